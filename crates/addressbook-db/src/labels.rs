//! Label repository implementation.

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use tracing::debug;

use addressbook_core::{
    Error, Label, LabelChanges, LabelQuery, LabelRepository, LabelStats, NewLabel, Result,
};

use crate::contact_query::order_by_clause;
use crate::escape_like;

const LABEL_COLUMNS: &str = "l.id, l.name, l.color, l.created_at, l.updated_at";

/// PostgreSQL implementation of LabelRepository.
pub struct PgLabelRepository {
    pool: Pool<Postgres>,
}

impl PgLabelRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LabelRepository for PgLabelRepository {
    async fn create(&self, label: NewLabel) -> Result<Label> {
        let created = sqlx::query_as::<_, Label>(
            "INSERT INTO label AS l (name, color) VALUES ($1, $2)
             RETURNING l.id, l.name, l.color, l.created_at, l.updated_at",
        )
        .bind(&label.name)
        .bind(&label.color)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        debug!(label_id = created.id, name = %created.name, "label: created");
        Ok(created)
    }

    async fn get(&self, id: i64) -> Result<Option<Label>> {
        let sql = format!("SELECT {} FROM label l WHERE l.id = $1", LABEL_COLUMNS);
        sqlx::query_as::<_, Label>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)
    }

    async fn fetch(&self, id: i64) -> Result<Label> {
        self.get(id).await?.ok_or(Error::LabelNotFound(id))
    }

    async fn list(&self, query: &LabelQuery) -> Result<Vec<Label>> {
        let where_sql = if query.search.is_empty() {
            "TRUE".to_string()
        } else {
            (1..=query.search.len())
                .map(|idx| format!("l.name ILIKE ${}", idx))
                .collect::<Vec<_>>()
                .join(" AND ")
        };
        let sql = format!(
            "SELECT {} FROM label l WHERE {} ORDER BY {}",
            LABEL_COLUMNS,
            where_sql,
            order_by_clause(&query.order, "l")
        );

        let mut q = sqlx::query_as::<_, Label>(&sql);
        for term in &query.search {
            q = q.bind(format!("%{}%", escape_like(term)));
        }
        let labels = q.fetch_all(&self.pool).await.map_err(Error::Database)?;

        Ok(labels)
    }

    async fn update(&self, id: i64, changes: LabelChanges) -> Result<Label> {
        sqlx::query_as::<_, Label>(
            "UPDATE label AS l
             SET name = COALESCE($2, l.name),
                 color = COALESCE($3, l.color),
                 updated_at = NOW()
             WHERE l.id = $1
             RETURNING l.id, l.name, l.color, l.created_at, l.updated_at",
        )
        .bind(id)
        .bind(changes.name)
        .bind(changes.color)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?
        .ok_or(Error::LabelNotFound(id))
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM label WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::LabelNotFound(id));
        }
        debug!(label_id = id, "label: deleted");
        Ok(())
    }

    async fn stats(&self) -> Result<Vec<LabelStats>> {
        sqlx::query_as::<_, LabelStats>(
            r#"
            SELECT l.id, l.name, l.color, COUNT(cl.contact_id) AS contact_count
            FROM label l
            LEFT JOIN contact_label cl ON cl.label_id = l.id
            GROUP BY l.id, l.name, l.color
            ORDER BY contact_count DESC, l.id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)
    }

    async fn existing_ids(&self, ids: &[i64]) -> Result<Vec<i64>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let found: Vec<i64> = sqlx::query_scalar("SELECT id FROM label WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(ids.iter().copied().filter(|id| found.contains(id)).collect())
    }
}
