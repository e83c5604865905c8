//! Contact repository implementation.

use std::collections::HashMap;
use std::time::Instant;

use async_trait::async_trait;
use sqlx::postgres::PgExecutor;
use sqlx::{Pool, Postgres, Row};
use tracing::{debug, info};

use addressbook_core::validation::unknown_label_message;
use addressbook_core::{
    Contact, ContactChanges, ContactFilter, ContactPage, ContactQuery, ContactRepository,
    ContactStatistics, Error, FieldErrors, Label, NewContact, Result,
};

use crate::contact_query::{order_by_clause, ContactQueryBuilder, QueryParam};

const CONTACT_COLUMNS: &str = "id, name, email, phone, company, position, memo, profile_url, \
                               address, birthday, website, created_at, updated_at";

/// PostgreSQL implementation of ContactRepository.
pub struct PgContactRepository {
    pool: Pool<Postgres>,
}

impl PgContactRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

/// Load labels for every contact in one query and attach them, name order.
async fn attach_labels<'e, E>(executor: E, contacts: &mut [Contact]) -> Result<()>
where
    E: PgExecutor<'e>,
{
    if contacts.is_empty() {
        return Ok(());
    }
    let ids: Vec<i64> = contacts.iter().map(|c| c.id).collect();

    let rows = sqlx::query(
        r#"
        SELECT cl.contact_id, l.id, l.name, l.color, l.created_at, l.updated_at
        FROM contact_label cl
        JOIN label l ON l.id = cl.label_id
        WHERE cl.contact_id = ANY($1)
        ORDER BY l.name, l.id
        "#,
    )
    .bind(&ids)
    .fetch_all(executor)
    .await
    .map_err(Error::Database)?;

    let mut by_contact: HashMap<i64, Vec<Label>> = HashMap::new();
    for row in rows {
        by_contact
            .entry(row.get("contact_id"))
            .or_default()
            .push(Label {
                id: row.get("id"),
                name: row.get("name"),
                color: row.get("color"),
                created_at: row.get("created_at"),
                updated_at: row.get("updated_at"),
            });
    }

    for contact in contacts.iter_mut() {
        contact.labels = by_contact.remove(&contact.id).unwrap_or_default();
    }
    Ok(())
}

/// Fail validation on `label_ids` when any id names no label.
async fn require_labels<'e, E>(executor: E, label_ids: &[i64]) -> Result<()>
where
    E: PgExecutor<'e>,
{
    if label_ids.is_empty() {
        return Ok(());
    }
    let found: Vec<i64> = sqlx::query_scalar("SELECT id FROM label WHERE id = ANY($1)")
        .bind(label_ids)
        .fetch_all(executor)
        .await
        .map_err(Error::Database)?;

    let mut errors = FieldErrors::new();
    for id in label_ids.iter().filter(|id| !found.contains(id)) {
        errors.add("label_ids", unknown_label_message(*id));
    }
    errors.into_result()
}

/// Attach labels; existing pairs and unknown label ids are skipped.
async fn link_labels<'e, E>(executor: E, contact_id: i64, label_ids: &[i64]) -> Result<u64>
where
    E: PgExecutor<'e>,
{
    if label_ids.is_empty() {
        return Ok(0);
    }
    let result = sqlx::query(
        "INSERT INTO contact_label (contact_id, label_id)
         SELECT $1, l.id FROM label l WHERE l.id = ANY($2)
         ON CONFLICT (contact_id, label_id) DO NOTHING",
    )
    .bind(contact_id)
    .bind(label_ids)
    .execute(executor)
    .await
    .map_err(Error::Database)?;
    Ok(result.rows_affected())
}

#[async_trait]
impl ContactRepository for PgContactRepository {
    async fn create(&self, contact: NewContact) -> Result<Contact> {
        let label_ids = contact.label_ids.clone().unwrap_or_default();

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        require_labels(&mut *tx, &label_ids).await?;

        let sql = format!(
            "INSERT INTO contact (name, email, phone, company, position, memo, profile_url, \
             address, birthday, website) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {}",
            CONTACT_COLUMNS
        );
        let mut created = sqlx::query_as::<_, Contact>(&sql)
            .bind(&contact.name)
            .bind(&contact.email)
            .bind(&contact.phone)
            .bind(&contact.company)
            .bind(&contact.position)
            .bind(&contact.memo)
            .bind(&contact.profile_url)
            .bind(&contact.address)
            .bind(contact.birthday)
            .bind(&contact.website)
            .fetch_one(&mut *tx)
            .await
            .map_err(Error::Database)?;

        link_labels(&mut *tx, created.id, &label_ids).await?;
        attach_labels(&mut *tx, std::slice::from_mut(&mut created)).await?;

        tx.commit().await.map_err(Error::Database)?;

        debug!(
            contact_id = created.id,
            label_count = created.labels.len(),
            "contact: created"
        );
        Ok(created)
    }

    async fn fetch(&self, id: i64) -> Result<Contact> {
        let sql = format!("SELECT {} FROM contact WHERE id = $1", CONTACT_COLUMNS);
        let mut contact = sqlx::query_as::<_, Contact>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?
            .ok_or(Error::ContactNotFound(id))?;

        attach_labels(&self.pool, std::slice::from_mut(&mut contact)).await?;
        Ok(contact)
    }

    async fn list(&self, query: &ContactQuery) -> Result<ContactPage> {
        let start = Instant::now();
        let builder = ContactQueryBuilder::new(query, 0);
        let (where_sql, params) = builder.build();

        let count_sql = format!("SELECT COUNT(*) FROM contact c WHERE {}", where_sql);
        let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
        for param in &params {
            count_q = match param {
                QueryParam::BigIntArray(ids) => count_q.bind(ids),
                QueryParam::Int(val) => count_q.bind(val),
                QueryParam::Timestamp(ts) => count_q.bind(ts),
                QueryParam::String(s) => count_q.bind(s),
            };
        }
        let total = count_q
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;

        let mut page_sql = format!(
            "SELECT {} FROM contact c WHERE {} ORDER BY {}",
            CONTACT_COLUMNS,
            where_sql,
            order_by_clause(&query.order, "c")
        );
        let next_param = builder.param_count() + 1;
        if query.limit.is_some() {
            page_sql.push_str(&format!(
                " LIMIT ${} OFFSET ${}",
                next_param,
                next_param + 1
            ));
        }

        let mut page_q = sqlx::query_as::<_, Contact>(&page_sql);
        for param in &params {
            page_q = match param {
                QueryParam::BigIntArray(ids) => page_q.bind(ids),
                QueryParam::Int(val) => page_q.bind(val),
                QueryParam::Timestamp(ts) => page_q.bind(ts),
                QueryParam::String(s) => page_q.bind(s),
            };
        }
        if let Some(limit) = query.limit {
            page_q = page_q.bind(limit).bind(query.offset);
        }

        let mut contacts = page_q
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;
        attach_labels(&self.pool, &mut contacts).await?;

        debug!(
            subsystem = "db",
            component = "contacts",
            op = "list",
            total,
            result_count = contacts.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "contact: list"
        );
        Ok(ContactPage { contacts, total })
    }

    async fn update(&self, id: i64, changes: ContactChanges) -> Result<Contact> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let select_sql = format!(
            "SELECT {} FROM contact WHERE id = $1 FOR UPDATE",
            CONTACT_COLUMNS
        );
        let mut contact = sqlx::query_as::<_, Contact>(&select_sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(Error::Database)?
            .ok_or(Error::ContactNotFound(id))?;

        if let Some(label_ids) = &changes.label_ids {
            require_labels(&mut *tx, label_ids).await?;
        }

        changes.apply_to(&mut contact);

        let update_sql = format!(
            "UPDATE contact SET name = $2, email = $3, phone = $4, company = $5, position = $6, \
             memo = $7, profile_url = $8, address = $9, birthday = $10, website = $11, \
             updated_at = NOW() WHERE id = $1 RETURNING {}",
            CONTACT_COLUMNS
        );
        let mut updated = sqlx::query_as::<_, Contact>(&update_sql)
            .bind(id)
            .bind(&contact.name)
            .bind(&contact.email)
            .bind(&contact.phone)
            .bind(&contact.company)
            .bind(&contact.position)
            .bind(&contact.memo)
            .bind(&contact.profile_url)
            .bind(&contact.address)
            .bind(contact.birthday)
            .bind(&contact.website)
            .fetch_one(&mut *tx)
            .await
            .map_err(Error::Database)?;

        // Replace the whole label set only when one was supplied
        if let Some(label_ids) = &changes.label_ids {
            sqlx::query("DELETE FROM contact_label WHERE contact_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(Error::Database)?;
            link_labels(&mut *tx, id, label_ids).await?;
        }

        attach_labels(&mut *tx, std::slice::from_mut(&mut updated)).await?;
        tx.commit().await.map_err(Error::Database)?;

        debug!(contact_id = id, "contact: updated");
        Ok(updated)
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM contact WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::ContactNotFound(id));
        }
        debug!(contact_id = id, "contact: deleted");
        Ok(())
    }

    async fn list_for_label(&self, label_id: i64) -> Result<Vec<Contact>> {
        let query = ContactQuery::new(ContactFilter::new().with_labels(vec![label_id]));
        Ok(self.list(&query).await?.contacts)
    }

    async fn list_by_birthday_month(&self, month: u32) -> Result<Vec<Contact>> {
        let query = ContactQuery::new(ContactFilter::new().with_birthday_month(month));
        Ok(self.list(&query).await?.contacts)
    }

    async fn statistics(&self) -> Result<ContactStatistics> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total_contacts,
                COUNT(*) FILTER (WHERE email IS NOT NULL AND email <> '') AS with_email,
                COUNT(*) FILTER (WHERE phone IS NOT NULL AND phone <> '') AS with_phone,
                COUNT(*) FILTER (WHERE birthday IS NOT NULL) AS with_birthday,
                COUNT(DISTINCT company) FILTER (WHERE company IS NOT NULL AND company <> '')
                    AS companies
            FROM contact
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(ContactStatistics {
            total_contacts: row.get("total_contacts"),
            with_email: row.get("with_email"),
            with_phone: row.get("with_phone"),
            with_birthday: row.get("with_birthday"),
            companies: row.get("companies"),
        })
    }

    async fn add_labels(&self, id: i64, label_ids: &[i64]) -> Result<Contact> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        lock_contact(&mut *tx, id).await?;
        let added = link_labels(&mut *tx, id, label_ids).await?;
        touch_contact(&mut *tx, id).await?;
        tx.commit().await.map_err(Error::Database)?;

        info!(
            subsystem = "db",
            component = "contacts",
            op = "add_labels",
            contact_id = id,
            requested = label_ids.len(),
            added,
            "Labels attached to contact"
        );
        self.fetch(id).await
    }

    async fn remove_labels(&self, id: i64, label_ids: &[i64]) -> Result<Contact> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        lock_contact(&mut *tx, id).await?;
        let removed = if label_ids.is_empty() {
            0
        } else {
            sqlx::query("DELETE FROM contact_label WHERE contact_id = $1 AND label_id = ANY($2)")
                .bind(id)
                .bind(label_ids)
                .execute(&mut *tx)
                .await
                .map_err(Error::Database)?
                .rows_affected()
        };
        touch_contact(&mut *tx, id).await?;
        tx.commit().await.map_err(Error::Database)?;

        info!(
            subsystem = "db",
            component = "contacts",
            op = "remove_labels",
            contact_id = id,
            requested = label_ids.len(),
            removed,
            "Labels detached from contact"
        );
        self.fetch(id).await
    }
}

/// Row-lock a contact for the rest of the transaction, or fail with
/// `ContactNotFound`.
async fn lock_contact<'e, E>(executor: E, id: i64) -> Result<()>
where
    E: PgExecutor<'e>,
{
    sqlx::query_scalar::<_, i64>("SELECT id FROM contact WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(executor)
        .await
        .map_err(Error::Database)?
        .ok_or(Error::ContactNotFound(id))?;
    Ok(())
}

async fn touch_contact<'e, E>(executor: E, id: i64) -> Result<()>
where
    E: PgExecutor<'e>,
{
    sqlx::query("UPDATE contact SET updated_at = NOW() WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await
        .map_err(Error::Database)?;
    Ok(())
}
