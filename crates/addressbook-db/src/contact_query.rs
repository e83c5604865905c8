//! SQL generation for contact listings.
//!
//! [`ContactQueryBuilder`] turns the filter and search terms of a
//! [`ContactQuery`] into one WHERE fragment over the `contact c` alias, with
//! positional parameters. The repository runs the COUNT and the page query
//! from the same fragment so totals always agree with the rows returned.

use addressbook_core::{ContactQuery, OrderBy, SortField, TextField, TextMatch, TextPredicate};

use crate::escape_like;

/// Type-safe parameter binding for SQL queries.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryParam {
    /// Array of ids (for ANY operations).
    BigIntArray(Vec<i64>),
    Int(i32),
    Timestamp(chrono::DateTime<chrono::Utc>),
    String(String),
}

/// Generates the WHERE clause for a contact listing.
///
/// ```rust,ignore
/// use addressbook_core::{ContactFilter, ContactQuery, TextField};
/// use addressbook_db::ContactQueryBuilder;
///
/// let query = ContactQuery::new(ContactFilter::new().contains(TextField::Name, "kim"));
/// let (sql, params) = ContactQueryBuilder::new(&query, 0).build();
/// // sql: "c.name ILIKE $1"
/// // params: [QueryParam::String("%kim%")]
/// ```
pub struct ContactQueryBuilder<'a> {
    query: &'a ContactQuery,
    param_offset: usize,
}

impl<'a> ContactQueryBuilder<'a> {
    /// `param_offset` is the number of parameters already in the statement.
    pub fn new(query: &'a ContactQuery, param_offset: usize) -> Self {
        Self {
            query,
            param_offset,
        }
    }

    /// Build the WHERE fragment and its parameters, in placeholder order.
    ///
    /// An unconstrained query yields `("TRUE", [])`.
    pub fn build(&self) -> (String, Vec<QueryParam>) {
        let filter = &self.query.filter;
        let mut clauses = Vec::new();
        let mut params = Vec::new();
        let mut param_idx = self.param_offset;

        for predicate in &filter.text {
            param_idx += 1;
            let (clause, param) = text_clause(predicate, param_idx);
            clauses.push(clause);
            params.push(param);
        }

        if let Some(after) = filter.created_after {
            param_idx += 1;
            clauses.push(format!("c.created_at >= ${}", param_idx));
            params.push(QueryParam::Timestamp(after));
        }

        if let Some(before) = filter.created_before {
            param_idx += 1;
            clauses.push(format!("c.created_at <= ${}", param_idx));
            params.push(QueryParam::Timestamp(before));
        }

        if let Some(month) = filter.birthday_month {
            param_idx += 1;
            clauses.push(format!(
                "EXTRACT(MONTH FROM c.birthday) = ${}",
                param_idx
            ));
            params.push(QueryParam::Int(month as i32));
        }

        // Any of the listed labels
        if !filter.label_ids.is_empty() {
            param_idx += 1;
            clauses.push(format!(
                "EXISTS (SELECT 1 FROM contact_label cl WHERE cl.contact_id = c.id AND cl.label_id = ANY(${}::bigint[]))",
                param_idx
            ));
            params.push(QueryParam::BigIntArray(filter.label_ids.clone()));
        }

        match filter.has_email {
            Some(true) => clauses.push("(c.email IS NOT NULL AND c.email <> '')".to_string()),
            Some(false) => clauses.push("(c.email IS NULL OR c.email = '')".to_string()),
            None => {}
        }

        match filter.has_birthday {
            Some(true) => clauses.push("c.birthday IS NOT NULL".to_string()),
            Some(false) => clauses.push("c.birthday IS NULL".to_string()),
            None => {}
        }

        // Each search term must hit at least one searchable column
        for term in &self.query.search {
            param_idx += 1;
            let alternatives: Vec<String> = TextField::SEARCHABLE
                .iter()
                .map(|field| format!("c.{} ILIKE ${}", field.column(), param_idx))
                .collect();
            clauses.push(format!("({})", alternatives.join(" OR ")));
            params.push(QueryParam::String(contains_pattern(term)));
        }

        if clauses.is_empty() {
            ("TRUE".to_string(), params)
        } else {
            (clauses.join(" AND "), params)
        }
    }

    /// Number of placeholders [`build`](Self::build) will emit.
    pub fn param_count(&self) -> usize {
        let filter = &self.query.filter;
        filter.text.len()
            + filter.created_after.is_some() as usize
            + filter.created_before.is_some() as usize
            + filter.birthday_month.is_some() as usize
            + (!filter.label_ids.is_empty()) as usize
            + self.query.search.len()
    }
}

fn text_clause(predicate: &TextPredicate, param_idx: usize) -> (String, QueryParam) {
    let column = predicate.field.column();
    match predicate.matching {
        TextMatch::Contains => (
            format!("c.{} ILIKE ${}", column, param_idx),
            QueryParam::String(contains_pattern(&predicate.value)),
        ),
        TextMatch::Exact => (
            format!("c.{} = ${}", column, param_idx),
            QueryParam::String(predicate.value.clone()),
        ),
    }
}

/// `%value%` with LIKE wildcards in the value escaped.
fn contains_pattern(value: &str) -> String {
    format!("%{}%", escape_like(value))
}

/// Render an ORDER BY list for `alias`, ending with the id tiebreaker.
pub fn order_by_clause<F: SortField>(order: &OrderBy<F>, alias: &str) -> String {
    let mut parts: Vec<String> = order
        .keys()
        .iter()
        .map(|key| {
            format!(
                "{}.{} {}",
                alias,
                key.field.column(),
                if key.descending { "DESC" } else { "ASC" }
            )
        })
        .collect();
    parts.push(format!(
        "{}.id {}",
        alias,
        if order.tiebreak_descending() {
            "DESC"
        } else {
            "ASC"
        }
    ));
    parts.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use addressbook_core::{ContactFilter, ContactSortField, LabelSortField};
    use chrono::{TimeZone, Utc};

    fn build(query: &ContactQuery) -> (String, Vec<QueryParam>) {
        ContactQueryBuilder::new(query, 0).build()
    }

    #[test]
    fn test_empty_query_returns_true() {
        let (sql, params) = build(&ContactQuery::default());
        assert_eq!(sql, "TRUE");
        assert!(params.is_empty());
    }

    #[test]
    fn test_contains_and_exact() {
        let query = ContactQuery::new(
            ContactFilter::new()
                .contains(TextField::Name, "kim")
                .exact(TextField::Phone, "010-1234-5678"),
        );
        let (sql, params) = build(&query);
        assert_eq!(sql, "c.name ILIKE $1 AND c.phone = $2");
        assert_eq!(
            params,
            vec![
                QueryParam::String("%kim%".to_string()),
                QueryParam::String("010-1234-5678".to_string()),
            ]
        );
    }

    #[test]
    fn test_contains_escapes_wildcards() {
        let query = ContactQuery::new(ContactFilter::new().contains(TextField::Email, "a_b%"));
        let (_, params) = build(&query);
        assert_eq!(params, vec![QueryParam::String("%a\\_b\\%%".to_string())]);
    }

    #[test]
    fn test_created_range_is_inclusive() {
        let after = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let before = Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 59).unwrap();
        let query = ContactQuery::new(
            ContactFilter::new()
                .created_after(after)
                .created_before(before),
        );
        let (sql, params) = build(&query);
        assert_eq!(sql, "c.created_at >= $1 AND c.created_at <= $2");
        assert_eq!(
            params,
            vec![QueryParam::Timestamp(after), QueryParam::Timestamp(before)]
        );
    }

    #[test]
    fn test_birthday_month() {
        let query = ContactQuery::new(ContactFilter::new().with_birthday_month(3));
        let (sql, params) = build(&query);
        assert_eq!(sql, "EXTRACT(MONTH FROM c.birthday) = $1");
        assert_eq!(params, vec![QueryParam::Int(3)]);
    }

    #[test]
    fn test_labels_any() {
        let query = ContactQuery::new(ContactFilter::new().with_labels(vec![1, 5]));
        let (sql, params) = build(&query);
        assert!(sql.starts_with("EXISTS (SELECT 1 FROM contact_label cl"));
        assert!(sql.contains("ANY($1::bigint[])"));
        assert_eq!(params, vec![QueryParam::BigIntArray(vec![1, 5])]);
    }

    #[test]
    fn test_presence_flags_take_no_params() {
        let query = ContactQuery::new(
            ContactFilter::new().has_email(true).has_birthday(false),
        );
        let (sql, params) = build(&query);
        assert_eq!(
            sql,
            "(c.email IS NOT NULL AND c.email <> '') AND c.birthday IS NULL"
        );
        assert!(params.is_empty());

        let query = ContactQuery::new(ContactFilter::new().has_email(false));
        let (sql, _) = build(&query);
        assert_eq!(sql, "(c.email IS NULL OR c.email = '')");
    }

    #[test]
    fn test_search_terms_and_together() {
        let query = ContactQuery::default().with_search("kim acme");
        let (sql, params) = build(&query);
        assert_eq!(
            sql,
            "(c.name ILIKE $1 OR c.email ILIKE $1 OR c.phone ILIKE $1 OR c.company ILIKE $1) \
             AND (c.name ILIKE $2 OR c.email ILIKE $2 OR c.phone ILIKE $2 OR c.company ILIKE $2)"
        );
        assert_eq!(
            params,
            vec![
                QueryParam::String("%kim%".to_string()),
                QueryParam::String("%acme%".to_string()),
            ]
        );
    }

    #[test]
    fn test_param_offset() {
        let query = ContactQuery::new(ContactFilter::new().with_birthday_month(12))
            .with_search("seoul");
        let (sql, params) = ContactQueryBuilder::new(&query, 2).build();
        assert!(sql.starts_with("EXTRACT(MONTH FROM c.birthday) = $3 AND "));
        assert!(sql.contains("c.company ILIKE $4"));
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_param_count_matches_build() {
        let query = ContactQuery::new(
            ContactFilter::new()
                .contains(TextField::Company, "acme")
                .created_after(Utc::now())
                .with_labels(vec![2])
                .has_email(true),
        )
        .with_search("a b");
        let builder = ContactQueryBuilder::new(&query, 0);
        assert_eq!(builder.param_count(), builder.build().1.len());
        assert_eq!(builder.param_count(), 5);
    }

    #[test]
    fn test_order_by_default_contact() {
        assert_eq!(
            order_by_clause(&OrderBy::<ContactSortField>::default(), "c"),
            "c.created_at DESC, c.id DESC"
        );
    }

    #[test]
    fn test_order_by_multiple_keys() {
        let order = OrderBy::<ContactSortField>::parse("name,-created_at").unwrap();
        assert_eq!(
            order_by_clause(&order, "c"),
            "c.name ASC, c.created_at DESC, c.id ASC"
        );
    }

    #[test]
    fn test_order_by_label_default() {
        assert_eq!(
            order_by_clause(&OrderBy::<LabelSortField>::default(), "l"),
            "l.name ASC, l.id ASC"
        );
    }
}
