//! Contact and label query model.
//!
//! A [`ContactQuery`] carries everything a listing needs: the AND-composed
//! [`ContactFilter`], free-text search terms, ordering, and the page window.
//! The db crate turns it into a single parameterized SQL plan.
//!
//! ```
//! use addressbook_core::filter::{ContactFilter, ContactQuery, TextField};
//!
//! let filter = ContactFilter::new()
//!     .contains(TextField::Company, "acme")
//!     .with_birthday_month(3)
//!     .with_labels(vec![1, 2]);
//!
//! let query = ContactQuery::new(filter).with_search("kim, seoul");
//! assert_eq!(query.search, vec!["kim", "seoul"]);
//! assert!(!query.filter.is_empty());
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// TEXT PREDICATES
// =============================================================================

/// Contact columns that accept text predicates and free-text search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextField {
    Name,
    Email,
    Phone,
    Company,
}

impl TextField {
    /// Fields searched by the `search` parameter, in match order.
    pub const SEARCHABLE: [TextField; 4] = [
        TextField::Name,
        TextField::Email,
        TextField::Phone,
        TextField::Company,
    ];

    pub fn column(self) -> &'static str {
        match self {
            TextField::Name => "name",
            TextField::Email => "email",
            TextField::Phone => "phone",
            TextField::Company => "company",
        }
    }
}

/// How a text predicate compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextMatch {
    /// Case-insensitive substring.
    Contains,
    Exact,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextPredicate {
    pub field: TextField,
    pub matching: TextMatch,
    pub value: String,
}

// =============================================================================
// CONTACT FILTER
// =============================================================================

/// Structured contact filter. Every set dimension must hold.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactFilter {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub text: Vec<TextPredicate>,

    /// Inclusive lower bound on `created_at`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_after: Option<DateTime<Utc>>,

    /// Inclusive upper bound on `created_at`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_before: Option<DateTime<Utc>>,

    /// Birthday month, 1-12. Contacts without a birthday never match.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birthday_month: Option<u32>,

    /// Contact carries ANY of these labels.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub label_ids: Vec<i64>,

    /// `true`: email non-null and non-empty. `false`: null or empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_email: Option<bool>,

    /// `true`: birthday set. `false`: birthday null.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_birthday: Option<bool>,
}

impl ContactFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(mut self, field: TextField, value: impl Into<String>) -> Self {
        self.text.push(TextPredicate {
            field,
            matching: TextMatch::Contains,
            value: value.into(),
        });
        self
    }

    pub fn exact(mut self, field: TextField, value: impl Into<String>) -> Self {
        self.text.push(TextPredicate {
            field,
            matching: TextMatch::Exact,
            value: value.into(),
        });
        self
    }

    pub fn created_after(mut self, at: DateTime<Utc>) -> Self {
        self.created_after = Some(at);
        self
    }

    pub fn created_before(mut self, at: DateTime<Utc>) -> Self {
        self.created_before = Some(at);
        self
    }

    pub fn with_birthday_month(mut self, month: u32) -> Self {
        self.birthday_month = Some(month);
        self
    }

    pub fn with_labels(mut self, label_ids: Vec<i64>) -> Self {
        self.label_ids = label_ids;
        self
    }

    pub fn has_email(mut self, present: bool) -> Self {
        self.has_email = Some(present);
        self
    }

    pub fn has_birthday(mut self, present: bool) -> Self {
        self.has_birthday = Some(present);
        self
    }

    /// True when no dimension constrains the result.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
            && self.created_after.is_none()
            && self.created_before.is_none()
            && self.birthday_month.is_none()
            && self.label_ids.is_empty()
            && self.has_email.is_none()
            && self.has_birthday.is_none()
    }
}

/// Split free text into search terms on whitespace and commas.
pub fn split_search_terms(text: &str) -> Vec<String> {
    text.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

// =============================================================================
// ORDERING
// =============================================================================

/// A column a listing may be ordered by.
pub trait SortField: Copy + PartialEq + Sized {
    /// Parse a client-facing field name.
    fn parse(name: &str) -> Option<Self>;

    fn column(self) -> &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey<F> {
    pub field: F,
    pub descending: bool,
}

/// Ordered list of sort keys. The row id is always the final tiebreaker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy<F> {
    keys: Vec<SortKey<F>>,
}

impl<F: SortField> OrderBy<F> {
    pub fn asc(field: F) -> Self {
        Self {
            keys: vec![SortKey {
                field,
                descending: false,
            }],
        }
    }

    pub fn desc(field: F) -> Self {
        Self {
            keys: vec![SortKey {
                field,
                descending: true,
            }],
        }
    }

    /// Parse `name,-created_at` style input.
    ///
    /// Unknown and repeated fields are skipped. Returns `None` when nothing
    /// usable remains so the caller can fall back to its default.
    pub fn parse(input: &str) -> Option<Self> {
        let mut keys: Vec<SortKey<F>> = Vec::new();
        for part in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (name, descending) = match part.strip_prefix('-') {
                Some(rest) => (rest, true),
                None => (part, false),
            };
            if let Some(field) = F::parse(name) {
                if !keys.iter().any(|k| k.field == field) {
                    keys.push(SortKey { field, descending });
                }
            }
        }
        if keys.is_empty() {
            None
        } else {
            Some(Self { keys })
        }
    }

    pub fn keys(&self) -> &[SortKey<F>] {
        &self.keys
    }

    /// Direction of the id tiebreaker: follows the leading key.
    pub fn tiebreak_descending(&self) -> bool {
        self.keys.first().map(|k| k.descending).unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactSortField {
    Name,
    Email,
    Phone,
    CreatedAt,
}

impl SortField for ContactSortField {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "name" => Some(Self::Name),
            "email" => Some(Self::Email),
            "phone" => Some(Self::Phone),
            "created_at" => Some(Self::CreatedAt),
            _ => None,
        }
    }

    fn column(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::CreatedAt => "created_at",
        }
    }
}

impl Default for OrderBy<ContactSortField> {
    /// Newest first.
    fn default() -> Self {
        Self::desc(ContactSortField::CreatedAt)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelSortField {
    Name,
    CreatedAt,
}

impl SortField for LabelSortField {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "name" => Some(Self::Name),
            "created_at" => Some(Self::CreatedAt),
            _ => None,
        }
    }

    fn column(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::CreatedAt => "created_at",
        }
    }
}

impl Default for OrderBy<LabelSortField> {
    fn default() -> Self {
        Self::asc(LabelSortField::Name)
    }
}

// =============================================================================
// QUERIES
// =============================================================================

/// A complete contact listing request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContactQuery {
    pub filter: ContactFilter,
    /// Every term must match one of the searchable fields.
    pub search: Vec<String>,
    pub order: OrderBy<ContactSortField>,
    /// `None` returns every matching row.
    pub limit: Option<i64>,
    pub offset: i64,
}

impl ContactQuery {
    pub fn new(filter: ContactFilter) -> Self {
        Self {
            filter,
            ..Default::default()
        }
    }

    pub fn with_search(mut self, text: &str) -> Self {
        self.search = split_search_terms(text);
        self
    }

    pub fn with_order(mut self, order: OrderBy<ContactSortField>) -> Self {
        self.order = order;
        self
    }

    pub fn with_page(mut self, limit: i64, offset: i64) -> Self {
        self.limit = Some(limit);
        self.offset = offset;
        self
    }
}

/// A label listing request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelQuery {
    /// Every term must appear in the label name, case-insensitively.
    pub search: Vec<String>,
    pub order: OrderBy<LabelSortField>,
}

impl LabelQuery {
    pub fn with_search(mut self, text: &str) -> Self {
        self.search = split_search_terms(text);
        self
    }
}
