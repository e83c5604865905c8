//! Query-string parsing for the listing endpoints.
//!
//! Query strings are taken as raw `(key, value)` pairs so repeated keys
//! survive and every malformed parameter can be reported at once.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use addressbook_core::{
    ContactFilter, ContactQuery, ContactSortField, FieldErrors, LabelQuery, LabelSortField,
    OrderBy, SortField, TextField,
};

pub const MSG_DATETIME: &str = "Enter a valid date/time.";
pub const MSG_NUMBER: &str = "Enter a number.";
pub const MSG_MONTH_RANGE: &str = "Ensure this value is between 1 and 12.";

/// A timestamp accepted in any of the common ISO 8601 shapes.
///
/// Accepts:
/// - RFC 3339: `2024-01-15T10:30:00Z`, `2024-01-15T10:30:00+09:00`
/// - Without offset (UTC): `2024-01-15T10:30:00`, `2024-01-15 10:30`
/// - Date only (midnight UTC): `2024-01-15`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlexibleDateTime(pub DateTime<Utc>);

impl FlexibleDateTime {
    pub fn into_inner(self) -> DateTime<Utc> {
        self.0
    }
}

impl fmt::Display for FlexibleDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

impl FromStr for FlexibleDateTime {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(MSG_DATETIME.to_string());
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(FlexibleDateTime(dt.with_timezone(&Utc)));
        }

        for format in [
            "%Y-%m-%dT%H:%M:%S%.f",
            "%Y-%m-%dT%H:%M",
            "%Y-%m-%d %H:%M:%S%.f",
            "%Y-%m-%d %H:%M",
        ] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
                return Ok(FlexibleDateTime(naive.and_utc()));
            }
        }

        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
                return Ok(FlexibleDateTime(midnight.and_utc()));
            }
        }

        Err(MSG_DATETIME.to_string())
    }
}

/// Raw query pairs in request order.
#[derive(Debug, Clone, Default)]
pub struct QueryPairs(pub Vec<(String, String)>);

impl QueryPairs {
    /// Last value for `key`, if present. Blank values count as absent.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Last value for `key` exactly as sent, blank included.
    pub fn get_raw(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Every value for `key`, in request order.
    pub fn all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.0
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn as_slice(&self) -> &[(String, String)] {
        &self.0
    }
}

/// `"true"` in any case; everything else is false.
fn presence_flag(value: &str) -> bool {
    value.eq_ignore_ascii_case("true")
}

fn ordering<F: SortField>(pairs: &QueryPairs) -> Option<OrderBy<F>> {
    pairs.get("ordering").and_then(OrderBy::<F>::parse)
}

/// Text predicate parameters: `(param, field, exact)`.
const TEXT_PARAMS: [(&str, TextField, bool); 12] = [
    ("name", TextField::Name, false),
    ("name__icontains", TextField::Name, false),
    ("name__exact", TextField::Name, true),
    ("email", TextField::Email, false),
    ("email__icontains", TextField::Email, false),
    ("email__exact", TextField::Email, true),
    ("company", TextField::Company, false),
    ("company__icontains", TextField::Company, false),
    ("company__exact", TextField::Company, true),
    ("phone", TextField::Phone, true),
    ("phone__exact", TextField::Phone, true),
    ("phone__icontains", TextField::Phone, false),
];

/// Parse the contact listing query.
///
/// Label ids in `labels` are parsed here but their existence is checked by
/// the caller against storage.
pub fn parse_contact_query(pairs: &QueryPairs) -> Result<ContactQuery, FieldErrors> {
    let mut errors = FieldErrors::new();
    let mut filter = ContactFilter::new();

    for (param, field, exact) in TEXT_PARAMS {
        if let Some(value) = pairs.get(param) {
            filter = if exact {
                filter.exact(field, value)
            } else {
                filter.contains(field, value)
            };
        }
    }

    if let Some(raw) = pairs.get("created_after") {
        match raw.parse::<FlexibleDateTime>() {
            Ok(at) => filter = filter.created_after(at.into_inner()),
            Err(msg) => errors.add("created_after", msg),
        }
    }
    if let Some(raw) = pairs.get("created_before") {
        match raw.parse::<FlexibleDateTime>() {
            Ok(at) => filter = filter.created_before(at.into_inner()),
            Err(msg) => errors.add("created_before", msg),
        }
    }

    if let Some(raw) = pairs.get("birthday_month") {
        match raw.parse::<i64>() {
            Ok(month @ 1..=12) => filter = filter.with_birthday_month(month as u32),
            Ok(_) => errors.add("birthday_month", MSG_MONTH_RANGE),
            Err(_) => errors.add("birthday_month", MSG_NUMBER),
        }
    }

    let label_ids = parse_label_params(pairs, &mut errors);
    if !label_ids.is_empty() {
        filter = filter.with_labels(label_ids);
    }

    // Applied whenever present, blank included
    if let Some(raw) = pairs.get_raw("has_email") {
        filter = filter.has_email(presence_flag(raw.trim()));
    }
    if let Some(raw) = pairs.get_raw("has_birthday") {
        filter = filter.has_birthday(presence_flag(raw.trim()));
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    let mut query = ContactQuery::new(filter);
    if let Some(search) = pairs.get("search") {
        query = query.with_search(search);
    }
    if let Some(order) = ordering::<ContactSortField>(pairs) {
        query = query.with_order(order);
    }
    Ok(query)
}

/// Collect `labels` ids from repeated and comma-separated values.
fn parse_label_params(pairs: &QueryPairs, errors: &mut FieldErrors) -> Vec<i64> {
    let mut ids = Vec::new();
    for value in pairs.all("labels") {
        for part in value.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            match part.parse::<i64>() {
                Ok(id) if !ids.contains(&id) => ids.push(id),
                Ok(_) => {}
                Err(_) => errors.add(
                    "labels",
                    format!("\u{201c}{}\u{201d} is not a valid value.", part),
                ),
            }
        }
    }
    ids
}

/// Message for a `labels` id that names no label.
pub fn unknown_label_choice(id: i64) -> String {
    format!(
        "Select a valid choice. {} is not one of the available choices.",
        id
    )
}

pub fn parse_label_query(pairs: &QueryPairs) -> LabelQuery {
    let query = LabelQuery {
        order: ordering::<LabelSortField>(pairs).unwrap_or_default(),
        ..Default::default()
    };
    match pairs.get("search") {
        Some(text) => query.with_search(text),
        None => query,
    }
}
