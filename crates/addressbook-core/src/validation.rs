//! Field validation for label and contact request bodies.
//!
//! Every check records into a [`FieldErrors`] so a single response can name
//! all offending fields at once.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value as JsonValue;

use crate::defaults;
use crate::error::{Error, FieldErrors, Result};
use crate::models::{
    ContactChanges, ContactInput, LabelChanges, LabelInput, NewContact, NewLabel, Patch,
};

pub const MSG_REQUIRED: &str = "This field is required.";
pub const MSG_BLANK: &str = "This field may not be blank.";
pub const MSG_NULL: &str = "This field may not be null.";
pub const MSG_EMAIL: &str = "Enter a valid email address.";
pub const MSG_URL: &str = "Enter a valid URL.";
pub const MSG_COLOR: &str = "Color must be in #RRGGBB format.";
pub const MSG_DATE: &str = "Date has wrong format. Use one of these formats instead: YYYY-MM-DD.";
pub const MSG_LABEL_NAME_TAKEN: &str = "label with this name already exists.";
pub const MSG_STRING: &str = "Not a valid string.";

static COLOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("color pattern is valid")
});

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$",
    )
    .expect("email pattern is valid")
});

static URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^https?://[a-z0-9](?:[a-z0-9.-]*[a-z0-9])?(?::\d{1,5})?(?:[/?#]\S*)?$")
        .expect("url pattern is valid")
});

/// `#RRGGBB` hex color.
pub fn is_valid_color(color: &str) -> bool {
    COLOR_RE.is_match(color)
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Absolute http(s) URL with a host.
pub fn is_valid_url(url: &str) -> bool {
    URL_RE.is_match(url)
}

pub fn max_length_message(max: usize) -> String {
    format!("Ensure this field has no more than {} characters.", max)
}

/// Record an error when `value` is longer than `max` characters.
fn check_max_len(errors: &mut FieldErrors, field: &str, value: &str, max: usize) {
    if value.chars().count() > max {
        errors.add(field, max_length_message(max));
    }
}

/// Coerce a received JSON value to text. Numbers are taken in their decimal
/// form; booleans, lists and objects are recorded as errors and dropped.
fn text(errors: &mut FieldErrors, field: &str, value: Patch<JsonValue>) -> Patch<String> {
    match value? {
        None | Some(JsonValue::Null) => Some(None),
        Some(JsonValue::String(s)) => Some(Some(s)),
        Some(JsonValue::Number(n)) => Some(Some(n.to_string())),
        Some(_) => {
            errors.add(field, MSG_STRING);
            None
        }
    }
}

/// Python-style type name used in list type errors.
fn json_type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "NoneType",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(n) if n.is_f64() => "float",
        JsonValue::Number(_) => "int",
        JsonValue::String(_) => "str",
        JsonValue::Array(_) => "list",
        JsonValue::Object(_) => "dict",
    }
}

pub fn not_a_list_message(value: &JsonValue) -> String {
    format!(
        "Expected a list of items but got type \"{}\".",
        json_type_name(value)
    )
}

/// Parse a `label_ids` value that must be a list.
pub fn label_id_list(errors: &mut FieldErrors, field: &str, value: JsonValue) -> Vec<i64> {
    match value {
        JsonValue::Array(values) => parse_label_ids(errors, field, &values),
        other => {
            errors.add(field, not_a_list_message(&other));
            Vec::new()
        }
    }
}

/// The name branch shared by labels and contacts. A missing name is only
/// required on create and full update, and is not reported twice when the
/// value had the wrong type.
fn name_field(
    errors: &mut FieldErrors,
    value: Patch<JsonValue>,
    required: bool,
    max: usize,
) -> Option<String> {
    match text(errors, "name", value) {
        None => {
            if required && !errors.contains("name") {
                errors.add("name", MSG_REQUIRED);
            }
            None
        }
        Some(v) => required_text(errors, "name", v, max),
    }
}

/// Validate a required text field: non-null, non-blank after trimming,
/// within the length limit. Returns the trimmed value.
fn required_text(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<String>,
    max: usize,
) -> Option<String> {
    match value {
        None => {
            errors.add(field, MSG_NULL);
            None
        }
        Some(v) => {
            let v = v.trim().to_string();
            if v.is_empty() {
                errors.add(field, MSG_BLANK);
                return None;
            }
            check_max_len(errors, field, &v, max);
            Some(v)
        }
    }
}

/// Validate an optional text field. Empty strings are kept as-is.
fn optional_text(
    errors: &mut FieldErrors,
    field: &str,
    value: Patch<JsonValue>,
    max: Option<usize>,
    format: Option<(fn(&str) -> bool, &str)>,
) -> Patch<String> {
    let value = text(errors, field, value)?;
    let Some(v) = value else {
        return Some(None);
    };
    let v = v.trim().to_string();
    if let Some(max) = max {
        check_max_len(errors, field, &v, max);
    }
    if let Some((is_valid, message)) = format {
        if !v.is_empty() && !is_valid(&v) {
            errors.add(field, message);
        }
    }
    Some(Some(v))
}

/// Parse a `YYYY-MM-DD` birthday. An empty string clears the value.
fn optional_date(
    errors: &mut FieldErrors,
    field: &str,
    value: Patch<JsonValue>,
) -> Patch<NaiveDate> {
    let value = text(errors, field, value)?;
    match value.as_deref().map(str::trim) {
        None | Some("") => Some(None),
        Some(v) => match NaiveDate::parse_from_str(v, "%Y-%m-%d") {
            Ok(date) => Some(Some(date)),
            Err(_) => {
                errors.add(field, MSG_DATE);
                None
            }
        },
    }
}

/// Parse one label id given as a JSON integer or numeric string.
pub fn parse_label_id(value: &JsonValue) -> Option<i64> {
    match value {
        JsonValue::Number(n) => n.as_i64(),
        JsonValue::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Parse a `label_ids` list, naming every element that is not an id.
/// Duplicates are collapsed, first occurrence wins.
pub fn parse_label_ids(errors: &mut FieldErrors, field: &str, values: &[JsonValue]) -> Vec<i64> {
    let mut ids = Vec::with_capacity(values.len());
    for value in values {
        match parse_label_id(value) {
            Some(id) => {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
            None => {
                let shown = match value {
                    JsonValue::String(s) => s.clone(),
                    other => other.to_string(),
                };
                errors.add(field, format!("\"{}\" is not a valid primary key.", shown));
            }
        }
    }
    ids
}

/// Message for an id in `label_ids` that names no existing label.
pub fn unknown_label_message(id: i64) -> String {
    format!("Invalid pk \"{}\" - object does not exist.", id)
}

// =============================================================================
// LABEL
// =============================================================================

impl LabelInput {
    /// Validate a create body. `color` falls back to the default.
    pub fn into_new(self) -> Result<NewLabel> {
        let mut errors = FieldErrors::new();

        let name = name_field(&mut errors, self.name, true, defaults::LABEL_NAME_MAX_LEN);
        let color = label_color(&mut errors, self.color)
            .unwrap_or_else(|| defaults::LABEL_COLOR.to_string());

        errors.into_result()?;
        let name = name.ok_or_else(|| Error::field("name", MSG_REQUIRED))?;
        Ok(NewLabel { name, color })
    }

    /// Validate an update body. A full update requires `name`.
    pub fn into_changes(self, partial: bool) -> Result<LabelChanges> {
        let mut errors = FieldErrors::new();

        let name = name_field(&mut errors, self.name, !partial, defaults::LABEL_NAME_MAX_LEN);
        let color = label_color(&mut errors, self.color);

        errors.into_result()?;
        Ok(LabelChanges { name, color })
    }
}

fn label_color(errors: &mut FieldErrors, value: Patch<JsonValue>) -> Option<String> {
    match text(errors, "color", value) {
        None => None,
        Some(None) => {
            errors.add("color", MSG_NULL);
            None
        }
        Some(Some(c)) => {
            let c = c.trim().to_string();
            if is_valid_color(&c) {
                Some(c)
            } else {
                errors.add("color", MSG_COLOR);
                None
            }
        }
    }
}

// =============================================================================
// CONTACT
// =============================================================================

impl ContactInput {
    /// Validate a create body.
    pub fn into_new(self) -> Result<NewContact> {
        let changes = self.validate(false)?;
        let name = changes
            .name
            .ok_or_else(|| Error::field("name", MSG_REQUIRED))?;
        Ok(NewContact {
            name,
            email: changes.email.flatten(),
            phone: changes.phone.flatten(),
            company: changes.company.flatten(),
            position: changes.position.flatten(),
            memo: changes.memo.flatten(),
            profile_url: changes.profile_url.flatten(),
            address: changes.address.flatten(),
            birthday: changes.birthday.flatten(),
            website: changes.website.flatten(),
            label_ids: changes.label_ids,
        })
    }

    /// Validate an update body. A full update (PUT) requires `name`.
    pub fn into_changes(self, partial: bool) -> Result<ContactChanges> {
        self.validate(partial)
    }

    fn validate(self, partial: bool) -> Result<ContactChanges> {
        let mut errors = FieldErrors::new();

        let name = name_field(&mut errors, self.name, !partial, defaults::CONTACT_NAME_MAX_LEN);

        let email = optional_text(
            &mut errors,
            "email",
            self.email,
            Some(defaults::EMAIL_MAX_LEN),
            Some((is_valid_email, MSG_EMAIL)),
        );
        let phone = optional_text(&mut errors, "phone", self.phone, Some(defaults::PHONE_MAX_LEN), None);
        let company = optional_text(
            &mut errors,
            "company",
            self.company,
            Some(defaults::COMPANY_MAX_LEN),
            None,
        );
        let position = optional_text(
            &mut errors,
            "position",
            self.position,
            Some(defaults::POSITION_MAX_LEN),
            None,
        );
        let memo = optional_text(&mut errors, "memo", self.memo, None, None);
        let profile_url = optional_text(
            &mut errors,
            "profile_url",
            self.profile_url,
            Some(defaults::URL_MAX_LEN),
            Some((is_valid_url, MSG_URL)),
        );
        let address = optional_text(
            &mut errors,
            "address",
            self.address,
            Some(defaults::ADDRESS_MAX_LEN),
            None,
        );
        let birthday = optional_date(&mut errors, "birthday", self.birthday);
        let website = optional_text(
            &mut errors,
            "website",
            self.website,
            Some(defaults::URL_MAX_LEN),
            Some((is_valid_url, MSG_URL)),
        );
        let label_ids = match self.label_ids {
            None => None,
            Some(None) => {
                errors.add("label_ids", MSG_NULL);
                None
            }
            Some(Some(value)) => Some(label_id_list(&mut errors, "label_ids", value)),
        };

        errors.into_result()?;
        Ok(ContactChanges {
            name,
            email,
            phone,
            company,
            position,
            memo,
            profile_url,
            address,
            birthday,
            website,
            label_ids,
        })
    }
}
