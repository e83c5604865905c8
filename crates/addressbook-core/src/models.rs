//! Core data models: stored entities, their wire representations, and the
//! request bodies accepted for them.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;

/// Field update carried by a partial update.
///
/// `None` leaves the stored value alone, `Some(None)` clears it and
/// `Some(Some(v))` replaces it.
pub type Patch<T> = Option<Option<T>>;

/// Deserializer for [`Patch`] fields.
///
/// Use with `#[serde(default, deserialize_with = "nullable::deserialize")]` so
/// that an absent key and an explicit `null` stay distinguishable.
pub mod nullable {
    use super::*;

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

// =============================================================================
// LABEL
// =============================================================================

/// A label used to group contacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, utoipa::ToSchema)]
pub struct Label {
    pub id: i64,
    pub name: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A label annotated with the number of contacts carrying it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, utoipa::ToSchema)]
pub struct LabelStats {
    pub id: i64,
    pub name: String,
    pub color: String,
    pub contact_count: i64,
}

/// Request body for creating or updating a label.
#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
pub struct LabelInput {
    #[serde(default, deserialize_with = "nullable::deserialize")]
    #[schema(value_type = Option<String>)]
    pub name: Patch<JsonValue>,
    #[serde(default, deserialize_with = "nullable::deserialize")]
    #[schema(value_type = Option<String>)]
    pub color: Patch<JsonValue>,
}

/// A validated label ready to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLabel {
    pub name: String,
    pub color: String,
}

/// Validated label field changes. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelChanges {
    pub name: Option<String>,
    pub color: Option<String>,
}

impl LabelChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.color.is_none()
    }
}

// =============================================================================
// CONTACT
// =============================================================================

/// A stored contact together with its labels.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Contact {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub position: Option<String>,
    pub memo: Option<String>,
    pub profile_url: Option<String>,
    pub address: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub website: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Loaded separately from the association table.
    #[sqlx(skip)]
    pub labels: Vec<Label>,
}

impl Contact {
    /// `"{company} ({position})"` when both are set, whichever one is set
    /// otherwise, or an empty string.
    pub fn company_with_position(&self) -> String {
        company_with_position(self.company.as_deref(), self.position.as_deref())
    }

    /// Label ids currently attached, in label name order.
    pub fn label_ids(&self) -> Vec<i64> {
        self.labels.iter().map(|l| l.id).collect()
    }

    /// Full representation returned by detail, create, and update endpoints.
    pub fn into_detail(self) -> ContactDetail {
        let company_with_position = self.company_with_position();
        ContactDetail {
            id: self.id,
            name: self.name,
            email: self.email,
            phone: self.phone,
            company: self.company,
            position: self.position,
            memo: self.memo,
            profile_url: self.profile_url,
            address: self.address,
            birthday: self.birthday,
            website: self.website,
            labels: self.labels,
            company_with_position,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    /// Reduced representation used by listings.
    pub fn into_summary(self) -> ContactSummary {
        let company_with_position = self.company_with_position();
        ContactSummary {
            id: self.id,
            name: self.name,
            email: self.email,
            phone: self.phone,
            company: self.company,
            position: self.position,
            profile_url: self.profile_url,
            labels: self.labels,
            company_with_position,
        }
    }
}

impl fmt::Display for Contact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Combine company and position for display. Empty strings count as unset.
pub fn company_with_position(company: Option<&str>, position: Option<&str>) -> String {
    let company = company.filter(|s| !s.is_empty());
    let position = position.filter(|s| !s.is_empty());
    match (company, position) {
        (Some(c), Some(p)) => format!("{} ({})", c, p),
        (Some(c), None) => c.to_string(),
        (None, Some(p)) => p.to_string(),
        (None, None) => String::new(),
    }
}

/// Contact detail representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ContactDetail {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub position: Option<String>,
    pub memo: Option<String>,
    pub profile_url: Option<String>,
    pub address: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub website: Option<String>,
    pub labels: Vec<Label>,
    pub company_with_position: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Contact list representation. Omits memo, address, birthday, website.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ContactSummary {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub position: Option<String>,
    pub profile_url: Option<String>,
    pub labels: Vec<Label>,
    pub company_with_position: String,
}

/// Aggregate counts over all contacts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ContactStatistics {
    pub total_contacts: i64,
    /// Contacts with a non-empty email
    pub with_email: i64,
    /// Contacts with a non-empty phone
    pub with_phone: i64,
    /// Contacts with a birthday
    pub with_birthday: i64,
    /// Distinct non-empty company names
    pub companies: i64,
}

/// Request body for creating or updating a contact.
///
/// Everything arrives optional and untyped so validation can name every bad
/// field at once, wrong JSON types included. `label_ids` is write-only: it never appears in responses.
#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
pub struct ContactInput {
    #[serde(default, deserialize_with = "nullable::deserialize")]
    #[schema(value_type = Option<String>)]
    pub name: Patch<JsonValue>,
    #[serde(default, deserialize_with = "nullable::deserialize")]
    #[schema(value_type = Option<String>)]
    pub email: Patch<JsonValue>,
    #[serde(default, deserialize_with = "nullable::deserialize")]
    #[schema(value_type = Option<String>)]
    pub phone: Patch<JsonValue>,
    #[serde(default, deserialize_with = "nullable::deserialize")]
    #[schema(value_type = Option<String>)]
    pub company: Patch<JsonValue>,
    #[serde(default, deserialize_with = "nullable::deserialize")]
    #[schema(value_type = Option<String>)]
    pub position: Patch<JsonValue>,
    #[serde(default, deserialize_with = "nullable::deserialize")]
    #[schema(value_type = Option<String>)]
    pub memo: Patch<JsonValue>,
    #[serde(default, deserialize_with = "nullable::deserialize")]
    #[schema(value_type = Option<String>)]
    pub profile_url: Patch<JsonValue>,
    #[serde(default, deserialize_with = "nullable::deserialize")]
    #[schema(value_type = Option<String>)]
    pub address: Patch<JsonValue>,
    /// `YYYY-MM-DD`
    #[serde(default, deserialize_with = "nullable::deserialize")]
    #[schema(value_type = Option<String>)]
    pub birthday: Patch<JsonValue>,
    #[serde(default, deserialize_with = "nullable::deserialize")]
    #[schema(value_type = Option<String>)]
    pub website: Patch<JsonValue>,
    /// Label ids as integers or numeric strings.
    #[serde(default, deserialize_with = "nullable::deserialize")]
    #[schema(value_type = Option<Vec<i64>>)]
    pub label_ids: Patch<JsonValue>,
}

/// A validated contact ready to insert.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewContact {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub position: Option<String>,
    pub memo: Option<String>,
    pub profile_url: Option<String>,
    pub address: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub website: Option<String>,
    /// Initial label set; `None` or empty attaches nothing.
    pub label_ids: Option<Vec<i64>>,
}

/// Validated contact field changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactChanges {
    pub name: Option<String>,
    pub email: Patch<String>,
    pub phone: Patch<String>,
    pub company: Patch<String>,
    pub position: Patch<String>,
    pub memo: Patch<String>,
    pub profile_url: Patch<String>,
    pub address: Patch<String>,
    pub birthday: Patch<NaiveDate>,
    pub website: Patch<String>,
    /// `None` leaves labels alone; `Some` replaces the whole set.
    pub label_ids: Option<Vec<i64>>,
}

impl ContactChanges {
    /// True when no column of the contact row itself changes.
    pub fn has_no_field_changes(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.phone.is_none()
            && self.company.is_none()
            && self.position.is_none()
            && self.memo.is_none()
            && self.profile_url.is_none()
            && self.address.is_none()
            && self.birthday.is_none()
            && self.website.is_none()
    }

    /// Merge these changes into a stored contact. Labels are not touched.
    pub fn apply_to(&self, contact: &mut Contact) {
        if let Some(name) = &self.name {
            contact.name = name.clone();
        }
        merge(&mut contact.email, &self.email);
        merge(&mut contact.phone, &self.phone);
        merge(&mut contact.company, &self.company);
        merge(&mut contact.position, &self.position);
        merge(&mut contact.memo, &self.memo);
        merge(&mut contact.profile_url, &self.profile_url);
        merge(&mut contact.address, &self.address);
        merge(&mut contact.birthday, &self.birthday);
        merge(&mut contact.website, &self.website);
    }
}

fn merge<T: Clone>(target: &mut Option<T>, patch: &Patch<T>) {
    if let Some(value) = patch {
        *target = value.clone();
    }
}

/// Request body for the add/remove label actions.
#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
pub struct LabelIdsBody {
    #[serde(default)]
    #[schema(value_type = Option<Vec<i64>>)]
    pub label_ids: Option<JsonValue>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact(company: Option<&str>, position: Option<&str>) -> Contact {
        let now = Utc::now();
        Contact {
            id: 1,
            name: "Anna".to_string(),
            email: None,
            phone: None,
            company: company.map(str::to_string),
            position: position.map(str::to_string),
            memo: Some("met at a conference".to_string()),
            profile_url: None,
            address: Some("Seoul".to_string()),
            birthday: NaiveDate::from_ymd_opt(1990, 3, 14),
            website: None,
            created_at: now,
            updated_at: now,
            labels: vec![],
        }
    }

    #[test]
    fn test_company_with_position_both() {
        assert_eq!(
            contact(Some("ABC Corp"), Some("Developer")).company_with_position(),
            "ABC Corp (Developer)"
        );
    }

    #[test]
    fn test_company_with_position_company_only() {
        assert_eq!(contact(Some("ABC Corp"), None).company_with_position(), "ABC Corp");
    }

    #[test]
    fn test_company_with_position_position_only() {
        assert_eq!(contact(None, Some("Developer")).company_with_position(), "Developer");
    }

    #[test]
    fn test_company_with_position_neither() {
        assert_eq!(contact(None, None).company_with_position(), "");
    }

    #[test]
    fn test_company_with_position_empty_strings_count_as_unset() {
        assert_eq!(contact(Some(""), Some("CTO")).company_with_position(), "CTO");
        assert_eq!(contact(Some("ACME"), Some("")).company_with_position(), "ACME");
        assert_eq!(contact(Some(""), Some("")).company_with_position(), "");
    }

    #[test]
    fn test_display_is_name() {
        assert_eq!(contact(None, None).to_string(), "Anna");
        let now = Utc::now();
        let label = Label {
            id: 3,
            name: "Family".to_string(),
            color: "#FF0000".to_string(),
            created_at: now,
            updated_at: now,
        };
        assert_eq!(label.to_string(), "Family");
    }

    #[test]
    fn test_summary_omits_detail_only_fields() {
        let summary = contact(Some("ACME"), None).into_summary();
        let json = serde_json::to_value(&summary).unwrap();
        let obj = json.as_object().unwrap();
        for key in ["memo", "address", "birthday", "website", "created_at"] {
            assert!(!obj.contains_key(key), "list representation leaked {}", key);
        }
        assert_eq!(obj["company_with_position"], "ACME");
        assert!(obj.contains_key("labels"));
    }

    #[test]
    fn test_detail_contains_derived_field_and_no_label_ids() {
        let detail = contact(Some("ACME"), Some("CEO")).into_detail();
        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["company_with_position"], "ACME (CEO)");
        assert_eq!(json["birthday"], "1990-03-14");
        assert_eq!(json["memo"], "met at a conference");
        assert!(json.get("label_ids").is_none());
    }

    #[test]
    fn test_patch_distinguishes_absent_and_null() {
        let input: ContactInput =
            serde_json::from_str(r#"{"email": null, "phone": "010-1234-5678"}"#).unwrap();
        assert_eq!(input.email, Some(None));
        assert_eq!(input.phone, Some(Some(JsonValue::from("010-1234-5678"))));
        assert_eq!(input.company, None);
        assert!(input.label_ids.is_none());

        let input: ContactInput = serde_json::from_str(r#"{"label_ids": null}"#).unwrap();
        assert_eq!(input.label_ids, Some(None));
    }

    #[test]
    fn test_wrong_json_types_still_deserialize() {
        let input: ContactInput =
            serde_json::from_str(r#"{"name": 5, "email": true, "label_ids": "1"}"#).unwrap();
        assert_eq!(input.name, Some(Some(JsonValue::from(5))));
        assert_eq!(input.email, Some(Some(JsonValue::Bool(true))));
        assert_eq!(input.label_ids, Some(Some(JsonValue::from("1"))));
    }

    #[test]
    fn test_apply_changes_merges_patch_semantics() {
        let mut stored = contact(Some("ACME"), Some("CEO"));
        let changes = ContactChanges {
            name: Some("Anna Kim".to_string()),
            company: Some(None),
            phone: Some(Some("010-0000-0000".to_string())),
            ..Default::default()
        };
        changes.apply_to(&mut stored);
        assert_eq!(stored.name, "Anna Kim");
        assert_eq!(stored.company, None);
        assert_eq!(stored.position.as_deref(), Some("CEO"));
        assert_eq!(stored.phone.as_deref(), Some("010-0000-0000"));
        assert_eq!(stored.memo.as_deref(), Some("met at a conference"));
        assert_eq!(stored.birthday, NaiveDate::from_ymd_opt(1990, 3, 14));
    }

    #[test]
    fn test_contact_changes_field_detection() {
        let changes = ContactChanges {
            label_ids: Some(vec![1]),
            ..Default::default()
        };
        assert!(changes.has_no_field_changes());

        let changes = ContactChanges {
            memo: Some(None),
            ..Default::default()
        };
        assert!(!changes.has_no_field_changes());
    }
}
