//! Repository traits for addressbook storage.
//!
//! The db crate provides PostgreSQL implementations; handlers depend only on
//! these interfaces.

use async_trait::async_trait;

use crate::error::Result;
use crate::filter::{ContactQuery, LabelQuery};
use crate::models::*;

// =============================================================================
// LABEL REPOSITORY
// =============================================================================

#[async_trait]
pub trait LabelRepository: Send + Sync {
    /// Insert a new label. A duplicate name fails with a unique violation.
    async fn create(&self, label: NewLabel) -> Result<Label>;

    /// Fetch a label by id, if it exists.
    async fn get(&self, id: i64) -> Result<Option<Label>>;

    /// Fetch a label by id or fail with `LabelNotFound`.
    async fn fetch(&self, id: i64) -> Result<Label>;

    async fn list(&self, query: &LabelQuery) -> Result<Vec<Label>>;

    /// Apply field changes and bump `updated_at`.
    async fn update(&self, id: i64, changes: LabelChanges) -> Result<Label>;

    /// Delete a label. Associations go with it; contacts stay.
    async fn delete(&self, id: i64) -> Result<()>;

    /// Every label with its contact count, busiest first.
    async fn stats(&self) -> Result<Vec<LabelStats>>;

    /// The subset of `ids` that name existing labels, in input order.
    async fn existing_ids(&self, ids: &[i64]) -> Result<Vec<i64>>;
}

// =============================================================================
// CONTACT REPOSITORY
// =============================================================================

/// One page of contacts plus the total number of matches.
#[derive(Debug, Clone, Default)]
pub struct ContactPage {
    pub contacts: Vec<Contact>,
    pub total: i64,
}

#[async_trait]
pub trait ContactRepository: Send + Sync {
    /// Insert a contact and attach its initial labels in one transaction.
    /// Unknown label ids fail validation on `label_ids`.
    async fn create(&self, contact: NewContact) -> Result<Contact>;

    /// Fetch a contact with its labels or fail with `ContactNotFound`.
    async fn fetch(&self, id: i64) -> Result<Contact>;

    /// Run a listing query: count all matches, return the requested window.
    async fn list(&self, query: &ContactQuery) -> Result<ContactPage>;

    /// Apply field changes and, when given, replace the label set.
    async fn update(&self, id: i64, changes: ContactChanges) -> Result<Contact>;

    /// Delete a contact and its associations. Labels stay.
    async fn delete(&self, id: i64) -> Result<()>;

    /// Contacts carrying a label, in default contact order.
    async fn list_for_label(&self, label_id: i64) -> Result<Vec<Contact>>;

    /// Contacts whose birthday falls in `month` (1-12).
    async fn list_by_birthday_month(&self, month: u32) -> Result<Vec<Contact>>;

    async fn statistics(&self) -> Result<ContactStatistics>;

    /// Attach labels. Already-attached and unknown ids are skipped.
    async fn add_labels(&self, id: i64, label_ids: &[i64]) -> Result<Contact>;

    /// Detach labels. Ids not attached are skipped.
    async fn remove_labels(&self, id: i64, label_ids: &[i64]) -> Result<Contact>;
}
