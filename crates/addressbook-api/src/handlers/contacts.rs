//! Contact HTTP handlers.

use std::time::Instant;

use axum::extract::{OriginalUri, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::{Datelike, Local};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{debug, info};
use utoipa::ToSchema;

use addressbook_core::defaults::PAGE_SIZE_PARAM;
use addressbook_core::validation::label_id_list;
use addressbook_core::{
    ContactDetail, ContactInput, ContactQuery, ContactRepository, ContactStatistics,
    ContactSummary, FieldErrors, LabelIdsBody, LabelRepository,
};

use crate::extract::{Pk, ValidJson};
use crate::pagination::{
    offset_for, page_size, PageLinks, PageNumber, PageWindow, PaginationMeta,
};
use crate::query_types::{parse_contact_query, unknown_label_choice, QueryPairs};
use crate::{ApiError, AppState};

const LABEL_IDS_REQUIRED: &str = "label_ids is required.";

/// Paginated contact listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ContactListResponse {
    pub pagination: PaginationMeta,
    pub results: Vec<ContactSummary>,
}

// =============================================================================
// LISTING
// =============================================================================

/// Reject `labels` ids that name no label, naming each one.
async fn check_label_filter(state: &AppState, query: &ContactQuery) -> Result<(), ApiError> {
    let wanted = &query.filter.label_ids;
    if wanted.is_empty() {
        return Ok(());
    }
    let found = state.db.labels.existing_ids(wanted).await?;
    let mut errors = FieldErrors::new();
    for id in wanted.iter().filter(|id| !found.contains(id)) {
        errors.add("labels", unknown_label_choice(*id));
    }
    errors.into_result()?;
    Ok(())
}

/// List contacts with filters, search, ordering and pagination.
///
/// GET /api/contacts/?search=kim&labels=1,2&has_email=true&ordering=name&page=2
#[utoipa::path(get, path = "/api/contacts/", tag = "Contacts",
    params(
        ("search" = Option<String>, Query, description = "Terms matched against name, email, phone, company"),
        ("name" = Option<String>, Query, description = "Name contains (case-insensitive)"),
        ("email" = Option<String>, Query, description = "Email contains (case-insensitive)"),
        ("company" = Option<String>, Query, description = "Company contains (case-insensitive)"),
        ("phone" = Option<String>, Query, description = "Exact phone"),
        ("created_after" = Option<String>, Query, description = "ISO 8601 lower bound on created_at"),
        ("created_before" = Option<String>, Query, description = "ISO 8601 upper bound on created_at"),
        ("birthday_month" = Option<u32>, Query, description = "1-12"),
        ("labels" = Option<String>, Query, description = "Label ids, repeated or comma-separated; any match"),
        ("has_email" = Option<String>, Query, description = "true, or anything else for false"),
        ("has_birthday" = Option<String>, Query, description = "true, or anything else for false"),
        ("ordering" = Option<String>, Query, description = "name, email, phone, created_at; prefix - for descending"),
        ("page" = Option<String>, Query, description = "1-based page number or 'last'"),
        ("page_size" = Option<i64>, Query, description = "Default 20, at most 100"),
    ),
    responses(
        (status = 200, description = "One page of contacts", body = ContactListResponse),
        (status = 400, description = "Malformed filter parameter"),
        (status = 404, description = "Invalid page"),
    ))]
pub async fn list_contacts(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<ContactListResponse>, ApiError> {
    let start = Instant::now();
    let pairs = QueryPairs(pairs);

    let query = parse_contact_query(&pairs).map_err(ApiError::Validation)?;
    check_label_filter(&state, &query).await?;

    let size = page_size(pairs.get(PAGE_SIZE_PARAM));
    let page = PageNumber::parse(pairs.get_raw("page"))?;

    let (window, contacts) = match page {
        PageNumber::Number(n) => {
            let result = state
                .db
                .contacts
                .list(&query.with_page(size, offset_for(n, size)))
                .await?;
            let window = PageWindow::resolve(page, size, result.total)?;
            (window, result.contacts)
        }
        PageNumber::Last => {
            let counted = state.db.contacts.list(&query.clone().with_page(0, 0)).await?;
            let window = PageWindow::resolve(page, size, counted.total)?;
            let result = state
                .db
                .contacts
                .list(&query.with_page(size, window.offset()))
                .await?;
            (window, result.contacts)
        }
    };

    let links = PageLinks::from_request(
        state.public_base_url.as_deref(),
        &headers,
        &uri,
        pairs.as_slice(),
    );
    let pagination = links.meta(&window);

    debug!(
        subsystem = "api",
        component = "contacts",
        op = "list",
        page = window.number,
        result_count = contacts.len(),
        total = window.count,
        duration_ms = start.elapsed().as_millis() as u64,
        "Contacts listed"
    );

    Ok(Json(ContactListResponse {
        pagination,
        results: contacts.into_iter().map(|c| c.into_summary()).collect(),
    }))
}

/// Contacts whose birthday falls in the server's current month.
#[utoipa::path(get, path = "/api/contacts/birthdays_this_month/", tag = "Contacts",
    responses((status = 200, description = "Contacts with a birthday this month", body = Vec<ContactSummary>)))]
pub async fn birthdays_this_month(
    State(state): State<AppState>,
) -> Result<Json<Vec<ContactSummary>>, ApiError> {
    let month = Local::now().month();
    let contacts = state.db.contacts.list_by_birthday_month(month).await?;
    Ok(Json(
        contacts.into_iter().map(|c| c.into_summary()).collect(),
    ))
}

#[utoipa::path(get, path = "/api/contacts/statistics/", tag = "Contacts",
    responses((status = 200, description = "Aggregate counts", body = ContactStatistics)))]
pub async fn contact_statistics(
    State(state): State<AppState>,
) -> Result<Json<ContactStatistics>, ApiError> {
    Ok(Json(state.db.contacts.statistics().await?))
}

// =============================================================================
// CRUD
// =============================================================================

#[utoipa::path(post, path = "/api/contacts/", tag = "Contacts",
    request_body = ContactInput,
    responses(
        (status = 201, description = "Created", body = ContactDetail),
        (status = 400, description = "Validation failed"),
    ))]
pub async fn create_contact(
    State(state): State<AppState>,
    ValidJson(input): ValidJson<ContactInput>,
) -> Result<(StatusCode, Json<ContactDetail>), ApiError> {
    let new_contact = input.into_new()?;
    let contact = state.db.contacts.create(new_contact).await?;
    info!(
        subsystem = "api",
        component = "contacts",
        op = "create",
        contact_id = contact.id,
        label_count = contact.labels.len(),
        "Contact created"
    );
    Ok((StatusCode::CREATED, Json(contact.into_detail())))
}

#[utoipa::path(get, path = "/api/contacts/{id}/", tag = "Contacts",
    params(("id" = i64, Path, description = "Contact id")),
    responses(
        (status = 200, description = "Contact", body = ContactDetail),
        (status = 404, description = "Not found"),
    ))]
pub async fn get_contact(
    State(state): State<AppState>,
    Pk(id): Pk,
) -> Result<Json<ContactDetail>, ApiError> {
    let contact = state.db.contacts.fetch(id).await?;
    Ok(Json(contact.into_detail()))
}

/// Full update: `name` is required. `label_ids`, when present, replaces the
/// label set.
#[utoipa::path(put, path = "/api/contacts/{id}/", tag = "Contacts",
    params(("id" = i64, Path, description = "Contact id")),
    request_body = ContactInput,
    responses((status = 200, description = "Updated", body = ContactDetail)))]
pub async fn update_contact(
    State(state): State<AppState>,
    Pk(id): Pk,
    ValidJson(input): ValidJson<ContactInput>,
) -> Result<Json<ContactDetail>, ApiError> {
    apply_update(&state, id, input, false).await
}

#[utoipa::path(patch, path = "/api/contacts/{id}/", tag = "Contacts",
    params(("id" = i64, Path, description = "Contact id")),
    request_body = ContactInput,
    responses((status = 200, description = "Updated", body = ContactDetail)))]
pub async fn partial_update_contact(
    State(state): State<AppState>,
    Pk(id): Pk,
    ValidJson(input): ValidJson<ContactInput>,
) -> Result<Json<ContactDetail>, ApiError> {
    apply_update(&state, id, input, true).await
}

async fn apply_update(
    state: &AppState,
    id: i64,
    input: ContactInput,
    partial: bool,
) -> Result<Json<ContactDetail>, ApiError> {
    state.db.contacts.fetch(id).await?;
    let changes = input.into_changes(partial)?;
    let contact = state.db.contacts.update(id, changes).await?;
    Ok(Json(contact.into_detail()))
}

#[utoipa::path(delete, path = "/api/contacts/{id}/", tag = "Contacts",
    params(("id" = i64, Path, description = "Contact id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not found"),
    ))]
pub async fn delete_contact(
    State(state): State<AppState>,
    Pk(id): Pk,
) -> Result<StatusCode, ApiError> {
    state.db.contacts.delete(id).await?;
    info!(
        subsystem = "api",
        component = "contacts",
        op = "delete",
        contact_id = id,
        "Contact deleted"
    );
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// LABEL ACTIONS
// =============================================================================

/// Parse a label action body. An absent, null or empty list is a 400.
fn label_action_ids(body: LabelIdsBody) -> Result<Vec<i64>, ApiError> {
    let value = match body.label_ids {
        None | Some(JsonValue::Null) => None,
        Some(JsonValue::Array(values)) if values.is_empty() => None,
        Some(value) => Some(value),
    };
    let Some(value) = value else {
        return Err(ApiError::BadRequest(LABEL_IDS_REQUIRED.to_string()));
    };
    let mut errors = FieldErrors::new();
    let ids = label_id_list(&mut errors, "label_ids", value);
    errors.into_result()?;
    Ok(ids)
}

/// Attach labels to a contact. Unknown and already-attached ids are skipped.
#[utoipa::path(post, path = "/api/contacts/{id}/add_labels/", tag = "Contacts",
    params(("id" = i64, Path, description = "Contact id")),
    request_body = LabelIdsBody,
    responses(
        (status = 200, description = "Contact after the change", body = ContactDetail),
        (status = 400, description = "label_ids missing or empty"),
        (status = 404, description = "Not found"),
    ))]
pub async fn add_labels(
    State(state): State<AppState>,
    Pk(id): Pk,
    ValidJson(body): ValidJson<LabelIdsBody>,
) -> Result<Json<ContactDetail>, ApiError> {
    // Missing contact is a 404 before the body is looked at
    state.db.contacts.fetch(id).await?;
    let label_ids = label_action_ids(body)?;
    let contact = state.db.contacts.add_labels(id, &label_ids).await?;
    Ok(Json(contact.into_detail()))
}

/// Detach labels from a contact. Ids not attached are skipped.
#[utoipa::path(post, path = "/api/contacts/{id}/remove_labels/", tag = "Contacts",
    params(("id" = i64, Path, description = "Contact id")),
    request_body = LabelIdsBody,
    responses(
        (status = 200, description = "Contact after the change", body = ContactDetail),
        (status = 400, description = "label_ids missing or empty"),
        (status = 404, description = "Not found"),
    ))]
pub async fn remove_labels(
    State(state): State<AppState>,
    Pk(id): Pk,
    ValidJson(body): ValidJson<LabelIdsBody>,
) -> Result<Json<ContactDetail>, ApiError> {
    // Missing contact is a 404 before the body is looked at
    state.db.contacts.fetch(id).await?;
    let label_ids = label_action_ids(body)?;
    let contact = state.db.contacts.remove_labels(id, &label_ids).await?;
    Ok(Json(contact.into_detail()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(value: serde_json::Value) -> LabelIdsBody {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_label_action_requires_ids() {
        for value in [json!({}), json!({"label_ids": []}), json!({"label_ids": null})] {
            match label_action_ids(body(value)) {
                Err(ApiError::BadRequest(msg)) => assert_eq!(msg, LABEL_IDS_REQUIRED),
                other => panic!("Expected BadRequest, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_label_action_parses_mixed_ids() {
        let ids = label_action_ids(body(json!({"label_ids": [3, "1", 3]}))).unwrap();
        assert_eq!(ids, vec![3, 1]);
    }

    #[test]
    fn test_label_action_rejects_non_ids() {
        match label_action_ids(body(json!({"label_ids": ["abc"]}))) {
            Err(ApiError::Validation(fields)) => assert!(fields.contains("label_ids")),
            other => panic!("Expected Validation, got {:?}", other),
        }
    }

    #[test]
    fn test_label_action_rejects_non_list() {
        match label_action_ids(body(json!({"label_ids": "1"}))) {
            Err(ApiError::Validation(fields)) => assert_eq!(
                fields.get("label_ids").unwrap(),
                ["Expected a list of items but got type \"str\"."]
            ),
            other => panic!("Expected Validation, got {:?}", other),
        }
    }
}
