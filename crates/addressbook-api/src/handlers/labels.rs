//! Label HTTP handlers.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::info;

use addressbook_core::{
    ContactRepository, ContactSummary, Label, LabelInput, LabelRepository, LabelStats,
};

use crate::extract::{Pk, ValidJson};
use crate::query_types::{parse_label_query, QueryPairs};
use crate::{ApiError, AppState};

/// List labels, optionally searched by name and ordered.
///
/// GET /api/labels/?search=fam&ordering=-created_at
#[utoipa::path(get, path = "/api/labels/", tag = "Labels",
    params(
        ("search" = Option<String>, Query, description = "Substring of the label name"),
        ("ordering" = Option<String>, Query, description = "name, created_at; prefix - for descending"),
    ),
    responses((status = 200, description = "Labels", body = Vec<Label>)))]
pub async fn list_labels(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<Label>>, ApiError> {
    let query = parse_label_query(&QueryPairs(pairs));
    let labels = state.db.labels.list(&query).await?;
    Ok(Json(labels))
}

#[utoipa::path(post, path = "/api/labels/", tag = "Labels",
    request_body = LabelInput,
    responses(
        (status = 201, description = "Created", body = Label),
        (status = 400, description = "Validation failed"),
    ))]
pub async fn create_label(
    State(state): State<AppState>,
    ValidJson(input): ValidJson<LabelInput>,
) -> Result<(StatusCode, Json<Label>), ApiError> {
    let new_label = input.into_new()?;
    let label = state.db.labels.create(new_label).await?;
    info!(
        subsystem = "api",
        component = "labels",
        op = "create",
        label_id = label.id,
        "Label created"
    );
    Ok((StatusCode::CREATED, Json(label)))
}

/// Every label with the number of contacts carrying it, busiest first.
#[utoipa::path(get, path = "/api/labels/stats/", tag = "Labels",
    responses((status = 200, description = "Label statistics", body = Vec<LabelStats>)))]
pub async fn label_stats(
    State(state): State<AppState>,
) -> Result<Json<Vec<LabelStats>>, ApiError> {
    Ok(Json(state.db.labels.stats().await?))
}

#[utoipa::path(get, path = "/api/labels/{id}/", tag = "Labels",
    params(("id" = i64, Path, description = "Label id")),
    responses(
        (status = 200, description = "Label", body = Label),
        (status = 404, description = "Not found"),
    ))]
pub async fn get_label(
    State(state): State<AppState>,
    Pk(id): Pk,
) -> Result<Json<Label>, ApiError> {
    Ok(Json(state.db.labels.fetch(id).await?))
}

/// Full update: `name` is required.
#[utoipa::path(put, path = "/api/labels/{id}/", tag = "Labels",
    params(("id" = i64, Path, description = "Label id")),
    request_body = LabelInput,
    responses((status = 200, description = "Updated", body = Label)))]
pub async fn update_label(
    State(state): State<AppState>,
    Pk(id): Pk,
    ValidJson(input): ValidJson<LabelInput>,
) -> Result<Json<Label>, ApiError> {
    apply_update(&state, id, input, false).await
}

#[utoipa::path(patch, path = "/api/labels/{id}/", tag = "Labels",
    params(("id" = i64, Path, description = "Label id")),
    request_body = LabelInput,
    responses((status = 200, description = "Updated", body = Label)))]
pub async fn partial_update_label(
    State(state): State<AppState>,
    Pk(id): Pk,
    ValidJson(input): ValidJson<LabelInput>,
) -> Result<Json<Label>, ApiError> {
    apply_update(&state, id, input, true).await
}

async fn apply_update(
    state: &AppState,
    id: i64,
    input: LabelInput,
    partial: bool,
) -> Result<Json<Label>, ApiError> {
    // Missing rows are a 404 even when the body is also invalid
    state.db.labels.fetch(id).await?;
    let changes = input.into_changes(partial)?;
    let label = state.db.labels.update(id, changes).await?;
    Ok(Json(label))
}

/// Delete a label. Contacts that carried it are kept.
#[utoipa::path(delete, path = "/api/labels/{id}/", tag = "Labels",
    params(("id" = i64, Path, description = "Label id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not found"),
    ))]
pub async fn delete_label(
    State(state): State<AppState>,
    Pk(id): Pk,
) -> Result<StatusCode, ApiError> {
    state.db.labels.delete(id).await?;
    info!(
        subsystem = "api",
        component = "labels",
        op = "delete",
        label_id = id,
        "Label deleted"
    );
    Ok(StatusCode::NO_CONTENT)
}

/// Contacts carrying a label, newest first.
#[utoipa::path(get, path = "/api/labels/{id}/contacts/", tag = "Labels",
    params(("id" = i64, Path, description = "Label id")),
    responses(
        (status = 200, description = "Contacts with this label", body = Vec<ContactSummary>),
        (status = 404, description = "Not found"),
    ))]
pub async fn label_contacts(
    State(state): State<AppState>,
    Pk(id): Pk,
) -> Result<Json<Vec<ContactSummary>>, ApiError> {
    state.db.labels.fetch(id).await?;
    let contacts = state.db.contacts.list_for_label(id).await?;
    Ok(Json(
        contacts.into_iter().map(|c| c.into_summary()).collect(),
    ))
}
