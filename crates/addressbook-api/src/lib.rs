//! # addressbook-api
//!
//! HTTP layer for the addressbook service: routing, request parsing, error
//! mapping and the OpenAPI document. The binary in `main.rs` wires it to a
//! database and a listener.

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod pagination;
pub mod query_types;

use std::time::Duration;

use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post, MethodRouter};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

use addressbook_core::defaults;
use addressbook_db::Database;

pub use config::{ConfigError, LogConfig, ServerConfig};
pub use error::ApiError;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    /// Base for absolute pagination links; `None` uses the request `Host`.
    pub public_base_url: Option<String>,
}

impl AppState {
    pub fn new(db: Database, config: &ServerConfig) -> Self {
        Self {
            db,
            public_base_url: config.public_base_url.clone(),
        }
    }
}

// =============================================================================
// REQUEST ID (UUIDv7)
// =============================================================================

/// Generates time-ordered UUIDv7 request correlation IDs.
#[derive(Clone, Default)]
pub struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

/// Parse a comma-separated CORS origin whitelist. Invalid entries are
/// skipped with a warning.
///
/// ```
/// use addressbook_api::parse_allowed_origins;
///
/// let origins = parse_allowed_origins("http://localhost:3000, https://app.example.com");
/// assert_eq!(origins.len(), 2);
/// ```
pub fn parse_allowed_origins(origins_str: &str) -> Vec<HeaderValue> {
    origins_str
        .split(',')
        .filter_map(|s| {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            match trimmed.parse::<HeaderValue>() {
                Ok(v) => Some(v),
                Err(e) => {
                    tracing::warn!("Invalid CORS origin '{}': {}", trimmed, e);
                    None
                }
            }
        })
        .collect()
}

// =============================================================================
// OPENAPI
// =============================================================================

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Addressbook API",
        description = "Contacts with labels: CRUD, filtering, search, pagination and statistics"
    ),
    paths(
        handlers::meta::health_check,
        handlers::meta::api_index,
        handlers::labels::list_labels,
        handlers::labels::create_label,
        handlers::labels::label_stats,
        handlers::labels::get_label,
        handlers::labels::update_label,
        handlers::labels::partial_update_label,
        handlers::labels::delete_label,
        handlers::labels::label_contacts,
        handlers::contacts::list_contacts,
        handlers::contacts::create_contact,
        handlers::contacts::birthdays_this_month,
        handlers::contacts::contact_statistics,
        handlers::contacts::get_contact,
        handlers::contacts::update_contact,
        handlers::contacts::partial_update_contact,
        handlers::contacts::delete_contact,
        handlers::contacts::add_labels,
        handlers::contacts::remove_labels,
    ),
    components(schemas(
        addressbook_core::Label,
        addressbook_core::LabelStats,
        addressbook_core::LabelInput,
        addressbook_core::ContactDetail,
        addressbook_core::ContactSummary,
        addressbook_core::ContactStatistics,
        addressbook_core::ContactInput,
        addressbook_core::LabelIdsBody,
        pagination::PaginationMeta,
        handlers::contacts::ContactListResponse,
    )),
    tags(
        (name = "Labels", description = "Label management"),
        (name = "Contacts", description = "Contact management, filtering and statistics"),
        (name = "System", description = "Health checks and API index")
    )
)]
pub struct ApiDoc;

// =============================================================================
// ROUTER
// =============================================================================

/// Register `path` both with and without its trailing slash.
fn route_both(
    router: Router<AppState>,
    path: &str,
    method_router: MethodRouter<AppState>,
) -> Router<AppState> {
    router
        .route(path, method_router.clone())
        .route(&format!("{}/", path), method_router)
}

/// Build the application router with all middleware applied.
pub fn router(state: AppState, allowed_origins: Vec<HeaderValue>) -> Router {
    use handlers::{contacts, labels, meta};

    let api = Router::new();
    let api = route_both(api, "/api/test", get(meta::api_index));
    // Labels
    let api = route_both(
        api,
        "/api/labels",
        get(labels::list_labels).post(labels::create_label),
    );
    let api = route_both(api, "/api/labels/stats", get(labels::label_stats));
    let api = route_both(
        api,
        "/api/labels/:id",
        get(labels::get_label)
            .put(labels::update_label)
            .patch(labels::partial_update_label)
            .delete(labels::delete_label),
    );
    let api = route_both(api, "/api/labels/:id/contacts", get(labels::label_contacts));
    // Contacts
    let api = route_both(
        api,
        "/api/contacts",
        get(contacts::list_contacts).post(contacts::create_contact),
    );
    let api = route_both(
        api,
        "/api/contacts/birthdays_this_month",
        get(contacts::birthdays_this_month),
    );
    let api = route_both(
        api,
        "/api/contacts/statistics",
        get(contacts::contact_statistics),
    );
    let api = route_both(
        api,
        "/api/contacts/:id",
        get(contacts::get_contact)
            .put(contacts::update_contact)
            .patch(contacts::partial_update_contact)
            .delete(contacts::delete_contact),
    );
    let api = route_both(api, "/api/contacts/:id/add_labels", post(contacts::add_labels));
    let api = route_both(
        api,
        "/api/contacts/:id/remove_labels",
        post(contacts::remove_labels),
    );

    api.route("/health", get(meta::health_check))
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .fallback(meta::not_found)
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(allowed_origins))
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::PATCH,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
                .allow_credentials(true)
                .max_age(Duration::from_secs(defaults::CORS_MAX_AGE_SECS)),
        )
        .layer(RequestBodyLimitLayer::new(defaults::MAX_BODY_SIZE_BYTES))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_allowed_origins_skips_blank_and_invalid() {
        let origins =
            parse_allowed_origins("http://localhost:3000, ,https://app.example.com,bad\nvalue");
        assert_eq!(
            origins,
            vec![
                HeaderValue::from_static("http://localhost:3000"),
                HeaderValue::from_static("https://app.example.com"),
            ]
        );
    }

    #[test]
    fn test_request_id_is_uuid_v7() {
        let request = axum::http::Request::builder().body(()).unwrap();
        let id = MakeRequestUuidV7.make_request_id(&request).unwrap();
        let parsed = Uuid::parse_str(id.header_value().to_str().unwrap()).unwrap();
        assert_eq!(parsed.get_version_num(), 7);
    }

    #[test]
    fn test_openapi_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/health",
            "/api/test/",
            "/api/labels/",
            "/api/labels/stats/",
            "/api/labels/{id}/",
            "/api/labels/{id}/contacts/",
            "/api/contacts/",
            "/api/contacts/birthdays_this_month/",
            "/api/contacts/statistics/",
            "/api/contacts/{id}/",
            "/api/contacts/{id}/add_labels/",
            "/api/contacts/{id}/remove_labels/",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
    }
}
