//! Centralized default constants for the addressbook service.
//!
//! Shared magic numbers live here so the db and api crates agree on them.

// =============================================================================
// FIELD LIMITS
// =============================================================================

/// Maximum label name length in characters.
pub const LABEL_NAME_MAX_LEN: usize = 50;

/// Default label color.
pub const LABEL_COLOR: &str = "#007bff";

/// Maximum contact name length in characters.
pub const CONTACT_NAME_MAX_LEN: usize = 100;

/// Maximum email length in characters.
pub const EMAIL_MAX_LEN: usize = 254;

/// Maximum phone number length in characters.
pub const PHONE_MAX_LEN: usize = 20;

/// Maximum company name length in characters.
pub const COMPANY_MAX_LEN: usize = 100;

/// Maximum position length in characters.
pub const POSITION_MAX_LEN: usize = 50;

/// Maximum address length in characters.
pub const ADDRESS_MAX_LEN: usize = 200;

/// Maximum length of URL fields (profile image, website).
pub const URL_MAX_LEN: usize = 200;

// =============================================================================
// PAGINATION
// =============================================================================

/// Default page size for the contact listing.
pub const PAGE_SIZE: i64 = 20;

/// Largest page size a client may request.
pub const PAGE_SIZE_MAX: i64 = 100;

/// Query parameter carrying the page number.
pub const PAGE_PARAM: &str = "page";

/// Query parameter carrying the page size.
pub const PAGE_SIZE_PARAM: &str = "page_size";

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP server port.
pub const SERVER_PORT: u16 = 8000;

/// Default bind address.
pub const SERVER_HOST: &str = "0.0.0.0";

/// Default CORS max-age in seconds (1 hour).
pub const CORS_MAX_AGE_SECS: u64 = 3600;

/// Maximum request body size in bytes (1 MB).
pub const MAX_BODY_SIZE_BYTES: usize = 1024 * 1024;

/// Default database URL for local development.
pub const DATABASE_URL: &str = "postgres://localhost/addressbook";

/// Default maximum number of pooled database connections.
pub const DB_MAX_CONNECTIONS: u32 = 10;

/// Default wait for a free pooled connection, in seconds.
pub const DB_ACQUIRE_TIMEOUT_SECS: u64 = 30;
