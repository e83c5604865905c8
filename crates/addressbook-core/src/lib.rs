//! # addressbook-core
//!
//! Core types, validation, and repository abstractions for the addressbook
//! service.
//!
//! This crate holds the data model and the rules every write must satisfy.
//! It has no knowledge of HTTP or of how rows are stored.

pub mod defaults;
pub mod error;
pub mod filter;
pub mod models;
pub mod traits;
pub mod validation;

// Re-export commonly used types at crate root
pub use error::{Error, FieldErrors, Result};
pub use filter::{
    ContactFilter, ContactQuery, ContactSortField, LabelQuery, LabelSortField, OrderBy, SortField,
    SortKey, TextField, TextMatch, TextPredicate,
};
pub use models::*;
pub use traits::*;
