//! HTTP handlers for addressbook-api.

pub mod contacts;
pub mod labels;
pub mod meta;
