//! Core value types for the alert-rule store.
//!
//! This crate provides:
//! - The [`AlertRule`] entity and its derived identity/group keys
//! - The [`Namespace`] (folder) record rules are filed under
//! - Query filters and bulk-update command types
//! - Short random UID generation for auto-provisioned records

pub mod namespace;
pub mod query;
pub mod rule;
pub mod uid;

pub use namespace::*;
pub use query::*;
pub use rule::*;
pub use uid::*;
