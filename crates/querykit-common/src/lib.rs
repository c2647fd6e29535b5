//! Querykit-Common: Shared types used across querykit.
//!
//! This crate provides common functionality used by the database layer and
//! the CLI:
//!
//! - **Error Handling**: One error enum covering parameter binding, field
//!   restriction, compilation, and database failures
//! - **Configuration**: JSON-backed settings for the database and logging
//! - **Typed IDs**: UUID wrappers for stored entities
//!
//! # Examples
//!
//! ```
//! use querykit_common::{Error, PersonId, Result};
//!
//! let id = PersonId::new();
//!
//! fn lookup(id: PersonId) -> Result<()> {
//!     Err(Error::not_found("person", id))
//! }
//! assert!(lookup(id).is_err());
//! ```

pub mod config;
pub mod error;
pub mod ids;

pub use error::{Error, Result};
pub use ids::*;
