//! Database query modules.
//!
//! - people: person CRUD plus the shared count/exists/delete templates

pub mod people;
