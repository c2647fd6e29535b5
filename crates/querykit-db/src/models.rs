//! Rust structs mapping to database tables.
//!
//! Each stored model implements `from_row` for constructing itself from a
//! `rusqlite::Row`. Input structs carry only the caller-writable columns.

use querykit_common::PersonId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Parse a UUID-based ID from a text column.
fn parse_id<T: From<Uuid>>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<T> {
    let s: String = row.get(idx)?;
    let uuid = Uuid::parse_str(&s).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(T::from(uuid))
}

// ---------------------------------------------------------------------------
// Person
// ---------------------------------------------------------------------------

/// Columns selected for [`Person::from_row`], in order.
pub const PERSON_COLUMNS: &str = "id, name, email, age, created_at, updated_at";

/// Columns a caller may write; everything else is system-managed.
pub const PERSON_WRITABLE: &[&str] = &["name", "email", "age"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub name: String,
    pub email: Option<String>,
    pub age: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl Person {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: parse_id(row, 0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            age: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }
}

/// Input for creating a person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPerson {
    pub name: String,
    pub email: Option<String>,
    pub age: i64,
}

/// Replacement values for a person's writable columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonChanges {
    pub name: String,
    pub email: Option<String>,
    pub age: i64,
}

impl From<&Person> for PersonChanges {
    fn from(p: &Person) -> Self {
        Self {
            name: p.name.clone(),
            email: p.email.clone(),
            age: p.age,
        }
    }
}
