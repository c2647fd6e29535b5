//! Querykit-DB: SQLite data access with compile-once parameterized queries.
//!
//! # Modules
//!
//! - `pool` - Connection pool management (r2d2)
//! - `migrations` - Embedded schema migrations
//! - `models` - Rust models matching the database schema
//! - `value` - Typed values, parameter declarations, and parameter sets
//! - `sql` - Query builder and compiled statements
//! - `executor` - Async execution seam over a connection or pool
//! - `cached` - `ParameterizedQuery`, the compile-once query cache
//! - `restrict` - Allow-list restriction of records to writable columns
//! - `queries` - Repository operations per table
//!
//! # Example
//!
//! ```no_run
//! use querykit_db::models::NewPerson;
//! use querykit_db::pool::{get_conn, init_memory_pool};
//! use querykit_db::queries::people::PeopleQueries;
//!
//! # async fn run() -> querykit_common::Result<()> {
//! let pool = init_memory_pool()?;
//! let people = PeopleQueries::new();
//!
//! let conn = get_conn(&pool)?;
//! people.create(&conn, &NewPerson { name: "Ada".into(), email: None, age: 36 })?;
//! drop(conn);
//!
//! let adults = people.count_older_than(&pool, 18).await?;
//! assert_eq!(adults, 1);
//! # Ok(())
//! # }
//! ```

pub mod cached;
pub mod executor;
pub mod migrations;
pub mod models;
pub mod pool;
pub mod queries;
pub mod restrict;
pub mod sql;
pub mod value;

pub use cached::{ParameterizedCountQuery, ParameterizedExistsQuery, ParameterizedQuery};
pub use executor::{Executor, RawResult};
pub use restrict::{restrict, Record, RestrictedRecord};
pub use value::{ParamDecl, ParamType, Params, Value};
