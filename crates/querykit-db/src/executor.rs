//! Connection abstraction that runs compiled statements.
//!
//! [`run_statement`] is the synchronous primitive over a single
//! `rusqlite::Connection`. The [`Executor`] trait is the async surface the
//! query cache talks to; the pool implementation checks out a connection on
//! the blocking thread pool and calls `run_statement` there.

use std::sync::Arc;

use async_trait::async_trait;
use querykit_common::{Error, Result};
use rusqlite::Connection;

use crate::pool::{get_conn, DbPool};
use crate::sql::{CompiledStatement, StatementKind};
use crate::value::Value;

/// Raw engine result for a narrow-result statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawResult {
    /// Scalar cell for [`StatementKind::Scalar`], affected rows for
    /// [`StatementKind::Modify`].
    pub count: i64,
}

/// Something that can execute a compiled statement with bound values.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(
        &self,
        statement: Arc<CompiledStatement>,
        values: Vec<Value>,
    ) -> Result<RawResult>;
}

/// Execute `statement` on `conn` with positional `values`.
///
/// Uses the connection's prepared-statement cache, so repeated calls with the
/// same SQL skip SQLite's own parse step too. Engine errors are returned as
/// [`Error::Database`] with the `rusqlite::Error` as source.
pub fn run_statement(
    conn: &Connection,
    statement: &CompiledStatement,
    values: &[Value],
) -> Result<RawResult> {
    let mut stmt = conn
        .prepare_cached(statement.sql())
        .map_err(Error::database)?;
    let bound = rusqlite::params_from_iter(values.iter());

    let count = match statement.kind() {
        StatementKind::Scalar => stmt.query_row(bound, |row| row.get::<_, i64>(0)),
        StatementKind::Modify => stmt.execute(bound).map(|n| n as i64),
    }
    .map_err(Error::database)?;

    tracing::trace!(sql = statement.sql(), count, "executed statement");
    Ok(RawResult { count })
}

#[async_trait]
impl Executor for DbPool {
    async fn execute(
        &self,
        statement: Arc<CompiledStatement>,
        values: Vec<Value>,
    ) -> Result<RawResult> {
        let pool = self.clone();
        tokio::task::spawn_blocking(move || {
            let conn = get_conn(&pool)?;
            run_statement(&conn, &statement, &values)
        })
        .await
        .map_err(|e| Error::Internal(format!("spawn_blocking join error: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::init_memory_pool;
    use crate::sql::{col, lit, param, Compilable, Query};
    use crate::value::{ParamType, Params};
    use assert_matches::assert_matches;

    fn seed(conn: &Connection, ages: &[i64]) {
        for (i, age) in ages.iter().enumerate() {
            conn.execute(
                "INSERT INTO people (id, name, age, created_at, updated_at)
                 VALUES (?1, ?2, ?3, 'now', 'now')",
                rusqlite::params![format!("p{i}"), format!("person {i}"), age],
            )
            .unwrap();
        }
    }

    #[test]
    fn scalar_reads_first_cell() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();
        seed(&conn, &[10, 20, 30]);

        let stmt = Query::count("people")
            .filter(col("age").gt(param("min_age", ParamType::Integer)))
            .compile()
            .unwrap();
        let values = Params::new().with("min_age", 15).bind(stmt.params()).unwrap();
        assert_eq!(run_statement(&conn, &stmt, &values).unwrap().count, 2);
    }

    #[test]
    fn modify_reports_affected_rows() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();
        seed(&conn, &[10, 20, 30]);

        let stmt = Query::update("people")
            .set("name", lit("renamed"))
            .filter(col("age").ge(lit(20)))
            .compile()
            .unwrap();
        assert_eq!(run_statement(&conn, &stmt, &[]).unwrap().count, 2);
    }

    #[test]
    fn engine_error_keeps_source() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();

        let stmt = Query::count("no_such_table").compile().unwrap();
        let err = run_statement(&conn, &stmt, &[]).unwrap_err();
        assert_matches!(err, Error::Database { ref source }
            if source.downcast_ref::<rusqlite::Error>().is_some());
    }

    #[tokio::test]
    async fn pool_executes_on_blocking_thread() {
        let pool = init_memory_pool().unwrap();
        seed(&get_conn(&pool).unwrap(), &[1, 2, 3, 4]);

        let stmt = Arc::new(Query::count("people").compile().unwrap());
        let raw = pool.execute(stmt, Vec::new()).await.unwrap();
        assert_eq!(raw, RawResult { count: 4 });
    }
}
