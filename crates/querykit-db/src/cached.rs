//! Compile-once, execute-many parameterized queries.
//!
//! A [`ParameterizedQuery`] wraps a [`Compilable`] builder and a transform
//! from the raw engine count to the caller's result type. The first
//! execution compiles the builder and drops it; every execution after that
//! reads the shared [`CompiledStatement`], binds a fresh [`Params`] set, and
//! runs it.
//!
//! ```no_run
//! use querykit_db::cached::ParameterizedCountQuery;
//! use querykit_db::pool::init_memory_pool;
//! use querykit_db::sql::{col, param, Query};
//! use querykit_db::value::{ParamType, Params};
//!
//! # async fn run() -> querykit_common::Result<()> {
//! let pool = init_memory_pool()?;
//! let adults = ParameterizedCountQuery::count(
//!     Query::count("people").filter(col("age").gt(param("min_age", ParamType::Integer))),
//! );
//!
//! let over_18 = adults.execute(&pool, &Params::new().with("min_age", 18)).await?;
//! let over_65 = adults.execute(&pool, &Params::new().with("min_age", 65)).await?;
//! assert_eq!(adults.compile_count(), 1);
//! # let _ = (over_18, over_65);
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use querykit_common::Result;
use rusqlite::Connection;

use crate::executor::{run_statement, Executor};
use crate::sql::{Compilable, CompiledStatement, Query};
use crate::value::{Params, Value};

/// Count query returning the raw number.
pub type ParameterizedCountQuery<B = Query> = ParameterizedQuery<B, fn(i64) -> i64>;

/// Existence check: `true` when the raw count is positive.
pub type ParameterizedExistsQuery<B = Query> = ParameterizedQuery<B, fn(i64) -> bool>;

enum CacheState<B> {
    Uncompiled(B),
    Compiled(Arc<CompiledStatement>),
}

/// A query template compiled on first use and reused afterwards.
///
/// Safe to share across tasks. Concurrent first executions compile once:
/// the write lock re-checks the state before compiling, and every caller
/// ends up holding the same `Arc<CompiledStatement>`.
pub struct ParameterizedQuery<B, F> {
    state: RwLock<CacheState<B>>,
    transform: F,
    compilations: AtomicU64,
}

impl<B, F> ParameterizedQuery<B, F>
where
    B: Compilable,
{
    /// Wrap `builder` without compiling it.
    ///
    /// `transform` must be pure; it maps the raw scalar (or affected-row
    /// count) to the result handed back from [`execute`](Self::execute).
    pub fn new(builder: B, transform: F) -> Self {
        Self {
            state: RwLock::new(CacheState::Uncompiled(builder)),
            transform,
            compilations: AtomicU64::new(0),
        }
    }

    /// Number of successful compilations. Stays at 1 once compiled.
    pub fn compile_count(&self) -> u64 {
        self.compilations.load(Ordering::Acquire)
    }

    pub fn is_compiled(&self) -> bool {
        matches!(&*self.state.read(), CacheState::Compiled(_))
    }

    /// The compiled statement, if the first execution has happened.
    pub fn compiled(&self) -> Option<Arc<CompiledStatement>> {
        match &*self.state.read() {
            CacheState::Compiled(stmt) => Some(Arc::clone(stmt)),
            CacheState::Uncompiled(_) => None,
        }
    }

    /// Compile on first call; afterwards return the cached statement.
    ///
    /// A failed compile leaves the builder in place.
    fn compiled_form(&self) -> Result<Arc<CompiledStatement>> {
        if let CacheState::Compiled(stmt) = &*self.state.read() {
            return Ok(Arc::clone(stmt));
        }

        let mut state = self.state.write();
        let builder = match &*state {
            CacheState::Compiled(stmt) => return Ok(Arc::clone(stmt)),
            CacheState::Uncompiled(builder) => builder,
        };

        let stmt = Arc::new(builder.compile()?);
        self.compilations.fetch_add(1, Ordering::AcqRel);
        tracing::debug!(
            sql = stmt.sql(),
            params = stmt.params().len(),
            "compiled query template"
        );

        // Replacing the state drops the builder.
        *state = CacheState::Compiled(Arc::clone(&stmt));
        Ok(stmt)
    }

    fn prepare(&self, params: &Params) -> Result<(Arc<CompiledStatement>, Vec<Value>)> {
        let stmt = self.compiled_form()?;
        let values = params.bind(stmt.params())?;
        Ok((stmt, values))
    }

    /// Bind `params`, run on `executor`, and transform the raw count.
    ///
    /// Binding errors surface before any I/O. Executor errors are returned
    /// unchanged and leave the compiled form in place.
    pub async fn execute<E, T>(&self, executor: &E, params: &Params) -> Result<T>
    where
        E: Executor + ?Sized,
        F: Fn(i64) -> T,
    {
        let (stmt, values) = self.prepare(params)?;
        let raw = executor.execute(stmt, values).await?;
        Ok((self.transform)(raw.count))
    }

    /// Synchronous variant for callers that already hold a connection.
    pub fn execute_on<T>(&self, conn: &Connection, params: &Params) -> Result<T>
    where
        F: Fn(i64) -> T,
    {
        let (stmt, values) = self.prepare(params)?;
        let raw = run_statement(conn, &stmt, &values)?;
        Ok((self.transform)(raw.count))
    }
}

impl<B: Compilable> ParameterizedQuery<B, fn(i64) -> i64> {
    /// Count query with the identity transform.
    pub fn count(builder: B) -> Self {
        Self::new(builder, |n| n)
    }
}

impl<B: Compilable> ParameterizedQuery<B, fn(i64) -> bool> {
    /// Existence check: positive count means `true`.
    pub fn exists(builder: B) -> Self {
        Self::new(builder, |n| n > 0)
    }
}

impl<B, F> fmt::Debug for ParameterizedQuery<B, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sql = match &*self.state.read() {
            CacheState::Compiled(stmt) => Some(stmt.sql().to_string()),
            CacheState::Uncompiled(_) => None,
        };
        f.debug_struct("ParameterizedQuery")
            .field("compiled_sql", &sql)
            .field("compilations", &self.compilations.load(Ordering::Relaxed))
            .finish()
    }
}
