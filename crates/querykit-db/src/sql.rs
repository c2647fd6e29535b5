//! Query builder and compiled statements.
//!
//! [`Query`] describes a statement as a tree of [`Expr`] nodes, with typed
//! named parameters at the leaves. Compiling it renders SQLite text with
//! positional `?N` placeholders and records the parameter declarations in
//! placeholder order, so the tree is not needed again after compilation.
//!
//! ```
//! use querykit_db::sql::{col, param, Compilable, Query, StatementKind};
//! use querykit_db::value::ParamType;
//!
//! let query = Query::count("people").filter(col("age").gt(param("min_age", ParamType::Integer)));
//! let compiled = query.compile().unwrap();
//! assert_eq!(compiled.sql(), r#"SELECT COUNT(*) FROM "people" WHERE "age" > ?1"#);
//! assert_eq!(compiled.kind(), StatementKind::Scalar);
//! assert_eq!(compiled.params()[0].name, "min_age");
//! ```

use std::fmt::Write as _;

use querykit_common::{Error, Result};

use crate::value::{ParamDecl, ParamType, Value};

/// Anything that can be turned into an executable statement.
pub trait Compilable {
    fn compile(&self) -> Result<CompiledStatement>;
}

/// How the engine's raw result is read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// Returns a single integer cell (counts, existence checks).
    Scalar,
    /// Returns nothing; the affected-row count is the result.
    Modify,
}

/// SQL text plus the parameters it expects.
///
/// `params()[i]` binds to placeholder `?{i + 1}`.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledStatement {
    sql: String,
    kind: StatementKind,
    params: Vec<ParamDecl>,
}

impl CompiledStatement {
    /// Wrap hand-written SQL. Placeholders must be `?1..?N` in the order of
    /// `params`.
    pub fn new(sql: impl Into<String>, kind: StatementKind, params: Vec<ParamDecl>) -> Self {
        Self {
            sql: sql.into(),
            kind,
            params,
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    pub fn params(&self) -> &[ParamDecl] {
        &self.params
    }
}

impl Compilable for CompiledStatement {
    fn compile(&self) -> Result<CompiledStatement> {
        Ok(self.clone())
    }
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
}

impl CompareOp {
    fn as_sql(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Like => "LIKE",
        }
    }
}

/// A node in a filter or value expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Column(String),
    Param(ParamDecl),
    Literal(Value),
    Compare {
        lhs: Box<Expr>,
        op: CompareOp,
        rhs: Box<Expr>,
    },
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Box<Expr>),
    IsNull(Box<Expr>),
    IsNotNull(Box<Expr>),
}

/// Column reference.
pub fn col(name: impl Into<String>) -> Expr {
    Expr::Column(name.into())
}

/// Non-nullable named parameter.
pub fn param(name: impl Into<String>, ty: ParamType) -> Expr {
    Expr::Param(ParamDecl::new(name, ty))
}

/// Named parameter that also accepts `NULL`.
pub fn nullable_param(name: impl Into<String>, ty: ParamType) -> Expr {
    Expr::Param(ParamDecl::new(name, ty).nullable())
}

/// Inline literal.
pub fn lit(value: impl Into<Value>) -> Expr {
    Expr::Literal(value.into())
}

impl Expr {
    fn compare(self, op: CompareOp, rhs: Expr) -> Expr {
        Expr::Compare {
            lhs: Box::new(self),
            op,
            rhs: Box::new(rhs),
        }
    }

    pub fn eq(self, rhs: Expr) -> Expr {
        self.compare(CompareOp::Eq, rhs)
    }

    pub fn ne(self, rhs: Expr) -> Expr {
        self.compare(CompareOp::Ne, rhs)
    }

    pub fn lt(self, rhs: Expr) -> Expr {
        self.compare(CompareOp::Lt, rhs)
    }

    pub fn le(self, rhs: Expr) -> Expr {
        self.compare(CompareOp::Le, rhs)
    }

    pub fn gt(self, rhs: Expr) -> Expr {
        self.compare(CompareOp::Gt, rhs)
    }

    pub fn ge(self, rhs: Expr) -> Expr {
        self.compare(CompareOp::Ge, rhs)
    }

    pub fn like(self, rhs: Expr) -> Expr {
        self.compare(CompareOp::Like, rhs)
    }

    /// Conjunction, flattening nested `And` nodes.
    pub fn and(self, other: Expr) -> Expr {
        match self {
            Expr::And(mut terms) => {
                terms.push(other);
                Expr::And(terms)
            }
            this => Expr::And(vec![this, other]),
        }
    }

    /// Disjunction, flattening nested `Or` nodes.
    pub fn or(self, other: Expr) -> Expr {
        match self {
            Expr::Or(mut terms) => {
                terms.push(other);
                Expr::Or(terms)
            }
            this => Expr::Or(vec![this, other]),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Expr {
        Expr::Not(Box::new(self))
    }

    pub fn is_null(self) -> Expr {
        Expr::IsNull(Box::new(self))
    }

    pub fn is_not_null(self) -> Expr {
        Expr::IsNotNull(Box::new(self))
    }
}

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Shape {
    Count,
    Exists,
    Insert,
    Update,
    Delete,
}

/// A statement under construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    shape: Shape,
    table: String,
    assignments: Vec<(String, Expr)>,
    filter: Option<Expr>,
}

impl Query {
    fn new(shape: Shape, table: impl Into<String>) -> Self {
        Self {
            shape,
            table: table.into(),
            assignments: Vec::new(),
            filter: None,
        }
    }

    /// `SELECT COUNT(*) FROM table [WHERE ...]`
    pub fn count(table: impl Into<String>) -> Self {
        Self::new(Shape::Count, table)
    }

    /// `SELECT EXISTS(SELECT 1 FROM table [WHERE ...])`
    pub fn exists(table: impl Into<String>) -> Self {
        Self::new(Shape::Exists, table)
    }

    /// `INSERT INTO table (...) VALUES (...)`
    pub fn insert_into(table: impl Into<String>) -> Self {
        Self::new(Shape::Insert, table)
    }

    /// `UPDATE table SET ... [WHERE ...]`
    pub fn update(table: impl Into<String>) -> Self {
        Self::new(Shape::Update, table)
    }

    /// `DELETE FROM table [WHERE ...]`
    pub fn delete_from(table: impl Into<String>) -> Self {
        Self::new(Shape::Delete, table)
    }

    /// Add a filter; repeated calls are ANDed together.
    #[must_use]
    pub fn filter(mut self, expr: Expr) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(expr),
            None => expr,
        });
        self
    }

    /// Assign a column (insert value or update `SET`).
    #[must_use]
    pub fn set(mut self, column: impl Into<String>, expr: Expr) -> Self {
        self.assignments.push((column.into(), expr));
        self
    }

    /// Assign each column to a parameter of the same name.
    #[must_use]
    pub fn set_params<'a>(
        mut self,
        columns: impl IntoIterator<Item = (&'a str, ParamDecl)>,
    ) -> Self {
        for (column, decl) in columns {
            self.assignments.push((column.to_string(), Expr::Param(decl)));
        }
        self
    }

    fn statement_kind(&self) -> StatementKind {
        match self.shape {
            Shape::Count | Shape::Exists => StatementKind::Scalar,
            Shape::Insert | Shape::Update | Shape::Delete => StatementKind::Modify,
        }
    }
}

impl Compilable for Query {
    fn compile(&self) -> Result<CompiledStatement> {
        let mut w = SqlWriter::default();
        let table = quote_ident(&self.table)?;

        match self.shape {
            Shape::Count => {
                write!(w.sql, "SELECT COUNT(*) FROM {table}").ok();
                w.where_clause(self.filter.as_ref())?;
            }
            Shape::Exists => {
                write!(w.sql, "SELECT EXISTS(SELECT 1 FROM {table}").ok();
                w.where_clause(self.filter.as_ref())?;
                w.sql.push(')');
            }
            Shape::Insert => {
                let columns = self.checked_columns()?;
                write!(w.sql, "INSERT INTO {table} ({}) VALUES (", columns.join(", ")).ok();
                for (i, (_, expr)) in self.assignments.iter().enumerate() {
                    if i > 0 {
                        w.sql.push_str(", ");
                    }
                    w.expr(expr)?;
                }
                w.sql.push(')');
                if self.filter.is_some() {
                    return Err(Error::compile("INSERT does not take a filter"));
                }
            }
            Shape::Update => {
                let columns = self.checked_columns()?;
                write!(w.sql, "UPDATE {table} SET ").ok();
                for (i, (column, (_, expr))) in
                    columns.iter().zip(&self.assignments).enumerate()
                {
                    if i > 0 {
                        w.sql.push_str(", ");
                    }
                    write!(w.sql, "{column} = ").ok();
                    w.expr(expr)?;
                }
                w.where_clause(self.filter.as_ref())?;
            }
            Shape::Delete => {
                write!(w.sql, "DELETE FROM {table}").ok();
                w.where_clause(self.filter.as_ref())?;
            }
        }

        Ok(CompiledStatement::new(w.sql, self.statement_kind(), w.params))
    }
}

impl Query {
    /// Quoted assignment columns; rejects an empty or duplicated list.
    fn checked_columns(&self) -> Result<Vec<String>> {
        if self.assignments.is_empty() {
            return Err(Error::compile(format!(
                "no columns assigned for table '{}'",
                self.table
            )));
        }
        let mut quoted = Vec::with_capacity(self.assignments.len());
        for (i, (column, _)) in self.assignments.iter().enumerate() {
            if self.assignments[..i].iter().any(|(c, _)| c == column) {
                return Err(Error::compile(format!("column '{column}' assigned twice")));
            }
            quoted.push(quote_ident(column)?);
        }
        Ok(quoted)
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

#[derive(Default)]
struct SqlWriter {
    sql: String,
    params: Vec<ParamDecl>,
}

impl SqlWriter {
    fn where_clause(&mut self, filter: Option<&Expr>) -> Result<()> {
        if let Some(filter) = filter {
            self.sql.push_str(" WHERE ");
            self.expr(filter)?;
        }
        Ok(())
    }

    /// Placeholder index for `decl`; a name used twice shares one index.
    fn placeholder(&mut self, decl: &ParamDecl) -> Result<usize> {
        if let Some(pos) = self.params.iter().position(|p| p.name == decl.name) {
            let existing = &self.params[pos];
            if existing != decl {
                return Err(Error::compile(format!(
                    "parameter '{}' declared as both {} and {}",
                    decl.name, existing.ty, decl.ty
                )));
            }
            return Ok(pos + 1);
        }
        if !is_identifier(&decl.name) {
            return Err(Error::compile(format!("invalid parameter name '{}'", decl.name)));
        }
        self.params.push(decl.clone());
        Ok(self.params.len())
    }

    fn expr(&mut self, expr: &Expr) -> Result<()> {
        match expr {
            Expr::Column(name) => {
                let quoted = quote_ident(name)?;
                self.sql.push_str(&quoted);
            }
            Expr::Param(decl) => {
                let idx = self.placeholder(decl)?;
                write!(self.sql, "?{idx}").ok();
            }
            Expr::Literal(value) => self.literal(value)?,
            Expr::Compare { lhs, op, rhs } => {
                self.expr(lhs)?;
                write!(self.sql, " {} ", op.as_sql()).ok();
                self.expr(rhs)?;
            }
            Expr::And(terms) => self.junction(terms, " AND ")?,
            Expr::Or(terms) => self.junction(terms, " OR ")?,
            Expr::Not(inner) => {
                self.sql.push_str("NOT (");
                self.expr(inner)?;
                self.sql.push(')');
            }
            Expr::IsNull(inner) => {
                self.expr(inner)?;
                self.sql.push_str(" IS NULL");
            }
            Expr::IsNotNull(inner) => {
                self.expr(inner)?;
                self.sql.push_str(" IS NOT NULL");
            }
        }
        Ok(())
    }

    fn junction(&mut self, terms: &[Expr], sep: &str) -> Result<()> {
        if terms.is_empty() {
            return Err(Error::compile("empty AND/OR group"));
        }
        self.sql.push('(');
        for (i, term) in terms.iter().enumerate() {
            if i > 0 {
                self.sql.push_str(sep);
            }
            self.expr(term)?;
        }
        self.sql.push(')');
        Ok(())
    }

    fn literal(&mut self, value: &Value) -> Result<()> {
        match value {
            Value::Null => self.sql.push_str("NULL"),
            Value::Integer(i) => {
                write!(self.sql, "{i}").ok();
            }
            Value::Real(r) if r.is_finite() => {
                write!(self.sql, "{r:?}").ok();
            }
            Value::Real(r) => {
                return Err(Error::compile(format!("non-finite literal {r}")));
            }
            Value::Text(s) => {
                self.sql.push('\'');
                self.sql.push_str(&s.replace('\'', "''"));
                self.sql.push('\'');
            }
            Value::Bool(b) => self.sql.push_str(if *b { "1" } else { "0" }),
            Value::Blob(bytes) => {
                self.sql.push_str("X'");
                for b in bytes {
                    write!(self.sql, "{b:02X}").ok();
                }
                self.sql.push('\'');
            }
        }
        Ok(())
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn quote_ident(name: &str) -> Result<String> {
    if is_identifier(name) {
        Ok(format!("\"{name}\""))
    } else {
        Err(Error::compile(format!("invalid identifier '{name}'")))
    }
}
