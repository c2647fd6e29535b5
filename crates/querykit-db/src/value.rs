//! Typed values, parameter declarations, and parameter sets.
//!
//! A [`ParamDecl`] is fixed when a query template is built. A [`Params`] set
//! is supplied fresh on every execution and bound against the declarations
//! with [`Params::bind`], which produces values in placeholder order.

use std::collections::BTreeMap;
use std::fmt;

use querykit_common::{Error, Result};
use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::ToSql;

/// A single SQL value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Bool(bool),
    Blob(Vec<u8>),
}

impl Value {
    /// Declared type this value satisfies, or `None` for `Null`.
    pub fn param_type(&self) -> Option<ParamType> {
        match self {
            Value::Null => None,
            Value::Integer(_) => Some(ParamType::Integer),
            Value::Real(_) => Some(ParamType::Real),
            Value::Text(_) => Some(ParamType::Text),
            Value::Bool(_) => Some(ParamType::Bool),
            Value::Blob(_) => Some(ParamType::Blob),
        }
    }

    /// Lowercase name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        self.param_type().map_or("null", ParamType::as_str)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Borrowed(ValueRef::Null),
            Value::Integer(i) => ToSqlOutput::Borrowed(ValueRef::Integer(*i)),
            Value::Real(r) => ToSqlOutput::Borrowed(ValueRef::Real(*r)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Bool(b) => ToSqlOutput::Borrowed(ValueRef::Integer(i64::from(*b))),
            Value::Blob(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
        })
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Blob(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Arrays and objects are stored as their JSON text. Integers that do not
/// fit in `i64` become `Real`.
impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => Value::Real(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Text(s),
            other @ (serde_json::Value::Array(_) | serde_json::Value::Object(_)) => {
                Value::Text(other.to_string())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Declarations
// ---------------------------------------------------------------------------

/// Declared type of a query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamType {
    Integer,
    Real,
    Text,
    Bool,
    Blob,
}

impl ParamType {
    pub fn as_str(self) -> &'static str {
        match self {
            ParamType::Integer => "integer",
            ParamType::Real => "real",
            ParamType::Text => "text",
            ParamType::Bool => "bool",
            ParamType::Blob => "blob",
        }
    }

    /// Whether a non-null value of type `found` may bind to this type.
    /// Integers widen into `Real`; everything else must match exactly.
    fn accepts(self, found: ParamType) -> bool {
        self == found || (self == ParamType::Real && found == ParamType::Integer)
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named, typed parameter declared by a query template.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParamDecl {
    pub name: String,
    pub ty: ParamType,
    pub nullable: bool,
}

impl ParamDecl {
    pub fn new(name: impl Into<String>, ty: ParamType) -> Self {
        Self {
            name: normalize_name(name.into()),
            ty,
            nullable: false,
        }
    }

    /// Allow `Value::Null` to bind to this parameter.
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    fn check(&self, value: &Value) -> Result<()> {
        match value.param_type() {
            None if self.nullable => Ok(()),
            None => Err(Error::parameter_type(&self.name, self.ty, "null")),
            Some(found) if self.ty.accepts(found) => Ok(()),
            Some(found) => Err(Error::parameter_type(&self.name, self.ty, found)),
        }
    }
}

/// Parameter names may be written with or without the leading `:`.
fn normalize_name(name: String) -> String {
    match name.strip_prefix(':') {
        Some(stripped) => stripped.to_string(),
        None => name,
    }
}

// ---------------------------------------------------------------------------
// Params
// ---------------------------------------------------------------------------

/// Named parameter values for one execution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params(BTreeMap<String, Value>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Set a value, replacing any previous value for the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(normalize_name(name.into()), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name.strip_prefix(':').unwrap_or(name))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Bind these values against `decls`, returning them in declaration
    /// (placeholder) order.
    ///
    /// Fails on the first declared parameter without a value, on a value of
    /// the wrong type, and on any supplied name that is not declared.
    pub fn bind(&self, decls: &[ParamDecl]) -> Result<Vec<Value>> {
        let mut values = Vec::with_capacity(decls.len());
        for decl in decls {
            let value = self
                .0
                .get(&decl.name)
                .ok_or_else(|| Error::missing_parameter(&decl.name))?;
            decl.check(value)?;
            values.push(value.clone());
        }

        if let Some(unknown) = self
            .0
            .keys()
            .find(|name| !decls.iter().any(|d| &d.name == *name))
        {
            return Err(Error::unknown_parameter(unknown));
        }

        Ok(values)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}
