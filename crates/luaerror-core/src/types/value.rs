//! Snapshot of a script value read through the introspection API.

use std::fmt;

/// Value of a local or upvalue at the time the stack was captured.
///
/// Scalars are copied out. Everything else (tables, functions, userdata,
/// threads) stays owned by the runtime and is described by its type name and
/// the runtime's own display text.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptValue
{
    /// `nil`
    Nil,
    /// `true` / `false`
    Boolean(bool),
    /// Any number (the runtime has a single numeric type).
    Number(f64),
    /// String contents.
    String(String),
    /// Reference type described by the runtime.
    Opaque
    {
        /// Runtime type name (`table`, `function`, `Entity`, ...).
        type_name: String,
        /// Display text as produced by the runtime's `tostring`.
        display: String,
    },
}

impl ScriptValue
{
    /// `true` only for the literal boolean `true`.
    ///
    /// Truthy values such as non-empty strings or numbers do not count.
    pub fn is_literal_true(&self) -> bool
    {
        matches!(self, ScriptValue::Boolean(true))
    }

    /// Runtime type name of this value.
    pub fn type_name(&self) -> &str
    {
        match self {
            ScriptValue::Nil => "nil",
            ScriptValue::Boolean(_) => "boolean",
            ScriptValue::Number(_) => "number",
            ScriptValue::String(_) => "string",
            ScriptValue::Opaque { type_name, .. } => type_name,
        }
    }
}

impl fmt::Display for ScriptValue
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            ScriptValue::Nil => f.write_str("nil"),
            ScriptValue::Boolean(value) => write!(f, "{value}"),
            ScriptValue::Number(value) => write!(f, "{value}"),
            ScriptValue::String(value) => write!(f, "{value:?}"),
            ScriptValue::Opaque { display, .. } => f.write_str(display),
        }
    }
}

impl From<bool> for ScriptValue
{
    fn from(value: bool) -> Self
    {
        ScriptValue::Boolean(value)
    }
}

impl From<f64> for ScriptValue
{
    fn from(value: f64) -> Self
    {
        ScriptValue::Number(value)
    }
}

impl From<&str> for ScriptValue
{
    fn from(value: &str) -> Self
    {
        ScriptValue::String(value.to_string())
    }
}

impl From<String> for ScriptValue
{
    fn from(value: String) -> Self
    {
        ScriptValue::String(value)
    }
}
