//! Observability trait for inspecting and persisting component state.
//!
//! Every component exposes its internal state as a flat set of named
//! fields. The same enumeration serves two masters: debugging (query a
//! single field by name) and save-state (walk every field, persist the
//! values, write them back on restore). Queries never affect emulation
//! state.

use std::fmt;

/// A dynamically-typed value for state queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Boolean value.
    Bool(bool),
    /// 8-bit unsigned integer.
    U8(u8),
    /// 16-bit unsigned integer.
    U16(u16),
    /// 32-bit unsigned integer.
    U32(u32),
    /// 64-bit unsigned integer.
    U64(u64),
    /// Array of values.
    Array(Vec<Value>),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{v}"),
            Value::U8(v) => write!(f, "{v:#04X}"),
            Value::U16(v) => write!(f, "{v:#06X}"),
            Value::U32(v) => write!(f, "{v:#010X}"),
            Value::U64(v) => write!(f, "{v}"),
            Value::Array(arr) => {
                write!(f, "[")?;
                for (i, v) in arr.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<u8> for Value {
    fn from(v: u8) -> Self {
        Value::U8(v)
    }
}

impl From<u16> for Value {
    fn from(v: u16) -> Self {
        Value::U16(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::U32(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::U64(v)
    }
}

/// A component whose state can be enumerated by name.
///
/// The field set is static and known at compile time; `query_paths`
/// returns it in a stable order so a save-state layer can persist and
/// restore fields positionally as well as by name.
pub trait Observable {
    /// Query a specific field by name.
    ///
    /// Returns `None` if the name is not recognised (including fields
    /// that exist only on other variants of the same component family).
    fn query(&self, path: &str) -> Option<Value>;

    /// List all field names this component answers to, in stable order.
    fn query_paths(&self) -> &'static [&'static str];

    /// Snapshot every field as a (name, value) list.
    ///
    /// This is the flat enumeration a host save-state layer iterates.
    fn snapshot(&self) -> Vec<(&'static str, Value)> {
        self.query_paths()
            .iter()
            .filter_map(|p| self.query(p).map(|v| (*p, v)))
            .collect()
    }
}
