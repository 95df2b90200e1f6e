use chrono::{DateTime, FixedOffset};

use crate::id::NodeId;
use crate::property_type::PropertyType;
use crate::value::Value;

/// Untyped client input for a single property value.
///
/// This is what callers hand to `setProperty` before any coercion happens.
/// `Node` is a handle to a node and is only meaningful for the reference
/// types.
#[derive(Clone, Debug, PartialEq)]
pub enum RawValue {
    String(String),
    Long(i64),
    Double(f64),
    Boolean(bool),
    Date(DateTime<FixedOffset>),
    Binary(Vec<u8>),
    Node(NodeId),
}

impl RawValue {
    /// Name of the source kind, used in conversion error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Long(_) => "integer",
            Self::Double(_) => "double",
            Self::Boolean(_) => "boolean",
            Self::Date(_) => "date",
            Self::Binary(_) => "binary",
            Self::Node(_) => "node",
        }
    }

    pub fn is_textual(&self) -> bool {
        matches!(self, Self::String(_))
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for RawValue {
    fn from(v: i64) -> Self {
        Self::Long(v)
    }
}

impl From<i32> for RawValue {
    fn from(v: i32) -> Self {
        Self::Long(v.into())
    }
}

impl From<f64> for RawValue {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<bool> for RawValue {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<DateTime<FixedOffset>> for RawValue {
    fn from(d: DateTime<FixedOffset>) -> Self {
        Self::Date(d)
    }
}

impl From<Vec<u8>> for RawValue {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Binary(bytes)
    }
}

impl From<NodeId> for RawValue {
    fn from(id: NodeId) -> Self {
        Self::Node(id)
    }
}

impl From<Value> for RawValue {
    /// Lower a typed value back to raw input. Names, paths and URIs become
    /// strings; references become node handles.
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) | Value::Name(s) | Value::Path(s) | Value::Uri(s) => Self::String(s),
            Value::Binary(b) => Self::Binary(b),
            Value::Long(v) => Self::Long(v),
            Value::Double(v) => Self::Double(v),
            Value::Date(d) => Self::Date(d),
            Value::Boolean(b) => Self::Boolean(b),
            Value::Reference(id) | Value::WeakReference(id) => Self::Node(id),
        }
    }
}

/// Input to `setProperty`: nothing (remove), one value, or a list.
///
/// Multiplicity is carried explicitly; an empty `Multiple` is a valid
/// multi-valued assignment. `None` elements of a list are dropped before
/// conversion.
#[derive(Clone, Debug, PartialEq)]
pub enum PropertyInput {
    Null,
    Single(RawValue),
    Multiple(Vec<Option<RawValue>>),
}

impl PropertyInput {
    /// Build a multi-valued input without gaps.
    pub fn list<I, T>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<RawValue>,
    {
        Self::Multiple(values.into_iter().map(|v| Some(v.into())).collect())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn is_multiple(&self) -> bool {
        matches!(self, Self::Multiple(_))
    }
}

impl From<RawValue> for PropertyInput {
    fn from(v: RawValue) -> Self {
        Self::Single(v)
    }
}

impl From<&str> for PropertyInput {
    fn from(s: &str) -> Self {
        Self::Single(s.into())
    }
}

impl From<String> for PropertyInput {
    fn from(s: String) -> Self {
        Self::Single(s.into())
    }
}

impl From<i64> for PropertyInput {
    fn from(v: i64) -> Self {
        Self::Single(v.into())
    }
}

impl From<f64> for PropertyInput {
    fn from(v: f64) -> Self {
        Self::Single(v.into())
    }
}

impl From<bool> for PropertyInput {
    fn from(v: bool) -> Self {
        Self::Single(v.into())
    }
}

impl From<NodeId> for PropertyInput {
    fn from(id: NodeId) -> Self {
        Self::Single(id.into())
    }
}

impl From<Vec<u8>> for PropertyInput {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Single(RawValue::Binary(bytes))
    }
}

impl From<Vec<RawValue>> for PropertyInput {
    fn from(values: Vec<RawValue>) -> Self {
        Self::Multiple(values.into_iter().map(Some).collect())
    }
}

impl From<Vec<Option<RawValue>>> for PropertyInput {
    fn from(values: Vec<Option<RawValue>>) -> Self {
        Self::Multiple(values)
    }
}

/// Guess a property type from the shape of raw input.
///
/// Dates, binaries, doubles, booleans and integers map to their own type,
/// strings to STRING. Node handles carry no type of their own.
pub fn guess_type(value: &RawValue) -> PropertyType {
    match value {
        RawValue::Date(_) => PropertyType::Date,
        RawValue::Binary(_) => PropertyType::Binary,
        RawValue::Double(_) => PropertyType::Double,
        RawValue::Boolean(_) => PropertyType::Boolean,
        RawValue::Long(_) => PropertyType::Long,
        RawValue::String(_) => PropertyType::String,
        RawValue::Node(_) => PropertyType::Undefined,
    }
}
