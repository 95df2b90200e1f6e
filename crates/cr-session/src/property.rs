use std::fmt;

use chrono::{DateTime, FixedOffset};
use cr_store::{PropertyRow, RowValues};
use cr_types::{NodeId, PropertyType, Value};

use crate::error::{SessionError, SessionResult};

/// Autocreated property holding the node identifier.
pub const JCR_UUID: &str = "jcr:uuid";
/// Autocreated property holding the primary node type.
pub const JCR_PRIMARY_TYPE: &str = "jcr:primaryType";
pub const JCR_MIXIN_TYPES: &str = "jcr:mixinTypes";

/// Identifies a property within a session: owning node plus name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PropertyKey {
    pub node: NodeId,
    pub name: String,
}

impl PropertyKey {
    pub fn new(node: NodeId, name: impl Into<String>) -> Self {
        Self {
            node,
            name: name.into(),
        }
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.node.short())
    }
}

/// One value or an ordered list of same-typed values.
#[derive(Clone, Debug, PartialEq)]
pub enum PropertyValues {
    Single(Value),
    Multiple(Vec<Value>),
}

/// A named, typed property owned by a node.
#[derive(Clone, Debug, PartialEq)]
pub struct Property {
    name: String,
    parent: NodeId,
    property_type: PropertyType,
    values: PropertyValues,
}

impl Property {
    pub(crate) fn new(
        name: impl Into<String>,
        parent: NodeId,
        property_type: PropertyType,
        values: PropertyValues,
    ) -> Self {
        Self {
            name: name.into(),
            parent,
            property_type,
            values,
        }
    }

    pub(crate) fn from_row(row: PropertyRow) -> SessionResult<Self> {
        let ty = row.property_type;
        let values = match row.values {
            RowValues::Single(text) => PropertyValues::Single(Value::from_row(ty, &text)?),
            RowValues::Multiple(texts) => PropertyValues::Multiple(
                texts
                    .iter()
                    .map(|text| Value::from_row(ty, text))
                    .collect::<Result<_, _>>()?,
            ),
        };
        Ok(Self::new(row.name, row.parent, ty, values))
    }

    pub(crate) fn to_row(&self) -> PropertyRow {
        let values = match &self.values {
            PropertyValues::Single(v) => RowValues::Single(v.to_row_string()),
            PropertyValues::Multiple(vs) => {
                RowValues::Multiple(vs.iter().map(Value::to_row_string).collect())
            }
        };
        PropertyRow {
            parent: self.parent,
            name: self.name.clone(),
            property_type: self.property_type,
            values,
        }
    }

    pub(crate) fn replace(&mut self, property_type: PropertyType, values: PropertyValues) {
        self.property_type = property_type;
        self.values = values;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identifier of the owning node.
    pub fn parent_id(&self) -> NodeId {
        self.parent
    }

    pub fn key(&self) -> PropertyKey {
        PropertyKey::new(self.parent, self.name.clone())
    }

    pub fn property_type(&self) -> PropertyType {
        self.property_type
    }

    pub fn is_multiple(&self) -> bool {
        matches!(self.values, PropertyValues::Multiple(_))
    }

    /// `jcr:uuid` and `jcr:primaryType` are derived from the node row.
    pub fn is_autocreated(&self) -> bool {
        is_autocreated_name(&self.name)
    }

    pub fn raw_values(&self) -> &PropertyValues {
        &self.values
    }

    /// The value of a single-valued property.
    pub fn value(&self) -> SessionResult<&Value> {
        match &self.values {
            PropertyValues::Single(v) => Ok(v),
            PropertyValues::Multiple(_) => Err(SessionError::ValueFormat(format!(
                "value() cannot be called on multi-valued property {}",
                self.name
            ))),
        }
    }

    /// The values of a multi-valued property.
    pub fn values(&self) -> SessionResult<&[Value]> {
        match &self.values {
            PropertyValues::Multiple(vs) => Ok(vs),
            PropertyValues::Single(_) => Err(SessionError::ValueFormat(format!(
                "values() cannot be called on single-valued property {}",
                self.name
            ))),
        }
    }

    pub fn get_string(&self) -> SessionResult<String> {
        Ok(self.value()?.get_string()?)
    }

    pub fn get_long(&self) -> SessionResult<i64> {
        Ok(self.value()?.get_long()?)
    }

    pub fn get_double(&self) -> SessionResult<f64> {
        Ok(self.value()?.get_double()?)
    }

    pub fn get_boolean(&self) -> SessionResult<bool> {
        Ok(self.value()?.get_boolean()?)
    }

    pub fn get_date(&self) -> SessionResult<DateTime<FixedOffset>> {
        Ok(self.value()?.get_date()?)
    }

    pub fn get_binary(&self) -> SessionResult<Vec<u8>> {
        Ok(self.value()?.get_binary()?)
    }

    /// Byte length for BINARY, character length of the string form
    /// otherwise.
    pub fn length(&self) -> SessionResult<usize> {
        Ok(self.value()?.length()?)
    }

    pub fn lengths(&self) -> SessionResult<Vec<usize>> {
        self.values()?
            .iter()
            .map(|v| v.length().map_err(SessionError::from))
            .collect()
    }

    /// Whether any value is a reference of `ty` to `target`.
    pub fn references(&self, ty: PropertyType, target: &NodeId) -> bool {
        if self.property_type != ty {
            return false;
        }
        let points_at = |v: &Value| v.as_reference().as_ref() == Some(target);
        match &self.values {
            PropertyValues::Single(v) => points_at(v),
            PropertyValues::Multiple(vs) => vs.iter().any(points_at),
        }
    }
}

pub(crate) fn is_autocreated_name(name: &str) -> bool {
    name == JCR_UUID || name == JCR_PRIMARY_TYPE
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(name: &str, value: Value) -> Property {
        Property::new(name, NodeId::new(), value.property_type(), PropertyValues::Single(value))
    }

    #[test]
    fn multiplicity_guards() {
        let p = single("title", Value::String("Hello".into()));
        assert_eq!(p.value().unwrap(), &Value::String("Hello".into()));
        assert!(matches!(p.values(), Err(SessionError::ValueFormat(_))));

        let m = Property::new(
            "tags",
            NodeId::new(),
            PropertyType::String,
            PropertyValues::Multiple(vec![Value::String("a".into())]),
        );
        assert!(m.is_multiple());
        assert!(matches!(m.value(), Err(SessionError::ValueFormat(_))));
        assert!(matches!(m.get_string(), Err(SessionError::ValueFormat(_))));
        assert_eq!(m.values().unwrap().len(), 1);
    }

    #[test]
    fn typed_getters_convert() {
        let p = single("count", Value::String("42".into()));
        assert_eq!(p.get_long().unwrap(), 42);
        assert_eq!(p.get_double().unwrap(), 42.0);
        assert!(matches!(
            single("flag", Value::Boolean(true)).get_long(),
            Err(SessionError::ValueFormat(_))
        ));
    }

    #[test]
    fn lengths_follow_value_kind() {
        assert_eq!(single("b", Value::Binary(vec![0; 5])).length().unwrap(), 5);
        assert_eq!(single("s", Value::String("héllo".into())).length().unwrap(), 5);
        assert_eq!(single("l", Value::Long(-12)).length().unwrap(), 3);

        let m = Property::new(
            "m",
            NodeId::new(),
            PropertyType::String,
            PropertyValues::Multiple(vec![Value::String("ab".into()), Value::String("c".into())]),
        );
        assert_eq!(m.lengths().unwrap(), vec![2, 1]);
    }

    #[test]
    fn row_roundtrip() {
        let owner = NodeId::new();
        let target = NodeId::new();
        let p = Property::new(
            "links",
            owner,
            PropertyType::Reference,
            PropertyValues::Multiple(vec![Value::Reference(target)]),
        );
        let row = p.to_row();
        assert_eq!(row.values, RowValues::Multiple(vec![target.to_string()]));
        assert_eq!(Property::from_row(row).unwrap(), p);
        assert!(p.references(PropertyType::Reference, &target));
        assert!(!p.references(PropertyType::WeakReference, &target));
    }

    #[test]
    fn autocreated_names() {
        assert!(single(JCR_UUID, Value::String("x".into())).is_autocreated());
        assert!(single(JCR_PRIMARY_TYPE, Value::Name("nt:base".into())).is_autocreated());
        assert!(!single("title", Value::String("x".into())).is_autocreated());
    }
}
