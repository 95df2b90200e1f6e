use base64::engine::general_purpose::STANDARD as BASE64_ENGINE;
use base64::Engine;
use chrono::{DateTime, FixedOffset, SecondsFormat, TimeZone, Utc};

use crate::error::{TypeError, TypeResult};
use crate::id::NodeId;
use crate::patterns::{is_double_literal, is_long_literal, parse_double_literal, parse_iso_date};
use crate::property_type::PropertyType;

/// One typed property value.
///
/// There is exactly one variant per concrete [`PropertyType`]; DECIMAL has
/// no variant because no converter produces it.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    String(String),
    Binary(Vec<u8>),
    Long(i64),
    Double(f64),
    Date(DateTime<FixedOffset>),
    Boolean(bool),
    Name(String),
    Path(String),
    Reference(NodeId),
    WeakReference(NodeId),
    Uri(String),
}

impl Value {
    /// The type tag of this value.
    pub fn property_type(&self) -> PropertyType {
        match self {
            Self::String(_) => PropertyType::String,
            Self::Binary(_) => PropertyType::Binary,
            Self::Long(_) => PropertyType::Long,
            Self::Double(_) => PropertyType::Double,
            Self::Date(_) => PropertyType::Date,
            Self::Boolean(_) => PropertyType::Boolean,
            Self::Name(_) => PropertyType::Name,
            Self::Path(_) => PropertyType::Path,
            Self::Reference(_) => PropertyType::Reference,
            Self::WeakReference(_) => PropertyType::WeakReference,
            Self::Uri(_) => PropertyType::Uri,
        }
    }

    /// The referenced identifier of a REFERENCE or WEAKREFERENCE value.
    pub fn as_reference(&self) -> Option<NodeId> {
        match self {
            Self::Reference(id) | Self::WeakReference(id) => Some(*id),
            _ => None,
        }
    }

    // -----------------------------------------------------------------------
    // JCR value getters
    // -----------------------------------------------------------------------

    /// String form of the value. Fails only for binary data that is not
    /// valid UTF-8.
    pub fn get_string(&self) -> TypeResult<String> {
        match self {
            Self::String(s) | Self::Name(s) | Self::Path(s) | Self::Uri(s) => Ok(s.clone()),
            Self::Binary(bytes) => String::from_utf8(bytes.clone())
                .map_err(|_| format_error(self, PropertyType::String, "binary is not valid UTF-8")),
            Self::Long(v) => Ok(v.to_string()),
            Self::Double(v) => Ok(v.to_string()),
            Self::Date(d) => Ok(format_date(d)),
            Self::Boolean(b) => Ok(b.to_string()),
            Self::Reference(id) | Self::WeakReference(id) => Ok(id.to_string()),
        }
    }

    pub fn get_long(&self) -> TypeResult<i64> {
        match self {
            Self::Long(v) => Ok(*v),
            Self::Double(v) => truncate(*v)
                .ok_or_else(|| format_error(self, PropertyType::Long, "not a finite number")),
            Self::Date(d) => Ok(d.timestamp_millis()),
            Self::String(_) | Self::Binary(_) => {
                let text = self.get_string()?;
                if is_long_literal(&text) {
                    if let Ok(v) = text.parse() {
                        return Ok(v);
                    }
                }
                Err(format_error(self, PropertyType::Long, "not an integer literal"))
            }
            _ => Err(format_error(self, PropertyType::Long, "no conversion defined")),
        }
    }

    pub fn get_double(&self) -> TypeResult<f64> {
        match self {
            Self::Double(v) => Ok(*v),
            Self::Long(v) => Ok(*v as f64),
            Self::Date(d) => Ok(d.timestamp_millis() as f64),
            Self::String(_) | Self::Binary(_) => {
                let text = self.get_string()?;
                let parsed = if is_double_literal(&text) {
                    parse_double_literal(&text)
                } else if is_long_literal(&text) {
                    text.parse::<i64>().ok().map(|v| v as f64)
                } else {
                    None
                };
                parsed.ok_or_else(|| format_error(self, PropertyType::Double, "not a number literal"))
            }
            _ => Err(format_error(self, PropertyType::Double, "no conversion defined")),
        }
    }

    /// Boolean form: strings are `true` exactly when they read `true`,
    /// ignoring case.
    pub fn get_boolean(&self) -> TypeResult<bool> {
        match self {
            Self::Boolean(b) => Ok(*b),
            Self::String(_) | Self::Binary(_) => Ok(self.get_string()?.eq_ignore_ascii_case("true")),
            _ => Err(format_error(self, PropertyType::Boolean, "no conversion defined")),
        }
    }

    /// Date form: numbers are milliseconds since the Unix epoch (UTC).
    pub fn get_date(&self) -> TypeResult<DateTime<FixedOffset>> {
        match self {
            Self::Date(d) => Ok(*d),
            Self::Long(v) => from_millis(*v)
                .ok_or_else(|| format_error(self, PropertyType::Date, "out of range")),
            Self::Double(v) => truncate(*v)
                .and_then(from_millis)
                .ok_or_else(|| format_error(self, PropertyType::Date, "out of range")),
            Self::String(_) | Self::Binary(_) => parse_iso_date(&self.get_string()?)
                .ok_or_else(|| format_error(self, PropertyType::Date, "not an ISO 8601 date")),
            _ => Err(format_error(self, PropertyType::Date, "no conversion defined")),
        }
    }

    pub fn get_binary(&self) -> TypeResult<Vec<u8>> {
        match self {
            Self::Binary(bytes) => Ok(bytes.clone()),
            _ => Ok(self.get_string()?.into_bytes()),
        }
    }

    /// Length as defined by JCR: bytes for binary values, characters of the
    /// string form otherwise.
    pub fn length(&self) -> TypeResult<usize> {
        match self {
            Self::Binary(bytes) => Ok(bytes.len()),
            _ => Ok(self.get_string()?.chars().count()),
        }
    }

    // -----------------------------------------------------------------------
    // Storage text form
    // -----------------------------------------------------------------------

    /// Encode for a storage row. Binary data is base64.
    pub fn to_row_string(&self) -> String {
        match self {
            Self::Binary(bytes) => BASE64_ENGINE.encode(bytes),
            Self::String(s) | Self::Name(s) | Self::Path(s) | Self::Uri(s) => s.clone(),
            Self::Long(v) => v.to_string(),
            Self::Double(v) => v.to_string(),
            Self::Date(d) => format_date(d),
            Self::Boolean(b) => b.to_string(),
            Self::Reference(id) | Self::WeakReference(id) => id.to_string(),
        }
    }

    /// Decode a storage row written by [`Value::to_row_string`].
    pub fn from_row(ty: PropertyType, text: &str) -> TypeResult<Self> {
        let corrupt = |reason: &str| {
            TypeError::ValueFormat(format!("stored {ty} value {text:?} is corrupt: {reason}"))
        };
        match ty {
            PropertyType::String => Ok(Self::String(text.to_string())),
            PropertyType::Binary => BASE64_ENGINE
                .decode(text)
                .map(Self::Binary)
                .map_err(|e| corrupt(&e.to_string())),
            PropertyType::Long => text.parse().map(Self::Long).map_err(|_| corrupt("not an integer")),
            PropertyType::Double => text.parse().map(Self::Double).map_err(|_| corrupt("not a number")),
            PropertyType::Date => parse_iso_date(text)
                .map(Self::Date)
                .ok_or_else(|| corrupt("not a date")),
            PropertyType::Boolean => Ok(Self::Boolean(text == "true")),
            PropertyType::Name => Ok(Self::Name(text.to_string())),
            PropertyType::Path => Ok(Self::Path(text.to_string())),
            PropertyType::Uri => Ok(Self::Uri(text.to_string())),
            PropertyType::Reference => NodeId::parse(text)
                .map(Self::Reference)
                .map_err(|_| corrupt("not an identifier")),
            PropertyType::WeakReference => NodeId::parse(text)
                .map(Self::WeakReference)
                .map_err(|_| corrupt("not an identifier")),
            PropertyType::Decimal | PropertyType::Undefined => Err(corrupt("type cannot be stored")),
        }
    }
}

/// ISO 8601 text for a date, keeping sub-second precision when present.
pub fn format_date(d: &DateTime<FixedOffset>) -> String {
    d.to_rfc3339_opts(SecondsFormat::AutoSi, false)
}

/// Truncate toward zero, or `None` when the result does not fit in an i64.
pub(crate) fn truncate(v: f64) -> Option<i64> {
    let t = v.trunc();
    // i64::MAX as f64 rounds up to 2^63, which is already out of range.
    if t.is_finite() && t >= i64::MIN as f64 && t < i64::MAX as f64 {
        Some(t as i64)
    } else {
        None
    }
}

fn from_millis(millis: i64) -> Option<DateTime<FixedOffset>> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .map(DateTime::<FixedOffset>::from)
}

fn format_error(value: &Value, target: PropertyType, reason: &str) -> TypeError {
    TypeError::ValueFormat(format!(
        "cannot read {} value as {target}: {reason}",
        value.property_type()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    #[test]
    fn property_type_matches_variant() {
        assert_eq!(Value::Long(1).property_type(), PropertyType::Long);
        assert_eq!(Value::Uri("x:y".into()).property_type(), PropertyType::Uri);
        assert_eq!(
            Value::WeakReference(NodeId::new()).property_type(),
            PropertyType::WeakReference
        );
    }

    // -----------------------------------------------------------------------
    // Getters
    // -----------------------------------------------------------------------

    #[test]
    fn string_getter() {
        assert_eq!(Value::Long(42).get_string().unwrap(), "42");
        assert_eq!(Value::Double(12345.6).get_string().unwrap(), "12345.6");
        assert_eq!(Value::Boolean(false).get_string().unwrap(), "false");
        assert_eq!(
            Value::Date(date("2008-12-24T12:34:00+00:00")).get_string().unwrap(),
            "2008-12-24T12:34:00+00:00"
        );
        assert!(Value::Binary(vec![0xff, 0xfe]).get_string().is_err());
    }

    #[test]
    fn long_getter() {
        assert_eq!(Value::String("-17".into()).get_long().unwrap(), -17);
        assert_eq!(Value::Double(3.9).get_long().unwrap(), 3);
        assert!(Value::String("3.9".into()).get_long().is_err());
        assert!(Value::Boolean(true).get_long().is_err());
        assert!(Value::Double(f64::NAN).get_long().is_err());
    }

    #[test]
    fn double_getter() {
        assert_eq!(Value::String("2.5".into()).get_double().unwrap(), 2.5);
        assert_eq!(Value::String("7".into()).get_double().unwrap(), 7.0);
        assert_eq!(Value::Long(2).get_double().unwrap(), 2.0);
        assert!(Value::String("x".into()).get_double().is_err());
    }

    #[test]
    fn boolean_getter() {
        assert!(Value::String("TRUE".into()).get_boolean().unwrap());
        assert!(!Value::String("yes".into()).get_boolean().unwrap());
        assert!(Value::Long(1).get_boolean().is_err());
    }

    #[test]
    fn date_getter() {
        let d = Value::String("2008-12-24T12:34Z".into()).get_date().unwrap();
        assert_eq!(d, date("2008-12-24T12:34:00Z"));
        let epoch = Value::Long(0).get_date().unwrap();
        assert_eq!(epoch.timestamp(), 0);
        assert!(Value::String("not-a-date".into()).get_date().is_err());
    }

    #[test]
    fn lengths() {
        assert_eq!(Value::Binary(vec![1, 2, 3]).length().unwrap(), 3);
        assert_eq!(Value::String("héllo".into()).length().unwrap(), 5);
        assert_eq!(Value::Long(-10).length().unwrap(), 3);
    }

    // -----------------------------------------------------------------------
    // Row form
    // -----------------------------------------------------------------------

    #[test]
    fn row_form_of_every_type() {
        let id = NodeId::new();
        let values = vec![
            Value::String("hello".into()),
            Value::Binary(vec![0, 1, 2, 255]),
            Value::Long(i64::MIN),
            Value::Double(0.1),
            Value::Date(date("2009-03-01T10:11:12.345+02:00")),
            Value::Boolean(true),
            Value::Name("nt:base".into()),
            Value::Path("/a/b[2]".into()),
            Value::Reference(id),
            Value::WeakReference(id),
            Value::Uri("http://example.org/".into()),
        ];
        for v in values {
            let text = v.to_row_string();
            let back = Value::from_row(v.property_type(), &text).unwrap();
            assert_eq!(back, v, "row text {text:?}");
        }
    }

    #[test]
    fn binary_row_is_base64() {
        assert_eq!(Value::Binary(b"hi".to_vec()).to_row_string(), "aGk=");
    }

    #[test]
    fn corrupt_rows() {
        assert!(Value::from_row(PropertyType::Long, "x").is_err());
        assert!(Value::from_row(PropertyType::Binary, "***").is_err());
        assert!(Value::from_row(PropertyType::Reference, "abc").is_err());
        assert!(Value::from_row(PropertyType::Decimal, "1.0").is_err());
    }
}
