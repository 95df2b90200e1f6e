//! The property type coercion engine.
//!
//! One converter per target type pattern-matches on the raw source kind and
//! either produces a typed [`Value`] or rejects the input with a message.
//! [`convert_value`] drives the converters for a requested type, or tries
//! the [`UNDEFINED_CANDIDATES`] in order when no type was requested.

use crate::error::{TypeError, TypeResult};
use crate::id::NodeId;
use crate::names::{split_prefixed_name, validate_name};
use crate::path::{parse_segment, PathSegment};
use crate::patterns::{is_double_literal, is_long_literal, is_uri, is_uuid, parse_double_literal, parse_iso_date};
use crate::property_type::PropertyType;
use crate::raw::{PropertyInput, RawValue};
use crate::value::{format_date, truncate, Value};

/// Types tried, in this order, for an UNDEFINED assignment. STRING (for
/// textual input) or BOOLEAN (otherwise) is tried last.
///
/// Clients rely on this precedence: `"42"` becomes a LONG, `"http://x"` a
/// URI and a known identifier a REFERENCE.
pub const UNDEFINED_CANDIDATES: [PropertyType; 6] = [
    PropertyType::Long,
    PropertyType::Double,
    PropertyType::Uri,
    PropertyType::Reference,
    PropertyType::WeakReference,
    PropertyType::Date,
];

/// Session lookups needed by the NAME and REFERENCE converters.
pub trait ConversionContext {
    /// Whether a node with this identifier exists for the caller.
    fn has_identifier(&self, id: &NodeId) -> TypeResult<bool>;

    /// Whether a namespace prefix is currently mapped.
    fn is_registered_prefix(&self, prefix: &str) -> TypeResult<bool>;
}

/// Result of a successful conversion.
#[derive(Clone, Debug, PartialEq)]
pub enum Converted {
    Single(Value),
    /// All values share the carried type; the list may be empty.
    Multiple(PropertyType, Vec<Value>),
}

impl Converted {
    pub fn property_type(&self) -> PropertyType {
        match self {
            Self::Single(v) => v.property_type(),
            Self::Multiple(ty, _) => *ty,
        }
    }
}

/// Why a single converter refused its input.
enum Rejection {
    /// No converter exists for this source kind and target type.
    Unsupported,
    Invalid(&'static str),
}

type Attempt = TypeResult<Result<Value, Rejection>>;

/// Convert client input to typed values.
///
/// For a concrete `requested` type only that converter runs. For
/// [`PropertyType::Undefined`] the candidates are tried in order and the
/// first success wins; if all fail, every failure message is reported.
/// Multi-valued input is converted element-wise and every element must
/// succeed under the same target type.
pub fn convert_value(
    input: &PropertyInput,
    requested: PropertyType,
    ctx: &dyn ConversionContext,
) -> TypeResult<Converted> {
    if input.is_null() {
        return Err(TypeError::ValueFormat("cannot convert a null value".into()));
    }
    if requested == PropertyType::Undefined && is_empty_list(input) {
        return Ok(Converted::Multiple(PropertyType::String, Vec::new()));
    }

    let candidates: Vec<PropertyType> = if requested == PropertyType::Undefined {
        let mut types = UNDEFINED_CANDIDATES.to_vec();
        types.push(if is_textual(input) {
            PropertyType::String
        } else {
            PropertyType::Boolean
        });
        types
    } else {
        vec![requested]
    };

    let mut failures = Vec::with_capacity(candidates.len());
    for target in candidates {
        let outcome = match input {
            PropertyInput::Single(raw) => convert_single(raw, target, ctx)?,
            PropertyInput::Multiple(elements) => convert_multiple(elements, target, ctx)?,
            PropertyInput::Null => Err("cannot convert a null value".to_string()),
        };
        match outcome {
            Ok(converted) => return Ok(converted),
            Err(message) => failures.push(message),
        }
    }
    Err(TypeError::ValueFormat(failures.join("; ")))
}

fn is_empty_list(input: &PropertyInput) -> bool {
    matches!(input, PropertyInput::Multiple(elements) if elements.iter().all(Option::is_none))
}

fn is_textual(input: &PropertyInput) -> bool {
    match input {
        PropertyInput::Null => false,
        PropertyInput::Single(raw) => raw.is_textual(),
        PropertyInput::Multiple(elements) => elements.iter().flatten().all(RawValue::is_textual),
    }
}

fn convert_single(
    raw: &RawValue,
    target: PropertyType,
    ctx: &dyn ConversionContext,
) -> TypeResult<Result<Converted, String>> {
    Ok(match convert_scalar(raw, target, ctx)? {
        Ok(value) => Ok(Converted::Single(value)),
        Err(rejection) => Err(describe(raw, target, rejection)),
    })
}

fn convert_multiple(
    elements: &[Option<RawValue>],
    target: PropertyType,
    ctx: &dyn ConversionContext,
) -> TypeResult<Result<Converted, String>> {
    let mut values = Vec::with_capacity(elements.len());
    for (index, raw) in elements.iter().flatten().enumerate() {
        match convert_scalar(raw, target, ctx)? {
            Ok(value) => values.push(value),
            Err(rejection) => {
                return Ok(Err(format!(
                    "Unable to convert values in multi-valued property: element {index}: {}",
                    describe(raw, target, rejection)
                )))
            }
        }
    }
    Ok(Ok(Converted::Multiple(target, values)))
}

fn describe(raw: &RawValue, target: PropertyType, rejection: Rejection) -> String {
    match rejection {
        Rejection::Unsupported => format!(
            "Conversion of {} to {target} not possible or not implemented yet",
            raw.kind()
        ),
        Rejection::Invalid(reason) => format!(
            "Unable to convert value of type {} to {target}: {reason}",
            raw.kind()
        ),
    }
}

fn convert_scalar(raw: &RawValue, target: PropertyType, ctx: &dyn ConversionContext) -> Attempt {
    match target {
        PropertyType::String => Ok(to_string(raw)),
        PropertyType::Binary => Ok(to_binary(raw)),
        PropertyType::Long => Ok(to_long(raw)),
        PropertyType::Double => Ok(to_double(raw)),
        PropertyType::Date => Ok(to_date(raw)),
        PropertyType::Boolean => Ok(to_boolean(raw)),
        PropertyType::Name => to_name(raw, ctx),
        PropertyType::Path => Ok(to_path(raw)),
        PropertyType::Reference => to_reference(raw, ctx),
        PropertyType::WeakReference => Ok(to_weak_reference(raw)),
        PropertyType::Uri => Ok(to_uri(raw)),
        PropertyType::Decimal | PropertyType::Undefined => Ok(Err(Rejection::Unsupported)),
    }
}

// ---------------------------------------------------------------------------
// Per-type converters
// ---------------------------------------------------------------------------

fn to_string(raw: &RawValue) -> Result<Value, Rejection> {
    match raw {
        RawValue::String(s) => Ok(Value::String(s.clone())),
        RawValue::Long(v) => Ok(Value::String(v.to_string())),
        RawValue::Double(v) => Ok(Value::String(v.to_string())),
        RawValue::Boolean(b) => Ok(Value::String(if *b { "true" } else { "false" }.into())),
        RawValue::Date(d) => Ok(Value::String(format_date(d))),
        RawValue::Binary(bytes) => String::from_utf8(bytes.clone())
            .map(Value::String)
            .map_err(|_| Rejection::Invalid("Binary data is not valid UTF-8")),
        RawValue::Node(_) => Err(Rejection::Unsupported),
    }
}

fn to_binary(raw: &RawValue) -> Result<Value, Rejection> {
    match raw {
        RawValue::Binary(bytes) => Ok(Value::Binary(bytes.clone())),
        RawValue::String(s) => Ok(Value::Binary(s.clone().into_bytes())),
        RawValue::Long(v) => Ok(Value::Binary(v.to_string().into_bytes())),
        RawValue::Double(v) => Ok(Value::Binary(v.to_string().into_bytes())),
        RawValue::Boolean(b) => Ok(Value::Binary(if *b { "TRUE" } else { "FALSE" }.into())),
        RawValue::Date(_) | RawValue::Node(_) => Err(Rejection::Unsupported),
    }
}

fn to_long(raw: &RawValue) -> Result<Value, Rejection> {
    match raw {
        RawValue::Long(v) => Ok(Value::Long(*v)),
        RawValue::Double(v) if !v.is_finite() => Err(Rejection::Invalid("Must be a finite number")),
        RawValue::Double(v) => truncate(*v)
            .map(Value::Long)
            .ok_or(Rejection::Invalid("Integer is out of range")),
        RawValue::String(s) => {
            if !is_long_literal(s) {
                return Err(Rejection::Invalid("Must be a valid integer string representation"));
            }
            s.parse()
                .map(Value::Long)
                .map_err(|_| Rejection::Invalid("Integer is out of range"))
        }
        _ => Err(Rejection::Unsupported),
    }
}

fn to_double(raw: &RawValue) -> Result<Value, Rejection> {
    match raw {
        RawValue::Double(v) => Ok(Value::Double(*v)),
        RawValue::Long(v) => Ok(Value::Double(*v as f64)),
        RawValue::String(s) => {
            if !is_double_literal(s) {
                return Err(Rejection::Invalid(
                    "Must be a valid floating point string representation",
                ));
            }
            parse_double_literal(s)
                .map(Value::Double)
                .ok_or(Rejection::Invalid("Must be a valid floating point string representation"))
        }
        _ => Err(Rejection::Unsupported),
    }
}

fn to_date(raw: &RawValue) -> Result<Value, Rejection> {
    match raw {
        RawValue::Date(d) => Ok(Value::Date(*d)),
        RawValue::String(s) => parse_iso_date(s)
            .map(Value::Date)
            .ok_or(Rejection::Invalid("Must be valid ISO 8601 date")),
        _ => Err(Rejection::Unsupported),
    }
}

fn to_boolean(raw: &RawValue) -> Result<Value, Rejection> {
    match raw {
        RawValue::Boolean(b) => Ok(Value::Boolean(*b)),
        RawValue::String(s) => Ok(Value::Boolean(s.eq_ignore_ascii_case("true"))),
        _ => Err(Rejection::Unsupported),
    }
}

fn to_name(raw: &RawValue, ctx: &dyn ConversionContext) -> Attempt {
    let RawValue::String(s) = raw else {
        return Ok(Err(Rejection::Unsupported));
    };
    if s.matches(':').count() > 1 {
        return Ok(Err(Rejection::Invalid("More than one : in JCR name is not allowed")));
    }
    let (prefix, local) = split_prefixed_name(s);
    if local.is_empty() || validate_name(local).is_err() {
        return Ok(Err(Rejection::Invalid("Local name does not conform to JCR name rules")));
    }
    if let Some(prefix) = prefix {
        if !ctx.is_registered_prefix(prefix)? {
            return Ok(Err(Rejection::Invalid("Namespace prefix is not registered")));
        }
    }
    Ok(Ok(Value::Name(s.clone())))
}

fn to_path(raw: &RawValue) -> Result<Value, Rejection> {
    let RawValue::String(s) = raw else {
        return Err(Rejection::Unsupported);
    };
    if s.is_empty() {
        return Err(Rejection::Invalid("Path must not be empty"));
    }
    if s == "/" {
        return Ok(Value::Path(s.clone()));
    }
    let relative = s.strip_prefix('/').unwrap_or(s);
    for segment in relative.split('/') {
        match parse_segment(segment) {
            Ok(PathSegment::Name { name, .. }) if validate_name(&name).is_err() => {
                return Err(Rejection::Invalid("Path segment is not a valid JCR name"))
            }
            Ok(_) => {}
            Err(_) => return Err(Rejection::Invalid("Path segment is malformed")),
        }
    }
    Ok(Value::Path(s.clone()))
}

fn to_reference(raw: &RawValue, ctx: &dyn ConversionContext) -> Attempt {
    match raw {
        RawValue::Node(id) => Ok(Ok(Value::Reference(*id))),
        RawValue::String(s) => {
            if !is_uuid(s) {
                return Ok(Err(Rejection::Invalid("Must be a valid UUID")));
            }
            let Ok(id) = NodeId::parse(s) else {
                return Ok(Err(Rejection::Invalid("Must be a valid UUID")));
            };
            if ctx.has_identifier(&id)? {
                Ok(Ok(Value::Reference(id)))
            } else {
                Ok(Err(Rejection::Invalid("Must reference existing node")))
            }
        }
        _ => Ok(Err(Rejection::Unsupported)),
    }
}

fn to_weak_reference(raw: &RawValue) -> Result<Value, Rejection> {
    match raw {
        RawValue::Node(id) => Ok(Value::WeakReference(*id)),
        RawValue::String(s) => NodeId::parse(s)
            .map(Value::WeakReference)
            .map_err(|_| Rejection::Invalid("Must be a valid UUID")),
        _ => Err(Rejection::Unsupported),
    }
}

fn to_uri(raw: &RawValue) -> Result<Value, Rejection> {
    match raw {
        RawValue::String(s) if is_uri(s) => Ok(Value::Uri(s.clone())),
        RawValue::String(_) => Err(Rejection::Invalid("Must be a valid RFC 3986 URI")),
        _ => Err(Rejection::Unsupported),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use proptest::prelude::*;

    struct FixedContext {
        known: Vec<NodeId>,
        prefixes: Vec<&'static str>,
    }

    impl FixedContext {
        fn new() -> Self {
            Self {
                known: Vec::new(),
                prefixes: vec!["", "jcr", "nt", "mix", "xml"],
            }
        }
    }

    impl ConversionContext for FixedContext {
        fn has_identifier(&self, id: &NodeId) -> TypeResult<bool> {
            Ok(self.known.contains(id))
        }

        fn is_registered_prefix(&self, prefix: &str) -> TypeResult<bool> {
            Ok(self.prefixes.contains(&prefix))
        }
    }

    fn convert(input: impl Into<PropertyInput>, ty: PropertyType) -> TypeResult<Converted> {
        convert_value(&input.into(), ty, &FixedContext::new())
    }

    fn single(input: impl Into<PropertyInput>, ty: PropertyType) -> Value {
        match convert(input, ty).unwrap() {
            Converted::Single(v) => v,
            other => panic!("expected single value, got {other:?}"),
        }
    }

    // -----------------------------------------------------------------------
    // Explicit target types
    // -----------------------------------------------------------------------

    #[test]
    fn string_to_long() {
        assert_eq!(single("42", PropertyType::Long), Value::Long(42));
    }

    #[test]
    fn long_to_string() {
        assert_eq!(single(42i64, PropertyType::String), Value::String("42".into()));
    }

    #[test]
    fn double_to_string() {
        assert_eq!(
            single(12345.6, PropertyType::String),
            Value::String("12345.6".into())
        );
    }

    #[test]
    fn boolean_to_string_and_binary() {
        assert_eq!(single(true, PropertyType::String), Value::String("true".into()));
        assert_eq!(single(false, PropertyType::Binary), Value::Binary(b"FALSE".to_vec()));
    }

    #[test]
    fn double_truncates_to_long() {
        assert_eq!(single(3.99, PropertyType::Long), Value::Long(3));
        assert_eq!(single(-3.99, PropertyType::Long), Value::Long(-3));
    }

    #[test]
    fn double_outside_long_range() {
        assert!(matches!(
            convert(1e300, PropertyType::Long),
            Err(TypeError::ValueFormat(msg)) if msg.contains("out of range")
        ));
        assert!(convert(-1e19, PropertyType::Long).is_err());
        assert!(convert(9.223372036854775807e18, PropertyType::Long).is_err());
        assert_eq!(single(-9.223372036854775808e18, PropertyType::Long), Value::Long(i64::MIN));
        // Too large for LONG, so the UNDEFINED candidates move on to DOUBLE.
        assert_eq!(single(1e20, PropertyType::Undefined), Value::Double(1e20));
    }

    #[test]
    fn double_literal_with_exponent() {
        assert_eq!(single("3.4E-10", PropertyType::Double), Value::Double(3.4e-10));
    }

    #[test]
    fn date_from_string() {
        let expected = DateTime::parse_from_rfc3339("2008-12-24T12:34:00Z").unwrap();
        assert_eq!(single("2008-12-24T12:34Z", PropertyType::Date), Value::Date(expected));
    }

    #[test]
    fn unconvertible_dates() {
        assert!(convert("not-a-date", PropertyType::Date).is_err());
        assert!(convert("foo", PropertyType::Date).is_err());
        assert!(convert(5i64, PropertyType::Date).is_err());
    }

    #[test]
    fn boolean_from_any_string() {
        assert_eq!(single("TrUe", PropertyType::Boolean), Value::Boolean(true));
        assert_eq!(single("yes", PropertyType::Boolean), Value::Boolean(false));
        assert_eq!(single("", PropertyType::Boolean), Value::Boolean(false));
        assert!(convert(1i64, PropertyType::Boolean).is_err());
    }

    #[test]
    fn names() {
        assert_eq!(single("nt:page", PropertyType::Name), Value::Name("nt:page".into()));
        assert_eq!(single("text", PropertyType::Name), Value::Name("text".into()));
        assert!(convert("a:b:c", PropertyType::Name).is_err());
        assert!(convert("unknown:x", PropertyType::Name).is_err());
        assert!(convert("nt:", PropertyType::Name).is_err());
    }

    #[test]
    fn paths() {
        assert_eq!(single("/a/b[2]", PropertyType::Path), Value::Path("/a/b[2]".into()));
        assert_eq!(single("../sibling", PropertyType::Path), Value::Path("../sibling".into()));
        assert_eq!(single("/", PropertyType::Path), Value::Path("/".into()));
        assert!(convert("a//b", PropertyType::Path).is_err());
        assert!(convert("a/b[0]", PropertyType::Path).is_err());
        assert!(convert("", PropertyType::Path).is_err());
    }

    #[test]
    fn references_require_known_identifier() {
        let id = NodeId::new();
        let mut ctx = FixedContext::new();
        let input = PropertyInput::from(id.to_string());
        assert!(convert_value(&input, PropertyType::Reference, &ctx).is_err());

        ctx.known.push(id);
        assert_eq!(
            convert_value(&input, PropertyType::Reference, &ctx).unwrap(),
            Converted::Single(Value::Reference(id))
        );
        assert!(convert("abc", PropertyType::Reference).is_err());
    }

    #[test]
    fn reference_from_node_handle() {
        let id = NodeId::new();
        assert_eq!(single(id, PropertyType::Reference), Value::Reference(id));
    }

    #[test]
    fn weak_reference_needs_only_shape() {
        let id = NodeId::new();
        assert_eq!(
            single(id.to_string(), PropertyType::WeakReference),
            Value::WeakReference(id)
        );
        assert!(convert("abc", PropertyType::WeakReference).is_err());
    }

    #[test]
    fn uris() {
        assert!(convert("abc", PropertyType::Uri).is_err());
        assert_eq!(
            single("http://example.org/", PropertyType::Uri),
            Value::Uri("http://example.org/".into())
        );
    }

    #[test]
    fn decimal_is_never_possible() {
        let err = convert("1.5", PropertyType::Decimal).unwrap_err();
        assert!(err.to_string().contains("not possible or not implemented yet"));
    }

    #[test]
    fn null_is_rejected() {
        assert!(convert(PropertyInput::Null, PropertyType::String).is_err());
    }

    // -----------------------------------------------------------------------
    // UNDEFINED precedence
    // -----------------------------------------------------------------------

    #[test]
    fn undefined_text_falls_back_to_string() {
        assert_eq!(
            single("someValue", PropertyType::Undefined),
            Value::String("someValue".into())
        );
    }

    #[test]
    fn undefined_precedence() {
        assert_eq!(single("12345", PropertyType::Undefined), Value::Long(12345));
        assert_eq!(single(12345i64, PropertyType::Undefined), Value::Long(12345));
        assert_eq!(single("1.5", PropertyType::Undefined), Value::Double(1.5));
        assert_eq!(
            single("http://x.org", PropertyType::Undefined),
            Value::Uri("http://x.org".into())
        );
        assert!(matches!(
            single("2008-12-24T12:34Z", PropertyType::Undefined),
            Value::Date(_)
        ));
        assert_eq!(single(true, PropertyType::Undefined), Value::Boolean(true));
    }

    #[test]
    fn undefined_unknown_uuid_is_weak_reference() {
        let id = NodeId::new();
        assert_eq!(
            single(id.to_string(), PropertyType::Undefined),
            Value::WeakReference(id)
        );
    }

    #[test]
    fn undefined_known_uuid_is_reference() {
        let id = NodeId::new();
        let mut ctx = FixedContext::new();
        ctx.known.push(id);
        let converted =
            convert_value(&id.to_string().into(), PropertyType::Undefined, &ctx).unwrap();
        assert_eq!(converted, Converted::Single(Value::Reference(id)));
    }

    #[test]
    fn undefined_failure_reports_every_candidate() {
        let err = convert(vec![1u8, 2, 3], PropertyType::Undefined).unwrap_err();
        let message = err.to_string();
        for ty in ["Long", "Double", "URI", "Reference", "WeakReference", "Date", "Boolean"] {
            assert!(message.contains(ty), "missing {ty} in {message}");
        }
    }

    #[test]
    fn candidate_order_is_fixed() {
        assert_eq!(
            UNDEFINED_CANDIDATES,
            [
                PropertyType::Long,
                PropertyType::Double,
                PropertyType::Uri,
                PropertyType::Reference,
                PropertyType::WeakReference,
                PropertyType::Date,
            ]
        );
    }

    // -----------------------------------------------------------------------
    // Multi-valued input
    // -----------------------------------------------------------------------

    #[test]
    fn multivalue_strings() {
        let converted = convert(PropertyInput::list(["a", "b"]), PropertyType::String).unwrap();
        assert_eq!(
            converted,
            Converted::Multiple(
                PropertyType::String,
                vec![Value::String("a".into()), Value::String("b".into())]
            )
        );
    }

    #[test]
    fn multivalue_one_bad_element_fails_all() {
        let err = convert(PropertyInput::list(["1", "x", "3"]), PropertyType::Long).unwrap_err();
        assert!(err.to_string().contains("element 1"));
    }

    #[test]
    fn multivalue_drops_nulls() {
        let input = PropertyInput::Multiple(vec![None, Some("hi there".into()), None]);
        assert_eq!(
            convert(input, PropertyType::String).unwrap(),
            Converted::Multiple(PropertyType::String, vec![Value::String("hi there".into())])
        );
    }

    #[test]
    fn multivalue_undefined_shares_one_type() {
        let converted =
            convert(PropertyInput::list(["1", "2"]), PropertyType::Undefined).unwrap();
        assert_eq!(converted.property_type(), PropertyType::Long);

        let mixed = convert(PropertyInput::list(["1", "two"]), PropertyType::Undefined).unwrap();
        assert_eq!(mixed.property_type(), PropertyType::String);
    }

    #[test]
    fn empty_multivalue_without_type_is_string() {
        let input = PropertyInput::Multiple(vec![None]);
        assert_eq!(
            convert(input, PropertyType::Undefined).unwrap(),
            Converted::Multiple(PropertyType::String, vec![])
        );
    }

    #[test]
    fn empty_multivalue_keeps_requested_type() {
        let converted = convert(PropertyInput::Multiple(vec![]), PropertyType::Date).unwrap();
        assert_eq!(converted, Converted::Multiple(PropertyType::Date, vec![]));
    }

    proptest! {
        #[test]
        fn any_i64_string_converts_to_long(v in any::<i64>()) {
            prop_assert_eq!(single(v.to_string(), PropertyType::Long), Value::Long(v));
        }

        #[test]
        fn any_i64_converts_to_string(v in any::<i64>()) {
            prop_assert_eq!(single(v, PropertyType::String), Value::String(v.to_string()));
        }
    }
}
