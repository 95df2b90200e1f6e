use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// The JCR property type tags.
///
/// `Undefined` is only ever a *requested* type: a stored property always
/// carries one of the concrete tags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PropertyType {
    Undefined,
    String,
    Binary,
    Long,
    Double,
    Date,
    Boolean,
    Name,
    Path,
    Reference,
    WeakReference,
    Uri,
    Decimal,
}

impl PropertyType {
    /// Every tag, in JCR code order.
    pub const ALL: [PropertyType; 13] = [
        PropertyType::Undefined,
        PropertyType::String,
        PropertyType::Binary,
        PropertyType::Long,
        PropertyType::Double,
        PropertyType::Date,
        PropertyType::Boolean,
        PropertyType::Name,
        PropertyType::Path,
        PropertyType::Reference,
        PropertyType::WeakReference,
        PropertyType::Uri,
        PropertyType::Decimal,
    ];

    /// The JCR type name, as used in system view `sv:type` attributes.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::String => "String",
            Self::Binary => "Binary",
            Self::Long => "Long",
            Self::Double => "Double",
            Self::Date => "Date",
            Self::Boolean => "Boolean",
            Self::Name => "Name",
            Self::Path => "Path",
            Self::Reference => "Reference",
            Self::WeakReference => "WeakReference",
            Self::Uri => "URI",
            Self::Decimal => "Decimal",
        }
    }

    /// The JCR integer code.
    pub fn code(&self) -> u8 {
        match self {
            Self::Undefined => 0,
            Self::String => 1,
            Self::Binary => 2,
            Self::Long => 3,
            Self::Double => 4,
            Self::Date => 5,
            Self::Boolean => 6,
            Self::Name => 7,
            Self::Path => 8,
            Self::Reference => 9,
            Self::WeakReference => 10,
            Self::Uri => 11,
            Self::Decimal => 12,
        }
    }

    /// Case-insensitive inverse of [`PropertyType::name`].
    pub fn from_name(name: &str) -> Result<Self, TypeError> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| TypeError::UnknownPropertyType(name.to_string()))
    }

    /// Inverse of [`PropertyType::code`].
    pub fn from_code(code: u8) -> Result<Self, TypeError> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.code() == code)
            .ok_or_else(|| TypeError::UnknownPropertyType(code.to_string()))
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, Self::Reference | Self::WeakReference)
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
