//! Foundation types for the content repository.
//!
//! This crate holds everything that can be decided without a session or a
//! storage backend: identifiers, the closed set of property types, typed
//! values, the JCR name and path grammars, and the coercion engine that turns
//! untyped client input into typed values.
//!
//! # Key Types
//!
//! - [`NodeId`] — UUID identifying a node independent of its path
//! - [`PropertyType`] — the JCR property type tags
//! - [`Value`] — one typed property value
//! - [`RawValue`] / [`PropertyInput`] — untyped input handed to `setProperty`
//! - [`ConversionContext`] — session lookups the coercion engine needs
//! - [`PathSegment`] — one parsed path segment (`name[n]`, `.`, `..`)

pub mod convert;
pub mod error;
pub mod id;
pub mod names;
pub mod path;
pub mod patterns;
pub mod property_type;
pub mod raw;
pub mod value;

pub use convert::{convert_value, ConversionContext, Converted, UNDEFINED_CANDIDATES};
pub use error::{TypeError, TypeResult};
pub use id::NodeId;
pub use names::{is_valid_name, split_prefixed_name, validate_name};
pub use path::{parse_segment, split_last, PathSegment};
pub use property_type::PropertyType;
pub use raw::{guess_type, PropertyInput, RawValue};
pub use value::Value;
