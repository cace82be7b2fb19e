//! Core types shared across the crate: values, catalog rows and identifiers.

pub mod identifier;
pub mod metadata;
pub mod value;

pub use identifier::{double_quote, escape_literal, validate_identifier, Quoter};
pub use metadata::{GroupKey, MetadataRow};
pub use value::{Row, SqlValue};
