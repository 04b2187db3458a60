//! Schema module
//!
//! JSON Schema types shaped the way SCHEMA messages and catalog entries
//! carry them.
//!
//! # Features
//!
//! - **Type Lists**: Properties carry one or more JSON Schema types
//! - **Nullability**: Any property can have `null` appended to its types
//! - **Format Hints**: `date-time`, `date`, and `time` annotations
//! - **Nested Objects**: Object properties may carry sub-properties

mod types;

pub use types::{JsonType, JsonTypeOrArray, Schema, SchemaProperty};

#[cfg(test)]
mod tests;
