//! Record and schema transformation
//!
//! Transformations sit between parsing and emission. Stream maps are applied
//! first, then flattening, and each applies to the schema and to every record
//! the same way.

pub mod flatten;
pub mod stream_maps;

pub use flatten::{flatten_record, flatten_schema};
pub use stream_maps::StreamMap;
