//! Singer protocol output
//!
//! Message types, the discovery catalog, and the JSON-lines writer that
//! carries them to the downstream loader.

mod catalog;
mod messages;
mod writer;

pub use catalog::{Catalog, CatalogEntry, MetadataEntry};
pub use messages::{current_time_extracted, Message};
pub use writer::MessageWriter;
