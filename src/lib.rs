//! Aggregator for the MIDNAM workspace crates.

pub use midnam_core;
pub use midnam_store;
pub use midnam_xml;
