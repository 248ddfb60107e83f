//! Record data for the exhibit engine
//!
//! Schema and attribute catalog, typed record values, the record store with
//! its absolute numbering, the chunked loader and the category binner.

pub mod categories;
pub mod config;
pub mod dates;
pub mod records;
pub mod schema;
pub mod sources;
pub mod value;

use thiserror::Error;

// Re-exports
pub use categories::{Category, CategoryBinner, LegendRef, MatchRule, OrderEntry, SortValue};
pub use config::{EngineConfig, UndefinedTokens};
pub use dates::{DateGranularity, PartialDate};
pub use records::{RawRecord, Record, RecordStore};
pub use schema::{
    AttributeCatalog, AttributeDefinition, AttributeId, AttributeRange, AttributeType,
    ExhibitSchema, LegendData, LegendEntry, TemplateDef,
};
pub use sources::{JsonRecordSource, Loader, RecordSource};
pub use value::{DateEnd, DateValue, NumberValue, Value};

/// Errors that can occur in data operations
#[derive(Error, Debug)]
pub enum DataError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed date, timecode or value in loaded data
    #[error("Data format error: {0}")]
    DataFormat(String),

    /// A chunk request failed; loading has halted
    #[error("Network error loading template '{template_id}': {message}")]
    Network { template_id: String, message: String },

    /// Unknown id or out-of-range index
    #[error("Lookup error: {0}")]
    Lookup(String),

    #[error("Schema error: {0}")]
    Schema(String),

    /// Records are still loading
    #[error("Record store is not fully loaded")]
    NotReady,
}
