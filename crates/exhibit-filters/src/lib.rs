//! Filter pipeline for the exhibit engine
//!
//! A `FilterStack` narrows the full record stream through an ordered list
//! of filters, recomputing only from the first stage whose parameters
//! changed. Highlight filters reuse the same filter variants against a
//! visualization's render bitmap.

pub mod filter;
pub mod highlight;
pub mod stack;
pub mod validation;

use thiserror::Error;

use exhibit_core::FilterId;
use exhibit_data::DataError;

pub use filter::{
    DatesFilter, EvalContext, Filter, FilterState, NumberFilter, RecordFilter, TagsFilter,
    TextFilter, VocabularyFilter,
};
pub use highlight::apply_highlight;
pub use stack::{run_stage, FilterStack, RecomputeOutcome};
pub use validation::{parse_date_bounds, parse_number_bounds, ValidationError};

/// Errors raised by filter operations
#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Unknown filter {0}")]
    UnknownFilter(FilterId),

    #[error("Unknown attribute '{0}'")]
    UnknownAttribute(String),

    #[error("Attribute '{attribute}' of type {code} cannot be filtered")]
    Unfilterable { attribute: String, code: char },

    /// Parameters rejected before reaching the filter
    #[error("Invalid filter parameters: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Data(#[from] DataError),
}
