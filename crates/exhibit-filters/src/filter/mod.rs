//! Filter variants and the evaluation protocol
//!
//! Every pass over a stream calls `eval_prep` once, `eval` for each
//! in-scope record and `eval_done` with the number of records evaluated.
//! Parameters are set with `set_state` and only take effect at the next
//! `eval_prep`.

mod range;
mod text;
mod vocabulary;

pub use range::{DatesFilter, NumberFilter};
pub use text::{TagsFilter, TextFilter};
pub use vocabulary::VocabularyFilter;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use exhibit_data::{AttributeDefinition, AttributeType, CategoryBinner, EngineConfig, Record};

use crate::{FilterError, ValidationError};

/// Values shared by every filter during one pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalContext {
    /// Resolves open-ended date ranges
    pub today: NaiveDate,
}

impl EvalContext {
    pub fn new(today: NaiveDate) -> Self {
        Self { today }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self { today: config.today() }
    }
}

/// Evaluation protocol shared by all filter variants
pub trait RecordFilter {
    /// Capture the current parameters and reset counters before a pass
    fn eval_prep(&mut self, ctx: &EvalContext);

    /// Whether the record passes
    fn eval(&mut self, record: &Record) -> bool;

    /// Finish a pass over `total` evaluated records
    fn eval_done(&mut self, _total: usize) {}
}

fn default_overlap() -> bool {
    true
}

/// Serializable filter parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterState {
    Remove,
    Text {
        pattern: String,
        #[serde(default)]
        case_sensitive: bool,
    },
    Tags {
        pattern: String,
        #[serde(default)]
        case_sensitive: bool,
        /// Match tags containing the pattern instead of equal to it
        #[serde(default)]
        partial: bool,
    },
    Vocabulary {
        selected: Vec<String>,
    },
    /// Inclusive bounds
    Number {
        min: f64,
        max: f64,
        #[serde(default)]
        allow_undefined: bool,
    },
    /// Half-open day range `[start, end)`
    Dates {
        start: NaiveDate,
        end: NaiveDate,
        /// Ranges pass when they overlap the bounds rather than fit inside
        #[serde(default = "default_overlap")]
        overlap: bool,
        #[serde(default)]
        allow_undefined: bool,
    },
}

impl FilterState {
    pub fn kind_name(&self) -> &'static str {
        match self {
            FilterState::Remove => "remove",
            FilterState::Text { .. } => "text",
            FilterState::Tags { .. } => "tags",
            FilterState::Vocabulary { .. } => "vocabulary",
            FilterState::Number { .. } => "number",
            FilterState::Dates { .. } => "dates",
        }
    }
}

/// A filter of one of the supported kinds
#[derive(Debug, Clone)]
pub enum Filter {
    /// Removes every record of the templates it applies to
    Remove,
    Text(TextFilter),
    Tags(TagsFilter),
    Vocabulary(VocabularyFilter),
    Number(NumberFilter),
    Dates(DatesFilter),
}

impl Filter {
    /// Filter for an attribute, chosen by its type, with default parameters
    pub fn for_attribute(
        def: &AttributeDefinition,
        binner: &CategoryBinner<'_>,
    ) -> Result<Self, FilterError> {
        let filter = match def.kind {
            AttributeType::Text => Filter::Text(TextFilter::new(&def.id)),
            AttributeType::Tags => Filter::Tags(TagsFilter::new(&def.id)),
            AttributeType::Vocabulary => Filter::Vocabulary(VocabularyFilter::new(def)),
            AttributeType::Number => Filter::Number(NumberFilter::new(def, binner)?),
            AttributeType::Dates => Filter::Dates(DatesFilter::new(def, binner)?),
            other => {
                return Err(FilterError::Unfilterable {
                    attribute: def.id.clone(),
                    code: other.code(),
                })
            }
        };
        tracing::debug!("Created {} filter on '{}'", filter.state().kind_name(), def.id);
        Ok(filter)
    }

    /// Attribute the filter reads; `None` for the remove filter
    pub fn attribute(&self) -> Option<&str> {
        match self {
            Filter::Remove => None,
            Filter::Text(f) => Some(f.attribute()),
            Filter::Tags(f) => Some(f.attribute()),
            Filter::Vocabulary(f) => Some(f.attribute()),
            Filter::Number(f) => Some(f.attribute()),
            Filter::Dates(f) => Some(f.attribute()),
        }
    }

    pub fn state(&self) -> FilterState {
        match self {
            Filter::Remove => FilterState::Remove,
            Filter::Text(f) => f.state(),
            Filter::Tags(f) => f.state(),
            Filter::Vocabulary(f) => f.state(),
            Filter::Number(f) => f.state(),
            Filter::Dates(f) => f.state(),
        }
    }

    /// Replace the parameters; rejected input leaves the filter unchanged
    pub fn set_state(&mut self, state: FilterState) -> Result<(), ValidationError> {
        let expected = self.state().kind_name();
        match (self, state) {
            (Filter::Remove, FilterState::Remove) => Ok(()),
            (Filter::Text(f), FilterState::Text { pattern, case_sensitive }) => {
                f.set(pattern, case_sensitive);
                Ok(())
            }
            (Filter::Tags(f), FilterState::Tags { pattern, case_sensitive, partial }) => {
                f.set(pattern, case_sensitive, partial);
                Ok(())
            }
            (Filter::Vocabulary(f), FilterState::Vocabulary { selected }) => {
                f.select(selected);
                Ok(())
            }
            (Filter::Number(f), FilterState::Number { min, max, allow_undefined }) => {
                f.set_bounds(min, max)?;
                f.set_allow_undefined(allow_undefined);
                Ok(())
            }
            (Filter::Dates(f), FilterState::Dates { start, end, overlap, allow_undefined }) => {
                f.set_bounds(start, end)?;
                f.set_overlap(overlap);
                f.set_allow_undefined(allow_undefined);
                Ok(())
            }
            (_, other) => Err(ValidationError::WrongKind {
                expected,
                found: other.kind_name(),
            }),
        }
    }

    /// Set Number or Dates bounds from user-entered text
    pub fn set_bounds_from_input(&mut self, from: &str, to: &str) -> Result<(), ValidationError> {
        match self {
            Filter::Number(f) => f.set_bounds_from_input(from, to),
            Filter::Dates(f) => f.set_bounds_from_input(from, to),
            other => Err(ValidationError::WrongKind {
                expected: other.state().kind_name(),
                found: "range",
            }),
        }
    }
}

impl RecordFilter for Filter {
    fn eval_prep(&mut self, ctx: &EvalContext) {
        match self {
            Filter::Remove => {}
            Filter::Text(f) => f.eval_prep(ctx),
            Filter::Tags(f) => f.eval_prep(ctx),
            Filter::Vocabulary(f) => f.eval_prep(ctx),
            Filter::Number(f) => f.eval_prep(ctx),
            Filter::Dates(f) => f.eval_prep(ctx),
        }
    }

    fn eval(&mut self, record: &Record) -> bool {
        match self {
            Filter::Remove => false,
            Filter::Text(f) => f.eval(record),
            Filter::Tags(f) => f.eval(record),
            Filter::Vocabulary(f) => f.eval(record),
            Filter::Number(f) => f.eval(record),
            Filter::Dates(f) => f.eval(record),
        }
    }

    fn eval_done(&mut self, total: usize) {
        match self {
            Filter::Remove => {}
            Filter::Text(f) => f.eval_done(total),
            Filter::Tags(f) => f.eval_done(total),
            Filter::Vocabulary(f) => f.eval_done(total),
            Filter::Number(f) => f.eval_done(total),
            Filter::Dates(f) => f.eval_done(total),
        }
    }
}

/// Rounded share of `count` in `total`, in percent
pub(crate) fn percent(count: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((count as f64 * 100.0) / total as f64).round() as u32
}
