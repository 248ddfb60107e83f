//! Saved filter perspectives
//!
//! A perspective lists the filters to stack, in order, plus the attributes
//! the report groups and orders the resulting stream by.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;

use exhibit_core::IndexStream;
use exhibit_filters::FilterState;
use exhibit_views::ExhibitViewer;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Perspective {
    #[serde(default)]
    pub filters: Vec<FilterStep>,
    /// Attribute to group the stream by
    #[serde(default)]
    pub categories: Option<String>,
    /// Attribute to order each template by
    #[serde(default)]
    pub order: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FilterStep {
    /// Not needed for remove filters
    #[serde(default)]
    pub attribute: Option<String>,
    /// One flag per template; missing flags apply
    #[serde(default)]
    pub apply: Vec<bool>,
    pub state: FilterState,
}

impl Perspective {
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read perspective {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse perspective {}", path.display()))
    }

    /// Stack every filter on the viewer and recompute once
    pub fn apply(&self, viewer: &ExhibitViewer) -> Result<Arc<IndexStream>> {
        for (i, step) in self.filters.iter().enumerate() {
            let id = match (&step.state, step.attribute.as_deref()) {
                (FilterState::Remove, _) => viewer.create_remove_filter(step.apply.clone()),
                (state, Some(attribute)) => {
                    let id = viewer
                        .create_filter(attribute, step.apply.clone())
                        .with_context(|| format!("Filter {} on '{}'", i + 1, attribute))?;
                    viewer
                        .edit_filter(id, state.clone())
                        .with_context(|| format!("Filter {} on '{}'", i + 1, attribute))?;
                    id
                }
                (state, None) => {
                    anyhow::bail!("Filter {} ({}) names no attribute", i + 1, state.kind_name())
                }
            };
            tracing::debug!("Stacked filter {} as {}", i + 1, id);
        }
        Ok(viewer.recompute()?)
    }
}
