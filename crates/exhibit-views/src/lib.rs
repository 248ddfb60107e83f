//! Visualization-facing layer of the exhibit engine
//!
//! The `ExhibitViewer` context object, visualization frames and the
//! registry of visualization types.

mod frame;
mod viewer;
mod viz;

use thiserror::Error;

use exhibit_core::FrameId;
use exhibit_data::DataError;
use exhibit_filters::FilterError;

pub use frame::VizFrame;
pub use viewer::ExhibitViewer;
pub use viz::{VizCapabilities, VizKind};

/// Errors surfaced to visualization and UI code
#[derive(Error, Debug)]
pub enum ViewerError {
    #[error("Unknown frame {0}")]
    UnknownFrame(FrameId),

    #[error("Frame {0} has no highlight filter")]
    NoHighlight(FrameId),

    #[error("Unknown attribute '{0}'")]
    UnknownAttribute(String),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Data(#[from] DataError),
}
