//! Core abstractions for the exhibit engine
//!
//! This crate provides the index stream that every visualization consumes,
//! the event bus, engine phase tracking and per-visualization render
//! bitmaps.

pub mod events;
pub mod state;
pub mod stream;
pub mod sync;

// Re-export commonly used types
pub use events::{EventBus, handler_from_fn, typed_handler};
pub use state::{EngineState, PhaseTracker};
pub use stream::{
    AbsoluteIndex, IndexStream, StreamBuilder, StreamSubscriber, SubscriberList,
    TemplateIndex, TemplateRun,
};
pub use sync::{RecordSelection, SelectionBitmap};

/// Filter identifier type
pub type FilterId = uuid::Uuid;

/// Visualization frame identifier type
pub type FrameId = uuid::Uuid;
