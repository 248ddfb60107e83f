//! Typed publish/subscribe between the loader, filter stack and frames

use std::any::{Any, TypeId};

use ahash::AHashMap;
use parking_lot::Mutex;

type HandlerMap = AHashMap<TypeId, Vec<Box<dyn EventHandler>>>;

/// Engine-wide event bus; handlers are keyed by event type
#[derive(Default)]
pub struct EventBus {
    handlers: Mutex<HandlerMap>,
}

/// Implemented by every engine event
pub trait Event: Send + Sync + 'static {
    /// Short name used in traces
    fn name(&self) -> &'static str;

    fn as_any(&self) -> &dyn Any;
}

pub trait EventHandler: Send + Sync {
    fn handle(&mut self, event: &dyn Event);
}

/// Engine events
pub mod events {
    use super::Event;
    use crate::stream::TemplateIndex;
    use crate::FilterId;
    use crate::FrameId;

    /// A chunk of records was appended to a template
    #[derive(Debug, Clone)]
    pub struct RecordsLoaded {
        pub template: TemplateIndex,
        pub loaded: usize,
        pub declared: usize,
    }

    /// Every template holds its declared record count
    #[derive(Debug, Clone)]
    pub struct LoadComplete {
        pub total_records: usize,
    }

    /// A chunk request failed; loading has stopped
    #[derive(Debug, Clone)]
    pub struct LoadFailed {
        pub template_id: String,
        pub error: String,
    }

    /// A filter's parameters changed
    #[derive(Debug, Clone)]
    pub struct FilterDirtied {
        pub filter_id: FilterId,
    }

    /// The terminal stream was replaced
    #[derive(Debug, Clone)]
    pub struct StreamRecomputed {
        pub len: usize,
        pub stages_evaluated: usize,
    }

    /// A highlight filter produced a selection for a frame
    #[derive(Debug, Clone)]
    pub struct HighlightApplied {
        pub frame_id: FrameId,
        pub selected: usize,
    }

    macro_rules! impl_event {
        ($($t:ident),*) => {
            $(
                impl Event for $t {
                    fn name(&self) -> &'static str {
                        stringify!($t)
                    }

                    fn as_any(&self) -> &dyn std::any::Any {
                        self
                    }
                }
            )*
        }
    }

    impl_event!(
        RecordsLoaded,
        LoadComplete,
        LoadFailed,
        FilterDirtied,
        StreamRecomputed,
        HighlightApplied
    );
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for events of type `E`
    pub fn subscribe<E: Event>(&self, handler: Box<dyn EventHandler>) {
        self.handlers
            .lock()
            .entry(TypeId::of::<E>())
            .or_default()
            .push(handler);
    }

    /// Number of handlers registered for `E`
    pub fn handler_count<E: Event>(&self) -> usize {
        self.handlers
            .lock()
            .get(&TypeId::of::<E>())
            .map_or(0, Vec::len)
    }

    /// Deliver `event` to every handler of its type, in subscription order
    ///
    /// Handlers run while the bus is locked and must not publish themselves.
    pub fn publish<E: Event>(&self, event: E) {
        let mut handlers = self.handlers.lock();
        let Some(targets) = handlers.get_mut(&TypeId::of::<E>()) else {
            tracing::trace!("{} has no subscribers", event.name());
            return;
        };
        tracing::trace!("Publishing {} to {} handlers", event.name(), targets.len());
        for handler in targets.iter_mut() {
            handler.handle(&event);
        }
    }
}

struct FnHandler<F>(F);

impl<F> EventHandler for FnHandler<F>
where
    F: FnMut(&dyn Event) + Send + Sync,
{
    fn handle(&mut self, event: &dyn Event) {
        (self.0)(event);
    }
}

/// Handler that sees every event it is subscribed to, untyped
pub fn handler_from_fn<F>(f: F) -> Box<dyn EventHandler>
where
    F: FnMut(&dyn Event) + Send + Sync + 'static,
{
    Box::new(FnHandler(f))
}

/// Create an event handler that receives the concrete event type
pub fn typed_handler<E, F>(mut f: F) -> Box<dyn EventHandler>
where
    E: Event,
    F: FnMut(&E) + Send + Sync + 'static,
{
    handler_from_fn(move |event: &dyn Event| {
        if let Some(event) = event.as_any().downcast_ref::<E>() {
            f(event);
        }
    })
}
