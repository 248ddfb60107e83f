//! The exhibit viewer context
//!
//! `ExhibitViewer` owns everything a running exhibit shares: the record
//! store, attribute catalog, filter stack, visualization frames, event bus
//! and engine phase. Visualizations and UI code go through it instead of
//! reaching into global state.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock, RwLockReadGuard};
use serde_json::Value as JsonValue;

use exhibit_core::events::events::{FilterDirtied, HighlightApplied, StreamRecomputed};
use exhibit_core::{
    AbsoluteIndex, EngineState, EventBus, FilterId, FrameId, IndexStream, PhaseTracker,
    StreamSubscriber, SubscriberList, TemplateIndex,
};
use exhibit_data::{
    AttributeCatalog, AttributeDefinition, Category, CategoryBinner, DataError, EngineConfig,
    ExhibitSchema, LegendRef, Loader, OrderEntry, Record, RecordSource, RecordStore,
};
use exhibit_filters::{
    EvalContext, Filter, FilterError, FilterStack, FilterState, RecomputeOutcome,
};

use crate::frame::VizFrame;
use crate::viz::VizKind;
use crate::ViewerError;

pub struct ExhibitViewer {
    config: EngineConfig,
    catalog: AttributeCatalog,
    store: RwLock<RecordStore>,
    filters: Mutex<FilterStack>,
    frames: RwLock<Vec<VizFrame>>,
    events: EventBus,
    phase: PhaseTracker,
    subscribers: SubscriberList,
}

impl ExhibitViewer {
    /// Viewer for a schema; one frame is created per declared view with a
    /// known type code
    pub fn new(schema: ExhibitSchema, config: EngineConfig) -> Result<Self, ViewerError> {
        let catalog = AttributeCatalog::new(schema.attributes)?;
        let store = RecordStore::new(schema.templates);
        let record_count = store.total_records();
        let template_count = store.template_count();

        let mut frames = Vec::new();
        for view in schema.views {
            match view.kind.chars().next().and_then(VizKind::from_code) {
                Some(kind) => frames.push(VizFrame::new(
                    kind,
                    view.label,
                    view.settings,
                    record_count,
                    template_count,
                )),
                None => tracing::warn!("Skipping view '{}' of unknown type '{}'", view.label, view.kind),
            }
        }

        tracing::info!(
            "Exhibit with {} templates, {} attributes, {} frames",
            template_count,
            catalog.len(),
            frames.len()
        );
        Ok(Self {
            config,
            catalog,
            store: RwLock::new(store),
            filters: Mutex::new(FilterStack::new()),
            frames: RwLock::new(frames),
            events: EventBus::new(),
            phase: PhaseTracker::new(),
            subscribers: SubscriberList::new(),
        })
    }

    pub fn from_json_str(schema: &str, config: EngineConfig) -> Result<Self, ViewerError> {
        Self::new(ExhibitSchema::from_json_str(schema)?, config)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn catalog(&self) -> &AttributeCatalog {
        &self.catalog
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn phase(&self) -> EngineState {
        self.phase.get()
    }

    /// Read access to the record store
    pub fn store(&self) -> RwLockReadGuard<'_, RecordStore> {
        self.store.read()
    }

    pub fn eval_context(&self) -> EvalContext {
        EvalContext::from_config(&self.config)
    }

    /// Be notified whenever the terminal stream changes
    pub fn subscribe(&self, subscriber: &Arc<dyn StreamSubscriber>) {
        self.subscribers.add(subscriber);
    }

    /// Load every template from `source` and build the first stream
    ///
    /// Records are visible only once loading ends. Loading again replaces
    /// the records and discards every cached filter output. After a failure
    /// the store keeps what arrived and the viewer refuses to recompute.
    pub async fn load(&self, source: &dyn RecordSource) -> Result<Arc<IndexStream>, ViewerError> {
        self.phase.set(EngineState::Load);
        let mut store = RecordStore::new(self.store.read().templates().to_vec());
        let result = Loader::new(&self.config)
            .load_all(&mut store, &self.catalog, source, &self.events)
            .await;
        *self.store.write() = store;
        self.filters.lock().invalidate();

        if let Err(err) = result {
            tracing::error!("Loading from {} failed: {}", source.source_name(), err);
            self.phase.set(EngineState::Init);
            return Err(err.into());
        }
        self.recompute()
    }

    /// Terminal stream of the last recompute
    pub fn stream(&self) -> Option<Arc<IndexStream>> {
        self.filters.lock().stream()
    }

    pub fn set_filter_dirty(&self, id: FilterId) -> Result<(), ViewerError> {
        self.filters.lock().set_dirty(id)?;
        self.events.publish(FilterDirtied { filter_id: id });
        Ok(())
    }

    /// Bring the filter stack up to date and hand the stream to every frame
    ///
    /// Requests are serialized; a second caller waits for the first.
    pub fn recompute(&self) -> Result<Arc<IndexStream>, ViewerError> {
        let store = self.store.read();
        let ctx = self.eval_context();
        let previous = self.phase.set(EngineState::Process);

        let outcome = self.filters.lock().recompute(&store, &ctx);
        match outcome {
            Ok(outcome) => Ok(self.publish_stream(outcome)),
            Err(err) => {
                self.phase.set(previous);
                Err(err.into())
            }
        }
    }

    fn publish_stream(&self, outcome: RecomputeOutcome) -> Arc<IndexStream> {
        self.phase.set(EngineState::Build);
        for frame in self.frames.write().iter_mut() {
            frame.clear_selection();
        }
        self.subscribers.notify(&outcome.stream);
        self.events.publish(StreamRecomputed {
            len: outcome.stream.len(),
            stages_evaluated: outcome.stages_evaluated,
        });
        self.phase.set(EngineState::Ready);
        outcome.stream
    }

    pub fn record_at(&self, index: AbsoluteIndex) -> Result<Record, ViewerError> {
        Ok(self.store.read().record_at(index)?.clone())
    }

    /// Look up a record by id, optionally within one template
    pub fn record_by_id(&self, template: Option<&str>, id: &str) -> Option<Record> {
        let store = self.store.read();
        let scope = match template {
            Some(template_id) => Some(store.template_index(template_id)?),
            None => None,
        };
        store.record_by_id(scope, id).cloned()
    }

    pub fn attribute_by_id(&self, id: &str) -> Option<&AttributeDefinition> {
        self.catalog.get(id)
    }

    fn binner<'a>(&'a self, store: &'a RecordStore) -> CategoryBinner<'a> {
        CategoryBinner::new(store, &self.catalog, &self.config)
    }

    pub fn legend_categories(
        &self,
        attribute: &str,
        allowed: Option<&[LegendRef]>,
        include_undefined: bool,
    ) -> Result<Vec<Category>, ViewerError> {
        let store = self.store.read();
        Ok(self.binner(&store).legend_categories(attribute, allowed, include_undefined)?)
    }

    pub fn computed_range_categories(
        &self,
        attribute: &str,
        with_members: bool,
        include_undefined: bool,
    ) -> Result<Option<Vec<Category>>, ViewerError> {
        let store = self.store.read();
        Ok(self
            .binner(&store)
            .computed_range_categories(attribute, with_members, include_undefined)?)
    }

    /// Place a stream's records into categories; returns how many were placed
    pub fn fill(
        &self,
        categories: &mut Vec<Category>,
        attribute: &str,
        stream: &IndexStream,
        scope: Option<TemplateIndex>,
        secondary: Option<&str>,
    ) -> Result<usize, ViewerError> {
        let store = self.store.read();
        Ok(self.binner(&store).fill(categories, attribute, stream, scope, secondary)?)
    }

    pub fn sub_categorize(
        &self,
        members: &[AbsoluteIndex],
        attribute: &str,
        sub_categories: &mut Vec<Category>,
    ) -> Result<usize, ViewerError> {
        let store = self.store.read();
        Ok(self.binner(&store).sub_categorize(members, attribute, sub_categories)?)
    }

    pub fn sorted_order(
        &self,
        attribute: &str,
        stream: &IndexStream,
        template: TemplateIndex,
    ) -> Result<Vec<OrderEntry>, ViewerError> {
        let store = self.store.read();
        Ok(self.binner(&store).sorted_order(attribute, stream, template)?)
    }

    fn filter_for(&self, attribute: &str) -> Result<Filter, ViewerError> {
        let def = self
            .catalog
            .get(attribute)
            .ok_or_else(|| ViewerError::UnknownAttribute(attribute.to_string()))?;
        let store = self.store.read();
        Ok(Filter::for_attribute(def, &self.binner(&store))?)
    }

    /// Append a filter on `attribute`; `apply` holds one flag per template
    pub fn create_filter(&self, attribute: &str, apply: Vec<bool>) -> Result<FilterId, ViewerError> {
        let filter = self.filter_for(attribute)?;
        Ok(self.filters.lock().create_filter(filter, apply))
    }

    /// Append a filter that removes every record of the templates it applies to
    pub fn create_remove_filter(&self, apply: Vec<bool>) -> FilterId {
        self.filters.lock().create_filter(Filter::Remove, apply)
    }

    pub fn edit_filter(&self, id: FilterId, state: FilterState) -> Result<(), ViewerError> {
        self.filters.lock().edit(id, state)?;
        self.events.publish(FilterDirtied { filter_id: id });
        Ok(())
    }

    /// Set a Number or Dates filter's bounds from user-entered text
    ///
    /// Rejected input leaves the filter clean and unchanged.
    pub fn edit_filter_bounds(&self, id: FilterId, from: &str, to: &str) -> Result<(), ViewerError> {
        let mut filters = self.filters.lock();
        let mut edited = filters.filter(id).cloned().ok_or(FilterError::UnknownFilter(id))?;
        if let Err(err) = edited.set_bounds_from_input(from, to) {
            tracing::warn!("Rejected bounds '{}'..'{}' for filter {}: {}", from, to, id, err);
            return Err(FilterError::from(err).into());
        }
        *filters.edit_filter(id)? = edited;
        drop(filters);

        self.events.publish(FilterDirtied { filter_id: id });
        Ok(())
    }

    pub fn filter_state(&self, id: FilterId) -> Option<FilterState> {
        self.filters.lock().filter(id).map(Filter::state)
    }

    /// Filter ids in stack order
    pub fn filter_ids(&self) -> Vec<FilterId> {
        self.filters.lock().ids()
    }

    pub fn delete_filter(&self, id: FilterId) -> Result<Arc<IndexStream>, ViewerError> {
        let store = self.store.read();
        let ctx = self.eval_context();
        let outcome = self.filters.lock().delete_filter(id, &store, &ctx)?;
        Ok(self.publish_stream(outcome))
    }

    /// Add a frame for a visualization created at runtime
    pub fn add_frame(&self, kind: VizKind, label: &str, settings: JsonValue) -> FrameId {
        let store = self.store.read();
        let frame = VizFrame::new(kind, label, settings, store.total_records(), store.template_count());
        let id = frame.id();
        self.frames.write().push(frame);
        id
    }

    /// Frame ids in creation order
    pub fn frame_ids(&self) -> Vec<FrameId> {
        self.frames.read().iter().map(VizFrame::id).collect()
    }

    /// Run `f` against one frame
    pub fn with_frame<R>(&self, id: FrameId, f: impl FnOnce(&mut VizFrame) -> R) -> Result<R, ViewerError> {
        let mut frames = self.frames.write();
        let frame = frames
            .iter_mut()
            .find(|frame| frame.id() == id)
            .ok_or(ViewerError::UnknownFrame(id))?;
        Ok(f(frame))
    }

    pub fn begin_render(&self, frame: FrameId) -> Result<(), ViewerError> {
        self.with_frame(frame, VizFrame::begin_render)
    }

    pub fn report_rendered(
        &self,
        frame: FrameId,
        template: TemplateIndex,
        index: AbsoluteIndex,
    ) -> Result<bool, ViewerError> {
        self.with_frame(frame, |f| f.report_rendered(template, index))
    }

    pub fn report_template_used(&self, frame: FrameId, template: TemplateIndex) -> Result<(), ViewerError> {
        self.with_frame(frame, |f| f.report_template_used(template))
    }

    pub fn toggle_selection(&self, frame: FrameId, index: AbsoluteIndex) -> Result<bool, ViewerError> {
        self.with_frame(frame, |f| f.toggle_selection(index))
    }

    pub fn selection(&self, frame: FrameId) -> Result<Vec<AbsoluteIndex>, ViewerError> {
        self.with_frame(frame, |f| f.selection().as_slice().to_vec())
    }

    /// Give a frame a highlight filter on `attribute`, or remove it
    pub fn set_highlight(&self, frame: FrameId, attribute: Option<&str>) -> Result<(), ViewerError> {
        let filter = attribute.map(|a| self.filter_for(a)).transpose()?;
        self.with_frame(frame, |f| f.set_highlight(filter))
    }

    pub fn edit_highlight(&self, frame: FrameId, state: FilterState) -> Result<(), ViewerError> {
        self.with_frame(frame, |f| match f.highlight_mut() {
            Some(filter) => filter
                .set_state(state)
                .map_err(|err| ViewerError::Filter(err.into())),
            None => Err(ViewerError::NoHighlight(frame)),
        })?
    }

    /// Select the frame's rendered records that pass its highlight filter
    pub fn apply_highlight(&self, frame: FrameId) -> Result<Vec<AbsoluteIndex>, ViewerError> {
        let stream = self.stream().ok_or(DataError::NotReady)?;
        let store = self.store.read();
        let ctx = self.eval_context();

        let previous = self.phase.set(EngineState::Update);
        let selected = self.with_frame(frame, |f| {
            f.apply_highlight(&stream, &store, &ctx)
                .map(|selection| selection.as_slice().to_vec())
        });
        self.phase.set(previous);

        let selected = selected??;
        self.events.publish(HighlightApplied { frame_id: frame, selected: selected.len() });
        Ok(selected)
    }
}
