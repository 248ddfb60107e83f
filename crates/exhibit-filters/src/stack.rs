//! Ordered filter stages with dirty-tracked recompute
//!
//! Each stage caches the stream it produced. A recompute reuses cached
//! outputs up to the first dirty stage and re-runs every stage from there
//! on, since their input has changed.

use std::sync::Arc;

use exhibit_core::{FilterId, IndexStream, StreamBuilder};
use exhibit_data::RecordStore;

use crate::filter::{EvalContext, Filter, FilterState, RecordFilter};
use crate::FilterError;

/// Run one filter over a stream
///
/// Records of templates whose apply flag is false pass through unevaluated;
/// missing flags count as true. One run is closed per input run, even when
/// it ends up empty. `eval_done` receives the number of records evaluated.
pub fn run_stage<F: RecordFilter + ?Sized>(
    filter: &mut F,
    apply: &[bool],
    input: &IndexStream,
    store: &RecordStore,
    ctx: &EvalContext,
) -> Result<IndexStream, FilterError> {
    filter.eval_prep(ctx);
    let mut builder = StreamBuilder::with_capacity(input.len());
    let mut evaluated = 0;

    for (template, indices) in input.iter_templates() {
        if apply.get(template).copied().unwrap_or(true) {
            for &index in indices {
                evaluated += 1;
                if filter.eval(store.record_at(index)?) {
                    builder.push(index);
                }
            }
        } else {
            builder.extend_from_slice(indices);
        }
        builder.close_run();
    }

    filter.eval_done(evaluated);
    let output = builder.finish();
    tracing::debug!(
        "Stage kept {} of {} records ({} evaluated)",
        output.len(),
        input.len(),
        evaluated
    );
    Ok(output)
}

#[derive(Debug)]
struct Stage {
    id: FilterId,
    filter: Filter,
    apply: Vec<bool>,
    dirty: bool,
    output: Option<Arc<IndexStream>>,
}

/// Result of a recompute
#[derive(Debug, Clone)]
pub struct RecomputeOutcome {
    /// Terminal stream
    pub stream: Arc<IndexStream>,
    /// Stages that were re-run rather than reused
    pub stages_evaluated: usize,
}

/// The filter pipeline between the full record stream and the views
#[derive(Debug, Default)]
pub struct FilterStack {
    base: Option<Arc<IndexStream>>,
    stages: Vec<Stage>,
    terminal: Option<Arc<IndexStream>>,
}

impl FilterStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a filter; it starts dirty
    pub fn create_filter(&mut self, filter: Filter, apply: Vec<bool>) -> FilterId {
        let id = FilterId::new_v4();
        tracing::info!(
            "Created filter {} on {}",
            id,
            filter.attribute().unwrap_or("all records")
        );
        self.stages.push(Stage { id, filter, apply, dirty: true, output: None });
        id
    }

    fn position(&self, id: FilterId) -> Result<usize, FilterError> {
        self.stages
            .iter()
            .position(|stage| stage.id == id)
            .ok_or(FilterError::UnknownFilter(id))
    }

    fn stage_mut(&mut self, id: FilterId) -> Result<&mut Stage, FilterError> {
        let pos = self.position(id)?;
        Ok(&mut self.stages[pos])
    }

    pub fn set_dirty(&mut self, id: FilterId) -> Result<(), FilterError> {
        self.stage_mut(id)?.dirty = true;
        Ok(())
    }

    /// Replace a filter's parameters and mark it dirty
    ///
    /// Rejected parameters leave the filter clean and unchanged.
    pub fn edit(&mut self, id: FilterId, state: FilterState) -> Result<(), FilterError> {
        let stage = self.stage_mut(id)?;
        if let Err(err) = stage.filter.set_state(state) {
            tracing::warn!("Rejected parameters for filter {}: {}", id, err);
            return Err(err.into());
        }
        stage.dirty = true;
        Ok(())
    }

    /// Mutable access to a filter; marks it dirty
    pub fn edit_filter(&mut self, id: FilterId) -> Result<&mut Filter, FilterError> {
        let stage = self.stage_mut(id)?;
        stage.dirty = true;
        Ok(&mut stage.filter)
    }

    pub fn set_apply(&mut self, id: FilterId, apply: Vec<bool>) -> Result<(), FilterError> {
        let stage = self.stage_mut(id)?;
        stage.apply = apply;
        stage.dirty = true;
        Ok(())
    }

    pub fn filter(&self, id: FilterId) -> Option<&Filter> {
        self.stages.iter().find(|s| s.id == id).map(|s| &s.filter)
    }

    pub fn apply_flags(&self, id: FilterId) -> Option<&[bool]> {
        self.stages.iter().find(|s| s.id == id).map(|s| s.apply.as_slice())
    }

    pub fn is_dirty(&self, id: FilterId) -> Option<bool> {
        self.stages.iter().find(|s| s.id == id).map(|s| s.dirty)
    }

    /// Cached output of one stage
    pub fn stage_output(&self, id: FilterId) -> Option<Arc<IndexStream>> {
        self.stages
            .iter()
            .find(|s| s.id == id)
            .and_then(|s| s.output.clone())
    }

    /// Filter ids in stack order
    pub fn ids(&self) -> Vec<FilterId> {
        self.stages.iter().map(|s| s.id).collect()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Terminal stream of the last recompute
    pub fn stream(&self) -> Option<Arc<IndexStream>> {
        self.terminal.clone()
    }

    /// Drop every cached stream after the records changed underneath
    ///
    /// The base stream is rebuilt and every stage re-runs on the next
    /// recompute.
    pub fn invalidate(&mut self) {
        self.base = None;
        self.terminal = None;
        for stage in &mut self.stages {
            stage.dirty = true;
            stage.output = None;
        }
    }

    pub fn needs_recompute(&self) -> bool {
        self.terminal.is_none() || self.stages.iter().any(|s| s.dirty)
    }

    /// Bring every stage up to date and return the terminal stream
    ///
    /// The base stream is built on the first call, which fails with
    /// `NotReady` until the store is fully loaded.
    pub fn recompute(
        &mut self,
        store: &RecordStore,
        ctx: &EvalContext,
    ) -> Result<RecomputeOutcome, FilterError> {
        let base = match &self.base {
            Some(base) => base.clone(),
            None => {
                let base = Arc::new(store.full_stream()?);
                tracing::info!("Built base stream of {} records", base.len());
                self.base = Some(base.clone());
                base
            }
        };

        let mut input = base;
        let mut started = false;
        let mut stages_evaluated = 0;
        for stage in &mut self.stages {
            if !started && !stage.dirty {
                if let Some(output) = &stage.output {
                    input = output.clone();
                    continue;
                }
            }
            started = true;

            let output = Arc::new(run_stage(&mut stage.filter, &stage.apply, &input, store, ctx)?);
            stage.output = Some(output.clone());
            stage.dirty = false;
            stages_evaluated += 1;
            input = output;
        }

        tracing::info!(
            "Recomputed {} of {} stages, {} records remain",
            stages_evaluated,
            self.stages.len(),
            input.len()
        );
        self.terminal = Some(input.clone());
        Ok(RecomputeOutcome { stream: input, stages_evaluated })
    }

    /// Remove a filter and bring the terminal stream up to date
    ///
    /// Removing the last filter falls back to the previous stage's cached
    /// output, or the base stream, without evaluating anything. Otherwise
    /// the following stage is marked dirty and the stack recomputes.
    pub fn delete_filter(
        &mut self,
        id: FilterId,
        store: &RecordStore,
        ctx: &EvalContext,
    ) -> Result<RecomputeOutcome, FilterError> {
        let pos = self.position(id)?;
        self.stages.remove(pos);
        tracing::info!("Deleted filter {}", id);

        if pos < self.stages.len() {
            self.stages[pos].dirty = true;
            return self.recompute(store, ctx);
        }

        let fallback = match self.stages.last() {
            Some(stage) if !stage.dirty => stage.output.clone(),
            Some(_) => None,
            None => self.base.clone(),
        };
        match fallback {
            Some(stream) => {
                self.terminal = Some(stream.clone());
                Ok(RecomputeOutcome { stream, stages_evaluated: 0 })
            }
            None => self.recompute(store, ctx),
        }
    }
}
