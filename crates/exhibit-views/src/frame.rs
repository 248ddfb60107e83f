//! Visualization frames
//!
//! A frame is one visualization instance. It owns the bitmap of records it
//! rendered in its last pass, the user's selection and an optional
//! highlight filter. None of these are shared with other frames.

use serde_json::Value as JsonValue;

use exhibit_core::{
    AbsoluteIndex, FrameId, IndexStream, RecordSelection, SelectionBitmap, TemplateIndex,
};
use exhibit_data::RecordStore;
use exhibit_filters::{apply_highlight, EvalContext, Filter, FilterError};

use crate::viz::{VizCapabilities, VizKind};

#[derive(Debug)]
pub struct VizFrame {
    id: FrameId,
    kind: VizKind,
    label: String,
    settings: JsonValue,
    bitmap: SelectionBitmap,
    selection: RecordSelection,
    highlight: Option<Filter>,
}

impl VizFrame {
    pub fn new(
        kind: VizKind,
        label: impl Into<String>,
        settings: JsonValue,
        record_count: usize,
        template_count: usize,
    ) -> Self {
        Self {
            id: FrameId::new_v4(),
            kind,
            label: label.into(),
            settings,
            bitmap: SelectionBitmap::new(record_count, template_count),
            selection: RecordSelection::new(),
            highlight: None,
        }
    }

    pub fn id(&self) -> FrameId {
        self.id
    }

    pub fn kind(&self) -> VizKind {
        self.kind
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn settings(&self) -> &JsonValue {
        &self.settings
    }

    pub fn capabilities(&self) -> VizCapabilities {
        self.kind.capabilities()
    }

    pub fn bitmap(&self) -> &SelectionBitmap {
        &self.bitmap
    }

    pub fn selection(&self) -> &RecordSelection {
        &self.selection
    }

    /// Clear render bits before drawing a new stream
    pub fn begin_render(&mut self) {
        self.bitmap.reset();
    }

    /// Record that `index` of `template` was drawn
    pub fn report_rendered(&mut self, template: TemplateIndex, index: AbsoluteIndex) -> bool {
        self.bitmap.mark_template_used(template);
        self.bitmap.set(index)
    }

    pub fn report_template_used(&mut self, template: TemplateIndex) {
        self.bitmap.mark_template_used(template);
    }

    /// Toggle a record in the selection; returns true if it is now selected
    ///
    /// Frames without selection support ignore the request.
    pub fn toggle_selection(&mut self, index: AbsoluteIndex) -> bool {
        if !self.capabilities().contains(VizCapabilities::SELECT) {
            tracing::warn!("{} frame '{}' does not support selection", self.kind.name(), self.label);
            return false;
        }
        self.selection.toggle(index)
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn set_highlight(&mut self, filter: Option<Filter>) {
        self.highlight = filter;
    }

    pub fn highlight(&self) -> Option<&Filter> {
        self.highlight.as_ref()
    }

    pub fn highlight_mut(&mut self) -> Option<&mut Filter> {
        self.highlight.as_mut()
    }

    /// Replace the selection with rendered records that pass the highlight
    /// filter; without a highlight filter the selection is cleared
    pub fn apply_highlight(
        &mut self,
        stream: &IndexStream,
        store: &RecordStore,
        ctx: &EvalContext,
    ) -> Result<&RecordSelection, FilterError> {
        match self.highlight.as_mut() {
            Some(filter) => {
                let selected = apply_highlight(filter, &self.bitmap, stream, store, ctx)?;
                self.selection.set(selected);
            }
            None => self.selection.clear(),
        }
        Ok(&self.selection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_reporting() {
        let mut frame = VizFrame::new(VizKind::Cards, "Cards", JsonValue::Null, 10, 2);
        assert!(frame.report_rendered(1, 7));
        assert!(!frame.report_rendered(1, 12));
        frame.report_template_used(0);
        assert!(frame.bitmap().test(7));
        assert_eq!(frame.bitmap().templates_used(), &[true, true]);

        frame.begin_render();
        assert_eq!(frame.bitmap().count(), 0);
        assert!(!frame.bitmap().template_used(1));
    }

    #[test]
    fn test_selection_needs_capability() {
        let mut cards = VizFrame::new(VizKind::Cards, "Cards", JsonValue::Null, 10, 1);
        assert!(cards.toggle_selection(3));
        assert!(!cards.toggle_selection(3));
        assert!(cards.selection().is_empty());

        let mut directory = VizFrame::new(VizKind::Directory, "Directory", JsonValue::Null, 10, 1);
        assert!(directory.toggle_selection(3));
        assert_eq!(directory.selection().as_slice(), &[3]);
    }
}
