//! Highlight filters over a visualization's rendered records

use exhibit_core::{AbsoluteIndex, IndexStream, SelectionBitmap};
use exhibit_data::RecordStore;

use crate::filter::{EvalContext, RecordFilter};
use crate::FilterError;

/// Records that were rendered and satisfy `filter`, in stream order
///
/// Only templates flagged as used in the bitmap are visited, and only
/// records whose render bit is set are evaluated. `eval_done` receives the
/// full stream length.
pub fn apply_highlight<F: RecordFilter + ?Sized>(
    filter: &mut F,
    bitmap: &SelectionBitmap,
    stream: &IndexStream,
    store: &RecordStore,
    ctx: &EvalContext,
) -> Result<Vec<AbsoluteIndex>, FilterError> {
    filter.eval_prep(ctx);
    let mut selected = Vec::new();

    for (template, indices) in stream.iter_templates() {
        if !bitmap.template_used(template) {
            continue;
        }
        for &index in indices {
            if bitmap.test(index) && filter.eval(store.record_at(index)?) {
                selected.push(index);
            }
        }
    }

    filter.eval_done(stream.len());
    tracing::debug!("Highlighted {} of {} rendered records", selected.len(), bitmap.count());
    Ok(selected)
}
