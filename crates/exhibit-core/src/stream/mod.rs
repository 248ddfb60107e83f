//! Index streams: the visible subset of records, partitioned by template
//!
//! A stream is an ordered list of absolute record indices plus one run per
//! template describing which slice of that list belongs to the template.
//! Every visualization consumes streams; every filter stage produces one.

mod builder;
mod sets;
mod subscriber;

pub use builder::StreamBuilder;
pub use sets::{intersect, union};
pub use subscriber::{StreamSubscriber, SubscriberList};

use serde::{Deserialize, Serialize};

/// Dense, session-stable record number
pub type AbsoluteIndex = usize;

/// Position of a template in declaration order
pub type TemplateIndex = usize;

/// Slice of a stream (or of the absolute numbering) owned by one template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateRun {
    /// Offset of the first entry
    pub start: usize,
    /// Number of entries
    pub len: usize,
}

impl TemplateRun {
    pub fn new(start: usize, len: usize) -> Self {
        Self { start, len }
    }

    /// One past the last entry
    pub fn end(&self) -> usize {
        self.start + self.len
    }

    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end()
    }
}

/// Ordered record indices with a per-template run table
///
/// Invariant: the run lengths sum to the number of indices and the runs tile
/// the index list in template order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexStream {
    indices: Vec<AbsoluteIndex>,
    runs: Vec<TemplateRun>,
}

impl IndexStream {
    /// Stream containing every record, given each template's absolute extent
    /// in declaration order.
    pub fn full(extents: &[TemplateRun]) -> Self {
        let total: usize = extents.iter().map(|e| e.len).sum();
        debug_assert!(
            extents.windows(2).all(|w| w[0].end() == w[1].start),
            "template extents must be contiguous"
        );

        Self {
            indices: (0..total).collect(),
            runs: extents.to_vec(),
        }
    }

    /// Zero-length stream with an empty run table
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn from_parts(indices: Vec<AbsoluteIndex>, runs: Vec<TemplateRun>) -> Self {
        debug_assert_eq!(
            runs.iter().map(|r| r.len).sum::<usize>(),
            indices.len(),
            "run lengths must cover the stream"
        );
        Self { indices, runs }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn indices(&self) -> &[AbsoluteIndex] {
        &self.indices
    }

    pub fn runs(&self) -> &[TemplateRun] {
        &self.runs
    }

    pub fn template_count(&self) -> usize {
        self.runs.len()
    }

    pub fn run(&self, template: TemplateIndex) -> Option<TemplateRun> {
        self.runs.get(template).copied()
    }

    /// Offset of the template's first entry, or `None` when the template
    /// contributes nothing to this stream.
    pub fn first_run_start(&self, template: TemplateIndex) -> Option<usize> {
        match self.runs.get(template) {
            Some(run) if run.len > 0 => Some(run.start),
            _ => None,
        }
    }

    /// Indices belonging to one template (empty if the template is unknown)
    pub fn template_slice(&self, template: TemplateIndex) -> &[AbsoluteIndex] {
        match self.runs.get(template) {
            Some(run) => &self.indices[run.start..run.end()],
            None => &[],
        }
    }

    /// Per-template slices in declaration order
    pub fn iter_templates(&self) -> impl Iterator<Item = (TemplateIndex, &[AbsoluteIndex])> + '_ {
        self.runs
            .iter()
            .enumerate()
            .map(move |(t, run)| (t, &self.indices[run.start..run.end()]))
    }

    pub fn contains(&self, index: AbsoluteIndex) -> bool {
        self.indices.contains(&index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extents() -> Vec<TemplateRun> {
        vec![TemplateRun::new(0, 3), TemplateRun::new(3, 0), TemplateRun::new(3, 2)]
    }

    #[test]
    fn test_full_stream_matches_extents() {
        let stream = IndexStream::full(&extents());

        assert_eq!(stream.len(), 5);
        assert_eq!(stream.indices(), &[0, 1, 2, 3, 4]);
        assert_eq!(stream.runs(), extents().as_slice());
        assert_eq!(stream.template_slice(2), &[3, 4]);
    }

    #[test]
    fn test_empty_stream_has_no_runs() {
        let stream = IndexStream::empty();
        assert!(stream.is_empty());
        assert_eq!(stream.template_count(), 0);
        assert_eq!(stream.first_run_start(0), None);
    }

    #[test]
    fn test_first_run_start_skips_empty_templates() {
        let stream = IndexStream::full(&extents());
        assert_eq!(stream.first_run_start(0), Some(0));
        assert_eq!(stream.first_run_start(1), None);
        assert_eq!(stream.first_run_start(2), Some(3));
        assert_eq!(stream.first_run_start(7), None);
    }
}
