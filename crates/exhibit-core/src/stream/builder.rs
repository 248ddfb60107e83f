//! Incremental construction of index streams

use super::{AbsoluteIndex, IndexStream, TemplateRun};

/// Appends indices template by template, closing one run per template
#[derive(Debug, Default)]
pub struct StreamBuilder {
    indices: Vec<AbsoluteIndex>,
    runs: Vec<TemplateRun>,
    run_start: usize,
}

impl StreamBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder whose index buffer can hold `capacity` entries without growing
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            indices: Vec::with_capacity(capacity),
            runs: Vec::new(),
            run_start: 0,
        }
    }

    /// Append an index to the currently open run
    pub fn push(&mut self, index: AbsoluteIndex) {
        self.indices.push(index);
    }

    pub fn extend_from_slice(&mut self, indices: &[AbsoluteIndex]) {
        self.indices.extend_from_slice(indices);
    }

    /// Length of the currently open run
    pub fn open_run_len(&self) -> usize {
        self.indices.len() - self.run_start
    }

    /// Close the open run (possibly empty) and start the next template's run
    pub fn close_run(&mut self) {
        let len = self.open_run_len();
        self.runs.push(TemplateRun::new(self.run_start, len));
        self.run_start = self.indices.len();
    }

    /// Number of runs closed so far
    pub fn runs_closed(&self) -> usize {
        self.runs.len()
    }

    /// Finish the stream. Entries pushed after the last `close_run` are
    /// folded into a final run.
    pub fn finish(mut self) -> IndexStream {
        if self.open_run_len() > 0 {
            self.close_run();
        }
        IndexStream::from_parts(self.indices, self.runs)
    }
}
