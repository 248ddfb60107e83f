//! Per-visualization render and selection tracking
//!
//! Each visualization owns one `SelectionBitmap` recording which records it
//! actually rendered during its last pass, and one `RecordSelection` holding
//! the records the user picked. Neither is shared between visualizations.

use crate::stream::{AbsoluteIndex, TemplateIndex};
use roaring::RoaringBitmap;

/// Fixed-size bit vector over absolute record indices
#[derive(Debug, Clone, Default)]
pub struct SelectionBitmap {
    bits: RoaringBitmap,
    capacity: usize,
    templates_used: Vec<bool>,
}

impl SelectionBitmap {
    /// Bitmap for `capacity` records spread over `template_count` templates
    pub fn new(capacity: usize, template_count: usize) -> Self {
        Self {
            bits: RoaringBitmap::new(),
            capacity,
            templates_used: vec![false; template_count],
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Clear every bit and template flag before a render pass
    pub fn reset(&mut self) {
        self.bits.clear();
        self.templates_used.iter_mut().for_each(|used| *used = false);
    }

    /// Set the bit for `index`; returns false if the index is out of range
    pub fn set(&mut self, index: AbsoluteIndex) -> bool {
        match self.slot(index) {
            Some(slot) => {
                self.bits.insert(slot);
                true
            }
            None => {
                tracing::warn!("Render bit {} outside bitmap of {} records", index, self.capacity);
                false
            }
        }
    }

    pub fn test(&self, index: AbsoluteIndex) -> bool {
        self.slot(index).is_some_and(|slot| self.bits.contains(slot))
    }

    pub fn clear(&mut self, index: AbsoluteIndex) {
        if let Some(slot) = self.slot(index) {
            self.bits.remove(slot);
        }
    }

    /// Number of bits set
    pub fn count(&self) -> usize {
        self.bits.len() as usize
    }

    /// Set indices in ascending order
    pub fn iter(&self) -> impl Iterator<Item = AbsoluteIndex> + '_ {
        self.bits.iter().map(|slot| slot as AbsoluteIndex)
    }

    pub fn mark_template_used(&mut self, template: TemplateIndex) {
        if template >= self.templates_used.len() {
            self.templates_used.resize(template + 1, false);
        }
        self.templates_used[template] = true;
    }

    pub fn template_used(&self, template: TemplateIndex) -> bool {
        self.templates_used.get(template).copied().unwrap_or(false)
    }

    pub fn templates_used(&self) -> &[bool] {
        &self.templates_used
    }

    fn slot(&self, index: AbsoluteIndex) -> Option<u32> {
        if index < self.capacity {
            u32::try_from(index).ok()
        } else {
            None
        }
    }
}

/// Records selected by the user, kept in ascending absolute-index order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordSelection {
    selected: Vec<AbsoluteIndex>,
}

impl RecordSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_selected(&self, index: AbsoluteIndex) -> bool {
        self.selected.binary_search(&index).is_ok()
    }

    /// Add the record if absent, remove it if present.
    /// Returns true if the record was added.
    pub fn toggle(&mut self, index: AbsoluteIndex) -> bool {
        match self.selected.binary_search(&index) {
            Ok(pos) => {
                self.selected.remove(pos);
                false
            }
            Err(pos) => {
                self.selected.insert(pos, index);
                true
            }
        }
    }

    /// Replace the selection
    pub fn set(&mut self, mut indices: Vec<AbsoluteIndex>) {
        indices.sort_unstable();
        indices.dedup();
        self.selected = indices;
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    pub fn as_slice(&self) -> &[AbsoluteIndex] {
        &self.selected
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }
}
