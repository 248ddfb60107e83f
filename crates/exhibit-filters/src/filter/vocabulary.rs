use exhibit_data::{AttributeDefinition, AttributeId, Record, Value};

use super::{percent, EvalContext, FilterState, RecordFilter};

/// Passes records carrying at least one selected term
///
/// Starts with every legend term, children included, selected. Each
/// passing record counts toward the first selected term it carries.
#[derive(Debug, Clone)]
pub struct VocabularyFilter {
    attribute: AttributeId,
    terms: Vec<String>,
    selected: Vec<String>,
    /// Selection captured at `eval_prep`, sorted for lookup
    active: Vec<String>,
    counters: Vec<usize>,
    shares: Vec<(String, u32)>,
}

impl VocabularyFilter {
    pub fn new(def: &AttributeDefinition) -> Self {
        let terms: Vec<String> = def
            .legend
            .iter()
            .flat_map(|entry| {
                std::iter::once(entry.label.clone())
                    .chain(entry.children.iter().map(|child| child.label.clone()))
            })
            .collect();
        Self {
            attribute: def.id.clone(),
            selected: terms.clone(),
            terms,
            active: Vec::new(),
            counters: Vec::new(),
            shares: Vec::new(),
        }
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// Legend terms in legend order
    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn select(&mut self, selected: Vec<String>) {
        self.selected = selected;
    }

    pub fn state(&self) -> FilterState {
        FilterState::Vocabulary { selected: self.selected.clone() }
    }

    /// Percentage of evaluated records counted toward each selected term
    /// during the last pass
    pub fn shares(&self) -> &[(String, u32)] {
        &self.shares
    }
}

impl RecordFilter for VocabularyFilter {
    fn eval_prep(&mut self, _ctx: &EvalContext) {
        self.active = self.selected.clone();
        self.active.sort();
        self.active.dedup();
        self.counters = vec![0; self.active.len()];
    }

    fn eval(&mut self, record: &Record) -> bool {
        if self.active.is_empty() {
            return false;
        }
        let Some(Value::Vocabulary(terms)) = record.value(&self.attribute) else {
            return false;
        };
        for term in terms {
            if let Ok(pos) = self.active.binary_search(term) {
                self.counters[pos] += 1;
                return true;
            }
        }
        false
    }

    fn eval_done(&mut self, total: usize) {
        self.shares = self
            .active
            .iter()
            .zip(&self.counters)
            .map(|(term, &count)| (term.clone(), percent(count, total)))
            .collect();
    }
}
