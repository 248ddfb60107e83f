use exhibit_data::{AttributeId, Record, Value};

use super::{EvalContext, FilterState, RecordFilter};

/// Case folding applied to both sides of a comparison
fn fold(text: &str, case_sensitive: bool) -> String {
    if case_sensitive {
        text.to_string()
    } else {
        text.to_lowercase()
    }
}

/// Substring match on a Text attribute
///
/// An empty pattern passes everything, including records without a value.
#[derive(Debug, Clone)]
pub struct TextFilter {
    attribute: AttributeId,
    pattern: String,
    case_sensitive: bool,
    needle: String,
}

impl TextFilter {
    pub fn new(attribute: &str) -> Self {
        Self {
            attribute: attribute.to_string(),
            pattern: String::new(),
            case_sensitive: false,
            needle: String::new(),
        }
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    pub fn set(&mut self, pattern: String, case_sensitive: bool) {
        self.pattern = pattern;
        self.case_sensitive = case_sensitive;
    }

    pub fn state(&self) -> FilterState {
        FilterState::Text {
            pattern: self.pattern.clone(),
            case_sensitive: self.case_sensitive,
        }
    }
}

impl RecordFilter for TextFilter {
    fn eval_prep(&mut self, _ctx: &EvalContext) {
        self.needle = fold(&self.pattern, self.case_sensitive);
    }

    fn eval(&mut self, record: &Record) -> bool {
        if self.needle.is_empty() {
            return true;
        }
        match record.value(&self.attribute) {
            Some(Value::Text(text)) => fold(text, self.case_sensitive).contains(&self.needle),
            _ => false,
        }
    }
}

/// Match on any tag of a Tags attribute
#[derive(Debug, Clone)]
pub struct TagsFilter {
    attribute: AttributeId,
    pattern: String,
    case_sensitive: bool,
    partial: bool,
    needle: String,
}

impl TagsFilter {
    pub fn new(attribute: &str) -> Self {
        Self {
            attribute: attribute.to_string(),
            pattern: String::new(),
            case_sensitive: false,
            partial: false,
            needle: String::new(),
        }
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    pub fn set(&mut self, pattern: String, case_sensitive: bool, partial: bool) {
        self.pattern = pattern;
        self.case_sensitive = case_sensitive;
        self.partial = partial;
    }

    pub fn state(&self) -> FilterState {
        FilterState::Tags {
            pattern: self.pattern.clone(),
            case_sensitive: self.case_sensitive,
            partial: self.partial,
        }
    }

    fn matches(&self, tag: &str) -> bool {
        let tag = fold(tag, self.case_sensitive);
        if self.partial {
            tag.contains(&self.needle)
        } else {
            tag == self.needle
        }
    }
}

impl RecordFilter for TagsFilter {
    fn eval_prep(&mut self, _ctx: &EvalContext) {
        self.needle = fold(&self.pattern, self.case_sensitive);
    }

    fn eval(&mut self, record: &Record) -> bool {
        if self.needle.is_empty() {
            return true;
        }
        match record.value(&self.attribute) {
            Some(Value::Tags(tags)) => tags.iter().any(|tag| self.matches(tag)),
            _ => false,
        }
    }
}
