//! Routing records into categories

use ahash::AHashMap;
use chrono::NaiveDate;

use exhibit_core::{AbsoluteIndex, IndexStream, TemplateIndex};

use super::{Category, CategoryBinner, MatchRule};
use crate::schema::AttributeType;
use crate::value::{DateValue, NumberValue, Value};
use crate::DataError;

/// Places values into a category list
///
/// Number and Dates categories are located by binary search over their
/// lower bounds when those are ascending, so the input order of records
/// does not matter.
struct Router {
    kind: AttributeType,
    neutral_color: String,
    terms: AHashMap<String, usize>,
    offset: usize,
    ordered: bool,
}

impl Router {
    fn new(kind: AttributeType, categories: &[Category], neutral_color: &str) -> Self {
        let mut terms = AHashMap::new();
        for (i, category) in categories.iter().enumerate() {
            if let MatchRule::Term(term) = &category.rule {
                terms.entry(term.clone()).or_insert(i);
            }
        }
        let offset = usize::from(categories.first().is_some_and(Category::is_undefined));
        let ranged = &categories[offset..];
        let ordered = match kind {
            AttributeType::Number => {
                ranged.iter().all(|c| matches!(c.rule, MatchRule::Number { .. }))
                    && ranged.windows(2).all(|w| number_floor(&w[0]) <= number_floor(&w[1]))
            }
            AttributeType::Dates => {
                ranged.iter().all(|c| matches!(c.rule, MatchRule::Date { .. }))
                    && ranged.windows(2).all(|w| date_floor(&w[0]) <= date_floor(&w[1]))
            }
            _ => false,
        };
        if !ordered && matches!(kind, AttributeType::Number | AttributeType::Dates) {
            tracing::debug!("Categories not ascending; falling back to a linear scan");
        }

        Self {
            kind,
            neutral_color: neutral_color.to_string(),
            terms,
            offset,
            ordered,
        }
    }

    /// Route one record; returns true if it landed in at least one category
    fn place(&mut self, categories: &mut Vec<Category>, index: AbsoluteIndex, value: &Value) -> bool {
        match value {
            Value::Text(text) => {
                let hit = categories.iter_mut().find(|c| match &c.rule {
                    MatchRule::Substring(pattern) => text.contains(pattern.as_str()),
                    _ => false,
                });
                match hit {
                    Some(category) => {
                        category.push(index);
                        true
                    }
                    None => false,
                }
            }
            Value::Tags(tags) => {
                for tag in tags {
                    let slot = match self.terms.get(tag) {
                        Some(&slot) => slot,
                        None => {
                            categories.push(Category::new(
                                tag.as_str(),
                                self.neutral_color.as_str(),
                                MatchRule::Term(tag.clone()),
                                true,
                            ));
                            self.terms.insert(tag.clone(), categories.len() - 1);
                            categories.len() - 1
                        }
                    };
                    categories[slot].push(index);
                }
                !tags.is_empty()
            }
            Value::Vocabulary(terms) => {
                let mut placed = false;
                for term in terms {
                    if let Some(&slot) = self.terms.get(term) {
                        categories[slot].push(index);
                        placed = true;
                    }
                }
                placed
            }
            Value::Number(NumberValue::Undefined) | Value::Dates(DateValue::Undefined) => {
                self.place_undefined(categories, index)
            }
            Value::Number(NumberValue::Defined(v)) => {
                let v = *v;
                let ranged = &mut categories[self.offset..];
                let slot = if self.ordered {
                    let pos = ranged.partition_point(|c| number_floor(c) <= v);
                    pos.checked_sub(1).filter(|&p| ranged[p].rule.number_contains(v))
                } else {
                    ranged.iter().position(|c| c.rule.number_contains(v))
                };
                match slot {
                    Some(p) => {
                        ranged[p].push(index);
                        true
                    }
                    None => false,
                }
            }
            Value::Dates(DateValue::Span(span)) => {
                let day = span.first_day();
                let ranged = &mut categories[self.offset..];
                let slot = if self.ordered {
                    let pos = ranged.partition_point(|c| date_floor(c) <= day);
                    pos.checked_sub(1).filter(|&p| ranged[p].rule.date_contains(day))
                } else {
                    ranged.iter().position(|c| c.rule.date_contains(day))
                };
                match slot {
                    Some(p) => {
                        ranged[p].push(index);
                        true
                    }
                    None => false,
                }
            }
            _ => false,
        }
    }

    fn place_undefined(&self, categories: &mut [Category], index: AbsoluteIndex) -> bool {
        match categories.first_mut() {
            Some(first) if first.is_undefined() => {
                first.push(index);
                true
            }
            _ => false,
        }
    }

    /// Tags categories are listed alphabetically once collected
    fn finish(self, categories: &mut [Category]) {
        if self.kind == AttributeType::Tags {
            categories.sort_by(|a, b| a.label.cmp(&b.label));
        }
    }
}

fn number_floor(category: &Category) -> f64 {
    match category.rule {
        MatchRule::Number { min, .. } => min,
        _ => f64::NEG_INFINITY,
    }
}

fn date_floor(category: &Category) -> NaiveDate {
    match category.rule {
        MatchRule::Date { start, .. } => start,
        _ => NaiveDate::MIN,
    }
}

impl<'a> CategoryBinner<'a> {
    /// Put every record of the stream into the category matching its value
    ///
    /// With a `scope` only that template is visited; otherwise every
    /// template that declares `attribute` (and `secondary`, when given).
    /// Records without a value are skipped, as are undefined values when
    /// the first category is not the undefined one. Returns the number of
    /// records placed.
    pub fn fill(
        &self,
        categories: &mut Vec<Category>,
        attribute: &str,
        stream: &IndexStream,
        scope: Option<TemplateIndex>,
        secondary: Option<&str>,
    ) -> Result<usize, DataError> {
        let def = self.attribute(attribute)?;
        let mut router = Router::new(def.kind, categories, &self.neutral_color);
        let templates: Vec<TemplateIndex> = match scope {
            Some(t) => vec![t],
            None => (0..stream.template_count()).collect(),
        };

        let mut placed = 0;
        for template in templates {
            if !self.store.template_has_attribute(template, attribute) {
                continue;
            }
            if let Some(secondary) = secondary {
                if !self.store.template_has_attribute(template, secondary) {
                    continue;
                }
            }
            for &index in stream.template_slice(template) {
                let record = self.store.record_at(index)?;
                if let Some(value) = record.value(attribute) {
                    if router.place(categories, index, value) {
                        placed += 1;
                    }
                }
            }
        }

        router.finish(categories);
        tracing::debug!("Placed {} records by '{}'", placed, attribute);
        Ok(placed)
    }

    /// Split an existing category's members by a second attribute
    pub fn sub_categorize(
        &self,
        members: &[AbsoluteIndex],
        attribute: &str,
        sub_categories: &mut Vec<Category>,
    ) -> Result<usize, DataError> {
        let def = self.attribute(attribute)?;
        let mut router = Router::new(def.kind, sub_categories, &self.neutral_color);

        let mut placed = 0;
        for &index in members {
            let record = self.store.record_at(index)?;
            if let Some(value) = record.value(attribute) {
                if router.place(sub_categories, index, value) {
                    placed += 1;
                }
            }
        }

        router.finish(sub_categories);
        Ok(placed)
    }
}
