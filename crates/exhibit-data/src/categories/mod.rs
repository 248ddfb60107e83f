//! Category construction for legends, histograms and sorting
//!
//! Categories come either from an attribute's legend or from evenly spaced
//! steps over its declared range. Number and Dates category bounds are
//! monotonic and non-overlapping, with the undefined category (when
//! present) always first.

mod fill;
mod order;

pub use order::{OrderEntry, SortValue};

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use exhibit_core::AbsoluteIndex;

use crate::config::EngineConfig;
use crate::dates::PartialDate;
use crate::records::RecordStore;
use crate::schema::{
    AttributeCatalog, AttributeDefinition, AttributeRange, AttributeType, LegendData,
};
use crate::value::format_number;
use crate::DataError;

/// Upper limit on computed categories for one attribute
pub const MAX_RANGE_CATEGORIES: usize = 10_000;

/// Legend position used to restrict which categories are built
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LegendRef {
    Undefined,
    Entry(usize),
    Child(usize, usize),
}

/// How a value is matched to a category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MatchRule {
    /// The explicit undefined value
    Undefined,
    /// Text containing the pattern
    Substring(String),
    /// Vocabulary term or tag equal to the label
    Term(String),
    /// `min <= v <= max`, or `min <= v < max` when `max_inclusive` is false
    Number { min: f64, max: f64, max_inclusive: bool },
    /// Start day in `[start, end)`
    Date { start: NaiveDate, end: NaiveDate },
}

impl MatchRule {
    fn number_contains(&self, v: f64) -> bool {
        match *self {
            MatchRule::Number { min, max, max_inclusive } => {
                min <= v && (v < max || (max_inclusive && v == max))
            }
            _ => false,
        }
    }

    fn date_contains(&self, day: NaiveDate) -> bool {
        match *self {
            MatchRule::Date { start, end } => start <= day && day < end,
            _ => false,
        }
    }
}

/// Labeled bucket of records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub label: String,
    pub color: String,
    pub rule: MatchRule,
    /// Member records, when collected
    pub members: Option<Vec<AbsoluteIndex>>,
}

impl Category {
    fn new(label: impl Into<String>, color: impl Into<String>, rule: MatchRule, with_members: bool) -> Self {
        Self {
            label: label.into(),
            color: color.into(),
            rule,
            members: with_members.then(Vec::new),
        }
    }

    pub fn member_count(&self) -> usize {
        self.members.as_ref().map(Vec::len).unwrap_or(0)
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self.rule, MatchRule::Undefined)
    }

    fn push(&mut self, index: AbsoluteIndex) {
        self.members.get_or_insert_with(Vec::new).push(index);
    }
}

/// Builds and fills categories over a loaded record store
pub struct CategoryBinner<'a> {
    store: &'a RecordStore,
    catalog: &'a AttributeCatalog,
    neutral_color: String,
    today: NaiveDate,
}

impl<'a> CategoryBinner<'a> {
    pub fn new(store: &'a RecordStore, catalog: &'a AttributeCatalog, config: &EngineConfig) -> Self {
        Self {
            store,
            catalog,
            neutral_color: config.neutral_color.clone(),
            today: config.today(),
        }
    }

    /// Day that open-ended ranges run to
    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub(crate) fn attribute(&self, id: &str) -> Result<&'a AttributeDefinition, DataError> {
        self.catalog
            .get(id)
            .ok_or_else(|| DataError::Lookup(format!("unknown attribute '{}'", id)))
    }

    /// One category per legend entry
    ///
    /// Vocabulary children follow their parent, inheriting its color when
    /// they have none. `allowed` keeps only the listed legend positions.
    pub fn legend_categories(
        &self,
        attribute: &str,
        allowed: Option<&[LegendRef]>,
        include_undefined: bool,
    ) -> Result<Vec<Category>, DataError> {
        let def = self.attribute(attribute)?;
        let permitted = |r: LegendRef| allowed.map_or(true, |list| list.contains(&r));
        let mut categories = Vec::new();

        if include_undefined && permitted(LegendRef::Undefined) {
            if let Some(category) = undefined_category(def, true) {
                categories.push(category);
            }
        }

        for (i, entry) in def.legend.iter().enumerate() {
            let rule = match (def.kind, &entry.data) {
                (AttributeType::Text, LegendData::Pattern { pattern }) => {
                    MatchRule::Substring(pattern.clone())
                }
                (AttributeType::Text, _) => MatchRule::Substring(entry.label.clone()),
                (AttributeType::Vocabulary, _) | (AttributeType::Tags, _) => {
                    MatchRule::Term(entry.label.clone())
                }
                (AttributeType::Number, LegendData::Number { min, max }) => MatchRule::Number {
                    min: min.unwrap_or(f64::NEG_INFINITY),
                    max: max.unwrap_or(f64::INFINITY),
                    max_inclusive: true,
                },
                (AttributeType::Dates, LegendData::Dates { min, max }) => MatchRule::Date {
                    start: min.start()?,
                    end: self.exclusive_end(max.as_ref())?,
                },
                _ => {
                    tracing::warn!(
                        "Legend entry '{}' of '{}' does not fit the attribute type",
                        entry.label,
                        def.id
                    );
                    continue;
                }
            };

            if permitted(LegendRef::Entry(i)) {
                categories.push(Category::new(&entry.label, &entry.color, rule, true));
            }

            if def.kind == AttributeType::Vocabulary {
                for (j, child) in entry.children.iter().enumerate() {
                    if !permitted(LegendRef::Child(i, j)) {
                        continue;
                    }
                    let color = entry.child_color(j).unwrap_or(entry.color.as_str());
                    categories.push(Category::new(
                        &child.label,
                        color,
                        MatchRule::Term(child.label.clone()),
                        true,
                    ));
                }
            }
        }

        tracing::debug!("{} legend categories for '{}'", categories.len(), def.id);
        Ok(categories)
    }

    /// Evenly stepped categories over the declared range
    ///
    /// Returns `None` when the attribute lacks the bounds to compute a span.
    /// Text and Vocabulary attributes have no range and get their legend
    /// categories; Tags attributes start empty and are built by `fill`.
    pub fn computed_range_categories(
        &self,
        attribute: &str,
        with_members: bool,
        include_undefined: bool,
    ) -> Result<Option<Vec<Category>>, DataError> {
        let def = self.attribute(attribute)?;
        let mut categories = match def.kind {
            AttributeType::Text | AttributeType::Vocabulary => {
                self.legend_categories(attribute, None, false)?
            }
            AttributeType::Tags => Vec::new(),
            AttributeType::Number => match self.number_steps(def)? {
                Some(steps) => steps,
                None => return Ok(None),
            },
            AttributeType::Dates => match self.date_steps(def)? {
                Some(steps) => steps,
                None => return Ok(None),
            },
            _ => return Ok(None),
        };

        if include_undefined {
            if let Some(category) = undefined_category(def, with_members) {
                categories.insert(0, category);
            }
        }
        if !with_members {
            categories.iter_mut().for_each(|c| c.members = None);
        }

        tracing::debug!("{} range categories for '{}'", categories.len(), def.id);
        Ok(Some(categories))
    }

    fn number_steps(&self, def: &AttributeDefinition) -> Result<Option<Vec<Category>>, DataError> {
        let Some((min, max, granularity)) = def.number_bounds() else {
            return Ok(None);
        };
        let step = 10f64.powi(granularity);
        if !step.is_finite() || step <= 0.0 || max < min {
            return Ok(None);
        }
        let count = ((max - min) / step).floor() as usize + 1;
        if count > MAX_RANGE_CATEGORIES {
            tracing::warn!("'{}' would need {} range categories", def.id, count);
            return Ok(None);
        }

        let categories = (0..count)
            .map(|k| {
                let lo = min + step * k as f64;
                let last = k + 1 == count;
                let shown_max = (lo + step - 1.0).min(max);
                let mut label = format_number(lo);
                if step > 1.0 && label.len() < 4 && lo != shown_max {
                    label = format!("{}-{}", label, format_number(shown_max));
                }
                let color = def
                    .legend
                    .iter()
                    .find(|entry| match entry.data {
                        LegendData::Number { min, max } => {
                            min.map_or(true, |m| lo >= m) && max.map_or(true, |m| lo <= m)
                        }
                        _ => false,
                    })
                    .map_or(self.neutral_color.as_str(), |entry| entry.color.as_str());
                let rule = if last {
                    MatchRule::Number { min: lo, max, max_inclusive: true }
                } else {
                    MatchRule::Number { min: lo, max: lo + step, max_inclusive: false }
                };
                Category::new(label, color, rule, true)
            })
            .collect();
        Ok(Some(categories))
    }

    fn date_steps(&self, def: &AttributeDefinition) -> Result<Option<Vec<Category>>, DataError> {
        let Some(AttributeRange::Dates { min: Some(min), max, granularity }) = &def.range else {
            return Ok(None);
        };
        // Buckets never reach past today, whatever the declared max
        let last_day = match max {
            Some(max) => max.end()?.min(self.today),
            None => self.today,
        };
        let clamp = self.day_after(self.today)?;

        let mut legend_spans = Vec::new();
        for entry in &def.legend {
            if let LegendData::Dates { min, max } = &entry.data {
                let end = match max {
                    Some(max) => max.end()?,
                    None => self.today,
                };
                legend_spans.push((min.start()?, end, entry.color.as_str()));
            }
        }

        let mut categories = Vec::new();
        let first = min.start()?;
        let mut current = first;
        while current <= last_day {
            if categories.len() >= MAX_RANGE_CATEGORIES {
                tracing::warn!("'{}' exceeds {} range categories", def.id, MAX_RANGE_CATEGORIES);
                return Ok(None);
            }
            let next = granularity.step(first, categories.len() as u32 + 1)?.min(clamp);
            let color = legend_spans
                .iter()
                .find(|(start, end, _)| *start <= current && current <= *end)
                .map_or(self.neutral_color.as_str(), |(_, _, color)| *color);
            categories.push(Category::new(
                granularity.label(current),
                color,
                MatchRule::Date { start: current, end: next },
                true,
            ));
            current = next;
        }
        Ok(Some(categories))
    }

    fn day_after(&self, day: NaiveDate) -> Result<NaiveDate, DataError> {
        day.checked_add_days(Days::new(1))
            .ok_or_else(|| DataError::DataFormat(format!("no day after {}", day)))
    }

    /// Exclusive end of a legend date range; open ranges end after today
    fn exclusive_end(&self, max: Option<&PartialDate>) -> Result<NaiveDate, DataError> {
        let last = match max {
            Some(max) => max.end()?,
            None => self.today,
        };
        self.day_after(last)
    }
}

fn undefined_category(def: &AttributeDefinition, with_members: bool) -> Option<Category> {
    let spec = def.undefined.as_ref()?;
    matches!(def.kind, AttributeType::Number | AttributeType::Dates)
        .then(|| Category::new("?", &spec.color, MatchRule::Undefined, with_members))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::DateGranularity;
    use crate::schema::{LegendChild, LegendEntry, UndefinedSpec};

    fn attribute(id: &str, kind: AttributeType) -> AttributeDefinition {
        AttributeDefinition {
            id: id.to_string(),
            label: id.to_string(),
            kind,
            legend: Vec::new(),
            range: None,
            undefined: None,
            delimiter: None,
        }
    }

    fn binner_for<'a>(store: &'a RecordStore, catalog: &'a AttributeCatalog) -> CategoryBinner<'a> {
        let config = EngineConfig::default()
            .with_today(NaiveDate::from_ymd_opt(2020, 6, 15).unwrap());
        CategoryBinner::new(store, catalog, &config)
    }

    #[test]
    fn test_number_steps_of_ten() {
        let mut size = attribute("size", AttributeType::Number);
        size.range = Some(AttributeRange::Number { min: Some(0.0), max: Some(99.0), granularity: 1 });
        let catalog = AttributeCatalog::new(vec![size]).unwrap();
        let store = RecordStore::default();
        let binner = binner_for(&store, &catalog);

        let categories = binner.computed_range_categories("size", true, true).unwrap().unwrap();
        let labels: Vec<_> = categories.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(
            labels,
            vec!["0-9", "10-19", "20-29", "30-39", "40-49", "50-59", "60-69", "70-79", "80-89", "90-99"]
        );
        assert!(categories.iter().all(|c| c.color == "#777777"));
    }

    #[test]
    fn test_missing_bounds_yield_none() {
        let mut size = attribute("size", AttributeType::Number);
        size.range = Some(AttributeRange::Number { min: Some(0.0), max: None, granularity: 0 });
        let catalog = AttributeCatalog::new(vec![size, attribute("when", AttributeType::Dates)]).unwrap();
        let store = RecordStore::default();
        let binner = binner_for(&store, &catalog);

        assert!(binner.computed_range_categories("size", false, false).unwrap().is_none());
        assert!(binner.computed_range_categories("when", false, false).unwrap().is_none());
        assert!(binner.computed_range_categories("nope", false, false).is_err());
    }

    #[test]
    fn test_decade_buckets_take_legend_color() {
        let mut when = attribute("when", AttributeType::Dates);
        when.range = Some(AttributeRange::Dates {
            min: Some(PartialDate::year(1900)),
            max: Some(PartialDate::year(1999)),
            granularity: DateGranularity::Decade,
        });
        when.legend = vec![LegendEntry {
            label: "Early".to_string(),
            color: "#ff0000".to_string(),
            data: LegendData::Dates { min: PartialDate::year(1900), max: Some(PartialDate::year(1950)) },
            children: Vec::new(),
        }];
        let catalog = AttributeCatalog::new(vec![when]).unwrap();
        let store = RecordStore::default();
        let binner = binner_for(&store, &catalog);

        let categories = binner.computed_range_categories("when", false, false).unwrap().unwrap();
        assert_eq!(categories.len(), 10);
        assert_eq!(categories[2].label, "1920");
        assert_eq!(categories[2].color, "#ff0000");
        assert_eq!(categories[5].color, "#ff0000");
        assert_eq!(categories[7].label, "1970");
        assert_eq!(categories[7].color, "#777777");
        assert!(categories.iter().all(|c| c.members.is_none()));
    }

    #[test]
    fn test_open_range_clamps_to_today() {
        let mut when = attribute("when", AttributeType::Dates);
        when.range = Some(AttributeRange::Dates {
            min: Some(PartialDate::year(2018)),
            max: None,
            granularity: DateGranularity::Year,
        });
        when.undefined = Some(UndefinedSpec { label: "?".to_string(), color: "#000000".to_string() });
        let catalog = AttributeCatalog::new(vec![when]).unwrap();
        let store = RecordStore::default();
        let binner = binner_for(&store, &catalog);

        let categories = binner.computed_range_categories("when", true, true).unwrap().unwrap();
        let labels: Vec<_> = categories.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["?", "2018", "2019", "2020"]);
        assert_eq!(
            categories[3].rule,
            MatchRule::Date {
                start: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
                end: NaiveDate::from_ymd_opt(2020, 6, 16).unwrap(),
            }
        );
    }

    #[test]
    fn test_bce_month_buckets() {
        let mut when = attribute("when", AttributeType::Dates);
        when.range = Some(AttributeRange::Dates {
            min: Some(PartialDate::ym(-1, 11)),
            max: Some(PartialDate::ym(0, 2)),
            granularity: DateGranularity::Month,
        });
        let catalog = AttributeCatalog::new(vec![when]).unwrap();
        let store = RecordStore::default();
        let binner = binner_for(&store, &catalog);

        let categories = binner.computed_range_categories("when", false, false).unwrap().unwrap();
        let labels: Vec<_> = categories.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["-1-11", "-1-12", "0-1", "0-2"]);
        assert_eq!(
            categories[3].rule,
            MatchRule::Date {
                start: NaiveDate::from_ymd_opt(0, 2, 1).unwrap(),
                end: NaiveDate::from_ymd_opt(0, 3, 1).unwrap(),
            }
        );
    }

    #[test]
    fn test_month_buckets_align_to_month_starts() {
        let mut when = attribute("when", AttributeType::Dates);
        when.range = Some(AttributeRange::Dates {
            min: Some(PartialDate::ymd(2019, 1, 31)),
            max: Some(PartialDate::ym(2019, 5)),
            granularity: DateGranularity::Month,
        });
        let catalog = AttributeCatalog::new(vec![when]).unwrap();
        let store = RecordStore::default();
        let binner = binner_for(&store, &catalog);

        let categories = binner.computed_range_categories("when", false, false).unwrap().unwrap();
        let labels: Vec<_> = categories.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["2019-1", "2019-2", "2019-3", "2019-4", "2019-5"]);
        assert_eq!(
            categories[0].rule,
            MatchRule::Date {
                start: NaiveDate::from_ymd_opt(2019, 1, 31).unwrap(),
                end: NaiveDate::from_ymd_opt(2019, 2, 1).unwrap(),
            }
        );
        assert_eq!(
            categories[2].rule,
            MatchRule::Date {
                start: NaiveDate::from_ymd_opt(2019, 3, 1).unwrap(),
                end: NaiveDate::from_ymd_opt(2019, 4, 1).unwrap(),
            }
        );
        let march_fifth = NaiveDate::from_ymd_opt(2019, 3, 5).unwrap();
        let holder: Vec<_> = categories
            .iter()
            .filter(|c| c.rule.date_contains(march_fifth))
            .map(|c| c.label.as_str())
            .collect();
        assert_eq!(holder, vec!["2019-3"]);
        // Contiguous buckets
        for pair in categories.windows(2) {
            match (&pair[0].rule, &pair[1].rule) {
                (MatchRule::Date { end, .. }, MatchRule::Date { start, .. }) => assert_eq!(end, start),
                other => panic!("unexpected rules {:?}", other),
            }
        }
    }

    #[test]
    fn test_future_max_clamps_to_today() {
        let mut when = attribute("when", AttributeType::Dates);
        when.range = Some(AttributeRange::Dates {
            min: Some(PartialDate::year(2018)),
            max: Some(PartialDate::year(2030)),
            granularity: DateGranularity::Year,
        });
        let catalog = AttributeCatalog::new(vec![when]).unwrap();
        let store = RecordStore::default();
        let binner = binner_for(&store, &catalog);

        let categories = binner.computed_range_categories("when", false, false).unwrap().unwrap();
        let labels: Vec<_> = categories.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["2018", "2019", "2020"]);
        assert_eq!(
            categories[2].rule,
            MatchRule::Date {
                start: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
                end: NaiveDate::from_ymd_opt(2020, 6, 16).unwrap(),
            }
        );
    }

    #[test]
    fn test_vocabulary_children_and_allow_list() {
        let mut kind = attribute("kind", AttributeType::Vocabulary);
        kind.legend = vec![LegendEntry {
            label: "animal".to_string(),
            color: "#00ff00".to_string(),
            data: LegendData::Term,
            children: vec![
                LegendChild { label: "cat".to_string(), color: None },
                LegendChild { label: "dog".to_string(), color: Some("#0000ff".to_string()) },
            ],
        }];
        let catalog = AttributeCatalog::new(vec![kind]).unwrap();
        let store = RecordStore::default();
        let binner = binner_for(&store, &catalog);

        let all = binner.legend_categories("kind", None, true).unwrap();
        let pairs: Vec<_> = all.iter().map(|c| (c.label.as_str(), c.color.as_str())).collect();
        assert_eq!(pairs, vec![("animal", "#00ff00"), ("cat", "#00ff00"), ("dog", "#0000ff")]);

        let allowed = [LegendRef::Child(0, 1)];
        let some = binner.legend_categories("kind", Some(&allowed), true).unwrap();
        assert_eq!(some.len(), 1);
        assert_eq!(some[0].label, "dog");
    }
}
