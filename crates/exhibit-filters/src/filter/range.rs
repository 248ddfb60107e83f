//! Number and Dates range filters
//!
//! Both keep one counter per computed range category and turn the counts
//! into histogram percentages at `eval_done`.

use chrono::{Days, NaiveDate};

use exhibit_data::{
    AttributeDefinition, AttributeId, AttributeRange, Category, CategoryBinner, DateEnd,
    DateValue, MatchRule, NumberValue, Record, Value,
};

use super::{percent, EvalContext, FilterState, RecordFilter};
use crate::validation::{parse_date_bounds, parse_number_bounds};
use crate::{FilterError, ValidationError};

/// Category counters and the percentages of the last pass
#[derive(Debug, Clone, Default)]
struct Histogram {
    categories: Vec<Category>,
    counters: Vec<usize>,
    shares: Vec<(String, u32)>,
}

impl Histogram {
    fn new(categories: Vec<Category>) -> Self {
        Self { categories, counters: Vec::new(), shares: Vec::new() }
    }

    fn reset(&mut self) {
        self.counters = vec![0; self.categories.len()];
    }

    /// Count into the last category whose lower bound is at or below the key
    fn count_by<K: PartialOrd>(&mut self, key: K, lower: impl Fn(&MatchRule) -> Option<K>, contains: impl Fn(&MatchRule, &K) -> bool) {
        let pos = self
            .categories
            .partition_point(|c| lower(&c.rule).map_or(false, |lo| lo <= key));
        if let Some(slot) = pos.checked_sub(1) {
            if contains(&self.categories[slot].rule, &key) {
                self.counters[slot] += 1;
            }
        }
    }

    fn finish(&mut self, total: usize) {
        self.shares = self
            .categories
            .iter()
            .zip(&self.counters)
            .map(|(c, &count)| (c.label.clone(), percent(count, total)))
            .collect();
    }
}

fn number_lower(rule: &MatchRule) -> Option<f64> {
    match *rule {
        MatchRule::Number { min, .. } => Some(min),
        _ => None,
    }
}

fn number_contains(rule: &MatchRule, v: &f64) -> bool {
    match *rule {
        MatchRule::Number { min, max, max_inclusive } => {
            min <= *v && (*v < max || (max_inclusive && *v == max))
        }
        _ => false,
    }
}

fn date_lower(rule: &MatchRule) -> Option<NaiveDate> {
    match *rule {
        MatchRule::Date { start, .. } => Some(start),
        _ => None,
    }
}

fn date_contains(rule: &MatchRule, day: &NaiveDate) -> bool {
    match *rule {
        MatchRule::Date { start, end } => start <= *day && *day < end,
        _ => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct NumberParams {
    min: f64,
    max: f64,
    allow_undefined: bool,
}

/// Inclusive bounds on a Number attribute
#[derive(Debug, Clone)]
pub struct NumberFilter {
    attribute: AttributeId,
    declared_min: Option<f64>,
    declared_max: Option<f64>,
    undefined_permitted: bool,
    params: NumberParams,
    active: NumberParams,
    histogram: Histogram,
}

impl NumberFilter {
    /// Defaults to the span of the range categories, or the declared range
    pub fn new(def: &AttributeDefinition, binner: &CategoryBinner<'_>) -> Result<Self, FilterError> {
        let categories = binner
            .computed_range_categories(&def.id, false, false)?
            .unwrap_or_default();
        let (declared_min, declared_max) = match def.range {
            Some(AttributeRange::Number { min, max, .. }) => (min, max),
            _ => (None, None),
        };

        let first = categories.first().and_then(|c| number_lower(&c.rule));
        let last = categories.last().and_then(|c| match c.rule {
            MatchRule::Number { max, .. } => Some(max),
            _ => None,
        });
        let params = NumberParams {
            min: first.or(declared_min).unwrap_or(f64::NEG_INFINITY),
            max: last.or(declared_max).unwrap_or(f64::INFINITY),
            allow_undefined: false,
        };

        Ok(Self {
            attribute: def.id.clone(),
            declared_min,
            declared_max,
            undefined_permitted: def.allows_undefined(),
            params,
            active: params,
            histogram: Histogram::new(categories),
        })
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    pub fn bounds(&self) -> (f64, f64) {
        (self.params.min, self.params.max)
    }

    pub fn set_bounds(&mut self, min: f64, max: f64) -> Result<(), ValidationError> {
        if let Some(lowest) = self.declared_min {
            if min < lowest {
                return Err(ValidationError::BelowMinimum {
                    field: "lower bound",
                    value: min.to_string(),
                    min: lowest.to_string(),
                });
            }
        }
        if let Some(highest) = self.declared_max {
            if max > highest {
                return Err(ValidationError::AboveMaximum {
                    field: "upper bound",
                    value: max.to_string(),
                    max: highest.to_string(),
                });
            }
        }
        if min > max {
            return Err(ValidationError::Inverted { from: min.to_string(), to: max.to_string() });
        }
        self.params.min = min;
        self.params.max = max;
        Ok(())
    }

    /// Set bounds from user-entered text
    pub fn set_bounds_from_input(&mut self, from: &str, to: &str) -> Result<(), ValidationError> {
        let (min, max) = parse_number_bounds(from, to, self.declared_min, self.declared_max)?;
        self.set_bounds(min, max)
    }

    /// Ignored unless the attribute declares an undefined value
    pub fn set_allow_undefined(&mut self, allow: bool) {
        self.params.allow_undefined = allow && self.undefined_permitted;
    }

    pub fn state(&self) -> FilterState {
        FilterState::Number {
            min: self.params.min,
            max: self.params.max,
            allow_undefined: self.params.allow_undefined,
        }
    }

    /// Category labels with their share of the last pass, in percent
    pub fn histogram(&self) -> &[(String, u32)] {
        &self.histogram.shares
    }
}

impl RecordFilter for NumberFilter {
    fn eval_prep(&mut self, _ctx: &EvalContext) {
        self.active = self.params;
        self.histogram.reset();
    }

    fn eval(&mut self, record: &Record) -> bool {
        match record.value(&self.attribute) {
            Some(Value::Number(NumberValue::Undefined)) => self.active.allow_undefined,
            Some(Value::Number(NumberValue::Defined(v))) => {
                let v = *v;
                if v < self.active.min || v > self.active.max {
                    return false;
                }
                self.histogram.count_by(v, number_lower, number_contains);
                true
            }
            _ => false,
        }
    }

    fn eval_done(&mut self, total: usize) {
        self.histogram.finish(total);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct DateParams {
    start: NaiveDate,
    /// Exclusive
    end: NaiveDate,
    overlap: bool,
    allow_undefined: bool,
}

/// Day-range bounds on a Dates attribute
///
/// Single dates pass when their first day falls in `[start, end)`. Ranges
/// pass when they overlap the bounds, or in contain mode when they fit
/// inside them. Open ranges run to today.
#[derive(Debug, Clone)]
pub struct DatesFilter {
    attribute: AttributeId,
    /// Inclusive day range the attribute declares
    declared: Option<(NaiveDate, NaiveDate)>,
    undefined_permitted: bool,
    params: DateParams,
    active: DateParams,
    today: NaiveDate,
    histogram: Histogram,
}

impl DatesFilter {
    /// Defaults to the span of the range categories, or the declared range
    pub fn new(def: &AttributeDefinition, binner: &CategoryBinner<'_>) -> Result<Self, FilterError> {
        let categories = binner
            .computed_range_categories(&def.id, false, false)?
            .unwrap_or_default();
        let today = binner.today();

        let declared = match &def.range {
            Some(AttributeRange::Dates { min: Some(min), max, .. }) => {
                let last = match max {
                    Some(max) => max.end().map_err(FilterError::Data)?,
                    None => today,
                };
                Some((min.start().map_err(FilterError::Data)?, last))
            }
            _ => None,
        };

        let first = categories.first().and_then(|c| date_lower(&c.rule));
        let last = categories.last().and_then(|c| match c.rule {
            MatchRule::Date { end, .. } => Some(end),
            _ => None,
        });
        let declared_end = declared.and_then(|(_, last)| last.checked_add_days(Days::new(1)));
        let params = DateParams {
            start: first.or(declared.map(|(start, _)| start)).unwrap_or(NaiveDate::MIN),
            end: last.or(declared_end).unwrap_or(NaiveDate::MAX),
            overlap: true,
            allow_undefined: false,
        };

        Ok(Self {
            attribute: def.id.clone(),
            declared,
            undefined_permitted: def.allows_undefined(),
            params,
            active: params,
            today,
            histogram: Histogram::new(categories),
        })
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// Current `[start, end)` bounds
    pub fn bounds(&self) -> (NaiveDate, NaiveDate) {
        (self.params.start, self.params.end)
    }

    pub fn set_bounds(&mut self, start: NaiveDate, end: NaiveDate) -> Result<(), ValidationError> {
        if let Some((min, max)) = self.declared {
            if start < min {
                return Err(ValidationError::BelowMinimum {
                    field: "start date",
                    value: start.to_string(),
                    min: min.to_string(),
                });
            }
            if end.pred_opt().map_or(false, |last| last > max) {
                return Err(ValidationError::AboveMaximum {
                    field: "end date",
                    value: end.to_string(),
                    max: max.to_string(),
                });
            }
        }
        if start >= end {
            return Err(ValidationError::Inverted { from: start.to_string(), to: end.to_string() });
        }
        self.params.start = start;
        self.params.end = end;
        Ok(())
    }

    /// Set bounds from user-entered `[-]Y[-M[-D]]` text
    pub fn set_bounds_from_input(&mut self, from: &str, to: &str) -> Result<(), ValidationError> {
        let (start, end) = parse_date_bounds(from, to, self.declared)?;
        self.set_bounds(start, end)
    }

    pub fn set_overlap(&mut self, overlap: bool) {
        self.params.overlap = overlap;
    }

    /// Ignored unless the attribute declares an undefined value
    pub fn set_allow_undefined(&mut self, allow: bool) {
        self.params.allow_undefined = allow && self.undefined_permitted;
    }

    pub fn state(&self) -> FilterState {
        FilterState::Dates {
            start: self.params.start,
            end: self.params.end,
            overlap: self.params.overlap,
            allow_undefined: self.params.allow_undefined,
        }
    }

    /// Category labels with their share of the last pass, in percent
    pub fn histogram(&self) -> &[(String, u32)] {
        &self.histogram.shares
    }
}

impl RecordFilter for DatesFilter {
    fn eval_prep(&mut self, ctx: &EvalContext) {
        self.active = self.params;
        self.today = ctx.today;
        self.histogram.reset();
    }

    fn eval(&mut self, record: &Record) -> bool {
        let span = match record.value(&self.attribute) {
            Some(Value::Dates(DateValue::Undefined)) => return self.active.allow_undefined,
            Some(Value::Dates(DateValue::Span(span))) => span,
            _ => return false,
        };

        let DateParams { start, end, overlap, .. } = self.active;
        let first = span.first_day();
        let pass = if matches!(span.end, DateEnd::Instant) {
            start <= first && first < end
        } else {
            let last = span.last_day(self.today);
            if overlap {
                last >= start && first < end
            } else {
                start <= first && last < end
            }
        };

        if pass {
            self.histogram.count_by(first, date_lower, date_contains);
        }
        pass
    }

    fn eval_done(&mut self, total: usize) {
        self.histogram.finish(total);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ahash::AHashMap;
    use exhibit_data::schema::UndefinedSpec;
    use exhibit_data::value::DateSpan;
    use exhibit_data::{
        AttributeCatalog, AttributeType, DateGranularity, EngineConfig, PartialDate, RecordStore,
    };

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 6, 15).unwrap()
    }

    fn definitions() -> Vec<AttributeDefinition> {
        vec![
            AttributeDefinition {
                id: "size".to_string(),
                label: "Size".to_string(),
                kind: AttributeType::Number,
                legend: Vec::new(),
                range: Some(AttributeRange::Number { min: Some(0.0), max: Some(99.0), granularity: 1 }),
                undefined: Some(UndefinedSpec { label: "?".to_string(), color: "#000000".to_string() }),
                delimiter: None,
            },
            AttributeDefinition {
                id: "when".to_string(),
                label: "When".to_string(),
                kind: AttributeType::Dates,
                legend: Vec::new(),
                range: Some(AttributeRange::Dates {
                    min: Some(PartialDate::year(1900)),
                    max: Some(PartialDate::year(1999)),
                    granularity: DateGranularity::Decade,
                }),
                undefined: None,
                delimiter: None,
            },
        ]
    }

    fn filters() -> (NumberFilter, DatesFilter) {
        let defs = definitions();
        let catalog = AttributeCatalog::new(defs.clone()).unwrap();
        let store = RecordStore::default();
        let config = EngineConfig::default().with_today(today());
        let binner = CategoryBinner::new(&store, &catalog, &config);
        (
            NumberFilter::new(&defs[0], &binner).unwrap(),
            DatesFilter::new(&defs[1], &binner).unwrap(),
        )
    }

    fn record(attribute: &str, value: Value) -> Record {
        let mut attributes = AHashMap::new();
        attributes.insert(attribute.to_string(), value);
        Record { id: "r".to_string(), label: String::new(), attributes }
    }

    fn number(v: f64) -> Record {
        record("size", Value::Number(NumberValue::Defined(v)))
    }

    fn dated(start: PartialDate, end: DateEnd) -> Record {
        record("when", Value::Dates(DateValue::Span(DateSpan::new(start, end).unwrap())))
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_number_defaults_and_histogram() {
        let (mut filter, _) = filters();
        assert_eq!(filter.bounds(), (0.0, 99.0));

        filter.set_bounds(10.0, 20.0).unwrap();
        filter.eval_prep(&EvalContext::new(today()));
        assert!(filter.eval(&number(10.0)));
        assert!(filter.eval(&number(20.0)));
        assert!(!filter.eval(&number(21.0)));
        assert!(!filter.eval(&record("size", Value::Number(NumberValue::Undefined))));
        filter.eval_done(4);

        let shares = filter.histogram();
        assert_eq!(shares.len(), 10);
        assert_eq!(shares[1], ("10-19".to_string(), 25));
        assert_eq!(shares[2], ("20-29".to_string(), 25));
        assert_eq!(shares[0].1, 0);
    }

    #[test]
    fn test_number_undefined_needs_permission() {
        let (mut filter, _) = filters();
        filter.set_allow_undefined(true);
        filter.eval_prep(&EvalContext::new(today()));
        assert!(filter.eval(&record("size", Value::Number(NumberValue::Undefined))));
    }

    #[test]
    fn test_number_bounds_validation() {
        let (mut filter, _) = filters();
        assert!(matches!(filter.set_bounds(-1.0, 5.0), Err(ValidationError::BelowMinimum { .. })));
        assert!(matches!(filter.set_bounds_from_input("30", "x"), Err(ValidationError::Malformed { .. })));
        assert_eq!(filter.bounds(), (0.0, 99.0));
        filter.set_bounds_from_input("30", "40").unwrap();
        assert_eq!(filter.bounds(), (30.0, 40.0));
    }

    #[test]
    fn test_dates_single_and_ranges() {
        let (_, mut filter) = filters();
        assert_eq!(filter.bounds(), (day(1900, 1, 1), day(2000, 1, 1)));

        filter.set_bounds(day(1920, 1, 1), day(1930, 1, 1)).unwrap();
        filter.eval_prep(&EvalContext::new(today()));
        assert!(filter.eval(&dated(PartialDate::year(1925), DateEnd::Instant)));
        assert!(!filter.eval(&dated(PartialDate::year(1930), DateEnd::Instant)));
        // Overlapping range starting before the bounds
        assert!(filter.eval(&dated(PartialDate::year(1910), DateEnd::At(PartialDate::year(1921)))));
        assert!(!filter.eval(&dated(PartialDate::year(1931), DateEnd::Open)));

        filter.set_overlap(false);
        filter.eval_prep(&EvalContext::new(today()));
        assert!(!filter.eval(&dated(PartialDate::year(1910), DateEnd::At(PartialDate::year(1921)))));
        assert!(filter.eval(&dated(PartialDate::year(1921), DateEnd::At(PartialDate::year(1929)))));
        assert!(!filter.eval(&dated(PartialDate::year(1925), DateEnd::Open)));
    }

    #[test]
    fn test_dates_histogram_counts_by_start() {
        let (_, mut filter) = filters();
        filter.eval_prep(&EvalContext::new(today()));
        assert!(filter.eval(&dated(PartialDate::year(1925), DateEnd::Instant)));
        assert!(filter.eval(&dated(PartialDate::year(1921), DateEnd::At(PartialDate::year(1960)))));
        assert!(filter.eval(&dated(PartialDate::year(1990), DateEnd::Instant)));
        filter.eval_done(3);

        let shares = filter.histogram();
        assert_eq!(shares[2], ("1920".to_string(), 67));
        assert_eq!(shares[9], ("1990".to_string(), 33));
    }

    #[test]
    fn test_dates_bounds_from_input() {
        let (_, mut filter) = filters();
        assert!(matches!(
            filter.set_bounds_from_input("1850", "1900"),
            Err(ValidationError::BelowMinimum { .. })
        ));
        filter.set_bounds_from_input("1950", "1950-06").unwrap();
        assert_eq!(filter.bounds(), (day(1950, 1, 1), day(1950, 7, 1)));
    }
}
