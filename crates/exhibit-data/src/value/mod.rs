//! Typed attribute values
//!
//! Raw JSON values are checked against the attribute's declared type when a
//! record is loaded, so everything downstream works with a closed set of
//! variants.

use chrono::NaiveDate;
use serde_json::Value as JsonValue;

use crate::config::UndefinedTokens;
use crate::dates::{parse_partial_date, PartialDate};
use crate::schema::{AttributeDefinition, AttributeType};
use crate::DataError;

const DEFAULT_DELIMITER: &str = ",";

/// Number attribute value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumberValue {
    Defined(f64),
    /// The explicit undefined token
    Undefined,
}

/// End of a date value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateEnd {
    /// Single date; the span ends where the start period ends
    Instant,
    /// Ongoing; resolves to today
    Open,
    At(PartialDate),
}

/// A date or date range with its resolved day bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateSpan {
    pub start: PartialDate,
    pub end: DateEnd,
    first_day: NaiveDate,
    last_day: Option<NaiveDate>,
}

impl DateSpan {
    pub fn new(start: PartialDate, end: DateEnd) -> Result<Self, DataError> {
        let first_day = start.start()?;
        let last_day = match end {
            DateEnd::Instant => Some(start.end()?),
            DateEnd::Open => None,
            DateEnd::At(date) => Some(date.end()?),
        };
        if let Some(last) = last_day {
            if last < first_day {
                return Err(DataError::DataFormat(format!(
                    "date range {} ends before it starts",
                    start.display()
                )));
            }
        }
        Ok(Self { start, end, first_day, last_day })
    }

    /// First day covered
    pub fn first_day(&self) -> NaiveDate {
        self.first_day
    }

    /// Last day covered; open spans run to `today`
    pub fn last_day(&self, today: NaiveDate) -> NaiveDate {
        self.last_day.unwrap_or(today)
    }

    pub fn is_open(&self) -> bool {
        matches!(self.end, DateEnd::Open)
    }
}

/// Dates attribute value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateValue {
    Undefined,
    Span(DateSpan),
}

/// Attribute value of a loaded record
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Tags(Vec<String>),
    Vocabulary(Vec<String>),
    Number(NumberValue),
    Dates(DateValue),
    /// Lat/lon or x/y points
    Location(Vec<[f64; 2]>),
    /// Ids of other records
    Pointers(Vec<String>),
    /// Image, link, SoundCloud, YouTube or transcript address
    Url(String),
    /// Extract bounds in milliseconds
    Timecode { text: String, start_ms: u64, end_ms: u64 },
}

impl Value {
    /// Check a raw value against the attribute's declared type
    pub fn from_json(
        def: &AttributeDefinition,
        raw: &JsonValue,
        tokens: &UndefinedTokens,
    ) -> Result<Self, DataError> {
        let delimiter = def.delimiter.as_deref().unwrap_or(DEFAULT_DELIMITER);
        let mismatch = || {
            DataError::DataFormat(format!(
                "value {} does not fit attribute '{}' of type {}",
                raw,
                def.id,
                def.kind.code()
            ))
        };

        let value = match def.kind {
            AttributeType::Text => Value::Text(raw.as_str().ok_or_else(mismatch)?.to_string()),
            AttributeType::Tags => Value::Tags(string_list(raw, delimiter).ok_or_else(mismatch)?),
            AttributeType::Vocabulary => {
                Value::Vocabulary(string_list(raw, delimiter).ok_or_else(mismatch)?)
            }
            AttributeType::Pointer => {
                Value::Pointers(string_list(raw, delimiter).ok_or_else(mismatch)?)
            }
            AttributeType::Number => Value::Number(parse_number(def, raw, tokens)?),
            AttributeType::Dates => Value::Dates(parse_dates(def, raw, tokens)?),
            AttributeType::LatLon | AttributeType::XY => {
                Value::Location(parse_points(raw).ok_or_else(mismatch)?)
            }
            AttributeType::Image
            | AttributeType::Link
            | AttributeType::SoundCloud
            | AttributeType::YouTube
            | AttributeType::Transcript => {
                Value::Url(raw.as_str().ok_or_else(mismatch)?.to_string())
            }
            AttributeType::Timecode => {
                let text = raw.as_str().ok_or_else(mismatch)?;
                let (start_ms, end_ms) = parse_timecode_range(text)?;
                Value::Timecode { text: text.to_string(), start_ms, end_ms }
            }
        };
        Ok(value)
    }

    /// First text value of a Text, Tags or Vocabulary value
    pub fn first_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            Value::Tags(list) | Value::Vocabulary(list) => list.first().map(String::as_str),
            _ => None,
        }
    }

    /// Display form of the value
    pub fn display(&self) -> String {
        match self {
            Value::Text(text) | Value::Url(text) => text.clone(),
            Value::Timecode { text, .. } => text.clone(),
            Value::Tags(list) | Value::Vocabulary(list) | Value::Pointers(list) => list.join(", "),
            Value::Number(NumberValue::Undefined) | Value::Dates(DateValue::Undefined) => {
                "?".to_string()
            }
            Value::Number(NumberValue::Defined(n)) => format_number(*n),
            Value::Dates(DateValue::Span(span)) => {
                let start = span.start.display();
                match span.end {
                    DateEnd::Instant => start,
                    DateEnd::Open => format!("{} to now", start),
                    DateEnd::At(end) => format!("{} to {}", start, end.display()),
                }
            }
            Value::Location(points) => points
                .iter()
                .map(|p| format!("{}, {}", format_number(p[0]), format_number(p[1])))
                .collect::<Vec<_>>()
                .join("; "),
        }
    }
}

pub(crate) fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

fn string_list(raw: &JsonValue, delimiter: &str) -> Option<Vec<String>> {
    match raw {
        JsonValue::String(text) => Some(
            text.split(delimiter)
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect(),
        ),
        JsonValue::Array(items) => items
            .iter()
            .map(|item| item.as_str().map(|s| s.trim().to_string()))
            .collect(),
        _ => None,
    }
}

fn parse_number(
    def: &AttributeDefinition,
    raw: &JsonValue,
    tokens: &UndefinedTokens,
) -> Result<NumberValue, DataError> {
    match raw {
        JsonValue::Number(n) => n
            .as_f64()
            .map(NumberValue::Defined)
            .ok_or_else(|| DataError::DataFormat(format!("number {} out of range", n))),
        JsonValue::String(text) if tokens.is_undefined(text) => {
            if def.allows_undefined() {
                Ok(NumberValue::Undefined)
            } else {
                Err(DataError::DataFormat(format!(
                    "attribute '{}' does not allow undefined values",
                    def.id
                )))
            }
        }
        JsonValue::String(text) => text
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(NumberValue::Defined)
            .ok_or_else(|| DataError::DataFormat(format!("cannot parse '{}' as a number", text))),
        other => Err(DataError::DataFormat(format!("cannot parse {} as a number", other))),
    }
}

fn parse_date_field(raw: &JsonValue) -> Result<PartialDate, DataError> {
    match raw {
        JsonValue::String(text) => parse_partial_date(text),
        JsonValue::Number(n) => n
            .as_i64()
            .and_then(|y| i32::try_from(y).ok())
            .map(PartialDate::year)
            .ok_or_else(|| DataError::DataFormat(format!("cannot parse {} as a year", n))),
        JsonValue::Object(_) => Ok(serde_json::from_value(raw.clone())?),
        other => Err(DataError::DataFormat(format!("cannot parse {} as a date", other))),
    }
}

fn parse_dates(
    def: &AttributeDefinition,
    raw: &JsonValue,
    tokens: &UndefinedTokens,
) -> Result<DateValue, DataError> {
    if let JsonValue::String(text) = raw {
        if tokens.is_undefined(text) {
            if def.allows_undefined() {
                return Ok(DateValue::Undefined);
            }
            return Err(DataError::DataFormat(format!(
                "attribute '{}' does not allow undefined values",
                def.id
            )));
        }
    }

    let (start, end) = match raw {
        JsonValue::Object(fields) if fields.contains_key("min") => {
            let start = parse_date_field(&fields["min"])?;
            let end = match fields.get("max") {
                None | Some(JsonValue::Null) => DateEnd::Instant,
                Some(JsonValue::String(text)) if text == "open" => DateEnd::Open,
                Some(max) => DateEnd::At(parse_date_field(max)?),
            };
            (start, end)
        }
        _ => (parse_date_field(raw)?, DateEnd::Instant),
    };
    Ok(DateValue::Span(DateSpan::new(start, end)?))
}

fn parse_points(raw: &JsonValue) -> Option<Vec<[f64; 2]>> {
    let pair = |items: &[JsonValue]| -> Option<[f64; 2]> {
        match items {
            [a, b] => Some([a.as_f64()?, b.as_f64()?]),
            _ => None,
        }
    };
    match raw {
        JsonValue::Array(items) if items.first().is_some_and(JsonValue::is_number) => {
            Some(vec![pair(items.as_slice())?])
        }
        JsonValue::Array(items) => items
            .iter()
            .map(|item| item.as_array().and_then(|p| pair(p.as_slice())))
            .collect(),
        JsonValue::String(text) => text
            .split('|')
            .map(|point| {
                let mut coords = point.split(',').map(|c| c.trim().parse::<f64>().ok());
                let a = coords.next()??;
                let b = coords.next()??;
                if coords.next().is_some() {
                    return None;
                }
                Some([a, b])
            })
            .collect(),
        _ => None,
    }
}

/// Parse `HH:MM:SS.f` or `HH:MM:SS.ff` into milliseconds
///
/// A single fractional digit counts tenths, two digits count hundredths.
pub fn parse_timecode(text: &str) -> Result<u64, DataError> {
    let malformed = || DataError::DataFormat(format!("cannot parse '{}' as timecode", text));
    let text = text.trim();

    let (clock, fraction) = text.split_once('.').ok_or_else(malformed)?;
    let fields: Vec<&str> = clock.split(':').collect();
    if fields.len() != 3 || fields.iter().any(|f| f.len() != 2) {
        return Err(malformed());
    }
    if fraction.is_empty() || fraction.len() > 2 {
        return Err(malformed());
    }
    let all_digits = fields.iter().chain(std::iter::once(&fraction))
        .all(|f| f.bytes().all(|b| b.is_ascii_digit()));
    if !all_digits {
        return Err(malformed());
    }

    let number = |f: &str| f.parse::<u64>().map_err(|_| malformed());
    let seconds = number(fields[0])? * 3600 + number(fields[1])? * 60 + number(fields[2])?;
    let fraction_ms = if fraction.len() == 1 {
        number(fraction)? * 100
    } else {
        number(fraction)? * 10
    };
    Ok(seconds * 1000 + fraction_ms)
}

/// Parse an extract range `start-end` of two timecodes
pub fn parse_timecode_range(text: &str) -> Result<(u64, u64), DataError> {
    let (start, end) = text
        .split_once('-')
        .ok_or_else(|| DataError::DataFormat(format!("cannot parse '{}' as timecode range", text)))?;
    Ok((parse_timecode(start)?, parse_timecode(end)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::UndefinedSpec;
    use serde_json::json;

    fn def(kind: AttributeType, undefined: bool) -> AttributeDefinition {
        AttributeDefinition {
            id: "a".to_string(),
            label: "A".to_string(),
            kind,
            legend: Vec::new(),
            range: None,
            undefined: undefined.then(|| UndefinedSpec {
                label: "Unknown".to_string(),
                color: "#cccccc".to_string(),
            }),
            delimiter: None,
        }
    }

    #[test]
    fn test_timecode() {
        assert_eq!(parse_timecode("00:01:02.5").unwrap(), 62_500);
        assert_eq!(parse_timecode("01:00:00.05").unwrap(), 3_600_050);
        assert!(parse_timecode("1:00:00.0").is_err());
        assert!(parse_timecode("00:00:00").is_err());
        assert!(parse_timecode("00:00:00.123").is_err());
        assert_eq!(parse_timecode_range("00:00:01.0-00:00:02.25").unwrap(), (1000, 2250));
    }

    #[test]
    fn test_number_and_undefined_token() {
        let tokens = UndefinedTokens::default();
        let with_undef = def(AttributeType::Number, true);
        let without = def(AttributeType::Number, false);

        assert_eq!(
            Value::from_json(&with_undef, &json!(7), &tokens).unwrap(),
            Value::Number(NumberValue::Defined(7.0))
        );
        assert_eq!(
            Value::from_json(&with_undef, &json!("?"), &tokens).unwrap(),
            Value::Number(NumberValue::Undefined)
        );
        assert!(Value::from_json(&without, &json!("?"), &tokens).is_err());
        assert!(Value::from_json(&without, &json!("seven"), &tokens).is_err());
    }

    #[test]
    fn test_non_finite_numbers_rejected() {
        let tokens = UndefinedTokens::default();
        let number = def(AttributeType::Number, true);
        for text in ["NaN", "inf", "-inf", " infinity "] {
            assert!(matches!(
                Value::from_json(&number, &json!(text), &tokens),
                Err(DataError::DataFormat(_))
            ));
        }
        assert_eq!(
            Value::from_json(&number, &json!(" 1e3 "), &tokens).unwrap(),
            Value::Number(NumberValue::Defined(1000.0))
        );
    }

    #[test]
    fn test_dates_forms() {
        let tokens = UndefinedTokens::default();
        let dates = def(AttributeType::Dates, false);
        let today = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();

        let single = Value::from_json(&dates, &json!("1925"), &tokens).unwrap();
        let Value::Dates(DateValue::Span(span)) = single else { panic!("expected span") };
        assert_eq!(span.first_day(), NaiveDate::from_ymd_opt(1925, 1, 1).unwrap());
        assert_eq!(span.last_day(today), NaiveDate::from_ymd_opt(1925, 12, 31).unwrap());

        let open = Value::from_json(&dates, &json!({ "min": { "y": 1990, "f": true }, "max": "open" }), &tokens)
            .unwrap();
        assert_eq!(open.display(), "~1990 to now");
        let Value::Dates(DateValue::Span(span)) = open else { panic!("expected span") };
        assert_eq!(span.last_day(today), today);

        let backwards = json!({ "min": "1950", "max": "1900" });
        assert!(Value::from_json(&dates, &backwards, &tokens).is_err());
        assert!(Value::from_json(&dates, &json!("1925-14"), &tokens).is_err());
    }

    #[test]
    fn test_lists_and_display() {
        let tokens = UndefinedTokens::default();
        let tags = Value::from_json(&def(AttributeType::Tags, false), &json!("red, blue,"), &tokens)
            .unwrap();
        assert_eq!(tags, Value::Tags(vec!["red".to_string(), "blue".to_string()]));
        assert_eq!(tags.display(), "red, blue");
        assert_eq!(tags.first_text(), Some("red"));

        let points = Value::from_json(&def(AttributeType::LatLon, false), &json!("1,2|3.5,4"), &tokens)
            .unwrap();
        assert_eq!(points, Value::Location(vec![[1.0, 2.0], [3.5, 4.0]]));
        assert!(Value::from_json(&def(AttributeType::Text, false), &json!(3), &tokens).is_err());
    }
}
