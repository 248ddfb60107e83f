//! User-entered filter bounds
//!
//! Bounds are checked here, before they reach a filter. Nothing rejected by
//! these parsers ever gets to `eval` or a recompute.

use chrono::{Days, NaiveDate};
use thiserror::Error;

use exhibit_data::dates::parse_partial_date;

/// Rejected filter input
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("'{input}' is not a valid {field}")]
    Malformed { field: &'static str, input: String },

    #[error("{field} {value} is below the minimum {min}")]
    BelowMinimum { field: &'static str, value: String, min: String },

    #[error("{field} {value} is above the maximum {max}")]
    AboveMaximum { field: &'static str, value: String, max: String },

    #[error("lower bound {from} is after upper bound {to}")]
    Inverted { from: String, to: String },

    #[error("filter on {expected} attribute cannot take {found} parameters")]
    WrongKind { expected: &'static str, found: &'static str },
}

fn parse_whole_number(field: &'static str, input: &str) -> Result<f64, ValidationError> {
    let text = input.trim();
    let digits = text.strip_prefix('-').unwrap_or(text);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::Malformed { field, input: input.to_string() });
    }
    text.parse::<f64>()
        .map_err(|_| ValidationError::Malformed { field, input: input.to_string() })
}

/// Parse inclusive number bounds from text boxes
///
/// Each bound must be a whole number inside the attribute's declared range,
/// and `from` may not exceed `to`.
pub fn parse_number_bounds(
    from: &str,
    to: &str,
    declared_min: Option<f64>,
    declared_max: Option<f64>,
) -> Result<(f64, f64), ValidationError> {
    let lo = parse_whole_number("lower bound", from)?;
    let hi = parse_whole_number("upper bound", to)?;

    if let Some(min) = declared_min {
        if lo < min {
            return Err(ValidationError::BelowMinimum {
                field: "lower bound",
                value: lo.to_string(),
                min: min.to_string(),
            });
        }
    }
    if let Some(max) = declared_max {
        if hi > max {
            return Err(ValidationError::AboveMaximum {
                field: "upper bound",
                value: hi.to_string(),
                max: max.to_string(),
            });
        }
    }
    if lo > hi {
        return Err(ValidationError::Inverted { from: lo.to_string(), to: hi.to_string() });
    }
    Ok((lo, hi))
}

/// Parse date bounds (`[-]Y[-M[-D]]`) into a half-open day range
///
/// `from` resolves to the first day it covers and `to` to the day after the
/// last day it covers. `declared` is the attribute's inclusive day range.
pub fn parse_date_bounds(
    from: &str,
    to: &str,
    declared: Option<(NaiveDate, NaiveDate)>,
) -> Result<(NaiveDate, NaiveDate), ValidationError> {
    let malformed = |field: &'static str, input: &str| ValidationError::Malformed {
        field,
        input: input.to_string(),
    };

    let start = parse_partial_date(from)
        .and_then(|d| d.start())
        .map_err(|_| malformed("start date", from))?;
    let last = parse_partial_date(to)
        .and_then(|d| d.end())
        .map_err(|_| malformed("end date", to))?;

    if let Some((min, max)) = declared {
        if start < min {
            return Err(ValidationError::BelowMinimum {
                field: "start date",
                value: start.to_string(),
                min: min.to_string(),
            });
        }
        if last > max {
            return Err(ValidationError::AboveMaximum {
                field: "end date",
                value: last.to_string(),
                max: max.to_string(),
            });
        }
    }
    if start > last {
        return Err(ValidationError::Inverted { from: start.to_string(), to: last.to_string() });
    }

    let end = last
        .checked_add_days(Days::new(1))
        .ok_or_else(|| malformed("end date", to))?;
    Ok((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_bounds() {
        assert_eq!(parse_number_bounds("10", "20", Some(0.0), Some(99.0)), Ok((10.0, 20.0)));
        assert_eq!(parse_number_bounds(" 5 ", "5", None, None), Ok((5.0, 5.0)));
        assert!(matches!(
            parse_number_bounds("1.5", "20", None, None),
            Err(ValidationError::Malformed { .. })
        ));
        assert!(matches!(
            parse_number_bounds("", "20", None, None),
            Err(ValidationError::Malformed { .. })
        ));
        assert!(matches!(
            parse_number_bounds("-5", "20", Some(0.0), None),
            Err(ValidationError::BelowMinimum { .. })
        ));
        assert!(matches!(
            parse_number_bounds("5", "200", None, Some(99.0)),
            Err(ValidationError::AboveMaximum { .. })
        ));
        assert!(matches!(
            parse_number_bounds("30", "20", None, None),
            Err(ValidationError::Inverted { .. })
        ));
    }

    #[test]
    fn test_date_bounds_are_half_open() {
        let (start, end) = parse_date_bounds("1900", "1950-02", None).unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(1900, 1, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(1950, 3, 1).unwrap());

        let (start, end) = parse_date_bounds("-1", "0", None).unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(-1, 1, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(1, 1, 1).unwrap());
    }

    #[test]
    fn test_date_bounds_rejections() {
        let declared = Some((
            NaiveDate::from_ymd_opt(1800, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(1999, 12, 31).unwrap(),
        ));
        assert!(matches!(
            parse_date_bounds("1799", "1900", declared),
            Err(ValidationError::BelowMinimum { .. })
        ));
        assert!(matches!(
            parse_date_bounds("1900", "2000", declared),
            Err(ValidationError::AboveMaximum { .. })
        ));
        assert!(matches!(
            parse_date_bounds("1950", "1900", declared),
            Err(ValidationError::Inverted { .. })
        ));
        assert!(matches!(
            parse_date_bounds("1900-13", "1950", declared),
            Err(ValidationError::Malformed { .. })
        ));
    }
}
