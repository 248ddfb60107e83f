//! Ordering a template's records by one attribute

use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::Serialize;

use exhibit_core::{AbsoluteIndex, IndexStream, TemplateIndex};

use super::CategoryBinner;
use crate::schema::AttributeType;
use crate::value::{DateValue, NumberValue, Value};
use crate::DataError;

/// Key a record is ordered by
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SortValue {
    Text(String),
    Number(f64),
    Date(NaiveDate),
    /// The explicit undefined token
    Undefined,
    /// The record has no value for the attribute
    Missing,
}

/// One record's position in a sorted order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderEntry {
    pub index: AbsoluteIndex,
    pub value: SortValue,
}

fn sort_value(value: Option<&Value>) -> SortValue {
    match value {
        None => SortValue::Missing,
        Some(Value::Number(NumberValue::Defined(n))) => SortValue::Number(*n),
        Some(Value::Dates(DateValue::Span(span))) => SortValue::Date(span.first_day()),
        Some(Value::Number(NumberValue::Undefined)) | Some(Value::Dates(DateValue::Undefined)) => {
            SortValue::Undefined
        }
        Some(other) => other
            .first_text()
            .map(|t| SortValue::Text(t.to_string()))
            .unwrap_or(SortValue::Missing),
    }
}

/// Text keys descend; missing values go last
fn compare_text(a: &SortValue, b: &SortValue) -> Ordering {
    match (a, b) {
        (SortValue::Text(a), SortValue::Text(b)) => b.cmp(a),
        (SortValue::Missing, SortValue::Missing) => Ordering::Equal,
        (SortValue::Missing, _) => Ordering::Greater,
        (_, SortValue::Missing) => Ordering::Less,
        _ => Ordering::Equal,
    }
}

/// Number and date keys ascend; undefined goes first, missing last
fn compare_scalar(a: &SortValue, b: &SortValue) -> Ordering {
    fn rank(v: &SortValue) -> u8 {
        match v {
            SortValue::Undefined => 0,
            SortValue::Missing => 2,
            _ => 1,
        }
    }
    match (a, b) {
        (SortValue::Number(a), SortValue::Number(b)) => a.total_cmp(b),
        (SortValue::Date(a), SortValue::Date(b)) => a.cmp(b),
        _ => rank(a).cmp(&rank(b)),
    }
}

impl<'a> CategoryBinner<'a> {
    /// Records of one template in a stream, ordered by `attribute`
    ///
    /// Multi-valued attributes sort by their first value. Ties keep stream
    /// order.
    pub fn sorted_order(
        &self,
        attribute: &str,
        stream: &IndexStream,
        template: TemplateIndex,
    ) -> Result<Vec<OrderEntry>, DataError> {
        let def = self.attribute(attribute)?;
        let compare: fn(&SortValue, &SortValue) -> Ordering = match def.kind {
            AttributeType::Text | AttributeType::Tags | AttributeType::Vocabulary => compare_text,
            AttributeType::Number | AttributeType::Dates => compare_scalar,
            other => {
                return Err(DataError::Schema(format!(
                    "cannot order by '{}' of type {}",
                    def.id,
                    other.code()
                )))
            }
        };

        let mut order = stream
            .template_slice(template)
            .iter()
            .map(|&index| -> Result<OrderEntry, DataError> {
                let record = self.store.record_at(index)?;
                Ok(OrderEntry { index, value: sort_value(record.value(attribute)) })
            })
            .collect::<Result<Vec<_>, DataError>>()?;

        order.sort_by(|a, b| compare(&a.value, &b.value));
        Ok(order)
    }
}
