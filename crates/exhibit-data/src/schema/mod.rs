//! Exhibit schema: templates, attribute definitions and the attribute catalog

use std::path::Path;
use serde::{Serialize, Deserialize};

use crate::dates::{DateGranularity, PartialDate};
use crate::DataError;

/// Attribute identifier
pub type AttributeId = String;

/// Attribute value types, keyed by their single-character type code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttributeType {
    #[serde(rename = "T")]
    Text,
    #[serde(rename = "g")]
    Tags,
    #[serde(rename = "V")]
    Vocabulary,
    #[serde(rename = "N")]
    Number,
    #[serde(rename = "D")]
    Dates,
    #[serde(rename = "L")]
    LatLon,
    #[serde(rename = "X")]
    XY,
    #[serde(rename = "I")]
    Image,
    #[serde(rename = "l")]
    Link,
    #[serde(rename = "S")]
    SoundCloud,
    #[serde(rename = "Y")]
    YouTube,
    #[serde(rename = "x")]
    Transcript,
    #[serde(rename = "t")]
    Timecode,
    #[serde(rename = "P")]
    Pointer,
}

impl AttributeType {
    pub fn code(&self) -> char {
        match self {
            AttributeType::Text => 'T',
            AttributeType::Tags => 'g',
            AttributeType::Vocabulary => 'V',
            AttributeType::Number => 'N',
            AttributeType::Dates => 'D',
            AttributeType::LatLon => 'L',
            AttributeType::XY => 'X',
            AttributeType::Image => 'I',
            AttributeType::Link => 'l',
            AttributeType::SoundCloud => 'S',
            AttributeType::YouTube => 'Y',
            AttributeType::Transcript => 'x',
            AttributeType::Timecode => 't',
            AttributeType::Pointer => 'P',
        }
    }

    pub fn from_code(code: char) -> Option<Self> {
        let kind = match code {
            'T' => AttributeType::Text,
            'g' => AttributeType::Tags,
            'V' => AttributeType::Vocabulary,
            'N' => AttributeType::Number,
            'D' => AttributeType::Dates,
            'L' => AttributeType::LatLon,
            'X' => AttributeType::XY,
            'I' => AttributeType::Image,
            'l' => AttributeType::Link,
            'S' => AttributeType::SoundCloud,
            'Y' => AttributeType::YouTube,
            'x' => AttributeType::Transcript,
            't' => AttributeType::Timecode,
            'P' => AttributeType::Pointer,
            _ => return None,
        };
        Some(kind)
    }

    /// Types that a filter can be built for
    pub fn is_filterable(&self) -> bool {
        matches!(
            self,
            AttributeType::Text
                | AttributeType::Tags
                | AttributeType::Vocabulary
                | AttributeType::Number
                | AttributeType::Dates
        )
    }
}

/// Second-level legend entry of a vocabulary
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LegendChild {
    pub label: String,
    /// Inherits the parent's color when unset or empty
    #[serde(default)]
    pub color: Option<String>,
}

/// What a legend entry matches
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LegendData {
    /// Vocabulary terms match by label
    #[default]
    Term,
    /// Text attributes match by substring
    Pattern { pattern: String },
    /// Either bound may be missing, not both
    Number {
        #[serde(default)]
        min: Option<f64>,
        #[serde(default)]
        max: Option<f64>,
    },
    /// A missing max is open-ended (runs to today)
    Dates {
        min: PartialDate,
        #[serde(default)]
        max: Option<PartialDate>,
    },
}

/// Top-level legend entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LegendEntry {
    pub label: String,
    pub color: String,
    #[serde(default)]
    pub data: LegendData,
    #[serde(default)]
    pub children: Vec<LegendChild>,
}

impl LegendEntry {
    /// Color of child `index`, falling back to this entry's color
    pub fn child_color(&self, index: usize) -> Option<&str> {
        let child = self.children.get(index)?;
        match child.color.as_deref() {
            Some(color) if !color.is_empty() => Some(color),
            _ => Some(&self.color),
        }
    }
}

/// Declared value range of a Number or Dates attribute
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttributeRange {
    Number {
        #[serde(default)]
        min: Option<f64>,
        #[serde(default)]
        max: Option<f64>,
        /// Bucket width is `10^granularity`
        #[serde(default)]
        granularity: i32,
    },
    Dates {
        #[serde(default)]
        min: Option<PartialDate>,
        /// Open-ended (runs to today) when unset
        #[serde(default)]
        max: Option<PartialDate>,
        granularity: DateGranularity,
    },
}

/// Undefined-value support for Number and Dates attributes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UndefinedSpec {
    pub label: String,
    pub color: String,
}

/// Definition of one attribute
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AttributeDefinition {
    pub id: AttributeId,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: AttributeType,
    #[serde(default)]
    pub legend: Vec<LegendEntry>,
    #[serde(default)]
    pub range: Option<AttributeRange>,
    /// Present when the attribute allows an explicit undefined value
    #[serde(default)]
    pub undefined: Option<UndefinedSpec>,
    /// Separator for multi-valued attributes
    #[serde(default)]
    pub delimiter: Option<String>,
}

impl AttributeDefinition {
    pub fn allows_undefined(&self) -> bool {
        self.undefined.is_some()
    }

    /// Declared number bounds, if both are present
    pub fn number_bounds(&self) -> Option<(f64, f64, i32)> {
        match &self.range {
            Some(AttributeRange::Number { min: Some(min), max: Some(max), granularity }) => {
                Some((*min, *max, *granularity))
            }
            _ => None,
        }
    }
}

/// Template definition with its declared record count
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TemplateDef {
    pub id: String,
    #[serde(default)]
    pub label: String,
    pub attributes: Vec<AttributeId>,
    pub count: usize,
}

impl TemplateDef {
    pub fn has_attribute(&self, attribute: &str) -> bool {
        self.attributes.iter().any(|a| a == attribute)
    }
}

/// Visualization declared by the exhibit
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ViewDef {
    pub label: String,
    /// Visualization type code
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub settings: serde_json::Value,
}

/// Static exhibit configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExhibitSchema {
    pub templates: Vec<TemplateDef>,
    pub attributes: Vec<AttributeDefinition>,
    #[serde(default)]
    pub views: Vec<ViewDef>,
}

impl ExhibitSchema {
    pub fn from_json_str(text: &str) -> Result<Self, DataError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, DataError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

/// Attribute definitions sorted by id
#[derive(Debug, Clone, Default)]
pub struct AttributeCatalog {
    attributes: Vec<AttributeDefinition>,
}

impl AttributeCatalog {
    /// Build a catalog; duplicate ids are rejected
    pub fn new(mut attributes: Vec<AttributeDefinition>) -> Result<Self, DataError> {
        attributes.sort_by(|a, b| a.id.cmp(&b.id));
        if let Some(pair) = attributes.windows(2).find(|w| w[0].id == w[1].id) {
            return Err(DataError::Schema(format!("duplicate attribute id '{}'", pair[0].id)));
        }
        tracing::debug!("Attribute catalog with {} entries", attributes.len());
        Ok(Self { attributes })
    }

    /// Binary-search lookup by id
    pub fn get(&self, id: &str) -> Option<&AttributeDefinition> {
        self.attributes
            .binary_search_by(|a| a.id.as_str().cmp(id))
            .ok()
            .map(|pos| &self.attributes[pos])
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AttributeDefinition> {
        self.attributes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &str = r##"{
        "templates": [
            { "id": "people", "attributes": ["name", "born"], "count": 2 }
        ],
        "attributes": [
            { "id": "name", "label": "Name", "type": "T" },
            { "id": "born", "label": "Born", "type": "D",
              "range": { "kind": "dates", "min": { "year": 1800 }, "granularity": "decade" },
              "undefined": { "label": "Unknown", "color": "#cccccc" },
              "legend": [
                { "label": "Early", "color": "#ff0000",
                  "data": { "kind": "dates", "min": { "year": 1800 }, "max": { "year": 1850 } } }
              ] },
            { "id": "kind", "label": "Kind", "type": "V",
              "legend": [ { "label": "a", "color": "#111111",
                            "children": [ { "label": "a1" }, { "label": "a2", "color": "#222222" } ] } ] }
        ]
    }"##;

    #[test]
    fn test_schema_parses() {
        let schema = ExhibitSchema::from_json_str(SCHEMA).unwrap();
        assert_eq!(schema.templates[0].count, 2);
        assert!(schema.templates[0].has_attribute("born"));

        let born = &schema.attributes[1];
        assert_eq!(born.kind, AttributeType::Dates);
        assert!(born.allows_undefined());
        assert!(matches!(
            born.range,
            Some(AttributeRange::Dates { max: None, granularity: DateGranularity::Decade, .. })
        ));
    }

    #[test]
    fn test_catalog_lookup_is_sorted() {
        let schema = ExhibitSchema::from_json_str(SCHEMA).unwrap();
        let catalog = AttributeCatalog::new(schema.attributes).unwrap();

        let ids: Vec<_> = catalog.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["born", "kind", "name"]);
        assert_eq!(catalog.get("kind").map(|a| a.kind), Some(AttributeType::Vocabulary));
        assert!(catalog.get("missing").is_none());
    }

    #[test]
    fn test_catalog_rejects_duplicates() {
        let schema = ExhibitSchema::from_json_str(SCHEMA).unwrap();
        let mut attributes = schema.attributes.clone();
        attributes.push(schema.attributes[0].clone());
        assert!(AttributeCatalog::new(attributes).is_err());
    }

    #[test]
    fn test_child_color_inherits() {
        let schema = ExhibitSchema::from_json_str(SCHEMA).unwrap();
        let entry = &schema.attributes[2].legend[0];
        assert_eq!(entry.child_color(0), Some("#111111"));
        assert_eq!(entry.child_color(1), Some("#222222"));
        assert_eq!(entry.child_color(2), None);
    }

    #[test]
    fn test_type_codes_round_trip() {
        for code in ['T', 'g', 'V', 'N', 'D', 'L', 'X', 'I', 'l', 'S', 'Y', 'x', 't', 'P'] {
            let kind = AttributeType::from_code(code).unwrap();
            assert_eq!(kind.code(), code);
        }
        assert!(AttributeType::from_code('Q').is_none());
    }
}
