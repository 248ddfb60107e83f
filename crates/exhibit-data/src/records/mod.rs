//! Loaded records and their absolute numbering
//!
//! Templates occupy contiguous ranges of absolute indices in declaration
//! order. Each range is sized by the template's declared count when the
//! store is created and never moves afterwards.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use exhibit_core::{AbsoluteIndex, IndexStream, TemplateIndex, TemplateRun};

use crate::config::UndefinedTokens;
use crate::schema::{AttributeCatalog, AttributeId, TemplateDef};
use crate::value::Value;
use crate::DataError;

/// Record as delivered by a source, before type checking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRecord {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

/// Loaded, type-checked record
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: String,
    pub label: String,
    pub attributes: AHashMap<AttributeId, Value>,
}

impl Record {
    /// Type-check a raw record against its template
    ///
    /// Empty strings and nulls count as "no value". Attributes the template
    /// does not declare are dropped.
    pub fn from_raw(
        raw: RawRecord,
        template: &TemplateDef,
        catalog: &AttributeCatalog,
        tokens: &UndefinedTokens,
    ) -> Result<Self, DataError> {
        let mut attributes = AHashMap::with_capacity(raw.attributes.len());
        for (att_id, raw_value) in raw.attributes {
            let missing = match &raw_value {
                serde_json::Value::Null => true,
                serde_json::Value::String(s) => s.trim().is_empty(),
                _ => false,
            };
            if missing {
                continue;
            }
            if !template.has_attribute(&att_id) {
                tracing::debug!("Record {} has undeclared attribute '{}'", raw.id, att_id);
                continue;
            }
            let def = catalog.get(&att_id).ok_or_else(|| {
                DataError::Schema(format!(
                    "template '{}' uses unknown attribute '{}'",
                    template.id, att_id
                ))
            })?;
            let value = Value::from_json(def, &raw_value, tokens).map_err(|e| match e {
                DataError::DataFormat(msg) => {
                    DataError::DataFormat(format!("record '{}': {}", raw.id, msg))
                }
                other => other,
            })?;
            attributes.insert(att_id, value);
        }

        Ok(Self { id: raw.id, label: raw.label, attributes })
    }

    pub fn value(&self, attribute: &str) -> Option<&Value> {
        self.attributes.get(attribute)
    }
}

/// Per-template record arrays
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    templates: Vec<TemplateDef>,
    extents: Vec<TemplateRun>,
    records: Vec<Vec<Record>>,
}

impl RecordStore {
    /// Empty store with ranges reserved for every template's declared count
    pub fn new(templates: Vec<TemplateDef>) -> Self {
        let mut start = 0;
        let extents = templates
            .iter()
            .map(|t| {
                let run = TemplateRun::new(start, t.count);
                start += t.count;
                run
            })
            .collect();
        let records = templates.iter().map(|t| Vec::with_capacity(t.count)).collect();

        Self { templates, extents, records }
    }

    pub fn templates(&self) -> &[TemplateDef] {
        &self.templates
    }

    pub fn template(&self, template: TemplateIndex) -> Option<&TemplateDef> {
        self.templates.get(template)
    }

    pub fn template_count(&self) -> usize {
        self.templates.len()
    }

    pub fn template_index(&self, id: &str) -> Option<TemplateIndex> {
        self.templates.iter().position(|t| t.id == id)
    }

    /// Absolute range of every template
    pub fn extents(&self) -> &[TemplateRun] {
        &self.extents
    }

    /// Sum of the declared counts
    pub fn total_records(&self) -> usize {
        self.extents.last().map(|e| e.end()).unwrap_or(0)
    }

    pub fn loaded_count(&self, template: TemplateIndex) -> usize {
        self.records.get(template).map(Vec::len).unwrap_or(0)
    }

    /// Every template holds its declared count
    pub fn is_complete(&self) -> bool {
        self.templates
            .iter()
            .zip(&self.records)
            .all(|(t, recs)| recs.len() == t.count)
    }

    /// Append a chunk of records to a template
    ///
    /// Ids must continue the template's ascending order, and the chunk may
    /// not push the template past its declared count. Returns the new loaded
    /// count.
    pub fn append_chunk(
        &mut self,
        template: TemplateIndex,
        chunk: Vec<Record>,
    ) -> Result<usize, DataError> {
        let def = self
            .templates
            .get(template)
            .ok_or_else(|| DataError::Lookup(format!("no template at index {}", template)))?;
        let records = &mut self.records[template];

        if records.len() + chunk.len() > def.count {
            return Err(DataError::DataFormat(format!(
                "template '{}' declares {} records, chunk would bring it to {}",
                def.id,
                def.count,
                records.len() + chunk.len()
            )));
        }

        let mut previous = records.last().map(|r| r.id.as_str());
        for record in &chunk {
            if let Some(prev) = previous {
                if record.id.as_str() <= prev {
                    return Err(DataError::DataFormat(format!(
                        "template '{}' record ids out of order: '{}' after '{}'",
                        def.id, record.id, prev
                    )));
                }
            }
            previous = Some(record.id.as_str());
        }

        records.extend(chunk);
        tracing::debug!("Template '{}' loaded {}/{}", def.id, records.len(), def.count);
        Ok(records.len())
    }

    /// Stream over every record; refused until loading completes
    pub fn full_stream(&self) -> Result<IndexStream, DataError> {
        if !self.is_complete() {
            return Err(DataError::NotReady);
        }
        Ok(IndexStream::full(&self.extents))
    }

    /// Template whose range contains `index`
    pub fn template_of(&self, index: AbsoluteIndex) -> Option<TemplateIndex> {
        self.extents.iter().position(|e| e.contains(index))
    }

    pub fn record_at(&self, index: AbsoluteIndex) -> Result<&Record, DataError> {
        let template = self
            .template_of(index)
            .ok_or_else(|| DataError::Lookup(format!("absolute index {} out of range", index)))?;
        let offset = index - self.extents[template].start;
        self.records[template].get(offset).ok_or_else(|| {
            DataError::Lookup(format!("record {} of template {} not loaded", offset, template))
        })
    }

    /// Binary search by id within one template, or across all templates
    pub fn record_by_id(&self, scope: Option<TemplateIndex>, id: &str) -> Option<&Record> {
        let index = self.index_by_id(scope, id)?;
        self.record_at(index).ok()
    }

    pub fn index_by_id(&self, scope: Option<TemplateIndex>, id: &str) -> Option<AbsoluteIndex> {
        let search = |template: TemplateIndex| -> Option<AbsoluteIndex> {
            let records = self.records.get(template)?;
            let offset = records.binary_search_by(|r| r.id.as_str().cmp(id)).ok()?;
            Some(self.extents[template].start + offset)
        };
        match scope {
            Some(template) => search(template),
            None => (0..self.templates.len()).find_map(search),
        }
    }

    pub fn template_has_attribute(&self, template: TemplateIndex, attribute: &str) -> bool {
        self.templates
            .get(template)
            .is_some_and(|t| t.has_attribute(attribute))
    }

    pub fn value_at(&self, index: AbsoluteIndex, attribute: &str) -> Option<&Value> {
        self.record_at(index).ok()?.value(attribute)
    }

    /// Display text of a record's attribute value
    pub fn value_text(&self, index: AbsoluteIndex, attribute: &str) -> Option<String> {
        self.value_at(index, attribute).map(Value::display)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::NumberValue;

    fn template(id: &str, count: usize) -> TemplateDef {
        TemplateDef {
            id: id.to_string(),
            label: String::new(),
            attributes: vec!["size".to_string()],
            count,
        }
    }

    fn record(id: &str, size: f64) -> Record {
        let mut attributes = AHashMap::new();
        attributes.insert("size".to_string(), Value::Number(NumberValue::Defined(size)));
        Record { id: id.to_string(), label: id.to_uppercase(), attributes }
    }

    fn loaded_store() -> RecordStore {
        let mut store = RecordStore::new(vec![template("t0", 2), template("t1", 1)]);
        store.append_chunk(0, vec![record("a", 3.0), record("b", 10.0)]).unwrap();
        store.append_chunk(1, vec![record("c", 7.0)]).unwrap();
        store
    }

    #[test]
    fn test_extents_follow_declaration_order() {
        let store = RecordStore::new(vec![template("t0", 2), template("t1", 0), template("t2", 3)]);
        assert_eq!(
            store.extents(),
            &[TemplateRun::new(0, 2), TemplateRun::new(2, 0), TemplateRun::new(2, 3)]
        );
        assert_eq!(store.total_records(), 5);
        assert_eq!(store.template_of(2), Some(2));
        assert_eq!(store.template_of(5), None);
    }

    #[test]
    fn test_full_stream_waits_for_completion() {
        let mut store = RecordStore::new(vec![template("t0", 2)]);
        store.append_chunk(0, vec![record("a", 1.0)]).unwrap();
        assert!(matches!(store.full_stream(), Err(DataError::NotReady)));
        assert!(store.record_at(1).is_err());

        store.append_chunk(0, vec![record("b", 2.0)]).unwrap();
        assert_eq!(store.full_stream().unwrap().indices(), &[0, 1]);
    }

    #[test]
    fn test_append_rejects_disorder_and_overflow() {
        let mut store = RecordStore::new(vec![template("t0", 2)]);
        store.append_chunk(0, vec![record("m", 1.0)]).unwrap();
        assert!(store.append_chunk(0, vec![record("a", 1.0)]).is_err());
        assert!(store.append_chunk(0, vec![record("n", 1.0), record("o", 1.0)]).is_err());
        assert!(store.append_chunk(3, vec![]).is_err());
    }

    #[test]
    fn test_lookup_by_index_and_id() {
        let store = loaded_store();
        assert_eq!(store.record_at(2).unwrap().id, "c");
        assert_eq!(store.index_by_id(None, "c"), Some(2));
        assert_eq!(store.index_by_id(Some(0), "c"), None);
        assert_eq!(store.record_by_id(Some(0), "b").map(|r| r.label.as_str()), Some("B"));
        assert!(store.record_at(3).is_err());
        assert_eq!(store.value_text(1, "size").as_deref(), Some("10"));
        assert_eq!(store.value_text(1, "missing"), None);
    }

    #[test]
    fn test_record_at_is_stable() {
        let store = loaded_store();
        for i in 0..store.total_records() {
            let first = store.record_at(i).unwrap().clone();
            let second = store.record_at(i).unwrap();
            assert_eq!(&first, second);
        }
    }
}
