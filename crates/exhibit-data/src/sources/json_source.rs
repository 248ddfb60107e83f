//! Record source backed by a JSON document

use std::path::Path;
use async_trait::async_trait;
use ahash::AHashMap;

use super::RecordSource;
use crate::records::RawRecord;
use crate::DataError;

/// Serves chunks out of an in-memory `{ template_id: [records] }` document
#[derive(Debug, Clone, Default)]
pub struct JsonRecordSource {
    name: String,
    templates: AHashMap<String, Vec<RawRecord>>,
}

impl JsonRecordSource {
    /// Build a source; each template's records are sorted by id
    pub fn new(name: impl Into<String>, mut templates: AHashMap<String, Vec<RawRecord>>) -> Self {
        for records in templates.values_mut() {
            records.sort_by(|a, b| a.id.cmp(&b.id));
        }
        Self { name: name.into(), templates }
    }

    pub fn from_json_str(name: impl Into<String>, text: &str) -> Result<Self, DataError> {
        let templates: AHashMap<String, Vec<RawRecord>> = serde_json::from_str(text)?;
        Ok(Self::new(name, templates))
    }

    pub fn from_path(path: &Path) -> Result<Self, DataError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(path.display().to_string(), &text)
    }

    pub fn record_count(&self, template_id: &str) -> usize {
        self.templates.get(template_id).map(Vec::len).unwrap_or(0)
    }
}

#[async_trait]
impl RecordSource for JsonRecordSource {
    async fn request_chunk(
        &self,
        template_id: &str,
        from: usize,
        count: usize,
    ) -> Result<Vec<RawRecord>, DataError> {
        let records = self.templates.get(template_id).ok_or_else(|| DataError::Network {
            template_id: template_id.to_string(),
            message: format!("{} has no records for this template", self.name),
        })?;
        let start = from.min(records.len());
        let end = from.saturating_add(count).min(records.len());
        Ok(records[start..end].to_vec())
    }

    fn source_name(&self) -> &str {
        &self.name
    }
}
