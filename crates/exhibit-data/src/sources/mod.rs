//! Record sources and the chunked loader

pub mod json_source;

pub use json_source::JsonRecordSource;

use async_trait::async_trait;

use exhibit_core::events::events::{LoadComplete, LoadFailed, RecordsLoaded};
use exhibit_core::EventBus;

use crate::config::{EngineConfig, UndefinedTokens};
use crate::records::{RawRecord, Record, RecordStore};
use crate::schema::AttributeCatalog;
use crate::DataError;

/// Supplier of record chunks
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Records `from..from + count` of a template, ordered by id
    async fn request_chunk(
        &self,
        template_id: &str,
        from: usize,
        count: usize,
    ) -> Result<Vec<RawRecord>, DataError>;

    /// Name for log messages
    fn source_name(&self) -> &str;
}

/// Requests chunks until every template holds its declared count
#[derive(Debug, Clone)]
pub struct Loader {
    chunk_size: usize,
    undefined: UndefinedTokens,
}

impl Loader {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            chunk_size: config.chunk_size.max(1),
            undefined: config.undefined.clone(),
        }
    }

    /// Fill `store` from `source`
    ///
    /// Templates load in declaration order. The first failure is published
    /// as `LoadFailed` and stops loading, leaving the store partially
    /// filled. No retry is attempted.
    pub async fn load_all(
        &self,
        store: &mut RecordStore,
        catalog: &AttributeCatalog,
        source: &dyn RecordSource,
        events: &EventBus,
    ) -> Result<usize, DataError> {
        tracing::info!(
            "Loading {} records from {}",
            store.total_records(),
            source.source_name()
        );

        for template in 0..store.template_count() {
            let Some(def) = store.template(template).cloned() else {
                continue;
            };

            while store.loaded_count(template) < def.count {
                let from = store.loaded_count(template);
                let count = self.chunk_size.min(def.count - from);

                let result = self
                    .fetch_chunk(&def.id, from, count, source)
                    .await
                    .and_then(|raws| {
                        raws.into_iter()
                            .map(|raw| Record::from_raw(raw, &def, catalog, &self.undefined))
                            .collect::<Result<Vec<_>, _>>()
                    })
                    .and_then(|records| store.append_chunk(template, records));

                match result {
                    Ok(loaded) => events.publish(RecordsLoaded {
                        template,
                        loaded,
                        declared: def.count,
                    }),
                    Err(e) => {
                        tracing::error!("Loading template '{}' failed: {}", def.id, e);
                        events.publish(LoadFailed {
                            template_id: def.id.clone(),
                            error: e.to_string(),
                        });
                        return Err(e);
                    }
                }
            }
        }

        let total = store.total_records();
        tracing::info!("Loaded {} records", total);
        events.publish(LoadComplete { total_records: total });
        Ok(total)
    }

    async fn fetch_chunk(
        &self,
        template_id: &str,
        from: usize,
        count: usize,
        source: &dyn RecordSource,
    ) -> Result<Vec<RawRecord>, DataError> {
        let chunk = source
            .request_chunk(template_id, from, count)
            .await
            .map_err(|e| match e {
                DataError::Network { .. } => e,
                other => DataError::Network {
                    template_id: template_id.to_string(),
                    message: other.to_string(),
                },
            })?;

        if chunk.is_empty() {
            return Err(DataError::Network {
                template_id: template_id.to_string(),
                message: format!("no records returned from offset {}", from),
            });
        }
        if chunk.len() > count {
            return Err(DataError::Network {
                template_id: template_id.to_string(),
                message: format!("asked for {} records, got {}", count, chunk.len()),
            });
        }
        Ok(chunk)
    }
}
