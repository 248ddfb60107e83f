//! Demo mode
//! Runs the bundled museum exhibit when no files are given

use exhibit_data::{ExhibitSchema, JsonRecordSource};

use crate::perspective::Perspective;

const DEMO_SCHEMA: &str = include_str!("../../../demos/schema.json");
const DEMO_RECORDS: &str = include_str!("../../../demos/records.json");
const DEMO_PERSPECTIVE: &str = include_str!("../../../demos/perspective.json");

pub fn schema() -> anyhow::Result<ExhibitSchema> {
    Ok(ExhibitSchema::from_json_str(DEMO_SCHEMA)?)
}

pub fn source() -> anyhow::Result<JsonRecordSource> {
    Ok(JsonRecordSource::from_json_str("Demo: museum objects and people", DEMO_RECORDS)?)
}

pub fn perspective() -> anyhow::Result<Perspective> {
    Ok(serde_json::from_str(DEMO_PERSPECTIVE)?)
}
