//! Main application entry point

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use exhibit_core::events::events::{LoadFailed, RecordsLoaded};
use exhibit_core::typed_handler;
use exhibit_data::{EngineConfig, ExhibitSchema, JsonRecordSource};
use exhibit_views::ExhibitViewer;

use perspective::Perspective;

mod demo;
mod perspective;
mod report;

/// Load an exhibit, apply a perspective and print the resulting stream
#[derive(Debug, Parser)]
#[command(name = "exhibit")]
#[command(about = "Exhibit engine demo; runs the bundled exhibit when no files are given")]
struct Args {
    /// Exhibit schema (templates, attributes, views)
    #[arg(value_name = "SCHEMA", requires = "records")]
    schema: Option<PathBuf>,

    /// Records document keyed by template id
    #[arg(value_name = "RECORDS")]
    records: Option<PathBuf>,

    /// Engine configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Filters to stack and attributes to report on
    #[arg(long, value_name = "FILE")]
    perspective: Option<PathBuf>,
}

impl Args {
    fn is_demo(&self) -> bool {
        self.schema.is_none()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => EngineConfig::from_path(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };

    let (schema, source) = match (&args.schema, &args.records) {
        (Some(schema), Some(records)) => (
            ExhibitSchema::from_path(schema)
                .with_context(|| format!("Failed to load schema {}", schema.display()))?,
            JsonRecordSource::from_path(records)
                .with_context(|| format!("Failed to load records {}", records.display()))?,
        ),
        _ => {
            info!("No exhibit given, running the demo");
            (demo::schema()?, demo::source()?)
        }
    };

    let perspective = match &args.perspective {
        Some(path) => Perspective::from_path(path)?,
        None if args.is_demo() => demo::perspective()?,
        None => Perspective::default(),
    };

    let viewer = ExhibitViewer::new(schema, config)?;
    viewer
        .events()
        .subscribe::<RecordsLoaded>(typed_handler(|event: &RecordsLoaded| {
            tracing::debug!(
                "Template {}: {} of {} records",
                event.template,
                event.loaded,
                event.declared
            );
        }));
    viewer
        .events()
        .subscribe::<LoadFailed>(typed_handler(|event: &LoadFailed| {
            tracing::error!("Template '{}' failed to load: {}", event.template_id, event.error);
        }));

    let full = viewer.load(&source).await?;
    info!("Loaded {} records", full.len());

    let stream = perspective.apply(&viewer)?;
    info!(
        "{} filters leave {} of {} records",
        viewer.filter_ids().len(),
        stream.len(),
        full.len()
    );

    report::print_stream(&viewer, &stream)?;
    if let Some(attribute) = &perspective.categories {
        report::print_categories(&viewer, attribute, &stream)?;
    }
    if let Some(attribute) = &perspective.order {
        report::print_order(&viewer, attribute, &stream)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("exhibit").chain(list.iter().copied()))
    }

    #[test]
    fn test_no_arguments_runs_demo() {
        assert!(args(&[]).unwrap().is_demo());
    }

    #[test]
    fn test_positional_files_and_options() {
        let parsed = args(&["s.json", "r.json", "--perspective", "p.json"]).unwrap();
        assert_eq!(parsed.schema, Some(PathBuf::from("s.json")));
        assert_eq!(parsed.records, Some(PathBuf::from("r.json")));
        assert_eq!(parsed.perspective, Some(PathBuf::from("p.json")));
        assert!(parsed.config.is_none());
    }

    #[test]
    fn test_bad_arguments() {
        assert!(args(&["only-schema.json"]).is_err());
        assert!(args(&["--config"]).is_err());
        assert!(args(&["--verbose"]).is_err());
    }
}
