use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use satdex::api;
use satdex::{DbConfig, IngestParams, IngestReport, MemoryStore, Mission, ProductRecord};

use super::args::CliArgs;
use super::errors::AppError;

fn mission_for(dir: &PathBuf, hint: Option<Mission>) -> Mission {
    match hint {
        Some(mission) => mission,
        None => {
            let inferred = Mission::from_archive_name(&dir.to_string_lossy());
            if inferred == Mission::Unknown {
                warn!(input = %dir.display(), "could not infer mission from directory name");
            }
            inferred
        }
    }
}

fn db_config(args: &CliArgs) -> Result<Option<DbConfig>, AppError> {
    if args.dry_run {
        return Ok(None);
    }
    let name = args.db_name.clone().ok_or(AppError::MissingArgument {
        arg: "--db-name (or --dry-run)".to_string(),
    })?;
    let user = args.db_user.clone().ok_or(AppError::MissingArgument {
        arg: "--db-user (or --dry-run)".to_string(),
    })?;
    Ok(Some(DbConfig {
        host: args.db_host.clone(),
        port: args.db_port,
        name,
        user,
        password: std::env::var("PGPASSWORD").unwrap_or_default(),
    }))
}

fn print_summary(record: &ProductRecord, report: &IngestReport) {
    println!(
        "record {} ({} / {})",
        record.id, record.mission, record.product_type
    );
    println!("  name:     {}", record.name);
    println!("  country:  {}", record.country);
    match (record.capture_start, record.capture_stop) {
        (Some(start), Some(stop)) => println!("  capture:  {start} -> {stop}"),
        (Some(start), None) => println!("  capture:  {start} -> ?"),
        _ => println!("  capture:  unresolved"),
    }
    println!(
        "  bands:    {} imported, {} failed",
        report.bands_imported, report.bands_failed
    );
    println!("  indices:  {} rendered", report.indices_rendered);
    println!("  degraded: {}", report.degraded);
    for failure in &report.failures {
        println!("    [{}] {}", failure.stage, failure.detail);
    }
}

pub fn run(args: CliArgs) -> Result<(), Box<dyn std::error::Error>> {
    if args.log {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .init();
    }

    let params = IngestParams {
        indices: args.indices.clone(),
        srid: args.srid,
        output_dir: args.output_dir.clone(),
        render_size: args.render_size,
    };
    let db = db_config(&args)?;
    let store = Arc::new(MemoryStore::new());
    let pipeline = Arc::new(api::default_pipeline(store, params, db)?);

    if let Some(input_dir) = args.input_dir {
        // Batch mode: one worker per extracted product directory.
        info!("Starting batch ingestion from directory: {:?}", input_dir);
        let mut handles = Vec::new();
        for entry in fs::read_dir(&input_dir)? {
            let path = entry?.path();
            if !path.is_dir() {
                info!("Skipping non-directory: {:?}", path);
                continue;
            }
            let mission = mission_for(&path, args.mission);
            let id = Uuid::new_v4().to_string();
            handles.push(api::spawn_ingest(Arc::clone(&pipeline), id, path, mission));
        }

        let mut clean = 0;
        let mut degraded = 0;
        for handle in handles {
            let (record, report) = handle.join()?;
            print_summary(&record, &report);
            if report.degraded {
                degraded += 1;
            } else {
                clean += 1;
            }
        }
        info!("Batch ingestion complete: {} clean, {} degraded", clean, degraded);
    } else {
        let input = args.input.clone().ok_or(AppError::MissingArgument {
            arg: "--input".to_string(),
        })?;
        let mission = mission_for(&input, args.mission);
        let id = args
            .id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let (record, report) = api::ingest_extracted(&pipeline, id, input, mission);
        print_summary(&record, &report);
    }

    Ok(())
}
