use std::path::Path;

use contactdb_core::config::EngineConfig;
use contactdb_core::import::load_records;
use contactdb_core::{ContactService, ImportReport};

use crate::commands::common::print_json;
use crate::error::CliError;

pub async fn run_import(
    service: &ContactService,
    file: &Path,
    as_json: bool,
) -> Result<ImportReport, CliError> {
    let records = load_records(file)?;
    let report = service.reconcile_batch(records).await;

    if as_json {
        print_json(&report)?;
    } else {
        println!(
            "{} created, {} skipped, {} conflicts, {} failed{}",
            report.created,
            report.skipped,
            report.conflicts,
            report.failed,
            if report.aborted { " (stopped early)" } else { "" }
        );
        for failure in &report.failures {
            println!("  {}: {}", failure.external_id, failure.error);
        }
    }
    Ok(report)
}

/// Apply `--fail-fast` on top of the loaded config
pub fn import_config(mut config: EngineConfig, fail_fast: bool) -> EngineConfig {
    config.import.fail_fast |= fail_fast;
    config
}
