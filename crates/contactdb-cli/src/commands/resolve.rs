use std::path::Path;
use std::sync::Arc;

use contactdb_core::import::RegistrySnapshot;
use contactdb_core::resolve::KeepBothOutcome;
use contactdb_core::{ContactService, ResolutionPolicy};

use crate::commands::common::{format_contact_line, parse_conflict_id, print_json};
use crate::error::CliError;

pub async fn run_accept(service: &ContactService, conflict: &str) -> Result<(), CliError> {
    let conflict_id = parse_conflict_id(conflict)?;
    let contact = service.accept_incoming(&conflict_id).await?;
    println!("{}", format_contact_line(&contact));
    Ok(())
}

pub async fn run_keep_old(service: &ContactService, conflict: &str) -> Result<(), CliError> {
    let conflict_id = parse_conflict_id(conflict)?;
    service.keep_old(&conflict_id).await?;
    println!("{conflict_id}");
    Ok(())
}

/// Without `--registry` only conflicts on local-only contacts can be split.
pub async fn run_keep_both(
    service: &ContactService,
    conflict: &str,
    registry_path: Option<&Path>,
    as_json: bool,
) -> Result<(), CliError> {
    let conflict_id = parse_conflict_id(conflict)?;
    let registry = match registry_path {
        Some(path) => RegistrySnapshot::load(path)?,
        None => RegistrySnapshot::default(),
    };

    let outcome = service.keep_both(&conflict_id, Arc::new(registry)).await?;
    if as_json {
        return print_json(&outcome);
    }

    match outcome {
        KeepBothOutcome::Materialized { contact_id } => println!("created {contact_id}"),
        KeepBothOutcome::Reimported {
            replaced,
            external_ids,
            removed_conflicts,
            relations_moved_to,
            report,
        } => {
            println!(
                "replaced {replaced} by re-importing {}: {} created, {} skipped, {} conflicts",
                external_ids.join(", "),
                report.created,
                report.skipped,
                report.conflicts
            );
            println!(
                "dropped {removed_conflicts} pending conflicts, relations moved to {relations_moved_to}"
            );
        }
    }
    Ok(())
}

pub async fn run_resolve_all(
    service: &ContactService,
    policy: ResolutionPolicy,
    as_json: bool,
) -> Result<(), CliError> {
    let report = service.resolve_all(policy).await?;
    if as_json {
        return print_json(&report);
    }

    println!(
        "{}: {} resolved, {} failed",
        report.policy, report.resolved, report.failed
    );
    for failure in &report.failures {
        println!("  {}: {}", failure.conflict_id, failure.error);
    }
    Ok(())
}
