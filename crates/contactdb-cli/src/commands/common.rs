use std::env;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use contactdb_core::config::{EngineConfig, CONFIG_FILE_NAME};
use contactdb_core::models::{ConflictRecord, Contact};
use contactdb_core::{ConflictId, ContactId, ContactService};
use serde::Serialize;

use crate::error::CliError;

pub const DB_PATH_ENV: &str = "CONTACTDB_DB_PATH";
pub const DEFAULT_LOG_FILTER: &str = "contactdb=info";

pub fn resolve_config_path(cli_config_path: Option<PathBuf>) -> Result<PathBuf, CliError> {
    if let Some(path) = cli_config_path {
        return Ok(path);
    }
    dirs::config_dir()
        .map(|dir| dir.join("contactdb").join(CONFIG_FILE_NAME))
        .ok_or_else(|| CliError::Config("Failed to resolve CLI config directory".to_string()))
}

pub fn load_config(cli_config_path: Option<PathBuf>) -> Result<EngineConfig, CliError> {
    let path = resolve_config_path(cli_config_path)?;
    Ok(EngineConfig::load_from_path(&path)?)
}

/// `--db-path`, then the environment, then the config file, then the data dir
pub fn resolve_db_path(
    cli_db_path: Option<PathBuf>,
    config: &EngineConfig,
) -> Result<PathBuf, CliError> {
    if let Some(path) = cli_db_path
        .or_else(|| env::var_os(DB_PATH_ENV).map(PathBuf::from))
        .or_else(|| config.database_path.clone())
    {
        return Ok(path);
    }
    default_db_path()
}

pub fn default_db_path() -> Result<PathBuf, CliError> {
    dirs::data_dir()
        .map(|dir| dir.join("contactdb").join("contactdb.db"))
        .ok_or_else(|| CliError::Config("Failed to resolve CLI data directory".to_string()))
}

pub fn log_filter(config: &EngineConfig) -> String {
    config
        .log_filter
        .clone()
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string())
}

pub async fn open_service(
    db_path: &Path,
    config: &EngineConfig,
) -> Result<ContactService, CliError> {
    Ok(ContactService::open_path(db_path, config).await?)
}

pub fn parse_contact_id(value: &str) -> Result<ContactId, CliError> {
    value.parse().map_err(|_| CliError::InvalidId {
        kind: "contact",
        value: value.to_string(),
    })
}

pub fn parse_conflict_id(value: &str) -> Result<ConflictId, CliError> {
    value.parse().map_err(|_| CliError::InvalidId {
        kind: "conflict",
        value: value.to_string(),
    })
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn format_timestamp(ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms).map_or_else(
        || ms.to_string(),
        |time| time.format("%Y-%m-%d %H:%M").to_string(),
    )
}

pub fn format_contact_line(contact: &Contact) -> String {
    let mut line = format!("{}  {}", contact.id, contact.details.display_name());
    if !contact.details.department.is_empty() {
        line.push_str(&format!(" ({})", contact.details.department));
    }
    if contact.has_external_ids() {
        line.push_str(&format!(" [{}]", contact.external_ids.join(", ")));
    }
    line
}

pub fn format_conflict_lines(conflicts: &[ConflictRecord]) -> Vec<String> {
    if conflicts.is_empty() {
        return vec!["No pending conflicts.".to_string()];
    }

    conflicts
        .iter()
        .map(|conflict| {
            format!(
                "{}  {:<6}  {}  against {}  {}",
                conflict.id,
                conflict.source.as_str(),
                format_timestamp(conflict.created_at),
                conflict.existing_contact_id,
                conflict.details.display_name()
            )
        })
        .collect()
}
