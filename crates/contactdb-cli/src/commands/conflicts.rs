use contactdb_core::ContactService;

use crate::commands::common::{format_conflict_lines, parse_contact_id, print_json};
use crate::error::CliError;

pub async fn run_conflicts(
    service: &ContactService,
    contact: Option<&str>,
    limit: usize,
    as_json: bool,
) -> Result<(), CliError> {
    let conflicts = match contact {
        Some(id) => {
            let contact_id = parse_contact_id(id)?;
            let mut conflicts = service.list_conflicts_for(&contact_id).await?;
            conflicts.truncate(limit);
            conflicts
        }
        None => service.list_conflicts(limit, 0).await?,
    };

    if as_json {
        return print_json(&conflicts);
    }
    for line in format_conflict_lines(&conflicts) {
        println!("{line}");
    }
    Ok(())
}
