use contactdb_core::ContactService;

use crate::commands::common::{format_contact_line, parse_contact_id, print_json};
use crate::error::CliError;

pub async fn run_merge(
    service: &ContactService,
    survivor: &str,
    losers: &[String],
    as_json: bool,
) -> Result<(), CliError> {
    let survivor = parse_contact_id(survivor)?;
    let losers = losers
        .iter()
        .map(|loser| parse_contact_id(loser))
        .collect::<Result<Vec<_>, _>>()?;

    let outcomes = service.merge_many(&survivor, &losers).await?;

    if as_json {
        return print_json(&outcomes);
    }

    for outcome in &outcomes {
        let conflict = outcome
            .conflict
            .as_ref()
            .map_or_else(String::new, |conflict| {
                format!(
                    ", conflict {} on {}",
                    conflict.id,
                    outcome.conflicting_fields.join(", ")
                )
            });
        println!(
            "merged {}: {} filled, {} appended, {} moved, {} discarded{conflict}",
            outcome.loser_id,
            outcome.filled_fields.len(),
            outcome.appended_items,
            outcome.moved_children,
            outcome.discarded_children,
        );
    }
    if let Some(last) = outcomes.last() {
        println!("{}", format_contact_line(&last.survivor));
    }
    Ok(())
}
