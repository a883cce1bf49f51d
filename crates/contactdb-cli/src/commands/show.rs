use contactdb_core::models::{ConflictRecord, Contact, Registration};
use contactdb_core::ContactService;
use serde::Serialize;

use crate::commands::common::{
    format_conflict_lines, format_contact_line, format_timestamp, parse_contact_id, print_json,
};
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct ContactView {
    pub contact: Contact,
    pub registrations: Vec<Registration>,
    pub conflicts: Vec<ConflictRecord>,
}

pub async fn load_contact_view(
    service: &ContactService,
    id: &str,
) -> Result<ContactView, CliError> {
    let contact_id = parse_contact_id(id)?;
    let contact = service
        .get_contact(&contact_id)
        .await?
        .ok_or_else(|| CliError::ContactNotFound(id.to_string()))?;

    Ok(ContactView {
        registrations: service.list_registrations(&contact_id).await?,
        conflicts: service.list_conflicts_for(&contact_id).await?,
        contact,
    })
}

pub async fn run_show(service: &ContactService, id: &str, as_json: bool) -> Result<(), CliError> {
    let view = load_contact_view(service, id).await?;
    if as_json {
        return print_json(&view);
    }

    println!("{}", format_contact_line(&view.contact));
    for email in &view.contact.emails {
        println!("  email: {email}");
    }
    for phone in view.contact.phones.iter().chain(&view.contact.mobiles) {
        println!("  phone: {phone}");
    }
    for registration in &view.registrations {
        println!(
            "  registration: event {} {} on {}",
            registration.event_id,
            registration.status,
            format_timestamp(registration.date)
        );
    }
    if !view.conflicts.is_empty() {
        for line in format_conflict_lines(&view.conflicts) {
            println!("  conflict: {line}");
        }
    }
    Ok(())
}
