//! Data models for contactdb

mod conflict;
mod contact;
mod directory;
mod ids;
mod registration;

pub use conflict::{ConflictRecord, ConflictSource};
pub use contact::{Contact, ContactDetails, IncomingContact};
pub use directory::{Event, Group, Organization};
pub use ids::{ConflictId, ContactId, EventId, GroupId, OrganizationId, RegistrationId};
pub use registration::{Registration, RegistrationStatus};
