//! Database layer for contactdb

mod conflict_repository;
mod connection;
mod directory_repository;
mod migrations;
mod registration_repository;
mod repository;
pub(crate) mod sql;

pub use conflict_repository::{ConflictRepository, SqliteConflictRepository};
pub use connection::Database;
pub use directory_repository::{DirectoryRepository, SqliteDirectoryRepository};
pub use registration_repository::{Repoint, RegistrationRepository, SqliteRegistrationRepository};
pub use repository::{ContactRepository, SqliteContactRepository};
