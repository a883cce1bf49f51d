//! contactdb-core - Core library for contactdb
//!
//! This crate contains the contact models, the `SQLite` storage layer, the
//! record merge engine and the conflict reconciliation workflow used by the
//! administrative CLI and any other surface that drives merges or imports.

pub mod config;
pub mod db;
pub mod error;
pub mod import;
pub mod merge;
pub mod models;
pub mod resolve;
pub mod schema;
pub mod services;
pub mod util;

pub use error::{Error, Result};
pub use models::{Contact, ContactDetails, ContactId, ConflictId, ConflictRecord};
pub use import::{ImportReconciler, ImportReport, IncomingRecord, ReconcileOutcome};
pub use merge::{MergeEngine, MergeOutcome};
pub use resolve::{ConflictResolver, ResolutionPolicy};
pub use services::ContactService;
