//! Service layer shared by the command-line tool and any other front end.

pub mod contact_service;

pub use contact_service::ContactService;
