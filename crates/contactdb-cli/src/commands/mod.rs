pub mod common;
pub mod completions;
pub mod conflicts;
pub mod import;
pub mod merge;
pub mod resolve;
pub mod show;
