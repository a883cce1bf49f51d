use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use contactdb_core::ResolutionPolicy;

#[derive(Parser)]
#[command(name = "contactdb")]
#[command(about = "Merge duplicate contacts and reconcile registry imports")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Optional path to the JSON config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Merge one or more duplicates into a surviving contact
    Merge {
        /// Contact that survives the merge
        survivor: String,
        /// Contacts folded into the survivor and deleted
        #[arg(required = true)]
        losers: Vec<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a contact with its registrations and pending conflicts
    Show {
        /// Contact ID
        contact: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List pending conflicts
    Conflicts {
        /// Only conflicts raised against this contact
        #[arg(long, value_name = "ID")]
        contact: Option<String>,
        /// Number of conflicts to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Overwrite the existing contact with a conflict's values
    Accept {
        /// Conflict ID
        conflict: String,
    },
    /// Discard a conflict and keep the existing contact
    KeepOld {
        /// Conflict ID
        conflict: String,
    },
    /// Keep both sides of a conflict as separate contacts
    KeepBoth {
        /// Conflict ID
        conflict: String,
        /// JSON snapshot of the external registry
        #[arg(long, value_name = "PATH")]
        registry: Option<PathBuf>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Settle every pending conflict with one policy
    ResolveAll {
        /// keep-old or save-incoming
        policy: ResolutionPolicy,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Reconcile a JSON batch of registry records
    Import {
        /// JSON array of records keyed by `external_id`
        file: PathBuf,
        /// Stop at the first failing record
        #[arg(long)]
        fail_fast: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
    #[value(name = "powershell")]
    PowerShell,
}
