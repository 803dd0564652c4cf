use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "srht-provider")]
#[command(version)]
#[command(about = "Manage sourcehut repositories and keys declaratively", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Manifest file (default: <config dir>/srht.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub manifest: Option<PathBuf>,

    /// State file (default: <state dir>/state.json)
    #[arg(long, global = true, value_name = "PATH")]
    pub state: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show what apply would change
    Plan(PlanArgs),

    /// Create, update and delete resources to match the manifest
    Apply(ApplyArgs),

    /// Adopt an existing remote object into state
    ///
    /// Repositories are imported by name, keys by numeric id.
    Import {
        /// Resource address, e.g. sourcehut_repository.dotfiles
        address: String,

        /// Import id
        id: String,
    },

    /// Look up remote data without touching state
    Show(ShowArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
pub struct PlanArgs {
    /// Only plan this address, or every resource of this type
    #[arg(short, long)]
    pub target: Option<String>,

    /// Number of parallel refreshes
    #[arg(short, long, default_value = "4")]
    pub jobs: usize,
}

#[derive(Args)]
pub struct ApplyArgs {
    /// Only apply this address, or every resource of this type
    #[arg(short, long)]
    pub target: Option<String>,

    /// Apply without asking for confirmation
    #[arg(short, long)]
    pub yes: bool,

    /// Show what would change without making changes
    #[arg(long)]
    pub dry_run: bool,

    /// Number of parallel jobs
    #[arg(short, long, default_value = "4")]
    pub jobs: usize,
}

#[derive(Args)]
pub struct ShowArgs {
    /// Print JSON instead of a table
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub what: ShowCommand,
}

#[derive(Subcommand)]
pub enum ShowCommand {
    /// The authenticated user
    User,

    /// A repository owned by the authenticated user
    Repo {
        /// Repository name
        name: String,
    },

    /// A paste and its file hashes
    Paste {
        /// Paste id
        id: String,
    },

    /// Contents of one file of a paste
    Blob {
        /// Paste id
        id: String,

        /// File hash
        hash: String,
    },

    /// All pastes of the authenticated user
    Pastes,
}
