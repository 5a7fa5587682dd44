use clap::{Parser, Subcommand};

use crate::models::migration::MigrationTarget;

#[derive(Parser)]
#[command(name = "policycraft")]
#[command(author, version, about = "Policy service with embedded schema migrations")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Inspect or move the database schema version
    Migrate {
        #[command(subcommand)]
        action: MigrateCommand,
    },
}

#[derive(Subcommand)]
pub enum MigrateCommand {
    /// Apply pending migrations
    Up {
        /// Revision id, or `head`
        #[arg(long, default_value = "head")]
        target: MigrationTarget,
    },

    /// Revert applied migrations
    Down {
        /// Revision id, or `base` to revert everything
        #[arg(long, default_value = "base")]
        target: MigrationTarget,
    },

    /// Print the applied revision
    Current,

    /// List the migration chain with applied markers
    History,
}
