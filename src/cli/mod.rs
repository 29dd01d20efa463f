//! CLI module - command-line interface for provisr.

use clap::{Parser, Subcommand};

/// provisr - Transactional account provisioning
#[derive(Parser)]
#[command(name = "provisr")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Provision a single account
    #[command(alias = "p")]
    Provision {
        /// Username, 3-50 characters, unique
        username: String,
        /// Email address, unique
        email: String,
    },

    /// Provision the demo batch (alice, bob, charlie)
    Seed,

    /// List accounts with their roles
    #[command(alias = "ls", alias = "l")]
    List,

    /// List active (unexpired) sessions
    Sessions,

    /// Show role -> permission grants
    Grants,

    /// Create default config file
    Init,
}
