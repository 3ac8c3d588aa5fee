//! Command-line interface for memberdesk.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// memberdesk - member administration backend
#[derive(Parser)]
#[command(name = "memberdesk")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API (default)
    #[command(alias = "daemon")]
    Serve,

    /// Create default config file
    #[command(alias = "--init")]
    Init,

    /// Register an administrator account
    ///
    /// The welcome mail goes through the configured transport before the command exits.
    CreateAdmin {
        /// Display name
        #[arg(long)]
        name: String,
        /// Login email
        #[arg(long)]
        email: String,
        /// Password (at least 6 characters)
        #[arg(long)]
        password: String,
        /// Require an emailed passcode at login
        #[arg(long)]
        two_factor: bool,
    },

    /// Write every member to a CSV file
    ExportMembers {
        /// Destination file, `-` for stdout
        path: PathBuf,
    },
}

pub use commands::*;
