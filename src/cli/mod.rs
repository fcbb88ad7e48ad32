//! Command-line surface of the `splitter` binary.
//!
//! Parsing is done by clap; [`dispatch::run`] turns a parsed [`Cli`] into
//! ledger calls and writes reports to any `Write`, so the whole command
//! path can be driven from tests.

pub mod dispatch;
pub mod target;

use crate::core::money::Money;
use crate::engine::allocation::ShareSpec;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shared-expense ledger
#[derive(Debug, Parser)]
#[command(name = "splitter", version, about = "Track shared expenses and settle up", long_about = None)]
pub struct Cli {
    /// Book file (overrides the `store` setting)
    #[arg(short, long, global = true, env = "SPLITTER_DATABASE")]
    pub database: Option<PathBuf>,

    /// Report format for list, stat and balance
    #[arg(long, global = true, value_enum, default_value_t = Format::Text)]
    pub format: Format,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Text,
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create a group and select it
    Create {
        name: String,

        /// Initial members, in roster order
        #[arg(short = 'a', long = "add", required = true, num_args = 1..)]
        members: Vec<String>,

        /// Currency code (defaults to the `currency` setting)
        #[arg(long)]
        currency: Option<String>,
    },

    /// Add members to a group
    Add {
        #[arg(short, long)]
        group: Option<String>,

        #[arg(required = true)]
        members: Vec<String>,
    },

    /// Remove members from a group
    Remove {
        #[arg(short, long)]
        group: Option<String>,

        /// Remove even if a member's balance is not zero
        #[arg(long)]
        force: bool,

        #[arg(required = true)]
        members: Vec<String>,
    },

    /// Delete a group with all its transactions
    DeleteGroup {
        group: String,

        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },

    /// Record a shared expense
    Split {
        amount: Money,

        /// What the expense was for
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        group: Option<String>,

        /// Who paid: name[:amount[%]]; a bare name covers what is left
        #[arg(short, long, required = true)]
        from: Vec<ShareSpec>,

        /// Who consumed: name:amount[%]
        #[arg(short, long)]
        to: Vec<ShareSpec>,

        /// Split the unassigned rest evenly on top of the --to shares
        #[arg(short, long)]
        balance_rest: bool,
    },

    /// Record a direct payment between two members
    Pay {
        amount: Money,

        #[arg(short, long)]
        group: Option<String>,

        #[arg(short, long)]
        from: String,

        #[arg(short, long)]
        to: String,
    },

    /// Reverse the last transaction, or the one with the given id
    Undo {
        #[arg(short, long)]
        group: Option<String>,

        id: Option<u64>,
    },

    /// Show the transaction log
    List {
        #[arg(short, long)]
        group: Option<String>,

        /// Every group
        #[arg(long)]
        all: bool,
    },

    /// Show member balances
    Stat {
        #[arg(short, long)]
        group: Option<String>,

        /// Every group
        #[arg(long)]
        all: bool,
    },

    /// Compute and record the payments that settle a group
    Balance {
        #[arg(short, long)]
        group: Option<String>,

        /// Only show the payments
        #[arg(long)]
        dry_run: bool,
    },
}
