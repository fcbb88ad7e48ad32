//! splitter CLI
//!
//! Track shared expenses of a group from the command line.
//!
//! # Usage
//!
//! ```bash
//! # Create a group (and select it)
//! splitter create spezi -a fred jenny george
//!
//! # fred paid 3.50, jenny 30%; everyone shares equally
//! splitter split 20 -n Rewe -f fred:3.50 -f jenny:30%
//!
//! # Show balances, then settle
//! splitter stat
//! splitter balance --dry-run
//! splitter balance
//! ```

use clap::Parser;
use log::error;
use splitter::cli::dispatch;
use splitter::cli::Cli;
use splitter::ledger::book::Ledger;
use splitter::ledger::file::JsonFileStore;
use splitter::settings::Settings;
use std::process;

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let settings = Settings::new().unwrap_or_else(|e| {
        eprintln!("Error loading settings: {}", e);
        process::exit(2);
    });
    let path = cli.database.clone().unwrap_or_else(|| settings.store.clone());
    let store = JsonFileStore::open(&path).unwrap_or_else(|e| {
        eprintln!("Error opening {}: {}", path.display(), e);
        process::exit(2);
    });

    let mut ledger = Ledger::new(store);
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if let Err(e) = dispatch::run(&mut ledger, cli, &settings.currency(), &mut out) {
        error!("command failed: {:?}", e);
        eprintln!("Error: {}", e);
        process::exit(e.exit_code());
    }
}
