//! # tasks - File-Backed To-Do CLI
//!
//! A small command-line task manager that keeps its data in a single
//! flat-JSON text file.
//!
//! ## Quick Start
//!
//! ```bash
//! # Add a task
//! tasks add "Write the quarterly report"
//!
//! # See what's pending
//! tasks list
//! tasks list --status in-progress
//!
//! # Move work along
//! tasks mark 1 done
//! tasks update 1 "Write and circulate the quarterly report"
//! tasks delete 1
//! ```
//!
//! Data lives in `./tasks.json` by default (override with `--db`). The file
//! is plain text and diff-friendly; a damaged entry is skipped on load
//! rather than taking the whole list down.

use std::path::PathBuf;

use clap::Parser;

pub mod cli;
pub mod cmd;
pub mod db;
pub mod storage;
pub mod task;

use cli::Cli;
use cmd::*;
use db::Database;

fn main() {
    let cli = Cli::parse();

    // Completions don't need the store.
    if let Commands::Completions { shell } = &cli.command {
        cmd_completions(*shell);
        return;
    }

    let db_path = cli.db.unwrap_or_else(|| PathBuf::from("tasks.json"));
    let mut db = Database::load(&db_path);

    match cli.command {
        Commands::Add { description } => cmd_add(&mut db, &db_path, description),

        Commands::Update { id, description } => cmd_update(&mut db, &db_path, id, description),

        Commands::Delete { id } => cmd_delete(&mut db, &db_path, id),

        Commands::Mark { id, status } => cmd_mark(&mut db, &db_path, id, status),

        Commands::List { status } => cmd_list(&db, status),

        Commands::Completions { .. } => unreachable!("completions handled above"),
    }
}
