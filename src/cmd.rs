//! Command implementations for the CLI interface.
//!
//! Each subcommand gets a `cmd_*` handler. Handlers that mutate the task
//! list save the store before printing their confirmation; lookup failures
//! go to stderr with a non-zero exit.

use clap::Subcommand;
use clap_complete::{generate, Shell};

use std::path::Path;

use crate::db::Database;
use crate::storage::format_timestamp;
use crate::task::{Status, Task};

#[derive(Subcommand)]
pub enum Commands {
    /// Add a new task.
    Add {
        /// Description of the task.
        description: String,
    },

    /// Replace the description of a task.
    Update {
        /// Task ID to update.
        id: u64,
        /// New description.
        description: String,
    },

    /// Delete a task by ID.
    Delete {
        /// Task ID to delete.
        id: u64,
    },

    /// Set the status of a task.
    Mark {
        /// Task ID to mark.
        id: u64,
        /// New status: todo | in-progress | done.
        #[arg(value_enum)]
        status: Status,
    },

    /// List tasks, optionally filtered by status.
    List {
        /// Show only tasks with this status.
        #[arg(long, value_enum)]
        status: Option<Status>,
    },

    /// Generate shell completion scripts.
    Completions {
        /// Shell to generate completions for.
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Add a new task to the store.
pub fn cmd_add(db: &mut Database, db_path: &Path, description: String) {
    let id = db.next_id();
    db.tasks.push(Task::new(id, description));
    if let Err(e) = db.save(db_path) {
        eprintln!("Failed to save task store: {e}");
        std::process::exit(1);
    }
    println!("Added task {id}");
}

/// Replace an existing task's description.
pub fn cmd_update(db: &mut Database, db_path: &Path, id: u64, description: String) {
    let Some(task) = db.get_mut(id) else {
        eprintln!("Task {id} not found.");
        std::process::exit(1);
    };
    task.description = description;
    task.touch();
    if let Err(e) = db.save(db_path) {
        eprintln!("Failed to save task store: {e}");
        std::process::exit(1);
    }
    println!("Updated task {id}");
}

/// Delete a task by ID.
pub fn cmd_delete(db: &mut Database, db_path: &Path, id: u64) {
    if db.get(id).is_none() {
        eprintln!("Task {id} not found.");
        std::process::exit(1);
    }
    db.remove(id);
    if let Err(e) = db.save(db_path) {
        eprintln!("Failed to save task store: {e}");
        std::process::exit(1);
    }
    println!("Deleted task {id}");
}

/// Set a task's status.
pub fn cmd_mark(db: &mut Database, db_path: &Path, id: u64, status: Status) {
    let Some(task) = db.get_mut(id) else {
        eprintln!("Task {id} not found.");
        std::process::exit(1);
    };
    task.status = status;
    task.touch();
    if let Err(e) = db.save(db_path) {
        eprintln!("Failed to save task store: {e}");
        std::process::exit(1);
    }
    println!("Marked task {id} as {}", status.as_str());
}

/// List tasks, optionally filtered by status.
pub fn cmd_list(db: &Database, status: Option<Status>) {
    let filtered: Vec<&Task> = db
        .tasks
        .iter()
        .filter(|t| {
            if let Some(s) = status {
                if t.status != s {
                    return false;
                }
            }
            true
        })
        .collect();

    if filtered.is_empty() {
        match status {
            Some(s) => println!("No tasks found with status: {}", s.as_str()),
            None => println!("No tasks in the list."),
        }
        return;
    }
    print_table(&filtered);
}

/// Print tasks in a formatted table.
fn print_table(tasks: &[&Task]) {
    println!(
        "{:<5} {:<12} {:<20} {:<20} {}",
        "ID", "Status", "Created", "Updated", "Description"
    );
    for t in tasks {
        println!(
            "{:<5} {:<12} {:<20} {:<20} {}",
            t.id,
            t.status.as_str(),
            format_timestamp(&t.created_at),
            format_timestamp(&t.updated_at),
            t.description
        );
    }
}

/// Generate shell completion scripts.
pub fn cmd_completions(shell: Shell) {
    use crate::cli::Cli;
    use clap::CommandFactory;

    let mut app = Cli::command();
    let app_name = app.get_name().to_string();
    generate(shell, &mut app, app_name, &mut std::io::stdout());
}
