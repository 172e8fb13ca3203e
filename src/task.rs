//! Task data structure and related functionality.
//!
//! Defines the `Task` record held in the store and the closed `Status`
//! enumeration with its on-disk string forms.

use chrono::{DateTime, Local, Timelike};
use clap::ValueEnum;

/// A single to-do entry: identity, text, status, and two timestamps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Task {
    pub id: u64,
    pub description: String,
    pub status: Status,
    pub created_at: DateTime<Local>,
    pub updated_at: DateTime<Local>,
}

impl Task {
    /// Create a task with both timestamps set to the current time.
    pub fn new(id: u64, description: String) -> Self {
        let now = current_timestamp();
        Task {
            id,
            description,
            status: Status::Todo,
            created_at: now,
            updated_at: now,
        }
    }

    /// Record a mutation by bumping `updated_at` to the current time.
    pub fn touch(&mut self) {
        self.updated_at = current_timestamp();
    }
}

/// Task completion status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Status {
    #[default]
    Todo,
    InProgress,
    Done,
}

impl Status {
    /// The string form stored in the task file.
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Todo => "todo",
            Status::InProgress => "in-progress",
            Status::Done => "done",
        }
    }

    /// Parse a stored status string. Unrecognized input falls back to `Todo`.
    pub fn parse(s: &str) -> Status {
        match s.to_lowercase().as_str() {
            "in-progress" => Status::InProgress,
            "done" => Status::Done,
            _ => Status::Todo,
        }
    }
}

/// Current local time truncated to whole seconds, the resolution of the
/// stored timestamp format.
pub fn current_timestamp() -> DateTime<Local> {
    let now = Local::now();
    now.with_nanosecond(0).unwrap_or(now)
}
