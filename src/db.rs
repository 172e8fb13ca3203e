//! File-backed task database.
//!
//! `Database` holds the whole task list in memory. The file is read once at
//! startup and rewritten in full after every mutation; the on-disk layout is
//! the flat-JSON format in `storage`.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use crate::storage;
use crate::task::Task;

/// In-memory task list plus file load/save.
#[derive(Debug, Default)]
pub struct Database {
    pub tasks: Vec<Task>,
}

impl Database {
    /// Load the database from the store file.
    ///
    /// A missing file is a fresh start, not an error. Read failures and
    /// corrupt contents degrade to an empty list with a warning on stderr;
    /// they never abort the process.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Database::default();
        }
        let mut buf = String::new();
        match File::open(path).and_then(|mut f| f.read_to_string(&mut buf)) {
            Ok(_) => Database {
                tasks: storage::deserialize(&buf),
            },
            Err(e) => {
                eprintln!("Warning: could not read task store, starting fresh: {e}");
                Database::default()
            }
        }
    }

    /// Save the database to the store file using a temp file + rename so a
    /// crash mid-write cannot truncate the store.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let tmp = path.with_extension("json.tmp");
        let mut f = File::create(&tmp)?;
        f.write_all(storage::serialize(&self.tasks).as_bytes())?;
        f.flush()?;
        fs::rename(tmp, path)?;
        Ok(())
    }

    /// Generate the next available task ID (highest existing ID plus one).
    pub fn next_id(&self) -> u64 {
        self.tasks.iter().map(|t| t.id).max().unwrap_or(0) + 1
    }

    /// Get a task by ID.
    pub fn get(&self, id: u64) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Get a mutable reference to a task by ID.
    pub fn get_mut(&mut self, id: u64) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    /// Remove a task by ID. Returns whether a task was removed.
    pub fn remove(&mut self, id: u64) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        self.tasks.len() < before
    }
}
