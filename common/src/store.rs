use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use serde::{Deserialize, Serialize};

/// Per-hunt record file, one JSON record per line.
pub const TREASURE_FILE: &str = "treasures.jsonl";
/// Per-hunt operation log.
pub const LOG_FILE: &str = "hunt.log";
/// Prefix of the convenience symlink pointing at a hunt's log.
pub const LOG_LINK_PREFIX: &str = "hunt-log-";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Treasure {
    pub id: u32,
    pub username: String,
    pub latitude: f64,
    pub longitude: f64,
    pub clue: String,
    pub value: i64,
    /// Removal is logical: the record stays in the file with this cleared.
    pub active: bool,
}

/// Record store rooted at a hunts directory, one subdirectory per hunt.
#[derive(Debug, Clone)]
pub struct HuntStore {
    root: PathBuf,
}

impl HuntStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        HuntStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn hunt_dir(&self, hunt: &str) -> PathBuf {
        self.root.join(hunt)
    }

    pub fn treasure_path(&self, hunt: &str) -> PathBuf {
        self.hunt_dir(hunt).join(TREASURE_FILE)
    }

    pub fn log_path(&self, hunt: &str) -> PathBuf {
        self.hunt_dir(hunt).join(LOG_FILE)
    }

    /// Where the per-hunt log symlink lives: next to the hunts root.
    pub fn log_link_path(&self, hunt: &str) -> PathBuf {
        let base = self.root.parent().filter(|p| !p.as_os_str().is_empty());
        base.unwrap_or(Path::new("."))
            .join(format!("{LOG_LINK_PREFIX}{hunt}"))
    }

    /// Whether a record file exists for the hunt at all.
    pub fn has_records(&self, hunt: &str) -> bool {
        self.treasure_path(hunt).exists()
    }

    /// Hunt directory names under the root, sorted. A missing root counts as
    /// no hunts, not an error.
    pub fn list_hunts(&self) -> Result<Vec<String>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("failed to read hunts directory {}", self.root.display())
                });
            }
        };

        let mut hunts = Vec::new();
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                hunts.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        hunts.sort();
        Ok(hunts)
    }

    /// All records of a hunt, active or not. A hunt without a record file
    /// yields an empty list.
    pub fn load(&self, hunt: &str) -> Result<Vec<Treasure>> {
        let path = self.treasure_path(hunt);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("failed to read treasure file {}", path.display()));
            }
        };

        let mut treasures = Vec::new();
        for (lineno, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let treasure: Treasure = serde_json::from_str(line).with_context(|| {
                format!("malformed record at {}:{}", path.display(), lineno + 1)
            })?;
            treasures.push(treasure);
        }
        Ok(treasures)
    }

    /// Next free id: one past the highest active id, starting at 1. Removing
    /// the highest treasure frees its id for reuse.
    pub fn next_id(&self, hunt: &str) -> Result<u32> {
        let max = self
            .load(hunt)?
            .iter()
            .filter(|t| t.active)
            .map(|t| t.id)
            .max()
            .unwrap_or(0);
        Ok(max + 1)
    }

    pub fn append(&self, hunt: &str, treasure: &Treasure) -> Result<()> {
        let dir = self.hunt_dir(hunt);
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create hunt directory {}", dir.display()))?;

        let path = self.treasure_path(hunt);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open treasure file {}", path.display()))?;
        let line = serde_json::to_string(treasure)?;
        writeln!(file, "{line}")
            .with_context(|| format!("failed to write treasure file {}", path.display()))?;
        Ok(())
    }

    /// Mark the treasure with `id` inactive. Returns whether it was found
    /// among the active records.
    pub fn deactivate(&self, hunt: &str, id: u32) -> Result<bool> {
        let mut treasures = self.load(hunt)?;
        let Some(target) = treasures.iter_mut().find(|t| t.active && t.id == id) else {
            return Ok(false);
        };
        target.active = false;
        self.rewrite(hunt, &treasures)?;
        Ok(true)
    }

    fn rewrite(&self, hunt: &str, treasures: &[Treasure]) -> Result<()> {
        let path = self.treasure_path(hunt);
        let mut out = String::new();
        for t in treasures {
            out.push_str(&serde_json::to_string(t)?);
            out.push('\n');
        }
        fs::write(&path, out)
            .with_context(|| format!("failed to rewrite treasure file {}", path.display()))?;
        Ok(())
    }

    /// Append a timestamped line to the hunt's log and refresh the symlink
    /// pointing at it.
    pub fn log_operation(&self, hunt: &str, operation: &str) -> Result<()> {
        let dir = self.hunt_dir(hunt);
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create hunt directory {}", dir.display()))?;

        let path = self.log_path(hunt);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open log file {}", path.display()))?;
        let stamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        writeln!(file, "[{stamp}] {operation}")
            .with_context(|| format!("failed to write log file {}", path.display()))?;

        self.refresh_log_link(hunt)
    }

    fn refresh_log_link(&self, hunt: &str) -> Result<()> {
        let link = self.log_link_path(hunt);
        match fs::remove_file(&link) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("failed to replace log link {}", link.display()));
            }
        }
        std::os::unix::fs::symlink(self.log_path(hunt), &link)
            .with_context(|| format!("failed to create log link {}", link.display()))
    }

    /// Remove a hunt's record file, log, log symlink and directory.
    pub fn remove_hunt(&self, hunt: &str) -> Result<()> {
        for path in [self.treasure_path(hunt), self.log_path(hunt), self.log_link_path(hunt)] {
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(e)
                        .with_context(|| format!("failed to remove {}", path.display()));
                }
            }
        }

        let dir = self.hunt_dir(hunt);
        fs::remove_dir(&dir)
            .with_context(|| format!("failed to remove hunt directory {}", dir.display()))
    }
}
