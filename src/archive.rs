//! The pond archive — append-only `memories.jsonl`.
//!
//! One line per archived ritual. The file is append-only by design: archived
//! memories are never rewritten, and external tools can tail or replay the
//! file without coordination.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::ritual::intent::ArchiveChoice;
use crate::ritual::LevelSummary;

/// One archived ritual.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// UTC, second precision, `YYYY-MM-DDTHH:MM:SS`.
    pub timestamp: String,
    pub title: String,
    pub offering: String,
    pub summaries: Vec<LevelSummary>,
    pub archive_choice: ArchiveChoice,
    /// The artifact card HTML, verbatim.
    pub artifact: String,
}

impl MemoryRecord {
    /// Current UTC time in the archive's timestamp format.
    pub fn now_timestamp() -> String {
        Utc::now().format("%Y-%m-%dT%H:%M:%S").to_string()
    }
}

/// Handle on the JSONL archive file.
#[derive(Debug, Clone)]
pub struct MemoryArchive {
    path: PathBuf,
}

impl MemoryArchive {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Append one record as a single JSON line.
    pub fn append(&self, record: &MemoryRecord) -> Result<(), AppError> {
        let line = serde_json::to_string(record)
            .map_err(|e| AppError::Archive(format!("serialise record: {e}")))?;
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| AppError::Archive(format!("cannot open {}: {e}", self.path.display())))?;
        writeln!(f, "{line}")
            .map_err(|e| AppError::Archive(format!("cannot write {}: {e}", self.path.display())))
    }

    /// Read every record back. Missing file is an empty archive; a malformed
    /// line is an error (the file is machine-written only).
    pub fn read_all(&self) -> Result<Vec<MemoryRecord>, AppError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(AppError::Archive(format!(
                    "cannot read {}: {e}",
                    self.path.display()
                )))
            }
        };
        text.lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| {
                serde_json::from_str(l)
                    .map_err(|e| AppError::Archive(format!("malformed archive line: {e}")))
            })
            .collect()
    }
}
