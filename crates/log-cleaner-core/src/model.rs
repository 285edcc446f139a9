use chrono::{DateTime, Local};
use std::path::PathBuf;

/// Whether a located file is a log waiting to be archived or an earlier archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Regular,
    Archive,
}

#[derive(Debug, Clone)]
pub struct LogDirectoryConfig {
    pub path: PathBuf,
    pub file_patterns: Vec<String>,
    pub file_retention_days: u32,
    pub archive_retention_days: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFile {
    pub path: PathBuf,
    pub last_modified: DateTime<Local>,
    pub kind: FileKind,
}

#[derive(Debug, Clone)]
pub struct ArchiveJob {
    pub archive_path: PathBuf,
    pub sources: Vec<CandidateFile>,
}

/// Source file written into an archive, along with the entry name it got.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivedFile {
    pub source: PathBuf,
    pub entry_name: String,
}

#[derive(Debug, Clone)]
pub struct ArchiveOutcome {
    pub archive_path: PathBuf,
    pub archived: Vec<ArchivedFile>,
    pub failed: Vec<(PathBuf, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Removed(PathBuf),
    Failed { path: PathBuf, reason: String },
}

impl DeleteOutcome {
    pub fn is_removed(&self) -> bool {
        matches!(self, DeleteOutcome::Removed(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VolumeStatus {
    pub root: PathBuf,
    pub total_bytes: u64,
    pub free_bytes: u64,
    /// Unrounded; round only when displaying.
    pub free_percent: f64,
}

impl VolumeStatus {
    pub fn new(root: PathBuf, total_bytes: u64, free_bytes: u64) -> Self {
        let free_percent = if total_bytes == 0 {
            0.0
        } else {
            free_bytes as f64 * 100.0 / total_bytes as f64
        };
        Self {
            root,
            total_bytes,
            free_bytes,
            free_percent,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AlertEvent {
    pub volume: PathBuf,
    pub free_percent: f64,
    pub threshold_percent: f64,
    pub host_name: String,
    pub timestamp: DateTime<Local>,
    pub attachment: PathBuf,
}
