use super::NamePatterns;
use crate::error::Error;
use crate::model::{CandidateFile, FileKind};
use chrono::{DateTime, Days, Local, NaiveDate};
use std::path::Path;
use tracing::{debug, trace};
use walkdir::WalkDir;

/// Latest modification date that still counts as stale.
fn cutoff_date(today: NaiveDate, retention_days: u32) -> NaiveDate {
    today
        .checked_sub_days(Days::new(u64::from(retention_days)))
        .unwrap_or(NaiveDate::MIN)
}

/// Recursively collect files under `root` whose name matches one of `patterns` and
/// whose last-modified date is on or before `today - retention_days`.
///
/// Only the date part of the modification time is compared. Each file is tested
/// once against the whole pattern set, so overlapping patterns never produce
/// duplicates. When looking for `Regular` files, archives are left out.
///
/// A missing or unreadable directory is returned as an error.
pub fn locate_files(
    root: &Path,
    patterns: &NamePatterns,
    retention_days: u32,
    today: NaiveDate,
    kind: FileKind,
) -> Result<Vec<CandidateFile>, Error> {
    if !root.is_dir() {
        return Err(Error::DirectoryNotFound(root.to_path_buf()));
    }

    let cutoff = cutoff_date(today, retention_days);
    let archives = NamePatterns::archives()?;
    let mut candidates = Vec::new();

    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let file_name = entry.file_name().to_string_lossy().into_owned();
        if !patterns.matches(&file_name) {
            continue;
        }
        if kind == FileKind::Regular && archives.matches(&file_name) {
            trace!("Skipping archive {}", entry.path().display());
            continue;
        }

        let modified = entry.metadata()?.modified()?;
        let last_modified: DateTime<Local> = modified.into();
        if last_modified.date_naive() <= cutoff {
            candidates.push(CandidateFile {
                path: entry.into_path(),
                last_modified,
                kind,
            });
        }
    }

    debug!(
        "Found {} {:?} candidates in {} (cutoff {})",
        candidates.len(),
        kind,
        root.display(),
        cutoff
    );

    Ok(candidates)
}
