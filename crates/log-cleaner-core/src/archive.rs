use crate::error::Error;
use crate::model::{ArchiveJob, ArchiveOutcome, ArchivedFile};
use chrono::{DateTime, Datelike, Local, NaiveDate, Timelike};
use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const MAX_DEFLATE_LEVEL: i32 = 9;

/// `<dir>/logArchive<YYYYMMDD>.zip`
pub fn archive_path(dir: &Path, date: NaiveDate) -> PathBuf {
    dir.join(format!("logArchive{}.zip", date.format("%Y%m%d")))
}

/// Zip timestamp for an entry. The format only covers 1980 to 2107; anything
/// outside that range is stored without one.
fn entry_time(modified: &DateTime<Local>) -> Option<zip::DateTime> {
    let year = u16::try_from(modified.year()).ok()?;
    zip::DateTime::from_date_and_time(
        year,
        modified.month() as u8,
        modified.day() as u8,
        modified.hour() as u8,
        modified.minute() as u8,
        modified.second() as u8,
    )
    .ok()
}

/// Pick an entry name that is not already in the archive. Collisions become
/// `stem~1.ext`, `stem~2.ext`, ...
fn unique_entry_name(file_name: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(file_name) {
        return file_name.to_string();
    }

    let path = Path::new(file_name);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path.extension().map(|e| e.to_string_lossy().into_owned());

    (1..)
        .map(|n| match &extension {
            Some(ext) => format!("{}~{}.{}", stem, n, ext),
            None => format!("{}~{}", stem, n),
        })
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| file_name.to_string())
}

/// Open the day's archive for appending, or create it. Returns the writer and the
/// entry names already stored.
fn open_archive(path: &Path) -> Result<(ZipWriter<File>, HashSet<String>), Error> {
    let existing = fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false);

    if existing {
        let names: HashSet<String> = {
            let reader = ZipArchive::new(File::open(path)?)?;
            reader.file_names().map(String::from).collect()
        };
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        debug!(
            "Appending to {} ({} existing entries)",
            path.display(),
            names.len()
        );
        Ok((ZipWriter::new_append(file)?, names))
    } else {
        let file = File::create(path)?;
        debug!("Creating {}", path.display());
        Ok((ZipWriter::new(file), HashSet::new()))
    }
}

/// Write every source of `job` into its archive, one entry per file named by the
/// file's base name and stamped with the file's modification time.
///
/// A source that cannot be read or written is logged and left out of
/// `archived`; entries written before it stay in the archive. If the archive
/// itself cannot be opened or finalized the whole job fails, so callers never
/// delete a source that was not durably stored.
pub fn write_archive(job: &ArchiveJob) -> Result<ArchiveOutcome, Error> {
    let mut outcome = ArchiveOutcome {
        archive_path: job.archive_path.clone(),
        archived: Vec::new(),
        failed: Vec::new(),
    };

    if job.sources.is_empty() {
        debug!("Nothing to archive into {}", job.archive_path.display());
        return Ok(outcome);
    }

    let (mut writer, mut taken) = open_archive(&job.archive_path)?;
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(MAX_DEFLATE_LEVEL));

    for source in &job.sources {
        let path = &source.path;
        let file_name = match path.file_name() {
            Some(name) => name.to_string_lossy().into_owned(),
            None => {
                outcome
                    .failed
                    .push((path.clone(), "path has no file name".to_string()));
                continue;
            }
        };

        let content = match fs::read(path) {
            Ok(content) => content,
            Err(e) => {
                error!("Failed to read {} for archiving: {}", path.display(), e);
                outcome.failed.push((path.clone(), e.to_string()));
                continue;
            }
        };

        let entry_options = match entry_time(&source.last_modified) {
            Some(time) => options.last_modified_time(time),
            None => options,
        };

        let entry_name = unique_entry_name(&file_name, &taken);
        if entry_name != file_name {
            warn!(
                "Entry '{}' already exists in {}, storing {} as '{}'",
                file_name,
                job.archive_path.display(),
                path.display(),
                entry_name
            );
        }

        let written = writer
            .start_file(entry_name.as_str(), entry_options)
            .map_err(Error::from)
            .and_then(|_| writer.write_all(&content).map_err(Error::from));

        match written {
            Ok(()) => {
                taken.insert(entry_name.clone());
                outcome.archived.push(ArchivedFile {
                    source: path.clone(),
                    entry_name,
                });
            }
            Err(e) => {
                error!(
                    "Failed to write {} into {}: {}",
                    path.display(),
                    job.archive_path.display(),
                    e
                );
                outcome.failed.push((path.clone(), e.to_string()));
            }
        }
    }

    let file = writer.finish()?;
    file.sync_all()?;

    info!(
        "Archived {} files into {}",
        outcome.archived.len(),
        job.archive_path.display()
    );

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CandidateFile, FileKind};
    use chrono::TimeZone;
    use std::io::Read;
    use tempfile::tempdir;

    fn candidate(path: PathBuf) -> CandidateFile {
        CandidateFile {
            path,
            last_modified: Local::now(),
            kind: FileKind::Regular,
        }
    }

    fn candidate_modified_at(path: PathBuf, last_modified: DateTime<Local>) -> CandidateFile {
        CandidateFile {
            path,
            last_modified,
            kind: FileKind::Regular,
        }
    }

    fn read_entries(path: &Path) -> Vec<(String, String)> {
        let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
        let mut entries = Vec::new();
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i).unwrap();
            let mut content = String::new();
            entry.read_to_string(&mut content).unwrap();
            entries.push((entry.name().to_string(), content));
        }
        entries.sort();
        entries
    }

    #[test]
    fn test_archive_name_uses_run_date() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let path = archive_path(Path::new("/var/log/app"), date);
        assert_eq!(path, PathBuf::from("/var/log/app/logArchive20240115.zip"));
    }

    #[test]
    fn test_unique_entry_name() {
        let taken: HashSet<String> = ["app.log", "app~1.log", "README"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(unique_entry_name("other.log", &taken), "other.log");
        assert_eq!(unique_entry_name("app.log", &taken), "app~2.log");
        assert_eq!(unique_entry_name("README", &taken), "README~1");
    }

    #[test]
    fn test_writes_each_file_by_base_name() {
        let tmp = tempdir().unwrap();
        let nested = tmp.path().join("nested");
        fs::create_dir_all(&nested).unwrap();
        fs::write(tmp.path().join("a.log"), "alpha").unwrap();
        fs::write(nested.join("b.log"), "bravo").unwrap();

        let job = ArchiveJob {
            archive_path: tmp.path().join("logArchive20240115.zip"),
            sources: vec![
                candidate(tmp.path().join("a.log")),
                candidate(nested.join("b.log")),
            ],
        };
        let outcome = write_archive(&job).unwrap();

        assert_eq!(outcome.archived.len(), 2);
        assert!(outcome.failed.is_empty());
        assert_eq!(
            read_entries(&job.archive_path),
            vec![
                ("a.log".to_string(), "alpha".to_string()),
                ("b.log".to_string(), "bravo".to_string()),
            ]
        );
    }

    #[test]
    fn test_same_day_runs_append() {
        let tmp = tempdir().unwrap();
        let archive = tmp.path().join("logArchive20240115.zip");
        fs::write(tmp.path().join("first.log"), "one").unwrap();
        fs::write(tmp.path().join("second.log"), "two").unwrap();

        write_archive(&ArchiveJob {
            archive_path: archive.clone(),
            sources: vec![candidate(tmp.path().join("first.log"))],
        })
        .unwrap();
        write_archive(&ArchiveJob {
            archive_path: archive.clone(),
            sources: vec![candidate(tmp.path().join("second.log"))],
        })
        .unwrap();

        let names: Vec<String> = read_entries(&archive).into_iter().map(|e| e.0).collect();
        assert_eq!(names, vec!["first.log", "second.log"]);
    }

    #[test]
    fn test_entries_keep_source_modification_time() {
        let tmp = tempdir().unwrap();
        fs::write(tmp.path().join("old.log"), "stale").unwrap();
        let modified = Local.with_ymd_and_hms(2023, 6, 10, 14, 25, 30).unwrap();

        let job = ArchiveJob {
            archive_path: tmp.path().join("logArchive20240115.zip"),
            sources: vec![candidate_modified_at(tmp.path().join("old.log"), modified)],
        };
        write_archive(&job).unwrap();

        let mut archive = ZipArchive::new(File::open(&job.archive_path).unwrap()).unwrap();
        let entry = archive.by_name("old.log").unwrap();
        let stamp = entry.last_modified();
        assert_eq!(
            (stamp.year(), stamp.month(), stamp.day()),
            (2023, 6, 10)
        );
        assert_eq!((stamp.hour(), stamp.minute()), (14, 25));
    }

    #[test]
    fn test_entry_time_out_of_zip_range() {
        let ancient = Local.with_ymd_and_hms(1970, 1, 2, 0, 0, 0).unwrap();
        assert!(entry_time(&ancient).is_none());
        let recent = Local.with_ymd_and_hms(2024, 1, 15, 8, 0, 0).unwrap();
        assert!(entry_time(&recent).is_some());
    }

    #[test]
    fn test_colliding_names_are_kept_apart() {
        let tmp = tempdir().unwrap();
        let sub = tmp.path().join("sub");
        fs::create_dir_all(&sub).unwrap();
        fs::write(tmp.path().join("app.log"), "top").unwrap();
        fs::write(sub.join("app.log"), "nested").unwrap();

        let job = ArchiveJob {
            archive_path: tmp.path().join("logArchive20240115.zip"),
            sources: vec![
                candidate(tmp.path().join("app.log")),
                candidate(sub.join("app.log")),
            ],
        };
        let outcome = write_archive(&job).unwrap();

        assert_eq!(outcome.archived[1].entry_name, "app~1.log");
        assert_eq!(
            read_entries(&job.archive_path),
            vec![
                ("app.log".to_string(), "top".to_string()),
                ("app~1.log".to_string(), "nested".to_string()),
            ]
        );
    }

    #[test]
    fn test_unreadable_source_is_skipped() {
        let tmp = tempdir().unwrap();
        fs::write(tmp.path().join("ok.log"), "fine").unwrap();

        let job = ArchiveJob {
            archive_path: tmp.path().join("logArchive20240115.zip"),
            sources: vec![
                candidate(tmp.path().join("gone.log")),
                candidate(tmp.path().join("ok.log")),
            ],
        };
        let outcome = write_archive(&job).unwrap();

        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].0, tmp.path().join("gone.log"));
        assert_eq!(outcome.archived.len(), 1);
        assert_eq!(outcome.archived[0].source, tmp.path().join("ok.log"));
    }

    #[test]
    fn test_no_sources_creates_nothing() {
        let tmp = tempdir().unwrap();
        let job = ArchiveJob {
            archive_path: tmp.path().join("logArchive20240115.zip"),
            sources: Vec::new(),
        };
        let outcome = write_archive(&job).unwrap();
        assert!(outcome.archived.is_empty());
        assert!(!job.archive_path.exists());
    }

    #[test]
    fn test_corrupt_existing_archive_fails_job() {
        let tmp = tempdir().unwrap();
        let archive = tmp.path().join("logArchive20240115.zip");
        fs::write(&archive, "definitely not a zip").unwrap();
        fs::write(tmp.path().join("a.log"), "alpha").unwrap();

        let job = ArchiveJob {
            archive_path: archive,
            sources: vec![candidate(tmp.path().join("a.log"))],
        };
        assert!(write_archive(&job).is_err());
    }
}
