use crate::alert::{AlertNotifier, Mailer};
use crate::archive::{self, archive_path};
use crate::cleaner;
use crate::config::AppConfig;
use crate::drive::{self, VolumeSource};
use crate::error::Error;
use crate::model::{ArchiveJob, ArchiveOutcome, FileKind, LogDirectoryConfig, VolumeStatus};
use crate::scanner::{locate_files, NamePatterns};
use chrono::{DateTime, Local, NaiveDate};
use rayon::prelude::*;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// What happened to one log directory during a run.
#[derive(Debug, Clone, Default)]
pub struct DirectoryReport {
    pub path: PathBuf,
    pub archive_path: PathBuf,
    pub archived: usize,
    pub archive_failures: usize,
    pub originals_removed: usize,
    pub expired_archives_removed: usize,
    pub delete_failures: usize,
    pub error: Option<String>,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub directories: Vec<DirectoryReport>,
    pub volumes: Vec<VolumeStatus>,
    pub alerts_sent: usize,
    pub alerts_failed: usize,
    pub duration: Duration,
}

impl RunSummary {
    pub fn files_archived(&self) -> usize {
        self.directories.iter().map(|d| d.archived).sum()
    }

    pub fn files_removed(&self) -> usize {
        self.directories
            .iter()
            .map(|d| d.originals_removed + d.expired_archives_removed)
            .sum()
    }

    pub fn failed_directories(&self) -> usize {
        self.directories.iter().filter(|d| d.error.is_some()).count()
    }
}

/// Drives a maintenance run: every log directory is archived and cleaned, then
/// the volumes holding them are checked for free space.
pub struct MaintenanceEngine<'a> {
    config: &'a AppConfig,
    volumes: &'a dyn VolumeSource,
    mailer: &'a dyn Mailer,
    now: DateTime<Local>,
    host_name: Option<String>,
}

impl<'a> MaintenanceEngine<'a> {
    pub fn new(
        config: &'a AppConfig,
        volumes: &'a dyn VolumeSource,
        mailer: &'a dyn Mailer,
    ) -> Self {
        Self {
            config,
            volumes,
            mailer,
            now: Local::now(),
            host_name: None,
        }
    }

    /// Pin the run time, which fixes the retention cutoffs and the archive name.
    pub fn with_now(mut self, now: DateTime<Local>) -> Self {
        self.now = now;
        self
    }

    pub fn with_host_name(mut self, host_name: &str) -> Self {
        self.host_name = Some(host_name.to_string());
        self
    }

    pub fn today(&self) -> NaiveDate {
        self.now.date_naive()
    }

    /// Full pipeline. Only pattern compilation can fail here; everything below the
    /// directory level is logged and recorded in the summary.
    pub fn run(&self) -> Result<RunSummary, Error> {
        let start = Instant::now();

        let directories = self.process_directories()?;

        // Runs only once every directory is done, so freed space is measured.
        let (volumes, alerts_sent, alerts_failed) = self.drive_pass();

        Ok(RunSummary {
            directories,
            volumes,
            alerts_sent,
            alerts_failed,
            duration: start.elapsed(),
        })
    }

    pub fn process_directories(&self) -> Result<Vec<DirectoryReport>, Error> {
        let archive_patterns = NamePatterns::archives()?;
        let today = self.today();

        let reports = self
            .config
            .directories()
            .par_iter()
            .map(|dir| {
                info!("Processing log directory {}", dir.path.display());
                match process_directory(dir, &archive_patterns, today) {
                    Ok(report) => report,
                    Err(e) => {
                        error!("Skipping log directory {}: {}", dir.path.display(), e);
                        DirectoryReport {
                            path: dir.path.clone(),
                            archive_path: archive_path(&dir.path, today),
                            error: Some(e.to_string()),
                            ..Default::default()
                        }
                    }
                }
            })
            .collect();

        Ok(reports)
    }

    /// Check every distinct volume holding a log directory and alert for those at
    /// or below the threshold. Returns the statuses plus sent/failed alert counts.
    pub fn drive_pass(&self) -> (Vec<VolumeStatus>, usize, usize) {
        let dirs: Vec<PathBuf> = self
            .config
            .log_directories
            .iter()
            .map(PathBuf::from)
            .collect();
        let statuses = drive::check_volumes(&dirs, self.volumes);

        let mut notifier = AlertNotifier::new(self.config, self.mailer);
        if let Some(host_name) = &self.host_name {
            notifier = notifier.with_host_name(host_name);
        }

        let mut sent = 0;
        let mut failed = 0;
        for status in &statuses {
            match notifier.notify(status, self.now) {
                Ok(true) => sent += 1,
                Ok(false) => {}
                Err(e) => {
                    error!(
                        "Failed to send low space alert for {}: {}",
                        status.root.display(),
                        e
                    );
                    failed += 1;
                }
            }
        }

        (statuses, sent, failed)
    }
}

fn process_directory(
    dir: &LogDirectoryConfig,
    archive_patterns: &NamePatterns,
    today: NaiveDate,
) -> Result<DirectoryReport, Error> {
    let target = archive_path(&dir.path, today);
    let file_patterns = NamePatterns::new(&dir.file_patterns)?;

    let stale_files = locate_files(
        &dir.path,
        &file_patterns,
        dir.file_retention_days,
        today,
        FileKind::Regular,
    )?;
    let expired_archives: Vec<PathBuf> = locate_files(
        &dir.path,
        archive_patterns,
        dir.archive_retention_days,
        today,
        FileKind::Archive,
    )?
    .into_iter()
    .map(|candidate| candidate.path)
    .filter(|path| *path != target)
    .collect();

    debug!(
        "{}: {} stale files, {} expired archives",
        dir.path.display(),
        stale_files.len(),
        expired_archives.len()
    );

    let job = ArchiveJob {
        archive_path: target.clone(),
        sources: stale_files,
    };
    // A broken archive keeps every original in place but does not stop the
    // expired archives from being pruned.
    let (outcome, archive_error) = match archive::write_archive(&job) {
        Ok(outcome) => (outcome, None),
        Err(e) => {
            error!(
                "Could not write {}, originals are kept: {}",
                target.display(),
                e
            );
            let outcome = ArchiveOutcome {
                archive_path: target.clone(),
                archived: Vec::new(),
                failed: job
                    .sources
                    .iter()
                    .map(|source| (source.path.clone(), e.to_string()))
                    .collect(),
            };
            (outcome, Some(e.to_string()))
        }
    };
    for archived in &outcome.archived {
        info!(
            "File archived with name: {} as {}",
            archived.source.display(),
            archived.entry_name
        );
    }

    // Only what is durably in the archive gets deleted.
    let sources: Vec<&PathBuf> = outcome.archived.iter().map(|a| &a.source).collect();
    let removed_sources = cleaner::remove_files(&sources);
    let removed_archives = cleaner::remove_files(&expired_archives);

    let originals_removed = removed_sources.iter().filter(|o| o.is_removed()).count();
    let expired_archives_removed = removed_archives.iter().filter(|o| o.is_removed()).count();
    let delete_failures =
        removed_sources.len() + removed_archives.len() - originals_removed - expired_archives_removed;

    Ok(DirectoryReport {
        path: dir.path.clone(),
        archive_path: target,
        archived: outcome.archived.len(),
        archive_failures: outcome.failed.len(),
        originals_removed,
        expired_archives_removed,
        delete_failures,
        error: archive_error,
    })
}
