use crate::error::Error;
use crate::model::LogDirectoryConfig;
use crate::scanner::NamePatterns;
use config::{Config, Environment, File as ConfigFile};
use lettre::message::Mailbox;
use serde::Deserialize;
use std::env;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

pub const DEFAULT_CONFIG_NAME: &str = "LogCleaner";
pub const DATE_TOKEN: &str = "{date}";
pub const DEFAULT_LOG_DIR: &str = "./logs";
/// Prefix of the daily rolling log file, `<LOG_DIR>/log-cleaner.log.YYYY-MM-DD`.
pub const LOG_FILE_PREFIX: &str = "log-cleaner.log";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub log_directories: Vec<String>,
    /// Comma separated, e.g. `*.log,*.txt`.
    pub file_types_to_archive: String,
    pub file_retention_days: u32,
    pub zip_retention_days: u32,
    #[serde(default = "default_threshold")]
    pub free_space_threshold_percent: f64,
    #[serde(default = "default_log_template")]
    pub log_file_path_template: String,
    #[serde(default = "default_log_date_format")]
    pub log_file_date_format: String,
    pub mail: MailConfig,
}

#[derive(Clone, Deserialize)]
pub struct MailConfig {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub smtp_server: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailConfig")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("subject", &self.subject)
            .field("smtp_server", &self.smtp_server)
            .field("smtp_port", &self.smtp_port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "********"))
            .finish()
    }
}

fn default_threshold() -> f64 {
    20.0
}

/// Attachment template pointing at the daily log file written under `log_dir`.
pub fn log_template_for(log_dir: &str) -> String {
    let dir = log_dir.trim_end_matches(['/', '\\']);
    format!("{}/{}.{}", dir, LOG_FILE_PREFIX, DATE_TOKEN)
}

/// Follows `LOG_DIR` so the attachment is the file the binary actually logs to.
fn default_log_template() -> String {
    let log_dir = env::var("LOG_DIR").unwrap_or_else(|_| DEFAULT_LOG_DIR.to_string());
    log_template_for(&log_dir)
}

fn default_log_date_format() -> String {
    "%Y-%m-%d".to_string()
}

fn default_smtp_port() -> u16 {
    25
}

/// Load `LogCleaner.toml` (or the given file name) layered with `LOG_CLEANER__*`
/// environment variables, then validate it.
pub fn load_configuration(name: Option<&str>) -> Result<AppConfig, Error> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name(name.unwrap_or(DEFAULT_CONFIG_NAME)).required(false))
        .add_source(
            Environment::with_prefix("LOG_CLEANER")
                .prefix_separator("__")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("log_directories")
                .try_parsing(true),
        )
        .build()?;
    let config = builder.try_deserialize::<AppConfig>()?;
    config.validate()?;
    Ok(config)
}

/// Remove directories that repeat, or sit below, another directory in the list.
/// Paths are compared after canonicalization when they exist.
pub fn non_overlapping_directories(dirs: Vec<String>) -> Vec<String> {
    let mut result: Vec<(PathBuf, String)> = Vec::new();

    for dir in dirs {
        if dir.trim().is_empty() {
            continue;
        }
        let key = fs::canonicalize(&dir).unwrap_or_else(|_| PathBuf::from(&dir));

        if result.iter().any(|(kept, _)| key.starts_with(kept)) {
            debug!("{} is already covered by another log directory", dir);
            continue;
        }

        result.retain(|(kept, kept_dir)| {
            let nested = kept.starts_with(&key);
            if nested {
                debug!("{} is covered by {}", kept_dir, dir);
            }
            !nested
        });
        result.push((key, dir));
    }

    result.into_iter().map(|(_, dir)| dir).collect()
}

impl AppConfig {
    /// Split the delimited pattern list, dropping empty items.
    pub fn file_patterns(&self) -> Vec<String> {
        self.file_types_to_archive
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(String::from)
            .collect()
    }

    /// One entry per directory to process. Repeated and nested directories are
    /// folded into their outermost configured ancestor, whose recursive walk
    /// already covers them.
    pub fn directories(&self) -> Vec<LogDirectoryConfig> {
        let file_patterns = self.file_patterns();
        non_overlapping_directories(self.log_directories.clone())
            .iter()
            .map(|dir| LogDirectoryConfig {
                path: PathBuf::from(dir),
                file_patterns: file_patterns.clone(),
                file_retention_days: self.file_retention_days,
                archive_retention_days: self.zip_retention_days,
            })
            .collect()
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.log_directories.iter().all(|d| d.trim().is_empty()) {
            return Err(Error::Other(
                "log_directories must name at least one directory".to_string(),
            ));
        }

        let patterns = self.file_patterns();
        if patterns.is_empty() {
            return Err(Error::Other(
                "file_types_to_archive must contain at least one pattern".to_string(),
            ));
        }
        NamePatterns::new(&patterns)?;

        if !(0.0..=100.0).contains(&self.free_space_threshold_percent) {
            return Err(Error::Other(format!(
                "free_space_threshold_percent must be between 0 and 100, got {}",
                self.free_space_threshold_percent
            )));
        }

        for (key, value) in [("mail.from", &self.mail.from), ("mail.to", &self.mail.to)] {
            value.parse::<Mailbox>().map_err(|e| {
                Error::Other(format!("{} is not a valid address '{}': {}", key, value, e))
            })?;
        }

        if self.mail.smtp_server.trim().is_empty() {
            return Err(Error::Other("mail.smtp_server must be set".to_string()));
        }

        Ok(())
    }
}
