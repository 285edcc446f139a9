pub mod alert;
pub mod archive;
pub mod cleaner;
pub mod config;
pub mod drive;
pub mod engine;
pub mod error;
pub mod model;
pub mod scanner;

pub use alert::{AlertMessage, AlertNotifier, Mailer, SmtpMailer};
pub use config::{AppConfig, MailConfig};
pub use drive::{SystemVolumes, VolumeSource};
pub use engine::{DirectoryReport, MaintenanceEngine, RunSummary};
pub use error::Error;
