mod smtp;

pub use smtp::SmtpMailer;

use crate::config::{AppConfig, DATE_TOKEN};
use crate::model::{AlertEvent, VolumeStatus};
use chrono::{DateTime, Local, NaiveDate};
use std::path::PathBuf;
use sysinfo::System;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum AlertError {
    #[error("Invalid mail address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("Could not build message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("SMTP error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

/// A fully composed notification, ready for a `Mailer`.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
    pub attachment: PathBuf,
}

/// Anything that can deliver an `AlertMessage`.
pub trait Mailer {
    fn send(&self, message: &AlertMessage) -> Result<(), AlertError>;
}

/// Substitute today's date for the `{date}` token of the log file template.
pub fn resolve_log_file(template: &str, date_format: &str, today: NaiveDate) -> PathBuf {
    PathBuf::from(template.replace(DATE_TOKEN, &today.format(date_format).to_string()))
}

pub fn host_name() -> String {
    System::host_name().unwrap_or_else(|| "unknown-host".to_string())
}

/// Composes low-space alerts and hands them to a `Mailer`.
pub struct AlertNotifier<'a> {
    config: &'a AppConfig,
    mailer: &'a dyn Mailer,
    host_name: String,
}

impl<'a> AlertNotifier<'a> {
    pub fn new(config: &'a AppConfig, mailer: &'a dyn Mailer) -> Self {
        Self {
            config,
            mailer,
            host_name: host_name(),
        }
    }

    pub fn with_host_name(mut self, host_name: &str) -> Self {
        self.host_name = host_name.to_string();
        self
    }

    pub fn threshold_percent(&self) -> f64 {
        self.config.free_space_threshold_percent
    }

    /// Alerts fire at or below the threshold, compared on the unrounded value.
    pub fn should_alert(&self, status: &VolumeStatus) -> bool {
        status.free_percent <= self.threshold_percent()
    }

    pub fn event(&self, status: &VolumeStatus, now: DateTime<Local>) -> AlertEvent {
        AlertEvent {
            volume: status.root.clone(),
            free_percent: status.free_percent,
            threshold_percent: self.threshold_percent(),
            host_name: self.host_name.clone(),
            timestamp: now,
            attachment: resolve_log_file(
                &self.config.log_file_path_template,
                &self.config.log_file_date_format,
                now.date_naive(),
            ),
        }
    }

    pub fn compose(&self, event: &AlertEvent) -> AlertMessage {
        let body = format!(
            "Free space on volume {} of host {} is {:.2}%, at or below the alert threshold of {}%.\n\
             Checked at {}.\n\
             Today's log file is attached.",
            event.volume.display(),
            event.host_name,
            event.free_percent,
            event.threshold_percent,
            event.timestamp.format("%Y-%m-%d %H:%M:%S %z"),
        );

        AlertMessage {
            from: self.config.mail.from.clone(),
            to: self.config.mail.to.clone(),
            subject: self.config.mail.subject.clone(),
            body,
            attachment: event.attachment.clone(),
        }
    }

    /// Send an alert for `status` if it is at or below the threshold. Returns
    /// whether a message was handed to the mailer.
    pub fn notify(&self, status: &VolumeStatus, now: DateTime<Local>) -> Result<bool, AlertError> {
        if !self.should_alert(status) {
            debug!(
                "Volume {} at {:.2}% is above the {}% threshold",
                status.root.display(),
                status.free_percent,
                self.threshold_percent()
            );
            return Ok(false);
        }

        let event = self.event(status, now);
        let message = self.compose(&event);
        self.mailer.send(&message)?;

        info!(
            "Low space alert for volume {} ({:.2}%) sent to {}",
            event.volume.display(),
            event.free_percent,
            message.to
        );
        Ok(true)
    }
}
