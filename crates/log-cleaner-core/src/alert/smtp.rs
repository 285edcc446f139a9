use super::{AlertError, AlertMessage, Mailer};
use crate::config::MailConfig;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use std::fs;
use tracing::{debug, warn};

/// Delivers alerts through an SMTP relay.
pub struct SmtpMailer {
    transport: SmtpTransport,
}

impl SmtpMailer {
    pub fn new(mail: &MailConfig) -> Self {
        let mut builder =
            SmtpTransport::builder_dangerous(mail.smtp_server.as_str()).port(mail.smtp_port);
        if let (Some(username), Some(password)) = (&mail.username, &mail.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }
        Self {
            transport: builder.build(),
        }
    }

    fn build(message: &AlertMessage) -> Result<Message, AlertError> {
        let mut parts = MultiPart::mixed().singlepart(SinglePart::plain(message.body.clone()));

        match fs::read(&message.attachment) {
            Ok(content) => {
                let file_name = message
                    .attachment
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "log.txt".to_string());
                parts = parts.singlepart(
                    Attachment::new(file_name).body(content, ContentType::TEXT_PLAIN),
                );
            }
            Err(e) => warn!(
                "Could not attach {}: {}, sending without it",
                message.attachment.display(),
                e
            ),
        }

        let email = Message::builder()
            .from(message.from.parse::<Mailbox>()?)
            .to(message.to.parse::<Mailbox>()?)
            .subject(message.subject.as_str())
            .multipart(parts)?;
        Ok(email)
    }
}

impl Mailer for SmtpMailer {
    fn send(&self, message: &AlertMessage) -> Result<(), AlertError> {
        let email = Self::build(message)?;
        self.transport.send(&email)?;
        debug!("Mail '{}' delivered to {}", message.subject, message.to);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn message(attachment: PathBuf) -> AlertMessage {
        AlertMessage {
            from: "cleaner@example.com".to_string(),
            to: "ops@example.com".to_string(),
            subject: "Low disk space".to_string(),
            body: "Free space is low".to_string(),
            attachment,
        }
    }

    #[test]
    fn test_build_attaches_log_file() {
        let tmp = tempdir().unwrap();
        let log = tmp.path().join("log-cleaner.log.2024-01-15");
        fs::write(&log, "INFO archived app.log").unwrap();

        let email = SmtpMailer::build(&message(log)).unwrap();
        let raw = String::from_utf8(email.formatted()).unwrap();

        assert!(raw.contains("Subject: Low disk space"));
        assert!(raw.contains("log-cleaner.log.2024-01-15"));
    }

    #[test]
    fn test_build_without_attachment() {
        let tmp = tempdir().unwrap();
        let email = SmtpMailer::build(&message(tmp.path().join("missing.log"))).unwrap();
        let raw = String::from_utf8(email.formatted()).unwrap();
        assert!(raw.contains("Free space is low"));
        assert!(!raw.contains("missing.log"));
    }

    #[test]
    fn test_build_rejects_bad_address() {
        let mut bad = message(PathBuf::from("missing.log"));
        bad.to = "nobody".to_string();
        assert!(matches!(
            SmtpMailer::build(&bad),
            Err(AlertError::Address(_))
        ));
    }
}
