//! Test configuration helpers and a mail sender that records instead of sending

use async_trait::async_trait;
use listmonk_backup::{BackupRunner, Config, MailError, MailMessage, MailSender};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// API user the mock server expects
pub const API_USER: &str = "backup-bot";
/// API password the mock server expects
pub const API_PASS: &str = "s3cret pass";

/// Settings as they would appear in config.ini, pointing at `server_uri`
pub fn test_settings(server_uri: &str) -> HashMap<String, String> {
    [
        ("LISTMONK_URL", server_uri),
        ("LISTMONK_USER", API_USER),
        ("LISTMONK_PASS", API_PASS),
        ("MAIL_TO", "ops@example.com"),
        ("MAIL_FROM", "backup@example.com"),
        ("MAIL_SUBJECT", "Listmonk Backup"),
        ("SMTP_HOST", "smtp.example.com"),
        ("SMTP_PORT", "465"),
        ("SMTP_USER", "mailer"),
        ("SMTP_PASS", "smtp-secret"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// Build a config rooted at `base_dir`
///
/// `overrides` are applied on top of [`test_settings`].
pub fn test_config(server_uri: &str, base_dir: &Path, overrides: &[(&str, &str)]) -> Config {
    let mut settings = test_settings(server_uri);
    for (key, value) in overrides {
        settings.insert((*key).to_string(), (*value).to_string());
    }
    Config::from_settings(&settings, base_dir).expect("test settings are valid")
}

/// Mail sender that keeps every message in memory
#[derive(Clone, Default)]
pub struct RecordingMailSender {
    sent: Arc<Mutex<Vec<MailMessage>>>,
}

impl RecordingMailSender {
    /// Messages "sent" so far
    pub fn sent(&self) -> Vec<MailMessage> {
        self.sent.lock().expect("mail outbox lock").clone()
    }
}

#[async_trait]
impl MailSender for RecordingMailSender {
    async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        self.sent
            .lock()
            .expect("mail outbox lock")
            .push(message.clone());
        Ok(())
    }
}

/// Runner against the mock server that records mail instead of sending it
pub fn create_test_runner(
    server_uri: &str,
    base_dir: &Path,
    overrides: &[(&str, &str)],
) -> (BackupRunner, RecordingMailSender) {
    let outbox = RecordingMailSender::default();
    let runner = BackupRunner::new(test_config(server_uri, base_dir, overrides))
        .expect("runner builds")
        .with_mail_sender(outbox.clone());
    (runner, outbox)
}
