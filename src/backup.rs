//! End-to-end backup run
//!
//! A run walks the resources in a fixed order, writes one CSV per resource, syncs
//! media, sweeps expired backups, saves a report and mails it. Failures are isolated
//! per resource: an error while backing up one collection becomes that collection's
//! error entry in the [`RunLog`] and the run moves on.
//!
//! Precondition: at most one run is active per storage layout at a time. Nothing
//! here takes a lock; schedule runs so they cannot overlap.

use crate::client::RemoteClient;
use crate::config::Config;
use crate::error::Result;
use crate::mail::{MailMessage, MailSender, SmtpMailSender};
use crate::media::MediaSynchronizer;
use crate::report::ReportBuilder;
use crate::retention::RetentionSweeper;
use crate::tabular::TabularWriter;
use crate::types::{MediaDescriptor, Resource, ResourceOutcome, RunLog};
use chrono::{DateTime, Local};
use std::path::PathBuf;
use tracing::{error, info, warn};

/// What a finished run produced
#[derive(Clone, Debug)]
pub struct RunSummary {
    /// Per-resource outcomes in fetch order
    pub log: RunLog,
    /// Saved report, absent when it could not be written
    pub report_path: Option<PathBuf>,
    /// Backup files removed by the retention sweep
    pub deleted_backups: usize,
    /// Whether the report mail was delivered
    pub mail_sent: bool,
}

/// Drives a complete backup run
pub struct BackupRunner {
    config: Config,
    client: RemoteClient,
    writer: TabularWriter,
    reports: ReportBuilder,
    mailer: Option<Box<dyn MailSender>>,
}

impl std::fmt::Debug for BackupRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackupRunner")
            .field("config", &self.config)
            .field("client", &self.client)
            .field("writer", &self.writer)
            .field("mail_enabled", &self.mailer.is_some())
            .finish()
    }
}

impl BackupRunner {
    /// Runner that mails reports over the configured SMTP relay
    ///
    /// # Errors
    /// Fails when the HTTP client cannot be built.
    pub fn new(config: Config) -> Result<Self> {
        let client = RemoteClient::new(&config.api, &config.http)?;
        let writer = TabularWriter::new(&config.storage.backup_dir);
        let mailer: Box<dyn MailSender> = Box::new(SmtpMailSender::new(config.mail.smtp.clone()));

        Ok(Self {
            config,
            client,
            writer,
            reports: ReportBuilder::new(),
            mailer: Some(mailer),
        })
    }

    /// Deliver reports through `sender` instead of SMTP
    pub fn with_mail_sender(mut self, sender: impl MailSender + 'static) -> Self {
        self.mailer = Some(Box::new(sender));
        self
    }

    /// Skip the mail step
    pub fn without_mail(mut self) -> Self {
        self.mailer = None;
        self
    }

    /// Run every step, stamping files with the current local time
    pub async fn run(&self) -> RunSummary {
        self.run_at(Local::now()).await
    }

    /// Run every step, stamping files with `at`
    pub async fn run_at(&self, at: DateTime<Local>) -> RunSummary {
        info!(base_url = %self.config.api.base_url, "starting backup run");

        let mut log = RunLog::new();
        for resource in Resource::ALL {
            let outcome = match self.backup_resource(resource, at).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(resource = %resource, error = %e, "backup failed");
                    ResourceOutcome::failed(e)
                }
            };
            log.record(resource.name(), outcome);
        }

        let deleted_backups =
            RetentionSweeper::new(self.writer.backup_dir(), self.config.storage.retention_days)
                .sweep()
                .await;
        info!(deleted = deleted_backups, "old backups removed");

        let report = self.reports.render(&log, at);
        let report_path = match self
            .reports
            .save(&report, &self.config.storage.reports_dir, at)
            .await
        {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(error = %e, "failed to save report");
                None
            }
        };

        let mail_sent = self.send_report(&log, at).await;

        info!(
            resources = log.len(),
            errors = log.error_count(),
            deleted_backups,
            mail_sent,
            "backup run finished"
        );

        RunSummary {
            log,
            report_path,
            deleted_backups,
            mail_sent,
        }
    }

    async fn backup_resource(
        &self,
        resource: Resource,
        at: DateTime<Local>,
    ) -> Result<ResourceOutcome> {
        if resource == Resource::Media {
            return self.backup_media(at).await;
        }

        let records = self.client.fetch_collection(resource).await?;
        let artifact = self.writer.save(&records, resource.name(), at).await?;
        info!(resource = %resource, count = records.len(), "backup complete");

        Ok(ResourceOutcome {
            count: Some(records.len()),
            file: artifact.map(|a| a.file_path),
            ..Default::default()
        })
    }

    async fn backup_media(&self, at: DateTime<Local>) -> Result<ResourceOutcome> {
        let records = self.client.fetch_collection(Resource::Media).await?;
        let mut descriptors: Vec<MediaDescriptor> =
            records.into_iter().map(MediaDescriptor::new).collect();

        let synchronizer = MediaSynchronizer::new(&self.client, &self.config.storage.media_dir);
        let summary = synchronizer.sync_at(&mut descriptors, at).await?;

        let annotated: Vec<_> = descriptors
            .into_iter()
            .map(MediaDescriptor::into_record)
            .collect();
        let artifact = self
            .writer
            .save(&annotated, Resource::Media.name(), at)
            .await?;
        info!(count = annotated.len(), downloaded = summary.with_local_copy(), "media backup complete");

        Ok(ResourceOutcome {
            count: Some(annotated.len()),
            file: artifact.map(|a| a.file_path),
            media_downloaded: Some(summary.with_local_copy()),
            error: None,
        })
    }

    async fn send_report(&self, log: &RunLog, at: DateTime<Local>) -> bool {
        let Some(mailer) = &self.mailer else {
            info!("mail disabled, report not sent");
            return false;
        };

        let body = self.reports.email_body(log, at);
        let message = MailMessage::report(&self.config.mail, body);
        match mailer.send(&message).await {
            Ok(()) => {
                info!(to = %message.to, "report mail sent");
                true
            }
            Err(e) => {
                warn!(to = %message.to, error = %e, "failed to send report mail");
                false
            }
        }
    }
}
