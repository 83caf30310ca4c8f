//! # listmonk-backup
//!
//! Scheduled backup and reporting client for the Listmonk mailing-list API.
//!
//! One run fetches every collection (lists, subscribers, campaigns, templates,
//! bounces, import jobs, media), writes each to a timestamped CSV file, mirrors
//! media assets to disk with content-hash deduplication, deletes backups older
//! than the retention window, saves a text report and mails it.
//!
//! ## Quick Start
//!
//! ```no_run
//! use listmonk_backup::{BackupRunner, Config};
//! use std::path::Path;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load(Some(Path::new("config.ini")), Path::new("."))?;
//!     let summary = BackupRunner::new(config)?.run().await;
//!
//!     for (resource, outcome) in summary.log.iter() {
//!         println!("{resource}: {outcome:?}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Runs are strictly sequential and assume no other run is working on the same
//! backup directory at the same time.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// End-to-end run orchestration
pub mod backup;
/// Listmonk API client
pub mod client;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Nested record flattening
pub mod flatten;
/// Report mail delivery
pub mod mail;
/// Media asset synchronization
pub mod media;
/// Human-readable run reports
pub mod report;
/// Expired backup cleanup
pub mod retention;
/// CSV export
pub mod tabular;
/// Core record and run-log types
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use backup::{BackupRunner, RunSummary};
pub use client::{ApiResponse, RemoteClient};
pub use config::{ApiConfig, Config, HttpConfig, MailConfig, SmtpConfig, StorageConfig};
pub use error::{Error, MailError, Result};
pub use flatten::flatten;
pub use mail::{MailMessage, MailSender, SmtpMailSender};
pub use media::{MediaOutcome, MediaSynchronizer, SyncSummary};
pub use report::{EmailBody, ReportBuilder};
pub use retention::RetentionSweeper;
pub use tabular::TabularWriter;
pub use types::{
    BackupArtifact, FlattenedRecord, MediaDescriptor, RemoteRecord, Resource, ResourceOutcome,
    ResponseShape, RunLog,
};
