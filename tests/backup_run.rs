//! End-to-end backup runs against a mocked Listmonk API

mod common;

use chrono::{DateTime, Local, TimeZone};
use common::*;
use listmonk_backup::Resource;
use serde_json::json;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;
use wiremock::MockServer;

fn run_time() -> DateTime<Local> {
    Local.with_ymd_and_hms(2025, 6, 14, 15, 30, 45).unwrap()
}

#[tokio::test]
async fn subscribers_are_written_to_csv_and_logged() {
    let server = MockServer::start().await;
    mount_collection(&server, Resource::Subscribers, json!([{"id": 1, "name": "A"}])).await;
    mount_empty_api(&server).await;

    let temp_dir = TempDir::new().unwrap();
    let (runner, _outbox) = create_test_runner(&server.uri(), temp_dir.path(), &[]);

    let summary = runner.run_at(run_time()).await;

    let backup_dir = temp_dir.path().join("backup");
    let expected = backup_dir.join("subscribers_14062025_153045.csv");
    let entry = summary.log.get("subscribers").unwrap();
    assert_eq!(entry.count, Some(1));
    assert_eq!(entry.file.as_deref(), Some(expected.as_path()));
    assert_eq!(entry.error, None);
    assert_eq!(read_text(&expected), "id,name\n1,A\n");

    // Empty collections leave no file behind
    assert_files(&backup_dir, &["subscribers_14062025_153045.csv"]);
    assert_eq!(summary.log.get("lists").unwrap().count, Some(0));
    assert_eq!(summary.log.get("lists").unwrap().file, None);
}

#[tokio::test]
async fn transport_failure_is_isolated_to_its_resource() {
    let server = MockServer::start().await;
    mount_collection(&server, Resource::Lists, json!([{"id": 7, "name": "Weekly"}])).await;
    mount_collection(&server, Resource::Subscribers, json!([{"id": 1, "name": "A"}])).await;
    mount_stalled(&server, Resource::Campaigns, Duration::from_secs(3)).await;
    mount_empty_api(&server).await;

    let temp_dir = TempDir::new().unwrap();
    let (runner, _outbox) = create_test_runner(
        &server.uri(),
        temp_dir.path(),
        &[("HTTP_TIMEOUT_SECS", "1")],
    );

    let summary = runner.run_at(run_time()).await;

    let campaigns = summary.log.get("campaigns").unwrap();
    assert!(
        campaigns.error.as_deref().unwrap().starts_with("transport error"),
        "got {campaigns:?}"
    );
    assert_eq!(campaigns.count, None);

    for name in ["lists", "subscribers"] {
        let entry = summary.log.get(name).unwrap();
        assert_eq!(entry.count, Some(1), "{name}");
        assert!(entry.file.as_ref().unwrap().exists(), "{name}");
    }
    // Resources after the failing one were still attempted
    assert_eq!(summary.log.len(), Resource::ALL.len());
    assert_eq!(summary.log.error_count(), 1);

    let report = read_text(summary.report_path.as_deref().unwrap());
    assert!(report.contains("CAMPAIGNS\n--------------------------\nERROR: transport error"));
}

#[tokio::test]
async fn http_error_status_becomes_error_entry() {
    let server = MockServer::start().await;
    mount_status(&server, Resource::Bounces, 500).await;
    mount_empty_api(&server).await;

    let temp_dir = TempDir::new().unwrap();
    let (runner, _outbox) = create_test_runner(&server.uri(), temp_dir.path(), &[]);

    let summary = runner.run_at(run_time()).await;

    assert_eq!(
        summary.log.get("bounces").unwrap().error.as_deref(),
        Some("bounces returned HTTP 500")
    );
    assert_eq!(summary.log.error_count(), 1);
}

#[tokio::test]
async fn bare_envelope_resources_are_backed_up() {
    let server = MockServer::start().await;
    mount_collection(
        &server,
        Resource::Templates,
        json!([{"id": 1, "name": "Default", "type": "campaign", "is_default": true}]),
    )
    .await;
    mount_collection(
        &server,
        Resource::Import,
        json!([{"id": 2, "mode": "subscribe", "status": "finished"}]),
    )
    .await;
    mount_empty_api(&server).await;

    let temp_dir = TempDir::new().unwrap();
    let (runner, _outbox) = create_test_runner(&server.uri(), temp_dir.path(), &[]);

    let summary = runner.run_at(run_time()).await;

    let templates = summary.log.get("templates").unwrap();
    assert_eq!(templates.count, Some(1));
    assert_eq!(
        read_text(templates.file.as_deref().unwrap()),
        "id,name,type,is_default\n1,Default,campaign,true\n"
    );
    assert_eq!(summary.log.get("import").unwrap().count, Some(1));
}

#[tokio::test]
async fn nested_records_are_flattened_into_columns() {
    let server = MockServer::start().await;
    mount_collection(
        &server,
        Resource::Subscribers,
        json!([
            {"id": 1, "email": "a@example.com", "attribs": {"city": "Oslo", "plan": {"tier": "pro"}}},
            {"id": 2, "email": "b@example.com", "attribs": {"city": "Bergen", "plan": {"tier": "free"}}}
        ]),
    )
    .await;
    mount_empty_api(&server).await;

    let temp_dir = TempDir::new().unwrap();
    let (runner, _outbox) = create_test_runner(&server.uri(), temp_dir.path(), &[]);

    let summary = runner.run_at(run_time()).await;

    let file = summary.log.get("subscribers").unwrap().file.clone().unwrap();
    assert_eq!(
        read_text(&file),
        "id,email,attribs.city,attribs.plan.tier\n\
         1,a@example.com,Oslo,pro\n\
         2,b@example.com,Bergen,free\n"
    );
}

#[tokio::test]
async fn media_is_downloaded_once_and_exported_with_local_copy() {
    let server = MockServer::start().await;
    mount_collection(&server, Resource::Media, json!([media_item(&server, 1, "logo.png")])).await;
    mount_upload(&server, "logo.png", b"\x89PNG fake image").await;
    mount_empty_api(&server).await;

    let temp_dir = TempDir::new().unwrap();
    let (runner, _outbox) = create_test_runner(&server.uri(), temp_dir.path(), &[]);
    let media_dir = temp_dir.path().join("backup").join("media");

    let first = runner.run_at(run_time()).await;

    let media = first.log.get("media").unwrap();
    assert_eq!(media.count, Some(1));
    assert_eq!(media.media_downloaded, Some(1));
    assert_files(&media_dir, &["logo.png"]);
    assert_eq!(std::fs::read(media_dir.join("logo.png")).unwrap(), b"\x89PNG fake image");

    let csv = read_text(media.file.as_deref().unwrap());
    let mut lines = csv.lines();
    assert_eq!(
        lines.next(),
        Some("id,uuid,filename,content_type,url,created_at,local_copy")
    );
    assert!(lines.next().unwrap().ends_with(",logo.png"));

    // Unchanged remote content: same local copy, no second file
    let second = runner
        .run_at(run_time() + chrono::Duration::minutes(1))
        .await;
    assert_eq!(second.log.get("media").unwrap().media_downloaded, Some(1));
    assert_files(&media_dir, &["logo.png"]);
}

#[tokio::test]
async fn media_failures_are_soft() {
    let server = MockServer::start().await;
    let missing = media_item(&server, 2, "gone.png");
    let mut no_url = media_item(&server, 3, "nothing.png");
    no_url["url"] = json!("");
    mount_collection(
        &server,
        Resource::Media,
        json!([media_item(&server, 1, "my logo.png"), missing, no_url]),
    )
    .await;
    mount_upload(&server, "my%20logo.png", b"spaced").await;
    mount_empty_api(&server).await;

    let temp_dir = TempDir::new().unwrap();
    let (runner, _outbox) = create_test_runner(&server.uri(), temp_dir.path(), &[]);

    let summary = runner.run_at(run_time()).await;

    let media = summary.log.get("media").unwrap();
    assert_eq!(media.error, None);
    assert_eq!(media.count, Some(3));
    assert_eq!(media.media_downloaded, Some(1));
    assert_files(&temp_dir.path().join("backup").join("media"), &["my logo.png"]);

    let csv = read_text(media.file.as_deref().unwrap());
    let rows: Vec<&str> = csv.lines().skip(1).collect();
    assert!(rows[0].ends_with(",my logo.png"));
    assert!(rows[1].ends_with(','));
    assert!(rows[2].ends_with(','));
}

#[tokio::test]
async fn report_is_saved_and_mailed() {
    let server = MockServer::start().await;
    mount_collection(&server, Resource::Subscribers, json!([{"id": 1, "name": "A"}])).await;
    mount_empty_api(&server).await;

    let temp_dir = TempDir::new().unwrap();
    let (runner, outbox) = create_test_runner(&server.uri(), temp_dir.path(), &[]);

    let summary = runner.run_at(run_time()).await;

    let report_path = summary.report_path.clone().unwrap();
    assert_eq!(
        report_path,
        temp_dir
            .path()
            .join("reports")
            .join("backup_report_14062025_153045.txt")
    );
    let report = read_text(&report_path);
    assert!(report.starts_with("Listmonk Backup Report\nDate and Time: 14.06.2025 15:30:45\n\nLISTS\n"));
    assert!(report.contains(
        "SUBSCRIBERS\n--------------------------\nNumber of records: 1\nBackup file: subscribers_14062025_153045.csv ("
    ));

    assert!(summary.mail_sent);
    let sent = outbox.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "ops@example.com");
    assert_eq!(sent[0].from, "backup@example.com");
    assert_eq!(sent[0].subject, "Listmonk Backup");
    assert!(sent[0].text_body.starts_with("Backup report - 14.06.2025 15:30:45\n\n"));
    assert!(sent[0].text_body.contains("SUBSCRIBERS:\n  - count: 1\n  - file: "));
    assert!(sent[0].html_body.contains("SUBSCRIBERS:<br>\n"));
}

#[tokio::test]
async fn no_mail_is_sent_when_disabled() {
    let server = MockServer::start().await;
    mount_empty_api(&server).await;

    let temp_dir = TempDir::new().unwrap();
    let (runner, outbox) = create_test_runner(&server.uri(), temp_dir.path(), &[]);
    let runner = runner.without_mail();

    let summary = runner.run_at(run_time()).await;

    assert!(!summary.mail_sent);
    assert!(outbox.sent().is_empty());
    assert!(summary.report_path.is_some());
}

#[tokio::test]
async fn expired_backups_are_swept_after_the_run() {
    let server = MockServer::start().await;
    mount_collection(&server, Resource::Lists, json!([{"id": 1}])).await;
    mount_empty_api(&server).await;

    let temp_dir = TempDir::new().unwrap();
    let backup_dir = temp_dir.path().join("backup");
    std::fs::create_dir_all(&backup_dir).unwrap();

    let old = backup_dir.join("lists_01012025_000000.csv");
    std::fs::write(&old, "id\n1\n").unwrap();
    std::fs::File::options()
        .write(true)
        .open(&old)
        .unwrap()
        .set_modified(SystemTime::now() - Duration::from_secs(15 * 24 * 60 * 60))
        .unwrap();

    let (runner, _outbox) = create_test_runner(
        &server.uri(),
        temp_dir.path(),
        &[("BACKUP_RETENTION_DAYS", "14")],
    );
    let summary = runner.run_at(run_time()).await;

    assert_eq!(summary.deleted_backups, 1);
    assert!(!old.exists());
    assert_files(&backup_dir, &["lists_14062025_153045.csv"]);
}

#[tokio::test]
async fn custom_directories_are_honored() {
    let server = MockServer::start().await;
    mount_collection(&server, Resource::Lists, json!([{"id": 1}])).await;
    mount_empty_api(&server).await;

    let temp_dir = TempDir::new().unwrap();
    let (runner, _outbox) = create_test_runner(
        &server.uri(),
        temp_dir.path(),
        &[("BACKUP_DIR", "exports"), ("REPORTS_DIR", "out/reports")],
    );
    let summary = runner.run_at(run_time()).await;

    assert_files(&temp_dir.path().join("exports"), &["lists_14062025_153045.csv"]);
    assert_files(
        &temp_dir.path().join("out").join("reports"),
        &["backup_report_14062025_153045.txt"],
    );
    assert!(temp_dir.path().join("exports").join("media").is_dir());
    assert!(summary.report_path.is_some());
}
