//! Listmonk backup command line
//!
//! Runs one complete backup and exits. Meant to be started by cron or a systemd timer.

use std::path::{Path, PathBuf};

use clap::Parser;
use listmonk_backup::{BackupRunner, Config};

/// Default settings file looked up in the working directory
const DEFAULT_CONFIG_FILE: &str = "config.ini";

/// Back up a Listmonk installation to CSV files and mail a report
#[derive(Parser, Debug)]
#[command(name = "listmonk-backup")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Settings file (KEY=value lines); defaults to ./config.ini when present.
    /// Environment variables of the same name override file values.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory that relative backup/report paths resolve against
    #[arg(short, long, default_value = ".")]
    base_dir: PathBuf,

    /// Do not send the report mail
    #[arg(long)]
    no_mail: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("listmonk_backup=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    let runner = match build_runner(&cli) {
        Ok(runner) => runner,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let summary = runner.run().await;
    if let Some(path) = &summary.report_path {
        println!("Report saved as: {}", path.display());
    }
    println!("Old backups deleted: {}", summary.deleted_backups);
}

fn build_runner(cli: &Cli) -> listmonk_backup::Result<BackupRunner> {
    let config_path = match &cli.config {
        Some(path) => Some(path.clone()),
        None => {
            let default = Path::new(DEFAULT_CONFIG_FILE);
            default.is_file().then(|| default.to_path_buf())
        }
    };

    let config = Config::load(config_path.as_deref(), &cli.base_dir)?;
    let runner = BackupRunner::new(config)?;
    Ok(if cli.no_mail {
        runner.without_mail()
    } else {
        runner
    })
}
