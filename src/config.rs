//! Configuration types for listmonk-backup
//!
//! Settings are read once at startup from a `KEY=value` file (the classic
//! `config.ini`) and overlaid with process environment variables of the same name.
//! The result is an immutable [`Config`] that every component receives by reference.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Every setting key this crate understands
pub const KNOWN_KEYS: &[&str] = &[
    "LISTMONK_URL",
    "LISTMONK_USER",
    "LISTMONK_PASS",
    "MAIL_TO",
    "MAIL_FROM",
    "MAIL_SUBJECT",
    "SMTP_HOST",
    "SMTP_PORT",
    "SMTP_USER",
    "SMTP_PASS",
    "BACKUP_RETENTION_DAYS",
    "BACKUP_DIR",
    "MEDIA_DIR",
    "REPORTS_DIR",
    "HTTP_TIMEOUT_SECS",
    "HTTP_CONNECT_TIMEOUT_SECS",
];

/// Remote API credentials and location
#[derive(Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the Listmonk installation, without trailing slash
    pub base_url: String,

    /// Basic-auth username
    pub username: String,

    /// Basic-auth password
    #[serde(skip_serializing)]
    pub password: String,
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"********")
            .finish()
    }
}

/// SMTP relay settings (implicit TLS)
#[derive(Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    /// SMTP server host, e.g. smtp.example.com
    pub host: String,

    /// SMTP port, typically 465 for implicit TLS
    pub port: u16,

    /// SMTP username
    pub username: String,

    /// SMTP password
    #[serde(skip_serializing)]
    pub password: String,
}

impl fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"********")
            .finish()
    }
}

/// Report mail settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MailConfig {
    /// Recipient address
    pub to: String,

    /// Sender address
    pub from: String,

    /// Subject line
    pub subject: String,

    /// Transport settings
    pub smtp: SmtpConfig,
}

/// Where backups, media and reports live, and how long backups are kept
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// CSV exports (default: "<base>/backup")
    pub backup_dir: PathBuf,

    /// Downloaded media assets (default: "<backup_dir>/media")
    pub media_dir: PathBuf,

    /// Rendered text reports (default: "<base>/reports")
    pub reports_dir: PathBuf,

    /// Backups older than this many days are deleted (default: 30)
    #[serde(default = "default_retention_days")]
    pub retention_days: u64,
}

impl StorageConfig {
    /// Standard layout under `base_dir`
    pub fn under(base_dir: &Path) -> Self {
        let backup_dir = base_dir.join("backup");
        Self {
            media_dir: backup_dir.join("media"),
            backup_dir,
            reports_dir: base_dir.join("reports"),
            retention_days: default_retention_days(),
        }
    }
}

/// HTTP client timeouts
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Overall per-request timeout (default: 60s)
    #[serde(default = "default_timeout")]
    pub timeout: Duration,

    /// TCP/TLS connect timeout (default: 10s)
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            connect_timeout: default_connect_timeout(),
        }
    }
}

/// Main configuration for a backup run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Remote API
    pub api: ApiConfig,

    /// Report mail
    pub mail: MailConfig,

    /// Local layout and retention
    pub storage: StorageConfig,

    /// HTTP timeouts
    #[serde(default)]
    pub http: HttpConfig,
}

impl Config {
    /// Load settings from `path` (when given), overlay the environment, and build a config.
    ///
    /// Relative directories resolve against `base_dir`.
    pub fn load(path: Option<&Path>, base_dir: &Path) -> Result<Self> {
        let mut settings = match path {
            Some(path) => read_settings_file(path)?,
            None => HashMap::new(),
        };
        overlay_environment(&mut settings);
        Self::from_settings(&settings, base_dir)
    }

    /// Build a config from an already-parsed key/value map
    pub fn from_settings(settings: &HashMap<String, String>, base_dir: &Path) -> Result<Self> {
        let base_url = required(settings, "LISTMONK_URL")?;
        let base_url = base_url.trim_end_matches('/').to_string();
        match url::Url::parse(&base_url) {
            Ok(parsed) if parsed.has_host() => {}
            _ => {
                return Err(Error::config(
                    "LISTMONK_URL",
                    format!("LISTMONK_URL is not an absolute URL: {base_url}"),
                ));
            }
        }

        let api = ApiConfig {
            base_url,
            username: required(settings, "LISTMONK_USER")?,
            password: required(settings, "LISTMONK_PASS")?,
        };

        let smtp = SmtpConfig {
            host: required(settings, "SMTP_HOST")?,
            port: parse_number(&required(settings, "SMTP_PORT")?, "SMTP_PORT")?,
            username: required(settings, "SMTP_USER")?,
            password: required(settings, "SMTP_PASS")?,
        };

        let mail = MailConfig {
            to: required(settings, "MAIL_TO")?,
            from: required(settings, "MAIL_FROM")?,
            subject: required(settings, "MAIL_SUBJECT")?,
            smtp,
        };

        let mut storage = StorageConfig::under(base_dir);
        if let Some(dir) = optional(settings, "BACKUP_DIR") {
            storage.backup_dir = base_dir.join(dir);
            storage.media_dir = storage.backup_dir.join("media");
        }
        if let Some(dir) = optional(settings, "MEDIA_DIR") {
            storage.media_dir = base_dir.join(dir);
        }
        if let Some(dir) = optional(settings, "REPORTS_DIR") {
            storage.reports_dir = base_dir.join(dir);
        }
        if let Some(days) = optional(settings, "BACKUP_RETENTION_DAYS") {
            storage.retention_days = parse_number(days, "BACKUP_RETENTION_DAYS")?;
        }

        let mut http = HttpConfig::default();
        if let Some(secs) = optional(settings, "HTTP_TIMEOUT_SECS") {
            http.timeout = Duration::from_secs(parse_number(secs, "HTTP_TIMEOUT_SECS")?);
        }
        if let Some(secs) = optional(settings, "HTTP_CONNECT_TIMEOUT_SECS") {
            http.connect_timeout =
                Duration::from_secs(parse_number(secs, "HTTP_CONNECT_TIMEOUT_SECS")?);
        }

        Ok(Self {
            api,
            mail,
            storage,
            http,
        })
    }
}

/// Parse a `KEY=value` settings file
///
/// Accepts the subset of INI that the deployment uses: `;` and `#` comments,
/// `[section]` headers (ignored), optional whitespace around `=`, and quoted values.
pub fn read_settings_file(path: &Path) -> Result<HashMap<String, String>> {
    let raw = std::fs::read_to_string(path).map_err(|e| Error::Config {
        message: format!("could not load {}: {e}", path.display()),
        key: None,
    })?;
    parse_settings(&raw).map_err(|message| Error::Config {
        message: format!("could not parse {}: {message}", path.display()),
        key: None,
    })
}

fn parse_settings(raw: &str) -> std::result::Result<HashMap<String, String>, String> {
    let normalized: String = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with(';') && !line.starts_with('['))
        .map(|line| match line.split_once('=') {
            Some((key, value)) if !line.starts_with('#') => {
                format!("{}={}\n", key.trim(), quote_value(ini_literal(value.trim())))
            }
            _ => format!("{line}\n"),
        })
        .collect();

    let mut settings = HashMap::new();
    for item in dotenvy::from_read_iter(Cursor::new(normalized)) {
        let (key, value) = item.map_err(|e| e.to_string())?;
        settings.insert(key, value);
    }
    Ok(settings)
}

/// The literal value of an INI assignment's right-hand side
///
/// A quoted value is the text between its quotes. An unquoted value ends at a
/// `;` comment preceded by whitespace.
fn ini_literal(value: &str) -> &str {
    if let Some(quote @ ('"' | '\'')) = value.chars().next()
        && let Some(end) = value[1..].find(quote)
    {
        return &value[1..1 + end];
    }

    let end = value
        .char_indices()
        .find(|&(i, c)| c == ';' && value[..i].ends_with(char::is_whitespace))
        .map_or(value.len(), |(i, _)| i);
    value[..end].trim_end()
}

// INI values are literal: spaces and `$` must survive the dotenv parser.
fn quote_value(value: &str) -> String {
    if !value.contains('\'') {
        return format!("'{value}'");
    }
    let escaped = value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('$', "\\$");
    format!("\"{escaped}\"")
}

fn overlay_environment(settings: &mut HashMap<String, String>) {
    for key in KNOWN_KEYS {
        if let Ok(value) = std::env::var(key) {
            settings.insert((*key).to_string(), value);
        }
    }
}

fn required(settings: &HashMap<String, String>, key: &str) -> Result<String> {
    optional(settings, key)
        .map(str::to_string)
        .ok_or_else(|| Error::config(key, format!("missing required setting {key}")))
}

fn optional<'a>(settings: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    settings
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

fn parse_number<T: std::str::FromStr>(value: &str, key: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| Error::config(key, format!("{key} must be a non-negative integer, got {value:?}")))
}

fn default_retention_days() -> u64 {
    30
}

fn default_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}
