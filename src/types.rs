//! Core types for listmonk-backup

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;

use crate::error::{Error, Result};

/// An API record as returned by the remote service: arbitrarily nested JSON
pub type RemoteRecord = Map<String, Value>;

/// A single-level mapping from dot-joined key paths to scalar (or sequence) values
pub type FlattenedRecord = Map<String, Value>;

/// How a collection endpoint wraps its records
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseShape {
    /// `{"data": {"results": [...]}}`
    Paged,
    /// `{"data": [...]}`
    Bare,
}

impl ResponseShape {
    fn expected(self) -> &'static str {
        match self {
            ResponseShape::Paged => "data.results array",
            ResponseShape::Bare => "data array",
        }
    }

    /// Pull the record array out of a response body
    ///
    /// Fails with [`Error::UnexpectedShape`] when the body is missing or shaped differently
    /// than declared. Array elements that are not objects are kept as empty records so the
    /// record count still matches what the server sent.
    pub fn extract(self, endpoint: &str, body: Option<&Value>) -> Result<Vec<RemoteRecord>> {
        let data = body.and_then(|b| b.get("data"));
        let items = match self {
            ResponseShape::Paged => data.and_then(|d| d.get("results")),
            ResponseShape::Bare => data,
        };

        let items = items
            .and_then(Value::as_array)
            .ok_or_else(|| Error::UnexpectedShape {
                endpoint: endpoint.to_string(),
                expected: self.expected(),
            })?;

        Ok(items
            .iter()
            .map(|item| item.as_object().cloned().unwrap_or_default())
            .collect())
    }
}

/// One backed-up collection type
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    /// Mailing lists
    Lists,
    /// Subscribers
    Subscribers,
    /// Campaigns
    Campaigns,
    /// E-mail templates
    Templates,
    /// Bounce records
    Bounces,
    /// Import jobs
    Import,
    /// Media assets (records plus downloaded binaries)
    Media,
}

impl Resource {
    /// All resources in backup order
    pub const ALL: [Resource; 7] = [
        Resource::Lists,
        Resource::Subscribers,
        Resource::Campaigns,
        Resource::Templates,
        Resource::Bounces,
        Resource::Import,
        Resource::Media,
    ];

    /// Name used in file prefixes, the run log and the report
    pub fn name(self) -> &'static str {
        match self {
            Resource::Lists => "lists",
            Resource::Subscribers => "subscribers",
            Resource::Campaigns => "campaigns",
            Resource::Templates => "templates",
            Resource::Bounces => "bounces",
            Resource::Import => "import",
            Resource::Media => "media",
        }
    }

    /// API endpoint, relative to `/api/`
    pub fn endpoint(self) -> &'static str {
        self.name()
    }

    /// Envelope shape of the list response
    pub fn shape(self) -> ResponseShape {
        match self {
            Resource::Templates | Resource::Import => ResponseShape::Bare,
            _ => ResponseShape::Paged,
        }
    }
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A remote media item annotated with its on-disk copy
#[derive(Clone, Debug, PartialEq)]
pub struct MediaDescriptor {
    /// The record as listed by the API (carries `url` and metadata)
    pub record: RemoteRecord,

    /// Filename inside the media directory, or `None` when no copy could be made
    pub local_copy: Option<String>,
}

impl MediaDescriptor {
    /// Wrap a freshly listed record; no local copy yet
    pub fn new(record: RemoteRecord) -> Self {
        Self {
            record,
            local_copy: None,
        }
    }

    /// Source URL, if the record carries a non-empty string `url`
    pub fn url(&self) -> Option<&str> {
        self.record
            .get("url")
            .and_then(Value::as_str)
            .filter(|u| !u.is_empty())
    }

    /// The record with `local_copy` appended, ready for tabular export
    pub fn into_record(self) -> RemoteRecord {
        let mut record = self.record;
        record.insert(
            "local_copy".to_string(),
            self.local_copy.map(Value::String).unwrap_or(Value::Null),
        );
        record
    }
}

/// A CSV file written for one resource in one run
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackupArtifact {
    /// Resource name (file prefix)
    pub resource_name: String,
    /// Full path of the written file
    pub file_path: PathBuf,
    /// Number of records written
    pub record_count: usize,
    /// When the file was written
    pub created_at: DateTime<Local>,
}

/// Outcome of backing up a single resource
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ResourceOutcome {
    /// Records fetched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,

    /// Backup file, absent when nothing was written
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,

    /// Media items that have a local copy after sync
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_downloaded: Option<usize>,

    /// Why the resource failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResourceOutcome {
    /// Outcome for a failed resource
    pub fn failed(error: impl std::fmt::Display) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Default::default()
        }
    }

    /// Key/value pairs in report order, skipping absent fields
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = Vec::new();
        if let Some(count) = self.count {
            fields.push(("count", count.to_string()));
        }
        if let Some(file) = &self.file {
            fields.push(("file", file.display().to_string()));
        }
        if let Some(media) = self.media_downloaded {
            fields.push(("media_downloaded", media.to_string()));
        }
        if let Some(error) = &self.error {
            fields.push(("error", error.clone()));
        }
        fields
    }
}

/// Per-resource outcomes of one run, in insertion order
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RunLog {
    entries: Vec<(String, ResourceOutcome)>,
}

impl RunLog {
    /// Empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an outcome; a second record for the same name replaces the first in place
    pub fn record(&mut self, name: impl Into<String>, outcome: ResourceOutcome) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = outcome,
            None => self.entries.push((name, outcome)),
        }
    }

    /// Look up an entry by resource name
    pub fn get(&self, name: &str) -> Option<&ResourceOutcome> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, outcome)| outcome)
    }

    /// Entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ResourceOutcome)> {
        self.entries.iter().map(|(n, o)| (n.as_str(), o))
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries carrying an error
    pub fn error_count(&self) -> usize {
        self.entries.iter().filter(|(_, o)| o.error.is_some()).count()
    }
}
