//! Listing result types handed to the view layer.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// One immediate sub-prefix of the listed prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderEntry {
    pub name: String,
    pub path: String,
    pub navigation_url: String,
}

/// Capability URL for one object, valid until `expires_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedUrl {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

impl SignedUrl {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// True when the URL expires within `margin` of `now`.
    pub fn expires_within(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        now + margin >= self.expires_at
    }

    /// The URL without its query string, i.e. the object it points at.
    pub fn target(&self) -> &str {
        self.url.split('?').next().unwrap_or(&self.url)
    }
}

/// One object directly under the listed prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectEntry {
    pub name: String,
    pub path: String,
    pub last_modified: Option<DateTime<Utc>>,
    pub size: u64,
    pub download_url: SignedUrl,
}

/// Folders and objects directly under one prefix, each in backend order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingResult {
    pub prefix: String,
    pub folders: Vec<FolderEntry>,
    pub objects: Vec<ObjectEntry>,
    /// Set when the page cap stopped the listing before the backend was done.
    pub truncated: bool,
}

impl ListingResult {
    pub fn is_empty(&self) -> bool {
        self.folders.is_empty() && self.objects.is_empty()
    }

    /// Earliest expiry among the signed URLs, `None` without objects.
    pub fn earliest_expiry(&self) -> Option<DateTime<Utc>> {
        self.objects
            .iter()
            .map(|object| object.download_url.expires_at)
            .min()
    }
}
