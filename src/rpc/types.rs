// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Decoded engine payloads.
//!
//! Sizes, lengths, speeds and counters arrive as decimal strings so that
//! 64-bit values survive JSON. They are kept as strings here and converted
//! through [`parse_magnitude`] by the accessor methods, so a malformed field
//! reads as zero instead of failing the whole response.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::metrics::parse_magnitude;

/// Lifecycle state reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Active,
    Waiting,
    Paused,
    Complete,
    Error,
    Removed,
    /// A status string this client does not know.
    #[default]
    #[serde(other)]
    Unknown,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Waiting => "waiting",
            Self::Paused => "paused",
            Self::Complete => "complete",
            Self::Error => "error",
            Self::Removed => "removed",
            Self::Unknown => "unknown",
        }
    }

    /// Stopped tasks no longer transfer and only leave the engine on removal
    /// of their download result.
    pub fn is_stopped(&self) -> bool {
        matches!(self, Self::Complete | Self::Error | Self::Removed)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn value_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

/// Accept a string, a number or null for a field the engine sends as a
/// decimal string.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(value_to_string(Value::deserialize(deserializer)?))
}

fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Status of a single source URI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UriStatus {
    Used,
    Waiting,
    #[default]
    #[serde(other)]
    Unknown,
}

/// A source URI of a file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UriEntry {
    pub uri: String,
    pub status: UriStatus,
}

/// A file belonging to a task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FileEntry {
    #[serde(deserialize_with = "lenient_string")]
    pub index: String,
    pub path: String,
    #[serde(deserialize_with = "lenient_string")]
    pub length: String,
    #[serde(deserialize_with = "lenient_string")]
    pub completed_length: String,
    #[serde(deserialize_with = "lenient_string")]
    pub selected: String,
    pub uris: Vec<UriEntry>,
}

impl FileEntry {
    pub fn length(&self) -> u64 {
        parse_magnitude(&self.length)
    }

    pub fn completed_length(&self) -> u64 {
        parse_magnitude(&self.completed_length)
    }

    pub fn is_selected(&self) -> bool {
        self.selected == "true"
    }
}

/// Torrent layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BittorrentMode {
    Single,
    Multi,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BittorrentName {
    pub name: String,
}

/// Metadata of a task created from a torrent or magnet link.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BittorrentInfo {
    pub announce_list: Vec<Vec<String>>,
    pub comment: Option<String>,
    /// Seconds since the epoch.
    #[serde(deserialize_with = "lenient_i64")]
    pub creation_date: Option<i64>,
    pub mode: Option<BittorrentMode>,
    pub info: Option<BittorrentName>,
}

impl BittorrentInfo {
    pub fn name(&self) -> Option<&str> {
        self.info
            .as_ref()
            .map(|info| info.name.as_str())
            .filter(|name| !name.is_empty())
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.creation_date.and_then(|secs| DateTime::from_timestamp(secs, 0))
    }

    /// Tracker URLs, tiers flattened in order.
    pub fn trackers(&self) -> impl Iterator<Item = &str> {
        self.announce_list.iter().flatten().map(String::as_str)
    }
}

/// Snapshot of one task as the engine reports it.
///
/// Records are never built by the client and carry no identity beyond `gid`:
/// two fetches of the same task give two unrelated values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TaskRecord {
    pub gid: String,
    pub status: TaskStatus,
    #[serde(deserialize_with = "lenient_string")]
    pub total_length: String,
    #[serde(deserialize_with = "lenient_string")]
    pub completed_length: String,
    #[serde(deserialize_with = "lenient_string")]
    pub upload_length: String,
    pub bitfield: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub download_speed: String,
    #[serde(deserialize_with = "lenient_string")]
    pub upload_speed: String,
    pub info_hash: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub num_seeders: String,
    #[serde(deserialize_with = "lenient_string")]
    pub seeder: String,
    #[serde(deserialize_with = "lenient_string")]
    pub piece_length: String,
    #[serde(deserialize_with = "lenient_string")]
    pub num_pieces: String,
    #[serde(deserialize_with = "lenient_string")]
    pub connections: String,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    /// Tasks spawned by this one (e.g. the data download of a metadata task).
    pub followed_by: Vec<String>,
    /// The task that spawned this one.
    pub belongs_to: Option<String>,
    pub dir: String,
    pub files: Vec<FileEntry>,
    pub bittorrent: Option<BittorrentInfo>,
    #[serde(deserialize_with = "lenient_string")]
    pub verified_length: String,
    #[serde(deserialize_with = "lenient_string")]
    pub verify_integrity_pending: String,
}

impl TaskRecord {
    pub fn total_length(&self) -> u64 {
        parse_magnitude(&self.total_length)
    }

    pub fn completed_length(&self) -> u64 {
        parse_magnitude(&self.completed_length)
    }

    pub fn upload_length(&self) -> u64 {
        parse_magnitude(&self.upload_length)
    }

    pub fn download_speed(&self) -> u64 {
        parse_magnitude(&self.download_speed)
    }

    pub fn upload_speed(&self) -> u64 {
        parse_magnitude(&self.upload_speed)
    }

    pub fn connections(&self) -> u64 {
        parse_magnitude(&self.connections)
    }

    pub fn num_seeders(&self) -> u64 {
        parse_magnitude(&self.num_seeders)
    }

    pub fn num_pieces(&self) -> u64 {
        parse_magnitude(&self.num_pieces)
    }

    pub fn piece_length(&self) -> u64 {
        parse_magnitude(&self.piece_length)
    }

    pub fn is_seeder(&self) -> bool {
        self.seeder == "true"
    }

    /// Engine error for tasks in the error state. The code is kept as the
    /// engine's string; `"0"` means no error.
    pub fn error(&self) -> Option<(&str, &str)> {
        if self.status != TaskStatus::Error {
            return None;
        }
        let code = self.error_code.as_deref().unwrap_or("");
        let message = self.error_message.as_deref().unwrap_or("");
        Some((code, message))
    }
}

/// Engine version information.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Version {
    pub version: String,
    pub enabled_features: Vec<String>,
}

/// Global transfer statistics, keyed by the engine's statistic names.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct GlobalStat(BTreeMap<String, String>);

impl<'de> Deserialize<'de> for GlobalStat {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = BTreeMap::<String, Value>::deserialize(deserializer)?;
        Ok(Self(
            raw.into_iter()
                .map(|(name, value)| (name, value_to_string(value)))
                .collect(),
        ))
    }
}

impl GlobalStat {
    /// Raw decimal string for a statistic.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Statistic as a number; missing or malformed values read as zero.
    pub fn value(&self, name: &str) -> u64 {
        self.get(name).map(parse_magnitude).unwrap_or(0)
    }

    pub fn download_speed(&self) -> u64 {
        self.value("downloadSpeed")
    }

    pub fn upload_speed(&self) -> u64 {
        self.value("uploadSpeed")
    }

    pub fn num_active(&self) -> u64 {
        self.value("numActive")
    }

    pub fn num_waiting(&self) -> u64 {
        self.value("numWaiting")
    }

    pub fn num_stopped(&self) -> u64 {
        self.value("numStopped")
    }

    pub fn num_stopped_total(&self) -> u64 {
        self.value("numStoppedTotal")
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn torrent_task() -> Value {
        json!({
            "gid": "2089b05ecca3d829",
            "status": "active",
            "totalLength": "34896138",
            "completedLength": "34896138",
            "uploadLength": "1048576",
            "bitfield": "ffff",
            "downloadSpeed": "0",
            "uploadSpeed": "2048",
            "infoHash": "248d0a1cd08284299de78d5c1ed359bb46717d8c",
            "numSeeders": "0",
            "seeder": "true",
            "pieceLength": "262144",
            "numPieces": "134",
            "connections": "3",
            "followedBy": [],
            "belongsTo": "d2bef0a8b5d6b0e2",
            "dir": "/downloads",
            "files": [{
                "index": "1",
                "path": "/downloads/ubuntu.iso",
                "length": "34896138",
                "completedLength": "34896138",
                "selected": "true",
                "uris": [{"status": "used", "uri": "http://example.org/ubuntu.iso"}]
            }],
            "bittorrent": {
                "announceList": [["udp://tracker.example.org:6969"], ["udp://backup.example.org:80"]],
                "comment": "Ubuntu CD",
                "creationDate": 1700000000,
                "mode": "single",
                "info": {"name": "ubuntu.iso"}
            }
        })
    }

    #[test]
    fn test_decode_full_record() {
        let task: TaskRecord = serde_json::from_value(torrent_task()).unwrap();
        assert_eq!(task.gid, "2089b05ecca3d829");
        assert_eq!(task.status, TaskStatus::Active);
        assert_eq!(task.total_length(), 34_896_138);
        assert_eq!(task.upload_speed(), 2048);
        assert_eq!(task.connections(), 3);
        assert!(task.is_seeder());
        assert_eq!(task.belongs_to.as_deref(), Some("d2bef0a8b5d6b0e2"));
        assert_eq!(task.files.len(), 1);
        assert!(task.files[0].is_selected());
        assert_eq!(task.files[0].uris[0].status, UriStatus::Used);

        let bt = task.bittorrent.as_ref().unwrap();
        assert_eq!(bt.name(), Some("ubuntu.iso"));
        assert_eq!(bt.mode, Some(BittorrentMode::Single));
        assert_eq!(bt.trackers().count(), 2);
        assert_eq!(bt.created_at().unwrap().timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_decode_minimal_record() {
        let task: TaskRecord = serde_json::from_value(json!({"gid": "abc", "status": "waiting"})).unwrap();
        assert_eq!(task.status, TaskStatus::Waiting);
        assert_eq!(task.total_length(), 0);
        assert!(task.files.is_empty());
        assert!(task.bittorrent.is_none());
    }

    #[test]
    fn test_unknown_status_does_not_fail() {
        let task: TaskRecord = serde_json::from_value(json!({"gid": "abc", "status": "seeding"})).unwrap();
        assert_eq!(task.status, TaskStatus::Unknown);
    }

    #[test]
    fn test_numeric_fields_sent_as_numbers() {
        let task: TaskRecord = serde_json::from_value(json!({
            "gid": "abc",
            "status": "active",
            "totalLength": 1024,
            "numSeeders": 4,
            "connections": null
        }))
        .unwrap();
        assert_eq!(task.total_length(), 1024);
        assert_eq!(task.num_seeders(), 4);
        assert_eq!(task.connections(), 0);
    }

    #[test]
    fn test_error_details_only_in_error_state() {
        let failed: TaskRecord = serde_json::from_value(json!({
            "gid": "abc",
            "status": "error",
            "errorCode": "3",
            "errorMessage": "Resource not found"
        }))
        .unwrap();
        assert_eq!(failed.error(), Some(("3", "Resource not found")));

        let active: TaskRecord = serde_json::from_value(json!({"gid": "abc", "status": "active", "errorCode": "0"})).unwrap();
        assert_eq!(active.error(), None);
    }

    #[test]
    fn test_global_stat() {
        let stat: GlobalStat = serde_json::from_value(json!({
            "downloadSpeed": "21846",
            "uploadSpeed": "0",
            "numActive": "2",
            "numWaiting": "0",
            "numStopped": "1",
            "numStoppedTotal": 7
        }))
        .unwrap();
        assert_eq!(stat.download_speed(), 21_846);
        assert_eq!(stat.num_active(), 2);
        assert_eq!(stat.num_stopped_total(), 7);
        assert_eq!(stat.value("missing"), 0);
        assert_eq!(stat.get("numStopped"), Some("1"));
    }

    #[test]
    fn test_version() {
        let version: Version = serde_json::from_value(json!({
            "version": "1.37.0",
            "enabledFeatures": ["BitTorrent", "Metalink"]
        }))
        .unwrap();
        assert_eq!(version.version, "1.37.0");
        assert_eq!(version.enabled_features, vec!["BitTorrent", "Metalink"]);
    }

    #[test]
    fn test_stopped_statuses() {
        for status in [TaskStatus::Complete, TaskStatus::Error, TaskStatus::Removed] {
            assert!(status.is_stopped(), "{}", status);
        }
        for status in [TaskStatus::Active, TaskStatus::Waiting, TaskStatus::Paused, TaskStatus::Unknown] {
            assert!(!status.is_stopped(), "{}", status);
        }
    }
}
