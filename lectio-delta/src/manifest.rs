//! Update manifests: the wire form served to clients and the file form
//! produced by the authoring tool.

use crate::types::ChangeDescriptor;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A versioned, ordered set of changes moving a client from `from_version`
/// to `latest_version`.
///
/// `hasUpdates` on the wire is derived from the two versions; a value sent
/// by the server is ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ManifestWire", into = "ManifestWire")]
pub struct UpdateManifest {
    pub from_version: i64,
    pub latest_version: i64,
    pub changes: Vec<ChangeDescriptor>,
    pub size_hint: Option<u64>,
    pub description: Option<String>,
}

impl UpdateManifest {
    /// A manifest carrying no changes for a client already at `version`.
    pub fn up_to_date(version: i64) -> Self {
        Self {
            from_version: version,
            latest_version: version,
            changes: Vec::new(),
            size_hint: None,
            description: None,
        }
    }

    pub fn has_updates(&self) -> bool {
        self.latest_version > self.from_version
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ManifestWire {
    from_version: i64,
    latest_version: i64,
    #[serde(default)]
    has_updates: bool,
    #[serde(default)]
    changes: Vec<ChangeDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    size_hint: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

impl From<ManifestWire> for UpdateManifest {
    fn from(wire: ManifestWire) -> Self {
        Self {
            from_version: wire.from_version,
            latest_version: wire.latest_version,
            changes: wire.changes,
            size_hint: wire.size_hint,
            description: wire.description,
        }
    }
}

impl From<UpdateManifest> for ManifestWire {
    fn from(m: UpdateManifest) -> Self {
        Self {
            has_updates: m.has_updates(),
            from_version: m.from_version,
            latest_version: m.latest_version,
            changes: m.changes,
            size_hint: m.size_hint,
            description: m.description,
        }
    }
}

/// File name for the manifest of a given version.
pub fn manifest_file_name(version: i64) -> String {
    format!("update_v{version}.json")
}

/// A manifest as written to disk by the authoring tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestFile {
    pub version: i64,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub changes: Vec<ChangeDescriptor>,
}

impl ManifestFile {
    pub fn file_name(&self) -> String {
        manifest_file_name(self.version)
    }

    /// Serve this file to a client currently at `from_version`.
    pub fn into_update(self, from_version: i64) -> UpdateManifest {
        let size_hint = serde_json::to_vec(&self.changes)
            .ok()
            .map(|bytes| bytes.len() as u64);
        UpdateManifest {
            from_version,
            latest_version: self.version,
            changes: self.changes,
            size_hint,
            description: Some(self.description),
        }
    }
}
