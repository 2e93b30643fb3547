//! Writing manifests to disk and summarizing them for review.

use crate::error::AuthorResult;
use lectio_delta::ManifestFile;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    pub path: PathBuf,
    /// A manifest for the same version already existed and was replaced.
    pub overwrote: bool,
}

/// Write `manifest` as pretty JSON to `out_dir/update_v{version}.json`,
/// creating `out_dir` if needed.
pub fn write_manifest(manifest: &ManifestFile, out_dir: &Path) -> AuthorResult<WriteOutcome> {
    fs::create_dir_all(out_dir)?;
    let path = out_dir.join(manifest.file_name());
    let overwrote = path.exists();

    let mut json = serde_json::to_string_pretty(manifest)?;
    json.push('\n');
    fs::write(&path, json)?;

    Ok(WriteOutcome { path, overwrote })
}

/// Human-readable listing of every change, for review before publishing.
pub fn render_summary(manifest: &ManifestFile) -> String {
    let mut out = String::new();
    let count = manifest.changes.len();
    let _ = writeln!(
        out,
        "Update manifest v{}: {}",
        manifest.version, manifest.description
    );
    let _ = writeln!(
        out,
        "  created {} by {}",
        manifest.created_at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        manifest.created_by
    );
    let _ = writeln!(out, "  {count} change{}:", if count == 1 { "" } else { "s" });
    for (i, change) in manifest.changes.iter().enumerate() {
        let _ = writeln!(out, "    {}. {change}", i + 1);
    }
    out
}
