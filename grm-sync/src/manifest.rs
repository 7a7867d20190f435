//! Per-directory integrity manifest (`files_info.txt`).
//!
//! Every regular file below a directory (the manifest itself excluded) gets
//! one record: relative path, human-readable size, mtime, and MD5 / SHA-1 /
//! SHA-256 / SHA-512 digests. Records follow directory-walk order, sorted by
//! file name at each level.
//!
//! All functions here are blocking; async callers run them on
//! `tokio::task::spawn_blocking`.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local};
use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};
use walkdir::WalkDir;

use grm_core::layout::{self, MANIFEST_FILE};

use crate::error::{io_err, SyncError};

const HASH_BUFFER: usize = 64 * 1024;
const HEADER: &str = "File manifest";
const RULE_WIDTH: usize = 50;

/// Hex digests of one file's contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDigests {
    pub md5: String,
    pub sha1: String,
    pub sha256: String,
    pub sha512: String,
}

/// One manifest record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// Path relative to the manifest directory, `/`-separated.
    pub relative_path: String,
    pub size: String,
    pub modified: String,
    /// `None` when the file could not be read.
    pub digests: Option<FileDigests>,
}

/// Format a byte count with base-1024 units and two decimals, e.g. `1.50 KB`.
pub fn format_size(bytes: u64) -> String {
    let mut size = bytes as f64;
    for unit in ["B", "KB", "MB", "GB"] {
        if size < 1024.0 {
            return format!("{size:.2} {unit}");
        }
        size /= 1024.0;
    }
    format!("{size:.2} TB")
}

/// Total size of all regular files below `path`. Unreadable entries count as zero.
pub fn directory_size(path: &Path) -> u64 {
    WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}

/// Stream `path` through all four digests in one pass.
pub fn hash_file(path: &Path) -> std::io::Result<FileDigests> {
    let mut file = File::open(path)?;
    let mut md5 = Md5::new();
    let mut sha1 = Sha1::new();
    let mut sha256 = Sha256::new();
    let mut sha512 = Sha512::new();

    let mut buf = vec![0u8; HASH_BUFFER];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        let chunk = &buf[..n];
        md5.update(chunk);
        sha1.update(chunk);
        sha256.update(chunk);
        sha512.update(chunk);
    }

    Ok(FileDigests {
        md5: hex::encode(md5.finalize()),
        sha1: hex::encode(sha1.finalize()),
        sha256: hex::encode(sha256.finalize()),
        sha512: hex::encode(sha512.finalize()),
    })
}

/// Collect one entry per regular file below `dir`.
///
/// Walk and metadata errors skip the affected file; hashing errors keep the
/// entry with `digests: None`. Both are logged.
pub fn collect_entries(dir: &Path) -> Vec<ManifestEntry> {
    let mut entries = Vec::new();
    for item in WalkDir::new(dir).sort_by_file_name() {
        let item = match item {
            Ok(item) => item,
            Err(err) => {
                tracing::warn!(dir = %dir.display(), error = %err, "skipping unreadable entry");
                continue;
            }
        };
        let name = item.file_name().to_string_lossy();
        if !item.file_type().is_file() || name == MANIFEST_FILE || layout::is_part_name(&name) {
            continue;
        }

        let path = item.path();
        let metadata = match item.metadata() {
            Ok(m) => m,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "skipping file without metadata");
                continue;
            }
        };
        let digests = match hash_file(path) {
            Ok(d) => Some(d),
            Err(err) => {
                tracing::error!(path = %path.display(), error = %err, "failed to hash file");
                None
            }
        };

        entries.push(ManifestEntry {
            relative_path: relative_display(dir, path),
            size: format_size(metadata.len()),
            modified: format_mtime(metadata.modified().ok()),
            digests,
        });
    }
    entries
}

/// Render entries into the manifest text format.
pub fn render(entries: &[ManifestEntry]) -> String {
    let mut out = String::new();
    out.push_str(HEADER);
    out.push('\n');
    out.push_str(&"=".repeat(RULE_WIDTH));
    out.push_str("\n\n");
    for entry in entries {
        out.push_str(&format!("Path: {}\n", entry.relative_path));
        out.push_str(&format!("Size: {}\n", entry.size));
        out.push_str(&format!("Modified: {}\n", entry.modified));
        out.push_str("Hashes:\n");
        if let Some(d) = &entry.digests {
            out.push_str(&format!("  md5: {}\n", d.md5));
            out.push_str(&format!("  sha1: {}\n", d.sha1));
            out.push_str(&format!("  sha256: {}\n", d.sha256));
            out.push_str(&format!("  sha512: {}\n", d.sha512));
        }
        out.push_str(&"-".repeat(RULE_WIDTH));
        out.push('\n');
    }
    out
}

/// Write `<dir>/files_info.txt` describing every file below `dir`.
pub fn generate(dir: &Path) -> Result<PathBuf, SyncError> {
    if !dir.is_dir() {
        return Err(io_err(
            dir,
            std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
        ));
    }
    let text = render(&collect_entries(dir));

    let path = dir.join(MANIFEST_FILE);
    let tmp = dir.join(format!("{MANIFEST_FILE}.tmp"));
    std::fs::write(&tmp, text).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, &path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(&path, e));
    }
    tracing::info!(path = %path.display(), "manifest written");
    Ok(path)
}

/// Write a manifest for `dir` and, when `recursive`, for every directory below it.
///
/// Returns the manifests written, parents before children.
pub fn generate_tree(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>, SyncError> {
    let mut written = vec![generate(dir)?];
    if recursive {
        for item in WalkDir::new(dir).min_depth(1).sort_by_file_name() {
            let item = item.map_err(|e| {
                let path = e.path().unwrap_or(dir).to_path_buf();
                io_err(path, std::io::Error::other(e.to_string()))
            })?;
            if item.file_type().is_dir() {
                written.push(generate(item.path())?);
            }
        }
    }
    Ok(written)
}

fn relative_display(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn format_mtime(modified: Option<SystemTime>) -> String {
    match modified {
        Some(t) => DateTime::<Local>::from(t).format("%Y-%m-%d %H:%M:%S").to_string(),
        None => "unknown".to_owned(),
    }
}
