//! Naming and discovery of recording segments and snapshot images.
//!
//! Both output directories are flat; every file is named
//! `{device}_{user}_{timestamp}.{ext}` with a local-time
//! `%Y%m%d-%H%M%S` timestamp, so the filesystem listing is the only
//! catalog the server keeps.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use serde::Serialize;

use crate::error::LibraryError;

/// Timestamp format embedded in every media filename.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// A file in one of the media directories, with timing parsed from its name.
#[derive(Debug, Clone, Serialize)]
pub struct MediaFile {
    pub name: String,
    pub size_bytes: u64,
    /// Capture/segment start time parsed from the filename, if it conforms.
    pub timestamp: Option<DateTime<Local>>,
}

/// Replace any character that could not survive a flat filename.
///
/// Device and user names come from request bodies; underscores delimit the
/// name fields and dots belong to the extension, so both are mapped away.
pub fn sanitize_component(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect();

    if cleaned.is_empty() {
        "unnamed".to_string()
    } else {
        cleaned
    }
}

/// Build `{device}_{user}_{timestamp}.{ext}` for the given capture time.
pub fn media_file_name(device: &str, user: &str, at: DateTime<Local>, ext: &str) -> String {
    format!(
        "{}_{}_{}.{}",
        sanitize_component(device),
        sanitize_component(user),
        at.format(TIMESTAMP_FORMAT),
        ext
    )
}

/// Parse the timestamp out of a media filename.
///
/// The timestamp is the last `_`-separated field before the extension, so
/// device names that contain dashes or dots still parse.
pub fn parse_file_timestamp(filename: &str) -> Option<DateTime<Local>> {
    let stem = Path::new(filename).file_stem()?.to_str()?;
    let (_, stamp) = stem.rsplit_once('_')?;
    let naive = NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).ok()?;
    Local.from_local_datetime(&naive).single()
}

/// Flat record/snapshot directories backing the listing and playback routes.
#[derive(Debug, Clone)]
pub struct MediaLibrary {
    records_dir: PathBuf,
    snapshots_dir: PathBuf,
}

impl MediaLibrary {
    pub fn new(records_dir: impl Into<PathBuf>, snapshots_dir: impl Into<PathBuf>) -> Self {
        Self {
            records_dir: records_dir.into(),
            snapshots_dir: snapshots_dir.into(),
        }
    }

    pub fn records_dir(&self) -> &Path {
        &self.records_dir
    }

    pub fn snapshots_dir(&self) -> &Path {
        &self.snapshots_dir
    }

    /// Create both directories and verify they accept writes.
    pub async fn ensure_dirs(&self) -> Result<(), LibraryError> {
        for dir in [&self.records_dir, &self.snapshots_dir] {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|_| LibraryError::DirectoryUnwritable(dir.clone()))?;
            probe_writable(dir).await?;
        }
        Ok(())
    }

    /// Names of all record segments, newest first.
    pub async fn list_records(&self) -> Result<Vec<MediaFile>, LibraryError> {
        list_dir(&self.records_dir).await
    }

    /// Names of all snapshot images, newest first.
    pub async fn list_snapshots(&self) -> Result<Vec<MediaFile>, LibraryError> {
        list_dir(&self.snapshots_dir).await
    }

    /// Resolve a record filename to its on-disk path.
    pub async fn record_path(&self, name: &str) -> Result<PathBuf, LibraryError> {
        resolve_in_dir(&self.records_dir, name).await
    }

    /// Resolve a snapshot filename to its on-disk path.
    pub async fn snapshot_path(&self, name: &str) -> Result<PathBuf, LibraryError> {
        resolve_in_dir(&self.snapshots_dir, name).await
    }
}

/// Verify a directory accepts writes by round-tripping a probe file.
pub async fn probe_writable(dir: &Path) -> Result<(), LibraryError> {
    let probe = dir.join(format!(".write-probe-{}", std::process::id()));
    tokio::fs::write(&probe, b"")
        .await
        .map_err(|_| LibraryError::DirectoryUnwritable(dir.to_path_buf()))?;
    let _ = tokio::fs::remove_file(&probe).await;
    Ok(())
}

async fn list_dir(dir: &Path) -> Result<Vec<MediaFile>, LibraryError> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(LibraryError::DirectoryMissing(dir.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let meta = entry.metadata().await?;
        if !meta.is_file() {
            continue;
        }
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if name.starts_with('.') {
            continue;
        }
        files.push(MediaFile {
            timestamp: parse_file_timestamp(&name),
            size_bytes: meta.len(),
            name,
        });
    }

    // Newest first; the embedded timestamp makes names sort chronologically
    // within one device/user prefix.
    files.sort_by(|a, b| b.name.cmp(&a.name));

    Ok(files)
}

/// Resolve `name` strictly as a single component inside `dir`.
///
/// Names carrying separators or dot-dot are rejected before touching the
/// filesystem so request parameters cannot escape the media directories.
async fn resolve_in_dir(dir: &Path, name: &str) -> Result<PathBuf, LibraryError> {
    if name.is_empty()
        || name.contains('/')
        || name.contains('\\')
        || name.contains("..")
        || name.starts_with('.')
    {
        return Err(LibraryError::InvalidName(name.to_string()));
    }

    let path = dir.join(name);
    match tokio::fs::metadata(&path).await {
        Ok(meta) if meta.is_file() => Ok(path),
        Ok(_) => Err(LibraryError::FileNotFound(name.to_string())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(LibraryError::FileNotFound(name.to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_media_file_name() {
        let at = Local.with_ymd_and_hms(2025, 3, 9, 14, 5, 30).unwrap();
        assert_eq!(
            media_file_name("cam1", "alice", at, "mkv"),
            "cam1_alice_20250309-140530.mkv"
        );
    }

    #[test]
    fn test_sanitize_component() {
        assert_eq!(sanitize_component("cam1"), "cam1");
        assert_eq!(sanitize_component("front door"), "front-door");
        assert_eq!(sanitize_component("../etc"), "---etc");
        assert_eq!(sanitize_component("a/b_c"), "a-b-c");
        assert_eq!(sanitize_component(""), "unnamed");
    }

    #[test]
    fn test_parse_file_timestamp() {
        let dt = parse_file_timestamp("cam1_alice_20250309-140530.mkv").unwrap();
        assert_eq!(dt.year(), 2025);
        assert_eq!(dt.month(), 3);
        assert_eq!(dt.day(), 9);
        assert_eq!(dt.hour(), 14);
        assert_eq!(dt.minute(), 5);
        assert_eq!(dt.second(), 30);
    }

    #[test]
    fn test_parse_file_timestamp_dashed_device() {
        let dt = parse_file_timestamp("front-door_bob-2_20250101-000000.jpg").unwrap();
        assert_eq!(dt.year(), 2025);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(parse_file_timestamp("noextension").is_none());
        assert!(parse_file_timestamp("cam1_alice_notatime.mkv").is_none());
        assert!(parse_file_timestamp("20250309-140530.mkv").is_none());
    }

    #[tokio::test]
    async fn test_listing_sorted_newest_first() {
        let tmp = tempfile::tempdir().unwrap();
        let records = tmp.path().join("records");
        let snaps = tmp.path().join("snapshots");
        let lib = MediaLibrary::new(&records, &snaps);
        lib.ensure_dirs().await.unwrap();

        for name in [
            "cam1_alice_20250309-100000.mkv",
            "cam1_alice_20250309-120000.mkv",
            "cam1_alice_20250309-110000.mkv",
        ] {
            tokio::fs::write(records.join(name), b"x").await.unwrap();
        }
        // Hidden files are skipped.
        tokio::fs::write(records.join(".partial"), b"x").await.unwrap();

        let files = lib.list_records().await.unwrap();
        let names: Vec<_> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "cam1_alice_20250309-120000.mkv",
                "cam1_alice_20250309-110000.mkv",
                "cam1_alice_20250309-100000.mkv",
            ]
        );
        assert!(files.iter().all(|f| f.timestamp.is_some()));
    }

    #[tokio::test]
    async fn test_listing_missing_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let lib = MediaLibrary::new(tmp.path().join("none"), tmp.path().join("none2"));
        assert!(matches!(
            lib.list_records().await,
            Err(LibraryError::DirectoryMissing(_))
        ));
    }

    #[tokio::test]
    async fn test_resolve_rejects_traversal() {
        let tmp = tempfile::tempdir().unwrap();
        let lib = MediaLibrary::new(tmp.path().join("r"), tmp.path().join("s"));
        lib.ensure_dirs().await.unwrap();

        for bad in ["../secret", "a/b.mkv", "..", ".hidden", ""] {
            assert!(
                matches!(
                    lib.record_path(bad).await,
                    Err(LibraryError::InvalidName(_))
                ),
                "expected rejection for {bad:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_resolve_existing_and_missing() {
        let tmp = tempfile::tempdir().unwrap();
        let lib = MediaLibrary::new(tmp.path().join("r"), tmp.path().join("s"));
        lib.ensure_dirs().await.unwrap();

        let name = "cam1_alice_20250309-100000.jpg";
        tokio::fs::write(lib.snapshots_dir().join(name), b"jpg")
            .await
            .unwrap();

        let path = lib.snapshot_path(name).await.unwrap();
        assert!(path.ends_with(name));

        assert!(matches!(
            lib.snapshot_path("cam1_alice_20990101-000000.jpg").await,
            Err(LibraryError::FileNotFound(_))
        ));
    }
}
