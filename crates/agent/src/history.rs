//! History persistence — the message log as JSON snapshot files.
//!
//! Each save writes a fresh timestamped file under the history directory;
//! saves never merge. A load replaces the in-memory log entirely.

use chrono::Local;
use parlance_core::{Error, Message, Result};
use std::path::{Path, PathBuf};

/// Snapshot file name for a save performed now, e.g.
/// `conversation_20260823_141530.json`.
pub fn snapshot_file_name() -> String {
    format!(
        "conversation_{}.json",
        Local::now().format("%Y%m%d_%H%M%S")
    )
}

/// Write the message log to a new snapshot file under `dir`.
///
/// Creates the directory if it does not exist. Returns the path written.
pub async fn write_snapshot(dir: &Path, messages: &[Message]) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| Error::Init(format!("Cannot create history directory {}: {e}", dir.display())))?;

    let path = dir.join(snapshot_file_name());
    let body = serde_json::to_vec_pretty(messages)?;
    tokio::fs::write(&path, body)
        .await
        .map_err(|e| Error::Storage(format!("Cannot write {}: {e}", path.display())))?;

    Ok(path)
}

/// Read a snapshot file back into a message log.
///
/// A missing file is `Error::NotFound`; the caller's in-memory log must be
/// left untouched in that case, so this never mutates anything itself.
pub async fn read_snapshot(path: &Path) -> Result<Vec<Message>> {
    let body = match tokio::fs::read(path).await {
        Ok(body) => body,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::NotFound(format!(
                "History file not found: {}",
                path.display()
            )));
        }
        Err(e) => {
            return Err(Error::Storage(format!(
                "Cannot read {}: {e}",
                path.display()
            )));
        }
    };

    serde_json::from_slice(&body)
        .map_err(|e| Error::Storage(format!("Corrupt history file {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_names_are_timestamped() {
        let name = snapshot_file_name();
        assert!(name.starts_with("conversation_"));
        assert!(name.ends_with(".json"));
        // conversation_ + YYYYMMDD + _ + HHMMSS + .json
        assert_eq!(name.len(), "conversation_".len() + 15 + ".json".len());
    }

    #[tokio::test]
    async fn snapshot_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let log = vec![Message::user("hi"), Message::assistant("hello")];

        let path = write_snapshot(dir.path(), &log).await.unwrap();
        assert!(path.exists());

        let loaded = read_snapshot(&path).await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].content, "hi");
        assert_eq!(loaded[1].content, "hello");
    }

    #[tokio::test]
    async fn write_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("deep/conversations");
        let path = write_snapshot(&nested, &[]).await.unwrap();
        assert!(path.starts_with(&nested));
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let err = read_snapshot(Path::new("/nonexistent/history.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn corrupt_file_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        tokio::fs::write(&path, b"not json").await.unwrap();
        let err = read_snapshot(&path).await.unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
    }
}
