//! Flat JSON file holding every registered face.
//!
//! The file is a single JSON array of `{name, encoding}` objects. It is
//! read whole and rewritten whole; callers serialize access through the
//! engine thread.
//!
//! Encodings are `f32`. A file written with float64 values loads fine, but
//! the next rewrite stores every value rounded to the nearest `f32`.

use facereg_core::FaceRecord;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("encoding database not found: {0}")]
    NotFound(PathBuf),
    #[error("encoding database is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("encoding database I/O: {0}")]
    Io(#[from] io::Error),
}

pub struct JsonStore {
    path: PathBuf,
}

impl JsonStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load every record. A missing file is an error.
    pub fn load(&self) -> Result<Vec<FaceRecord>, StoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(self.path.clone()))
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Load every record, treating a missing file as an empty store.
    pub fn load_or_default(&self) -> Result<Vec<FaceRecord>, StoreError> {
        match self.load() {
            Err(StoreError::NotFound(_)) => Ok(Vec::new()),
            other => other,
        }
    }

    /// Append one record and rewrite the whole file.
    ///
    /// Creates the file (and its parent directory) when missing. Returns the
    /// number of records now stored.
    pub fn append(&self, record: FaceRecord) -> Result<usize, StoreError> {
        let mut records = self.load_or_default()?;
        records.push(record);
        self.rewrite(&records)?;
        Ok(records.len())
    }

    /// Replace the file contents via a temporary sibling and rename.
    fn rewrite(&self, records: &[FaceRecord]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut tmp_name = self.path.file_name().unwrap_or_default().to_os_string();
        tmp_name.push(".tmp");
        let tmp_path = self.path.with_file_name(tmp_name);

        let json = serde_json::to_vec(records)?;
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(&json)?;
        file.sync_all()?;
        fs::rename(&tmp_path, &self.path)?;

        tracing::debug!(path = %self.path.display(), records = records.len(), "store written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facereg_core::Encoding;

    fn record(name: &str, v: f32) -> FaceRecord {
        FaceRecord {
            name: name.into(),
            encoding: Encoding::new(vec![v; 4]),
        }
    }

    #[test]
    fn test_load_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path().join("face_db.json"));
        assert!(!store.exists());
        assert!(matches!(store.load(), Err(StoreError::NotFound(_))));
        assert!(store.load_or_default().unwrap().is_empty());
    }

    #[test]
    fn test_append_creates_file_and_parent() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path().join("nested/dir/face_db.json"));

        assert_eq!(store.append(record("alice", 0.1)).unwrap(), 1);
        assert!(store.exists());
        assert_eq!(store.load().unwrap(), vec![record("alice", 0.1)]);
    }

    #[test]
    fn test_append_preserves_order_and_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path().join("face_db.json"));

        store.append(record("alice", 0.1)).unwrap();
        store.append(record("bob", 0.2)).unwrap();
        assert_eq!(store.append(record("alice", 0.3)).unwrap(), 3);

        let names: Vec<String> = store.load().unwrap().into_iter().map(|r| r.name).collect();
        assert_eq!(names, ["alice", "bob", "alice"]);
        assert!(!dir.path().join("face_db.json.tmp").exists());
    }

    #[test]
    fn test_file_format_is_plain_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("face_db.json");
        let store = JsonStore::new(&path);
        store.append(record("carol", 0.5)).unwrap();

        let raw: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(
            raw,
            serde_json::json!([{ "name": "carol", "encoding": [0.5, 0.5, 0.5, 0.5] }])
        );
    }

    #[test]
    fn test_reads_externally_written_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("face_db.json");
        fs::write(&path, r#"[{"name": "dave", "encoding": [0.25, -0.5]}]"#).unwrap();

        let records = JsonStore::new(&path).load().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].encoding.values, vec![0.25, -0.5]);
    }

    #[test]
    fn test_float64_file_is_rewritten_at_f32_precision() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("face_db.json");
        fs::write(&path, r#"[{"name": "erin", "encoding": [-0.0912345678901234, 0.1]}]"#).unwrap();

        let store = JsonStore::new(&path);
        assert_eq!(store.append(record("frank", 0.5)).unwrap(), 2);

        let records = store.load().unwrap();
        assert_eq!(records[0].name, "erin");
        assert_eq!(records[0].encoding.values, vec![-0.0912345678901234_f64 as f32, 0.1]);

        let raw: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        let first = raw[0]["encoding"][0].as_f64().unwrap();
        assert_ne!(first, -0.0912345678901234);
        assert!((first + 0.0912345678901234).abs() < 1e-7);
    }

    #[test]
    fn test_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("face_db.json");
        fs::write(&path, b"{ not json").unwrap();

        let store = JsonStore::new(&path);
        assert!(matches!(store.load(), Err(StoreError::Corrupt(_))));
        assert!(matches!(store.append(record("x", 0.0)), Err(StoreError::Corrupt(_))));
    }
}
