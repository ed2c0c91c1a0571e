//! Directory-backed blob store: one JSON file per key.

use std::path::{Path, PathBuf};

use occurrence_engine::{BlobStore, EngineError};

#[derive(Debug, Clone)]
pub struct FileBlobStore {
    dir: PathBuf,
}

impl FileBlobStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Map a key to a portable file name.
    ///
    /// Bytes outside `[A-Za-z0-9._-]` are percent-encoded, so distinct keys
    /// always land in distinct files.
    fn path_for(&self, key: &str) -> PathBuf {
        let mut name = String::with_capacity(key.len());
        for byte in key.bytes() {
            match byte {
                b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_' | b'.' => {
                    name.push(char::from(byte))
                }
                _ => name.push_str(&format!("%{byte:02X}")),
            }
        }
        self.dir.join(format!("{name}.json"))
    }
}

impl BlobStore for FileBlobStore {
    fn get(&self, key: &str) -> occurrence_engine::Result<Option<String>> {
        let path = self.path_for(key);
        match std::fs::read_to_string(&path) {
            Ok(blob) => Ok(Some(blob)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(EngineError::Storage(format!(
                "read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn put(&mut self, key: &str, blob: String) -> occurrence_engine::Result<()> {
        std::fs::create_dir_all(&self.dir).map_err(|e| {
            EngineError::Storage(format!("create {}: {}", self.dir.display(), e))
        })?;
        let path = self.path_for(key);
        std::fs::write(&path, blob)
            .map_err(|e| EngineError::Storage(format!("write {}: {}", path.display(), e)))?;
        tracing::debug!(path = %path.display(), "stored blob");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use occurrence_engine::persist;

    #[test]
    fn missing_key_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileBlobStore::new(dir.path());
        assert_eq!(store.get("ranges:h1").unwrap(), None);
    }

    #[test]
    fn put_then_get_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileBlobStore::new(dir.path().join("nested"));
        store.put("filters:h1:week", "{}".to_string()).unwrap();
        assert_eq!(store.get("filters:h1:week").unwrap().as_deref(), Some("{}"));
        assert!(store.dir().join("filters%3Ah1%3Aweek.json").exists());
    }

    #[test]
    fn keys_are_encoded_into_one_file_name() {
        let store = FileBlobStore::new("/data");
        assert_eq!(
            store.path_for("ranges:../etc/passwd"),
            PathBuf::from("/data/ranges%3A..%2Fetc%2Fpasswd.json")
        );
    }

    #[test]
    fn households_differing_in_punctuation_stay_separate() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileBlobStore::new(dir.path());
        let options = occurrence_engine::FilterOptions::default().with_tags("school");
        persist::save_filters(&mut store, "fam/1", "week", &options).unwrap();

        assert_eq!(persist::load_filters(&store, "fam/1", "week").unwrap(), options);
        assert!(persist::load_filters(&store, "fam:1", "week").unwrap().is_empty());
        assert_eq!(store.get(&persist::filters_key("fam_1", "week")).unwrap(), None);
    }
}
