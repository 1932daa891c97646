//! Saved link shortcuts for the linkcast Hub.
//!
//! A flat `name -> url` map kept in memory and written to a JSON object
//! file on [`LinkStore::save`]. The file format is the plain object the
//! console has always written:
//!
//! ```text
//! {
//!   "docs": "https://docs.example.com",
//!   "news": "https://news.example.com"
//! }
//! ```

mod url;

pub use url::{normalize_url, parse_url_list, suggest_name};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// Default file name, relative to the Hub's config directory.
pub const DEFAULT_FILE_NAME: &str = "saved_links.json";

/// Errors from link store persistence.
#[derive(Debug, thiserror::Error)]
pub enum LinkStoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Named URL shortcuts backed by a JSON file.
#[derive(Debug, Clone)]
pub struct LinkStore {
    path: PathBuf,
    links: BTreeMap<String, String>,
}

impl LinkStore {
    /// Creates an empty store that will save to `path`.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            links: BTreeMap::new(),
        }
    }

    /// Loads the store from `path`.
    ///
    /// A missing file yields an empty store. An unreadable or corrupt file
    /// is logged and also yields an empty store, so the Hub keeps working.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match read_links(&path) {
            Ok(links) => {
                debug!("loaded {} saved link(s) from {:?}", links.len(), path);
                Self { path, links }
            }
            Err(e) => {
                warn!(path = %path.display(), "failed to load saved links: {e}");
                Self::empty(path)
            }
        }
    }

    /// Writes the store to its file as pretty-printed JSON.
    pub fn save(&self) -> Result<(), LinkStoreError> {
        let json = serde_json::to_string_pretty(&self.links)?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, json)?;
        debug!("saved {} link(s) to {:?}", self.links.len(), self.path);
        Ok(())
    }

    /// Adds or replaces a shortcut. Returns the previous URL, if any.
    pub fn insert(&mut self, name: impl Into<String>, url: impl Into<String>) -> Option<String> {
        self.links.insert(name.into(), url.into())
    }

    /// Removes a shortcut. Returns its URL if it existed.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.links.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.links.get(name).map(String::as_str)
    }

    /// Iterates over `(name, url)` pairs sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.links.iter().map(|(n, u)| (n.as_str(), u.as_str()))
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn read_links(path: &Path) -> Result<BTreeMap<String, String>, LinkStoreError> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let data = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> (tempfile::TempDir, LinkStore) {
        let tmp = tempfile::tempdir().unwrap();
        let store = LinkStore::load(tmp.path().join(DEFAULT_FILE_NAME));
        (tmp, store)
    }

    #[test]
    fn missing_file_is_empty() {
        let (_tmp, store) = test_store();
        assert!(store.is_empty());
        assert!(store.get("docs").is_none());
    }

    #[test]
    fn insert_get_remove() {
        let (_tmp, mut store) = test_store();
        assert_eq!(store.insert("docs", "https://docs.test"), None);
        assert_eq!(store.get("docs"), Some("https://docs.test"));
        assert_eq!(
            store.insert("docs", "https://v2.docs.test").as_deref(),
            Some("https://docs.test")
        );
        assert_eq!(store.remove("docs").as_deref(), Some("https://v2.docs.test"));
        assert!(store.remove("docs").is_none());
    }

    #[test]
    fn iter_is_sorted_by_name() {
        let (_tmp, mut store) = test_store();
        store.insert("news", "https://n.test");
        store.insert("alpha", "https://a.test");
        store.insert("mail", "https://m.test");

        let names: Vec<&str> = store.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["alpha", "mail", "news"]);
    }

    #[test]
    fn save_and_reload() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join(DEFAULT_FILE_NAME);

        {
            let mut store = LinkStore::load(&path);
            store.insert("a", "https://a.test");
            store.insert("b", "https://b.test");
            store.save().unwrap();
        }

        let store = LinkStore::load(&path);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get("b"), Some("https://b.test"));
    }

    #[test]
    fn reads_plain_object_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(DEFAULT_FILE_NAME);
        std::fs::write(&path, r#"{"docs": "https://docs.test"}"#).unwrap();

        let store = LinkStore::load(&path);
        assert_eq!(store.get("docs"), Some("https://docs.test"));
    }

    #[test]
    fn corrupt_file_loads_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(DEFAULT_FILE_NAME);
        std::fs::write(&path, "not json").unwrap();

        let store = LinkStore::load(&path);
        assert!(store.is_empty());
        assert_eq!(store.path(), path.as_path());
    }
}
