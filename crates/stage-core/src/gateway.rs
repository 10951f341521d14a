//! Persistence gateways.
//!
//! The editor only talks to storage through [`PersistenceGateway`]. Names
//! are sanitized by the gateway; `write` reports the name it actually used.

use crate::error::PersistenceError;
use crate::format::SavedDocument;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Storage backend for saved documents.
pub trait PersistenceGateway {
    /// Names of every stored document, sorted.
    fn list(&self) -> Result<Vec<String>, PersistenceError>;

    fn read(&self, name: &str) -> Result<SavedDocument, PersistenceError>;

    /// Store `doc` and return the sanitized name it was stored under.
    fn write(&mut self, name: &str, doc: &SavedDocument) -> Result<String, PersistenceError>;

    fn delete(&mut self, name: &str) -> Result<(), PersistenceError>;
}

/// Map a user-supplied name onto `[A-Za-z0-9_-]`.
///
/// Other characters become `_`. A trailing `.json` is dropped first so
/// listed names and file names are interchangeable. Empty names become
/// `untitled`.
pub fn sanitize_name(name: &str) -> String {
    let name = name.trim();
    let name = name.strip_suffix(".json").unwrap_or(name);
    if name.is_empty() {
        return "untitled".to_string();
    }
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

// ─── In-memory ───────────────────────────────────────────────────────────

/// Keeps documents as MessagePack blobs.
#[derive(Debug, Default, Clone)]
pub struct MemoryGateway {
    blobs: BTreeMap<String, Vec<u8>>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Size of the stored blob, if any.
    pub fn blob_len(&self, name: &str) -> Option<usize> {
        self.blobs.get(&sanitize_name(name)).map(Vec::len)
    }
}

impl PersistenceGateway for MemoryGateway {
    fn list(&self) -> Result<Vec<String>, PersistenceError> {
        Ok(self.blobs.keys().cloned().collect())
    }

    fn read(&self, name: &str) -> Result<SavedDocument, PersistenceError> {
        let key = sanitize_name(name);
        let blob = self
            .blobs
            .get(&key)
            .ok_or_else(|| PersistenceError::NotFound(key.clone()))?;
        rmp_serde::from_slice(blob).map_err(|e| PersistenceError::Decode {
            name: key,
            message: e.to_string(),
        })
    }

    fn write(&mut self, name: &str, doc: &SavedDocument) -> Result<String, PersistenceError> {
        let key = sanitize_name(name);
        let blob = rmp_serde::to_vec_named(doc).map_err(|e| PersistenceError::Encode(e.to_string()))?;
        log::debug!("memory gateway: `{key}` ({} bytes)", blob.len());
        self.blobs.insert(key.clone(), blob);
        Ok(key)
    }

    fn delete(&mut self, name: &str) -> Result<(), PersistenceError> {
        let key = sanitize_name(name);
        match self.blobs.remove(&key) {
            Some(_) => Ok(()),
            None => Err(PersistenceError::NotFound(key)),
        }
    }
}

// ─── Directory ───────────────────────────────────────────────────────────

/// Keeps documents as pretty-printed `<name>.json` files in one directory.
#[derive(Debug, Clone)]
pub struct DirectoryGateway {
    root: PathBuf,
}

impl DirectoryGateway {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }
}

impl PersistenceGateway for DirectoryGateway {
    fn list(&self) -> Result<Vec<String>, PersistenceError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut names = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json")
                && let Some(stem) = path.file_stem().and_then(|s| s.to_str())
            {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn read(&self, name: &str) -> Result<SavedDocument, PersistenceError> {
        let key = sanitize_name(name);
        let text = match fs::read_to_string(self.path_for(&key)) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(PersistenceError::NotFound(key)),
            Err(e) => return Err(e.into()),
        };
        SavedDocument::from_json(&text).map_err(|e| PersistenceError::Decode {
            name: key,
            message: e.to_string(),
        })
    }

    fn write(&mut self, name: &str, doc: &SavedDocument) -> Result<String, PersistenceError> {
        let key = sanitize_name(name);
        let text = doc
            .to_json_pretty()
            .map_err(|e| PersistenceError::Encode(e.to_string()))?;
        fs::create_dir_all(&self.root)?;
        fs::write(self.path_for(&key), text)?;
        log::info!("saved `{key}` to {}", self.root.display());
        Ok(key)
    }

    fn delete(&mut self, name: &str) -> Result<(), PersistenceError> {
        let key = sanitize_name(name);
        match fs::remove_file(self.path_for(&key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(PersistenceError::NotFound(key)),
            Err(e) => Err(e.into()),
        }
    }
}
