//! Key-value persistence addressed by dotted paths.

use serde_json::{Map, Value};

use crate::error::StoreError;

/// Persistence capability (cookies, localStorage, config files).
///
/// Paths are dot-separated, e.g. `"dankbank.config.upload"`. Intermediate
/// objects are created on `set`.
pub trait KeyValueStore {
    fn get(&self, path: &str) -> Result<Option<Value>, StoreError>;
    fn set(&mut self, path: &str, value: Value) -> Result<(), StoreError>;
    fn remove(&mut self, path: &str) -> Result<Option<Value>, StoreError>;
}

/// Split a dotted path into its segments, rejecting empty segments.
pub fn split_path(path: &str) -> Result<Vec<&str>, StoreError> {
    let segments: Vec<&str> = path.split('.').collect();
    if segments.iter().any(|segment| segment.is_empty()) {
        return Err(StoreError::InvalidPath(path.to_string()));
    }
    Ok(segments)
}

/// In-memory store backed by a JSON object tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryStore {
    root: Map<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from an existing JSON object.
    pub fn from_value(value: Value) -> Result<Self, StoreError> {
        match value {
            Value::Object(root) => Ok(Self { root }),
            Value::Null => Ok(Self::default()),
            _ => Err(StoreError::NotAnObject(String::new())),
        }
    }

    /// Snapshot the whole tree.
    pub fn to_value(&self) -> Value {
        Value::Object(self.root.clone())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, path: &str) -> Result<Option<Value>, StoreError> {
        let segments = split_path(path)?;
        let mut current = &self.root;
        let (last, parents) = segments
            .split_last()
            .ok_or_else(|| StoreError::InvalidPath(path.to_string()))?;

        for segment in parents {
            match current.get(*segment) {
                Some(Value::Object(map)) => current = map,
                Some(_) | None => return Ok(None),
            }
        }
        Ok(current.get(*last).cloned())
    }

    fn set(&mut self, path: &str, value: Value) -> Result<(), StoreError> {
        let segments = split_path(path)?;
        let (last, parents) = segments
            .split_last()
            .ok_or_else(|| StoreError::InvalidPath(path.to_string()))?;

        let mut current = &mut self.root;
        for (depth, segment) in parents.iter().enumerate() {
            let entry = current
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            current = match entry {
                Value::Object(map) => map,
                _ => return Err(StoreError::NotAnObject(segments[..=depth].join("."))),
            };
        }
        current.insert(last.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, path: &str) -> Result<Option<Value>, StoreError> {
        let segments = split_path(path)?;
        let (last, parents) = segments
            .split_last()
            .ok_or_else(|| StoreError::InvalidPath(path.to_string()))?;

        let mut current = &mut self.root;
        for segment in parents {
            match current.get_mut(*segment) {
                Some(Value::Object(map)) => current = map,
                Some(_) | None => return Ok(None),
            }
        }
        Ok(current.remove(*last))
    }
}

/// JSON file store for native builds. Writes through on every mutation.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug)]
pub struct JsonFileStore {
    path: std::path::PathBuf,
    inner: MemoryStore,
}

#[cfg(not(target_arch = "wasm32"))]
impl JsonFileStore {
    /// Open the store at `path`. A missing file starts out empty.
    pub fn open(path: impl Into<std::path::PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let inner = if path.exists() {
            let json = std::fs::read_to_string(&path)
                .map_err(|e| StoreError::Backend(format!("read {:?}: {}", path, e)))?;
            let value: Value = serde_json::from_str(&json)
                .map_err(|e| StoreError::Backend(format!("parse {:?}: {}", path, e)))?;
            MemoryStore::from_value(value)?
        } else {
            log::debug!("No store file at {:?}, starting empty", path);
            MemoryStore::new()
        };
        Ok(Self { path, inner })
    }

    fn flush(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Backend(format!("create {:?}: {}", parent, e)))?;
        }
        let json = serde_json::to_string_pretty(&self.inner.to_value())
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        std::fs::write(&self.path, json)
            .map_err(|e| StoreError::Backend(format!("write {:?}: {}", self.path, e)))
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl KeyValueStore for JsonFileStore {
    fn get(&self, path: &str) -> Result<Option<Value>, StoreError> {
        self.inner.get(path)
    }

    fn set(&mut self, path: &str, value: Value) -> Result<(), StoreError> {
        self.inner.set(path, value)?;
        self.flush()
    }

    fn remove(&mut self, path: &str) -> Result<Option<Value>, StoreError> {
        let removed = self.inner.remove(path)?;
        if removed.is_some() {
            self.flush()?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_creates_intermediate_objects() {
        let mut store = MemoryStore::new();
        store.set("auth.tokens.access", json!("abc")).unwrap();

        assert_eq!(store.get("auth.tokens.access").unwrap(), Some(json!("abc")));
        assert_eq!(
            store.get("auth.tokens").unwrap(),
            Some(json!({ "access": "abc" }))
        );
        assert_eq!(store.get("auth.missing").unwrap(), None);
    }

    #[test]
    fn test_remove_returns_previous_value() {
        let mut store = MemoryStore::new();
        store.set("a.b", json!(1)).unwrap();

        assert_eq!(store.remove("a.b").unwrap(), Some(json!(1)));
        assert_eq!(store.remove("a.b").unwrap(), None);
        assert_eq!(store.get("a").unwrap(), Some(json!({})));
    }

    #[test]
    fn test_invalid_paths() {
        let mut store = MemoryStore::new();
        assert!(matches!(store.get(""), Err(StoreError::InvalidPath(_))));
        assert!(matches!(
            store.set("a..b", json!(1)),
            Err(StoreError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_set_through_scalar_fails() {
        let mut store = MemoryStore::new();
        store.set("a", json!(5)).unwrap();
        assert_eq!(
            store.set("a.b", json!(1)),
            Err(StoreError::NotAnObject("a".to_string()))
        );
        // Reading through a scalar is just absent.
        assert_eq!(store.get("a.b").unwrap(), None);
    }

    #[test]
    fn test_json_file_store_persists() {
        let dir = std::env::temp_dir().join(format!("dankbank-store-{}", uuid::Uuid::new_v4()));
        let path = dir.join("store.json");

        {
            let mut store = JsonFileStore::open(&path).unwrap();
            store.set("gallery.columns", json!(3)).unwrap();
        }

        let store = JsonFileStore::open(&path).unwrap();
        assert_eq!(store.get("gallery.columns").unwrap(), Some(json!(3)));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
