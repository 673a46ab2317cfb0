//! Per-node key/value state storage

use crate::error::StateError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Key/value store a presentation model writes its state into on save and reads
/// back from on restore.
///
/// Values are held in the serde data model (`serde_json::Value`) so the same
/// payload can be written by any [`WireFormat`](crate::state::format::WireFormat).
/// Typed access goes through [`get`](#method.get) and [`put`](#method.put) on
/// `dyn StateSaver`.
pub trait StateSaver {
    fn get_value(&self, key: &str) -> Option<&Value>;
    fn put_value(&mut self, key: &str, value: Value);
    fn remove(&mut self, key: &str) -> Option<Value>;
    fn keys(&self) -> Vec<String>;

    fn contains(&self, key: &str) -> bool {
        self.get_value(key).is_some()
    }
}

impl dyn StateSaver + '_ {
    /// Read and deserialize `key`. `Ok(None)` when the key was never written.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StateError> {
        match self.get_value(key) {
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|source| StateError::Deserialize {
                    key: key.to_string(),
                    source,
                }),
            None => Ok(None),
        }
    }

    /// Read `key`, falling back to `default` when absent.
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> Result<T, StateError> {
        Ok(self.get(key)?.unwrap_or(default))
    }

    pub fn put<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<(), StateError> {
        let value = serde_json::to_value(value).map_err(|source| StateError::Serialize {
            key: key.to_string(),
            source,
        })?;
        self.put_value(key, value);
        Ok(())
    }
}

/// In-memory saver backed by an ordered map. This is the `state` payload of every
/// snapshot node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MapStateSaver {
    values: BTreeMap<String, Value>,
}

impl MapStateSaver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

impl StateSaver for MapStateSaver {
    fn get_value(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    fn put_value(&mut self, key: &str, value: Value) {
        self.values.insert(key.to_string(), value);
    }

    fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    fn keys(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }
}

/// Saver that keeps nothing. Used when persistence is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopStateSaver;

impl StateSaver for NoopStateSaver {
    fn get_value(&self, _key: &str) -> Option<&Value> {
        None
    }

    fn put_value(&mut self, _key: &str, _value: Value) {}

    fn remove(&mut self, _key: &str) -> Option<Value> {
        None
    }

    fn keys(&self) -> Vec<String> {
        Vec::new()
    }
}
