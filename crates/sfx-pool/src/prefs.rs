//! Typed key/value preferences persisted as a flat TOML table.
//!
//! Every key declares its value type and a default. Reading a key that was
//! never saved, or that holds a value of another type, yields the default.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// A stored preference value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrefValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

/// Types a preference can hold.
pub trait PrefType: Clone {
    fn into_value(self) -> PrefValue;
    fn from_value(value: &PrefValue) -> Option<Self>;
}

impl PrefType for bool {
    fn into_value(self) -> PrefValue {
        PrefValue::Bool(self)
    }

    fn from_value(value: &PrefValue) -> Option<Self> {
        match value {
            PrefValue::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl PrefType for i64 {
    fn into_value(self) -> PrefValue {
        PrefValue::Int(self)
    }

    fn from_value(value: &PrefValue) -> Option<Self> {
        match value {
            PrefValue::Int(v) => Some(*v),
            _ => None,
        }
    }
}

impl PrefType for f32 {
    fn into_value(self) -> PrefValue {
        PrefValue::Float(self as f64)
    }

    // Hand-edited files may write `1` for a float key.
    fn from_value(value: &PrefValue) -> Option<Self> {
        match value {
            PrefValue::Float(v) => Some(*v as f32),
            PrefValue::Int(v) => Some(*v as f32),
            _ => None,
        }
    }
}

impl PrefType for String {
    fn into_value(self) -> PrefValue {
        PrefValue::Text(self)
    }

    fn from_value(value: &PrefValue) -> Option<Self> {
        match value {
            PrefValue::Text(v) => Some(v.clone()),
            _ => None,
        }
    }
}

/// Name of a preference plus the value it reads as when unset.
#[derive(Clone, Debug, PartialEq)]
pub struct PrefKey<T> {
    pub name: &'static str,
    pub default: T,
}

impl<T> PrefKey<T> {
    pub const fn new(name: &'static str, default: T) -> Self {
        Self { name, default }
    }
}

/// Preference table, optionally backed by a file.
#[derive(Debug, Default, Clone)]
pub struct PrefsStore {
    path: Option<PathBuf>,
    values: BTreeMap<String, PrefValue>,
}

impl PrefsStore {
    /// Store that never touches disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load `path`. A missing file yields an empty store that will be
    /// created on the first [`save`](Self::save).
    pub fn open(path: &Path) -> Result<Self> {
        let values = if path.exists() {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("read prefs {:?}", path))?;
            toml::from_str::<BTreeMap<String, PrefValue>>(&raw)
                .with_context(|| format!("parse prefs {:?}", path))?
        } else {
            BTreeMap::new()
        };
        tracing::debug!(path = ?path, entries = values.len(), "prefs loaded");
        Ok(Self {
            path: Some(path.to_path_buf()),
            values,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Write the table back to its file. In-memory stores do nothing.
    pub fn save(&self) -> Result<()> {
        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create prefs dir {:?}", parent))?;
        }
        let raw = toml::to_string(&self.values).context("serialize prefs")?;
        std::fs::write(path, raw).with_context(|| format!("write prefs {:?}", path))?;
        tracing::debug!(path = ?path, entries = self.values.len(), "prefs saved");
        Ok(())
    }

    pub fn get<T: PrefType>(&self, key: &PrefKey<T>) -> T {
        self.values
            .get(key.name)
            .and_then(T::from_value)
            .unwrap_or_else(|| key.default.clone())
    }

    pub fn set<T: PrefType>(&mut self, key: &PrefKey<T>, value: T) {
        self.values.insert(key.name.to_string(), value.into_value());
    }

    /// Remove a saved value. Returns whether one existed.
    pub fn delete<T>(&mut self, key: &PrefKey<T>) -> bool {
        self.values.remove(key.name).is_some()
    }

    pub fn contains<T>(&self, key: &PrefKey<T>) -> bool {
        self.values.contains_key(key.name)
    }

    /// Forget every saved value.
    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHOW_HINTS: PrefKey<bool> = PrefKey::new("show_hints", true);
    const HIGH_SCORE: PrefKey<i64> = PrefKey::new("high_score", 0);
    const SENSITIVITY: PrefKey<f32> = PrefKey::new("sensitivity", 0.5);

    fn temp_root(tag: &str) -> PathBuf {
        let root = std::env::temp_dir().join(format!(
            "sfx-pool-prefs-{tag}-{}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        let _ = std::fs::create_dir_all(&root);
        root
    }

    #[test]
    fn unset_keys_read_as_default() {
        let store = PrefsStore::in_memory();
        assert!(store.get(&SHOW_HINTS));
        assert_eq!(store.get(&HIGH_SCORE), 0);
        assert!(!store.contains(&HIGH_SCORE));
    }

    #[test]
    fn set_get_delete() {
        let mut store = PrefsStore::in_memory();
        store.set(&HIGH_SCORE, 1200);
        assert_eq!(store.get(&HIGH_SCORE), 1200);
        assert!(store.delete(&HIGH_SCORE));
        assert!(!store.delete(&HIGH_SCORE));
        assert_eq!(store.get(&HIGH_SCORE), 0);
    }

    #[test]
    fn mistyped_value_falls_back_to_default() {
        let mut store = PrefsStore::in_memory();
        let as_text = PrefKey::new("high_score", String::from("none"));
        store.set(&as_text, "lots".to_string());
        assert_eq!(store.get(&HIGH_SCORE), 0);
        assert_eq!(store.get(&as_text), "lots");
    }

    #[test]
    fn clear_drops_everything() {
        let mut store = PrefsStore::in_memory();
        store.set(&SHOW_HINTS, false);
        store.set(&SENSITIVITY, 0.9);
        store.clear();
        assert!(store.is_empty());
        assert!(store.get(&SHOW_HINTS));
    }

    #[test]
    fn open_missing_file_is_empty() {
        let root = temp_root("missing");
        let store = PrefsStore::open(&root.join("prefs.toml")).unwrap();
        assert!(store.is_empty());
        assert_eq!(store.path(), Some(root.join("prefs.toml").as_path()));
    }

    #[test]
    fn save_then_open_round_trips() {
        let root = temp_root("save");
        let path = root.join("nested").join("prefs.toml");
        let mut store = PrefsStore::open(&path).unwrap();
        store.set(&SHOW_HINTS, false);
        store.set(&HIGH_SCORE, 42);
        store.set(&SENSITIVITY, 0.25);
        store.save().unwrap();

        let loaded = PrefsStore::open(&path).unwrap();
        assert!(!loaded.get(&SHOW_HINTS));
        assert_eq!(loaded.get(&HIGH_SCORE), 42);
        assert_eq!(loaded.get(&SENSITIVITY), 0.25);
    }

    #[test]
    fn float_keys_accept_integers_from_disk() {
        let root = temp_root("int-float");
        let path = root.join("prefs.toml");
        std::fs::write(&path, "sensitivity = 1\n").unwrap();
        let store = PrefsStore::open(&path).unwrap();
        assert_eq!(store.get(&SENSITIVITY), 1.0);
    }

    #[test]
    fn open_rejects_malformed_file() {
        let root = temp_root("bad");
        let path = root.join("prefs.toml");
        std::fs::write(&path, "this is = = not toml").unwrap();
        let err = PrefsStore::open(&path).unwrap_err();
        assert!(format!("{err:#}").contains("parse prefs"));
    }
}
