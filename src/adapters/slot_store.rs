use crate::domain::ports::KeyValueStore;
use crate::utils::error::{InsightError, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// 以單一 JSON 檔保存所有鍵值，寫入時整檔取代
#[derive(Debug, Clone)]
pub struct JsonFileSlotStore {
    path: PathBuf,
}

impl JsonFileSlotStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        serde_json::from_str(&content).map_err(|e| {
            InsightError::store(format!(
                "{} is not a valid slot file: {}",
                self.path.display(),
                e
            ))
        })
    }

    fn write_all(&self, slots: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(slots)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileSlotStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut slots = self.read_all()?;
        slots.insert(key.to_string(), value.to_string());
        self.write_all(&slots)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut slots = self.read_all()?;
        if slots.remove(key).is_some() {
            self.write_all(&slots)?;
        }
        Ok(())
    }
}

/// 記憶體內的槽，clone 之後共用同一份資料
#[derive(Debug, Clone, Default)]
pub struct MemorySlotStore {
    slots: Arc<Mutex<BTreeMap<String, String>>>,
}

impl MemorySlotStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, String>>> {
        self.slots
            .lock()
            .map_err(|_| InsightError::store("memory slot store lock poisoned"))
    }
}

impl KeyValueStore for MemorySlotStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}
