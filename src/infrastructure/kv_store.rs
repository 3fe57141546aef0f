//! 键值存储
//!
//! 配额计数是唯一需要跨会话保存的状态。这里只暴露 get / set 能力，
//! 上层不关心数据落在内存还是文件里。

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::error::{AppResult, StorageError};

/// 键值存储能力
pub trait KeyValueStore: Send + Sync {
    /// 读取键值，不存在时返回 `None`
    fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// 写入单个键值
    fn set(&self, key: &str, value: &str) -> AppResult<()>;

    /// 一次写入多个键值
    ///
    /// 默认实现逐个写入；支持整体替换的实现应覆盖此方法。
    fn set_many(&self, entries: &[(&str, String)]) -> AppResult<()> {
        for (key, value) in entries {
            self.set(key, value)?;
        }
        Ok(())
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    fn get(&self, key: &str) -> AppResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> AppResult<()> {
        (**self).set(key, value)
    }

    fn set_many(&self, entries: &[(&str, String)]) -> AppResult<()> {
        (**self).set_many(entries)
    }
}

/// 内存存储（测试与临时会话使用）
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 用已有键值创建
    pub fn with_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let map = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            entries: Mutex::new(map),
        }
    }

    /// 当前所有键值的副本
    pub fn snapshot(&self) -> HashMap<String, String> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> AppResult<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> AppResult<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn set_many(&self, entries: &[(&str, String)]) -> AppResult<()> {
        let mut map = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        for (key, value) in entries {
            map.insert((*key).to_string(), value.clone());
        }
        Ok(())
    }
}

/// JSON 文件存储
///
/// 整个文件是一个 `{ "key": "value" }` 对象。写入先落到临时文件再 rename，
/// 多个键一次写入不会出现只写了一半的文件。
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> AppResult<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = std::fs::read_to_string(&self.path).map_err(|source| {
            StorageError::ReadFailed {
                path: self.path.display().to_string(),
                source,
            }
        })?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        let map = serde_json::from_str(&content).map_err(|source| StorageError::Corrupted {
            path: self.path.display().to_string(),
            source,
        })?;
        Ok(map)
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> AppResult<()> {
        let write_failed = |source| StorageError::WriteFailed {
            path: self.path.display().to_string(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(write_failed)?;
        }

        let content = serde_json::to_string_pretty(map)?;
        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, content).map_err(write_failed)?;
        std::fs::rename(&tmp_path, &self.path).map_err(write_failed)?;

        debug!("已写入存储文件: {}", self.path.display());
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> AppResult<Option<String>> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        Ok(self.read_map()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> AppResult<()> {
        self.set_many(&[(key, value.to_string())])
    }

    fn set_many(&self, entries: &[(&str, String)]) -> AppResult<()> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        // 文件损坏时直接用新内容覆盖
        let mut map = self.read_map().unwrap_or_else(|e| {
            warn!("⚠️ 存储文件无法读取，将被覆盖: {}", e);
            BTreeMap::new()
        });
        for (key, value) in entries {
            map.insert((*key).to_string(), value.clone());
        }
        self.write_map(&map)
    }
}
