use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::Mutex;

use crate::application::ports::option_store::OptionStore;

/// All options in one JSON object on disk.
pub struct FileOptionStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileOptionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> anyhow::Result<Map<String, Value>> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Map::new()),
            Err(err) => {
                return Err(err).with_context(|| format!("reading {}", self.path.display()));
            }
        };
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(Map::new());
        }
        match serde_json::from_slice::<Value>(&raw)
            .with_context(|| format!("parsing {}", self.path.display()))?
        {
            Value::Object(map) => Ok(map),
            _ => anyhow::bail!("{} does not hold a JSON object", self.path.display()),
        }
    }

    async fn write_all(&self, options: &Map<String, Value>) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let body = serde_json::to_vec_pretty(options)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body)
            .await
            .with_context(|| format!("writing {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("replacing {}", self.path.display()))?;
        Ok(())
    }
}

#[async_trait]
impl OptionStore for FileOptionStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<Value>> {
        Ok(self.read_all().await?.remove(key))
    }

    async fn put(&self, key: &str, value: &Value) -> anyhow::Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut options = self.read_all().await?;
        options.insert(key.to_string(), value.clone());
        self.write_all(&options).await
    }
}
