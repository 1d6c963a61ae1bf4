use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::application::ports::snippet_storage::{SnippetStorage, StoredSnippetFile};

pub struct FilesystemSnippetStorage {
    root: PathBuf,
}

impl FilesystemSnippetStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn file_path(&self, file: &str) -> anyhow::Result<PathBuf> {
        if file.is_empty() || file.contains(['/', '\\']) || file.starts_with('.') {
            bail!("invalid snippet filename: {file}");
        }
        Ok(self.root.join(file))
    }

    async fn entries(&self) -> anyhow::Result<Vec<(String, std::fs::Metadata)>> {
        let mut dir = match tokio::fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(err).with_context(|| format!("reading {}", self.root.display()));
            }
        };
        let mut out = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            let meta = entry.metadata().await?;
            if !meta.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                out.push((name.to_string(), meta));
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl SnippetStorage for FilesystemSnippetStorage {
    async fn file_names(&self) -> anyhow::Result<Vec<String>> {
        Ok(self.entries().await?.into_iter().map(|(name, _)| name).collect())
    }

    async fn read(&self, file: &str) -> anyhow::Result<Option<String>> {
        let path = self.file_path(file)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err).with_context(|| format!("reading {}", path.display())),
        }
    }

    async fn write(&self, file: &str, contents: &str) -> anyhow::Result<()> {
        let path = self.file_path(file)?;
        tokio::fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("creating {}", self.root.display()))?;
        tokio::fs::write(&path, contents)
            .await
            .with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }

    async fn remove(&self, file: &str) -> anyhow::Result<bool> {
        let path = self.file_path(file)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err).with_context(|| format!("removing {}", path.display())),
        }
    }

    async fn list(&self) -> anyhow::Result<Vec<StoredSnippetFile>> {
        let mut out = Vec::new();
        for (file, meta) in self.entries().await? {
            let bytes = match tokio::fs::read(self.root.join(&file)).await {
                Ok(bytes) => bytes,
                Err(err) => {
                    tracing::warn!(error = ?err, file = %file, "snippet_file_unreadable");
                    continue;
                }
            };
            out.push(StoredSnippetFile {
                size: meta.len(),
                modified: meta.modified().ok().map(DateTime::<Utc>::from),
                contents: String::from_utf8_lossy(&bytes).into_owned(),
                file,
            });
        }
        Ok(out)
    }
}
