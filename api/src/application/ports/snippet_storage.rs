use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct StoredSnippetFile {
    pub file: String,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
    pub contents: String,
}

/// Flat directory of generated snippet files, addressed by filename.
#[async_trait]
pub trait SnippetStorage: Send + Sync {
    /// Filenames currently present in storage.
    async fn file_names(&self) -> anyhow::Result<Vec<String>>;

    /// `None` when the file does not exist.
    async fn read(&self, file: &str) -> anyhow::Result<Option<String>>;

    async fn write(&self, file: &str, contents: &str) -> anyhow::Result<()>;

    /// Returns `false` when the file was already gone.
    async fn remove(&self, file: &str) -> anyhow::Result<bool>;

    async fn list(&self) -> anyhow::Result<Vec<StoredSnippetFile>>;
}
