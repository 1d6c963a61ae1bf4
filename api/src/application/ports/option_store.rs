use async_trait::async_trait;

/// Named JSON documents, the way the host CMS keeps its options table.
#[async_trait]
pub trait OptionStore: Send + Sync {
    async fn get(&self, key: &str) -> anyhow::Result<Option<serde_json::Value>>;

    async fn put(&self, key: &str, value: &serde_json::Value) -> anyhow::Result<()>;
}
