use chrono::{DateTime, Utc};

use crate::application::ports::snippet_storage::SnippetStorage;
use crate::application::snippets::content::{SnippetMetadata, extract_snippet_metadata};

#[derive(Debug, Clone)]
pub struct StoredSnippet {
    pub file: String,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
    pub metadata: SnippetMetadata,
}

pub struct ListSnippets<'a, S: SnippetStorage + ?Sized> {
    pub storage: &'a S,
}

impl<'a, S: SnippetStorage + ?Sized> ListSnippets<'a, S> {
    pub async fn execute(&self) -> anyhow::Result<Vec<StoredSnippet>> {
        let mut snippets: Vec<StoredSnippet> = self
            .storage
            .list()
            .await?
            .into_iter()
            .filter(|f| f.file.to_ascii_lowercase().ends_with(".php"))
            .map(|f| StoredSnippet {
                metadata: extract_snippet_metadata(&f.contents),
                file: f.file,
                size: f.size,
                modified: f.modified,
            })
            .collect();
        snippets.sort_by_key(|s| s.file.to_lowercase());
        Ok(snippets)
    }
}
