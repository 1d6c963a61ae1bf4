use async_trait::async_trait;

use crate::application::errors::InstallationError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryRef {
    pub owner: String,
    pub repo: String,
    pub branch: String,
    pub token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub name: String,
    /// Full path within the repository.
    pub path: String,
    pub kind: EntryKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositoryContent {
    File { path: String, content: Vec<u8> },
    Directory(Vec<DirectoryEntry>),
}

/// Read access to a hosted repository tree (`/repos/{owner}/{repo}/contents/{path}`).
#[async_trait]
pub trait RepositoryContentApi: Send + Sync {
    async fn contents(
        &self,
        repository: &RepositoryRef,
        path: &str,
    ) -> Result<RepositoryContent, InstallationError>;
}
