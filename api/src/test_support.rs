//! In-memory port implementations shared by unit tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use crate::application::errors::InstallationError;
use crate::application::ports::option_store::OptionStore;
use crate::application::ports::package_fetcher::PackageFetcher;
use crate::application::ports::package_installer::PackageInstaller;
use crate::application::ports::repository_content::{
    DirectoryEntry, EntryKind, RepositoryContent, RepositoryContentApi, RepositoryRef,
};
use crate::application::ports::snippet_storage::{SnippetStorage, StoredSnippetFile};
use crate::domain::installations::PackageKind;

#[derive(Default)]
pub struct InMemoryOptionStore {
    values: Mutex<HashMap<String, serde_json::Value>>,
    reject_puts: AtomicBool,
}

impl InMemoryOptionStore {
    /// Makes every later `put` fail.
    pub fn reject_puts(&self) {
        self.reject_puts.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl OptionStore for InMemoryOptionStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<serde_json::Value>> {
        Ok(self.values.lock().unwrap().get(key).cloned())
    }

    async fn put(&self, key: &str, value: &serde_json::Value) -> anyhow::Result<()> {
        if self.reject_puts.load(Ordering::SeqCst) {
            anyhow::bail!("option store is read-only");
        }
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemorySnippetStorage {
    files: Mutex<BTreeMap<String, String>>,
    failing: Mutex<HashSet<String>>,
}

impl InMemorySnippetStorage {
    pub fn insert(&self, name: &str, contents: &str) {
        self.files
            .lock()
            .unwrap()
            .insert(name.to_string(), contents.to_string());
    }

    pub fn names(&self) -> Vec<String> {
        self.files.lock().unwrap().keys().cloned().collect()
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.files.lock().unwrap().get(name).cloned()
    }

    /// Makes every later write of `name` fail.
    pub fn fail_writes_for(&self, name: &str) {
        self.failing.lock().unwrap().insert(name.to_string());
    }
}

#[async_trait]
impl SnippetStorage for InMemorySnippetStorage {
    async fn file_names(&self) -> anyhow::Result<Vec<String>> {
        Ok(self.names())
    }

    async fn read(&self, file: &str) -> anyhow::Result<Option<String>> {
        Ok(self.get(file))
    }

    async fn write(&self, file: &str, contents: &str) -> anyhow::Result<()> {
        if self.failing.lock().unwrap().contains(file) {
            anyhow::bail!("disk full");
        }
        self.insert(file, contents);
        Ok(())
    }

    async fn remove(&self, file: &str) -> anyhow::Result<bool> {
        Ok(self.files.lock().unwrap().remove(file).is_some())
    }

    async fn list(&self) -> anyhow::Result<Vec<StoredSnippetFile>> {
        Ok(self
            .files
            .lock()
            .unwrap()
            .iter()
            .map(|(file, contents)| StoredSnippetFile {
                file: file.clone(),
                size: contents.len() as u64,
                modified: None,
                contents: contents.clone(),
            })
            .collect())
    }
}

enum FetchResult {
    Body(Vec<u8>),
    Status(u16, String),
}

/// Answers every download with the same body or status.
pub struct StaticFetcher {
    result: FetchResult,
    requests: Mutex<Vec<(String, Option<String>)>>,
}

impl StaticFetcher {
    pub fn ok(body: Vec<u8>) -> Self {
        Self {
            result: FetchResult::Body(body),
            requests: Mutex::default(),
        }
    }

    pub fn status(status: u16, message: &str) -> Self {
        Self {
            result: FetchResult::Status(status, message.to_string()),
            requests: Mutex::default(),
        }
    }

    pub fn requests(&self) -> Vec<(String, Option<String>)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PackageFetcher for StaticFetcher {
    async fn fetch(&self, url: &str, token: Option<&str>) -> Result<Vec<u8>, InstallationError> {
        self.requests
            .lock()
            .unwrap()
            .push((url.to_string(), token.map(str::to_string)));
        match &self.result {
            FetchResult::Body(body) if body.is_empty() => Err(InstallationError::EmptyResponseBody),
            FetchResult::Body(body) => Ok(body.clone()),
            FetchResult::Status(status, message) => Err(InstallationError::HttpStatusError {
                status: *status,
                message: message.clone(),
            }),
        }
    }
}

#[derive(Default)]
pub struct RecordingInstaller {
    installed: Mutex<Vec<(PackageKind, String, Vec<u8>)>>,
    removed: Mutex<Vec<(PackageKind, String)>>,
}

impl RecordingInstaller {
    pub fn installed(&self) -> Vec<(PackageKind, String, Vec<u8>)> {
        self.installed.lock().unwrap().clone()
    }

    pub fn removed(&self) -> Vec<(PackageKind, String)> {
        self.removed.lock().unwrap().clone()
    }
}

#[async_trait]
impl PackageInstaller for RecordingInstaller {
    async fn install(
        &self,
        kind: PackageKind,
        slug: &str,
        archive: &[u8],
    ) -> Result<PathBuf, InstallationError> {
        self.installed
            .lock()
            .unwrap()
            .push((kind, slug.to_string(), archive.to_vec()));
        Ok(PathBuf::from("/installed").join(slug))
    }

    async fn remove(&self, kind: PackageKind, slug: &str) -> Result<(), InstallationError> {
        self.removed.lock().unwrap().push((kind, slug.to_string()));
        Ok(())
    }
}

/// Repository tree keyed by path. Unknown paths answer like a 404 from GitHub.
#[derive(Default)]
pub struct FakeRepositoryContent {
    dirs: HashMap<String, Vec<DirectoryEntry>>,
    files: HashMap<String, Vec<u8>>,
    branches: Mutex<Vec<String>>,
}

impl FakeRepositoryContent {
    pub fn dir(&mut self, path: &str, entries: &[(&str, EntryKind)]) {
        let entries = entries
            .iter()
            .map(|(name, kind)| DirectoryEntry {
                name: name.to_string(),
                path: format!("{path}/{name}"),
                kind: kind.clone(),
            })
            .collect();
        self.dirs.insert(path.to_string(), entries);
    }

    pub fn file(&mut self, path: &str, content: &[u8]) {
        self.files.insert(path.to_string(), content.to_vec());
    }

    pub fn requested_branches(&self) -> Vec<String> {
        let mut branches = self.branches.lock().unwrap().clone();
        branches.dedup();
        branches
    }
}

#[async_trait]
impl RepositoryContentApi for FakeRepositoryContent {
    async fn contents(
        &self,
        repository: &RepositoryRef,
        path: &str,
    ) -> Result<RepositoryContent, InstallationError> {
        self.branches
            .lock()
            .unwrap()
            .push(repository.branch.clone());
        let path = path.trim_matches('/');
        if let Some(entries) = self.dirs.get(path) {
            return Ok(RepositoryContent::Directory(entries.clone()));
        }
        if let Some(content) = self.files.get(path) {
            return Ok(RepositoryContent::File {
                path: path.to_string(),
                content: content.clone(),
            });
        }
        Err(InstallationError::HttpStatusError {
            status: 404,
            message: "Not Found".into(),
        })
    }
}
