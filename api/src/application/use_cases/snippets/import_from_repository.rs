use std::collections::{BTreeMap, HashSet};

use chrono::Utc;

use crate::application::errors::InstallationError;
use crate::application::ports::repository_content::{
    EntryKind, RepositoryContent, RepositoryContentApi, RepositoryRef,
};
use crate::application::ports::snippet_storage::SnippetStorage;
use crate::application::registry::{InstallationRegistry, SnippetImportRecord};
use crate::application::repository::RepositoryResolver;
use crate::application::snippets::SNIPPET_SOURCE_DIR;
use crate::application::snippets::content::render_snippet;
use crate::application::snippets::naming::snippet_file_name;
use crate::domain::installations::installation::DEFAULT_BRANCH;
use crate::domain::installations::slug::slugify;
use crate::domain::installations::{InstallationRecord, SnippetDetails};

pub const DEFAULT_MAX_DEPTH: usize = 8;
const FALLBACK_SNIPPET_SLUG: &str = "snippets";

#[derive(Debug, Clone, Default)]
pub struct SnippetImportRequest<'r> {
    pub installation_id: Option<&'r str>,
    pub repository_url: &'r str,
    pub branch: &'r str,
    pub access_token: &'r str,
    pub name: Option<&'r str>,
}

#[derive(Debug, Clone)]
pub struct SnippetImportOutcome {
    pub record: InstallationRecord,
    pub files: Vec<String>,
    pub removed: Vec<String>,
    pub message: String,
}

struct WrittenBatch {
    files: Vec<String>,
    sources: BTreeMap<String, String>,
    written: Vec<WrittenFile>,
}

struct WrittenFile {
    file: String,
    /// Contents the file had before this batch, `None` when it is new.
    previous: Option<String>,
}

struct SourceFile {
    /// Path below the snippet source directory.
    relative: String,
    content: Vec<u8>,
}

/// Imports every `*.php` file under the repository's `php/` directory.
///
/// All sources are fetched before anything is written. When a write or the
/// registry update fails, files the batch overwrote get their old contents
/// back, new files are removed and the registry keeps its previous entry.
/// Files from the previous import that were not rewritten are deleted only
/// once the registry has been updated.
pub struct ImportSnippetsFromRepository<'a, C, S>
where
    C: RepositoryContentApi + ?Sized,
    S: SnippetStorage + ?Sized,
{
    pub resolver: &'a RepositoryResolver,
    pub contents: &'a C,
    pub storage: &'a S,
    pub registry: InstallationRegistry<'a>,
    pub max_depth: usize,
}

impl<'a, C, S> ImportSnippetsFromRepository<'a, C, S>
where
    C: RepositoryContentApi + ?Sized,
    S: SnippetStorage + ?Sized,
{
    pub async fn execute(
        &self,
        req: SnippetImportRequest<'_>,
    ) -> Result<SnippetImportOutcome, InstallationError> {
        let existing = match req.installation_id.filter(|id| !id.is_empty()) {
            Some(id) => Some(
                self.registry
                    .list_snippets()
                    .await?
                    .into_iter()
                    .find(|r| r.id == id)
                    .ok_or_else(|| InstallationError::InstallationNotFound(id.to_string()))?,
            ),
            None => None,
        };

        let repository_url = non_empty_or(req.repository_url, existing.as_ref().map(|r| r.repository_url.as_str()));
        if repository_url.is_empty() {
            return Err(InstallationError::InvalidRequest(
                "Repository URL is required.".into(),
            ));
        }
        let branch = match non_empty_or(req.branch, existing.as_ref().map(|r| r.branch.as_str())) {
            "" => DEFAULT_BRANCH,
            b => b,
        };
        let access_token = non_empty_or(
            req.access_token,
            existing.as_ref().map(|r| r.access_token.as_str()),
        );
        let name = req
            .name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .or_else(|| existing.as_ref().and_then(|r| r.name.clone()));

        let github = self.resolver.parse_github(repository_url)?;
        let repository = RepositoryRef {
            owner: github.owner.clone(),
            repo: github.repo.clone(),
            branch: branch.to_string(),
            token: Some(access_token.to_string()).filter(|t| !t.is_empty()),
        };

        tracing::info!(
            owner = %repository.owner,
            repo = %repository.repo,
            branch = %repository.branch,
            "snippet_import_started"
        );

        let sources = self.collect_sources(&repository).await?;
        if sources.is_empty() {
            return Err(InstallationError::MissingSourceContent(
                "No PHP files were found in the repository's php directory.".into(),
            ));
        }

        let slug = match &existing {
            Some(record) => record.slug.clone(),
            None => {
                let base = slugify(name.as_deref().unwrap_or(&github.repo));
                if base.is_empty() {
                    FALLBACK_SNIPPET_SLUG.to_string()
                } else {
                    base
                }
            }
        };
        let previous = existing
            .as_ref()
            .and_then(|r| r.snippet().cloned())
            .unwrap_or_default();

        let imported_at = Utc::now();
        let batch = self
            .write_batch(&slug, &sources, &previous, imported_at)
            .await?;

        let recorded = self
            .registry
            .record_snippet_import(SnippetImportRecord {
                installation_id: existing.as_ref().map(|r| r.id.clone()),
                slug,
                name,
                repository_url: repository_url.to_string(),
                branch: branch.to_string(),
                access_token: access_token.to_string(),
                files: batch.files.clone(),
                sources: batch.sources.clone(),
                imported_at,
            })
            .await;
        let record = match recorded {
            Ok(record) => record,
            Err(err) => {
                self.rollback(&batch.written).await;
                return Err(err);
            }
        };

        let files = batch.files;
        let removed = self.remove_stale(&previous, &files).await;

        tracing::info!(
            id = %record.id,
            slug = %record.slug,
            files = files.len(),
            removed = removed.len(),
            "snippet_import_completed"
        );

        let message = format!(
            "Imported {} snippet{} from \"{}\".",
            files.len(),
            if files.len() == 1 { "" } else { "s" },
            record.display_name()
        );
        Ok(SnippetImportOutcome {
            record,
            files,
            removed,
            message,
        })
    }

    async fn collect_sources(
        &self,
        repository: &RepositoryRef,
    ) -> Result<Vec<SourceFile>, InstallationError> {
        let mut pending = vec![(SNIPPET_SOURCE_DIR.to_string(), 0usize)];
        let mut php_paths = Vec::new();

        while let Some((dir, depth)) = pending.pop() {
            let entries = match self.contents.contents(repository, &dir).await? {
                RepositoryContent::Directory(entries) => entries,
                RepositoryContent::File { path, .. } => {
                    tracing::warn!(path = %path, "snippet_source_not_a_directory");
                    continue;
                }
            };
            for entry in entries {
                match entry.kind {
                    EntryKind::Dir if depth + 1 > self.max_depth => {
                        tracing::warn!(
                            path = %entry.path,
                            max_depth = self.max_depth,
                            "snippet_directory_too_deep"
                        );
                    }
                    EntryKind::Dir => pending.push((entry.path, depth + 1)),
                    EntryKind::File if is_php(&entry.name) => php_paths.push(entry.path),
                    _ => {}
                }
            }
        }

        php_paths.sort();
        let mut sources = Vec::with_capacity(php_paths.len());
        for path in php_paths {
            let content = match self.contents.contents(repository, &path).await? {
                RepositoryContent::File { content, .. } => content,
                RepositoryContent::Directory(_) => {
                    return Err(InstallationError::MissingSourceContent(format!(
                        "Expected a file at {path}."
                    )));
                }
            };
            sources.push(SourceFile {
                relative: relative_to_source_dir(&path).to_string(),
                content,
            });
        }
        Ok(sources)
    }

    async fn write_batch(
        &self,
        slug: &str,
        sources: &[SourceFile],
        previous: &SnippetDetails,
        imported_at: chrono::DateTime<Utc>,
    ) -> Result<WrittenBatch, InstallationError> {
        let on_disk: HashSet<String> = self
            .storage
            .file_names()
            .await
            .map_err(InstallationError::FilesystemPermission)?
            .into_iter()
            .collect();

        let mut used = HashSet::new();
        let mut batch = WrittenBatch {
            files: Vec::with_capacity(sources.len()),
            sources: BTreeMap::new(),
            written: Vec::with_capacity(sources.len()),
        };

        for source in sources {
            let file = snippet_file_name(slug, &source.relative, &used, &previous.sources, &on_disk);
            let backup = if on_disk.contains(&file) {
                match self.storage.read(&file).await {
                    Ok(contents) => contents,
                    Err(error) => {
                        self.rollback(&batch.written).await;
                        return Err(InstallationError::FilesystemPermission(error));
                    }
                }
            } else {
                None
            };
            let body = render_snippet(&file, &source.content, imported_at);
            if let Err(source_err) = self.storage.write(&file, &body).await {
                self.rollback(&batch.written).await;
                return Err(InstallationError::WriteFailed {
                    target: file,
                    source: source_err,
                });
            }
            used.insert(file.clone());
            batch.sources.insert(file.clone(), source.relative.clone());
            batch.files.push(file.clone());
            batch.written.push(WrittenFile {
                file,
                previous: backup,
            });
        }
        Ok(batch)
    }

    async fn rollback(&self, written: &[WrittenFile]) {
        for entry in written.iter().rev() {
            match &entry.previous {
                Some(contents) => {
                    if let Err(error) = self.storage.write(&entry.file, contents).await {
                        tracing::warn!(error = ?error, file = %entry.file, "snippet_rollback_restore_failed");
                    }
                }
                None => {
                    if let Err(error) = self.storage.remove(&entry.file).await {
                        tracing::warn!(error = ?error, file = %entry.file, "snippet_rollback_delete_failed");
                    }
                }
            }
        }
    }

    async fn remove_stale(&self, previous: &SnippetDetails, current: &[String]) -> Vec<String> {
        let mut removed = Vec::new();
        for file in previous.files.iter().filter(|f| !current.contains(f)) {
            match self.storage.remove(file).await {
                Ok(true) => removed.push(file.clone()),
                Ok(false) => {}
                Err(error) => {
                    tracing::warn!(error = ?error, file = %file, "stale_snippet_delete_failed");
                }
            }
        }
        removed
    }
}

fn non_empty_or<'s>(value: &'s str, fallback: Option<&'s str>) -> &'s str {
    match value.trim() {
        "" => fallback.map(str::trim).unwrap_or_default(),
        v => v,
    }
}

fn is_php(name: &str) -> bool {
    name.to_ascii_lowercase().ends_with(".php")
}

fn relative_to_source_dir(path: &str) -> &str {
    path.strip_prefix(SNIPPET_SOURCE_DIR)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(path)
}
