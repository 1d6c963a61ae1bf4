use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::application::errors::InstallationError;
use crate::application::ports::option_store::OptionStore;
use crate::domain::installations::{
    InstallationKind, InstallationRecord, PackageKind, SnippetDetails,
};

pub const INSTALLATIONS_OPTION: &str = "flygit_installations";
pub const SNIPPET_INSTALLATIONS_OPTION: &str = "flygit_snippet_installations";
/// Key the host CMS stores the active theme's directory name under.
pub const ACTIVE_THEME_OPTION: &str = "stylesheet";

/// Values produced by a successful snippet import.
#[derive(Debug, Clone)]
pub struct SnippetImportRecord {
    pub installation_id: Option<String>,
    pub slug: String,
    pub name: Option<String>,
    pub repository_url: String,
    pub branch: String,
    pub access_token: String,
    pub files: Vec<String>,
    pub sources: BTreeMap<String, String>,
    pub imported_at: DateTime<Utc>,
}

/// Fields a settings update may change. `None` leaves the stored value alone.
#[derive(Debug, Clone, Default)]
pub struct SettingsPatch {
    pub webhook_secret: Option<String>,
    pub name: Option<String>,
}

/// Plugin/theme and snippet installation lists kept as two JSON options.
#[derive(Clone, Copy)]
pub struct InstallationRegistry<'a> {
    store: &'a dyn OptionStore,
    active_theme_override: Option<&'a str>,
}

impl<'a> InstallationRegistry<'a> {
    pub fn new(store: &'a dyn OptionStore, active_theme_override: Option<&'a str>) -> Self {
        Self {
            store,
            active_theme_override,
        }
    }

    pub async fn list(&self) -> Result<Vec<InstallationRecord>, InstallationError> {
        Ok(self.load(INSTALLATIONS_OPTION).await?.into_records())
    }

    pub async fn list_snippets(&self) -> Result<Vec<InstallationRecord>, InstallationError> {
        Ok(self.load(SNIPPET_INSTALLATIONS_OPTION).await?.into_records())
    }

    /// Looks the id up in the plugin/theme list first, then among snippets.
    pub async fn find_by_id(
        &self,
        id: &str,
    ) -> Result<Option<InstallationRecord>, InstallationError> {
        if id.is_empty() {
            return Ok(None);
        }
        if let Some(found) = self.list().await?.into_iter().find(|r| r.id == id) {
            return Ok(Some(found));
        }
        Ok(self
            .list_snippets()
            .await?
            .into_iter()
            .find(|r| r.id == id))
    }

    /// Upserts a plugin/theme record keyed by `(kind, slug)`.
    pub async fn record_installation(
        &self,
        kind: PackageKind,
        slug: &str,
        repository_url: &str,
        branch: &str,
        access_token: &str,
    ) -> Result<InstallationRecord, InstallationError> {
        let mut list = self.load(INSTALLATIONS_OPTION).await?;
        let existing = list.find_mut(|r| r.kind.package_kind() == Some(kind) && r.slug == slug);

        let record = match existing {
            Some(existing) => {
                existing.repository_url = repository_url.to_string();
                existing.branch = branch.to_string();
                existing.access_token = access_token.to_string();
                existing.clone()
            }
            None => {
                let record = InstallationRecord {
                    id: Uuid::new_v4().to_string(),
                    kind: kind.into(),
                    slug: slug.to_string(),
                    repository_url: repository_url.to_string(),
                    branch: branch.to_string(),
                    access_token: access_token.to_string(),
                    webhook_secret: String::new(),
                    name: None,
                };
                list.push(record.clone());
                record
            }
        };

        self.save(INSTALLATIONS_OPTION, &list).await?;
        tracing::debug!(id = %record.id, kind = %kind, slug = %slug, "installation_recorded");
        Ok(record)
    }

    /// Upserts a snippet record keyed by id. New records get a fresh id and a
    /// slug unique among snippet installations.
    pub async fn record_snippet_import(
        &self,
        import: SnippetImportRecord,
    ) -> Result<InstallationRecord, InstallationError> {
        let mut list = self.load(SNIPPET_INSTALLATIONS_OPTION).await?;
        let slug = unique_snippet_slug(&list, &import.slug);
        let details = SnippetDetails {
            files: import.files,
            sources: import.sources,
            last_import: Some(import.imported_at),
        };

        let existing = match import.installation_id.as_deref().filter(|id| !id.is_empty()) {
            Some(id) => list.find_mut(|r| r.id == id),
            None => None,
        };
        let record = match existing {
            Some(existing) => {
                existing.repository_url = import.repository_url;
                existing.branch = import.branch;
                existing.access_token = import.access_token;
                if let Some(name) = import.name.filter(|n| !n.trim().is_empty()) {
                    existing.name = Some(name);
                }
                existing.kind = InstallationKind::Snippet(details);
                existing.clone()
            }
            None => {
                let record = InstallationRecord {
                    id: Uuid::new_v4().to_string(),
                    kind: InstallationKind::Snippet(details),
                    slug,
                    repository_url: import.repository_url,
                    branch: import.branch,
                    access_token: import.access_token,
                    webhook_secret: String::new(),
                    name: import.name.filter(|n| !n.trim().is_empty()),
                };
                list.push(record.clone());
                record
            }
        };

        self.save(SNIPPET_INSTALLATIONS_OPTION, &list).await?;
        tracing::debug!(id = %record.id, slug = %record.slug, "snippet_installation_recorded");
        Ok(record)
    }

    pub async fn update_installation(
        &self,
        id: &str,
        patch: SettingsPatch,
    ) -> Result<InstallationRecord, InstallationError> {
        for key in [INSTALLATIONS_OPTION, SNIPPET_INSTALLATIONS_OPTION] {
            let mut list = self.load(key).await?;
            let Some(existing) = list.find_mut(|r| r.id == id) else {
                continue;
            };
            if let Some(secret) = patch.webhook_secret.clone() {
                existing.webhook_secret = secret;
            }
            if let Some(name) = patch.name.clone() {
                existing.name = Some(name).filter(|n| !n.trim().is_empty());
            }
            let updated = existing.clone();
            self.save(key, &list).await?;
            return Ok(updated);
        }
        Err(InstallationError::InstallationNotFound(id.to_string()))
    }

    /// Drops the record from whichever list holds it and returns it.
    pub async fn remove(&self, id: &str) -> Result<Option<InstallationRecord>, InstallationError> {
        for key in [INSTALLATIONS_OPTION, SNIPPET_INSTALLATIONS_OPTION] {
            let mut list = self.load(key).await?;
            let Some(removed) = list.remove(id) else {
                continue;
            };
            self.save(key, &list).await?;
            return Ok(Some(removed));
        }
        Ok(None)
    }

    pub async fn active_theme(&self) -> Result<Option<String>, InstallationError> {
        if let Some(theme) = self.active_theme_override.filter(|t| !t.is_empty()) {
            return Ok(Some(theme.to_string()));
        }
        let value = self
            .store
            .get(ACTIVE_THEME_OPTION)
            .await
            .map_err(InstallationError::Registry)?;
        Ok(value
            .as_ref()
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string))
    }

    async fn load(&self, key: &str) -> Result<StoredList, InstallationError> {
        let value = self
            .store
            .get(key)
            .await
            .map_err(InstallationError::Registry)?;
        let Some(serde_json::Value::Array(items)) = value else {
            return Ok(StoredList::default());
        };
        let entries = items
            .into_iter()
            .map(|item| match serde_json::from_value::<InstallationRecord>(item.clone()) {
                Ok(record) => StoredEntry::Record(record),
                Err(error) => {
                    tracing::warn!(option = key, error = %error, "installation_record_unreadable");
                    StoredEntry::Unreadable(item)
                }
            })
            .collect();
        Ok(StoredList { entries })
    }

    async fn save(&self, key: &str, list: &StoredList) -> Result<(), InstallationError> {
        let items = list
            .entries
            .iter()
            .map(|entry| match entry {
                StoredEntry::Record(record) => serde_json::to_value(record),
                StoredEntry::Unreadable(raw) => Ok(raw.clone()),
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| InstallationError::Registry(anyhow::anyhow!(e)))?;
        self.store
            .put(key, &serde_json::Value::Array(items))
            .await
            .map_err(InstallationError::Registry)
    }
}

/// One stored list entry. Entries that no longer deserialize are written back
/// exactly as they were read.
enum StoredEntry {
    Record(InstallationRecord),
    Unreadable(serde_json::Value),
}

#[derive(Default)]
struct StoredList {
    entries: Vec<StoredEntry>,
}

impl StoredList {
    fn records(&self) -> impl Iterator<Item = &InstallationRecord> {
        self.entries.iter().filter_map(|entry| match entry {
            StoredEntry::Record(record) => Some(record),
            StoredEntry::Unreadable(_) => None,
        })
    }

    fn find_mut(
        &mut self,
        predicate: impl Fn(&InstallationRecord) -> bool,
    ) -> Option<&mut InstallationRecord> {
        self.entries.iter_mut().find_map(|entry| match entry {
            StoredEntry::Record(record) => predicate(record).then_some(record),
            StoredEntry::Unreadable(_) => None,
        })
    }

    fn push(&mut self, record: InstallationRecord) {
        self.entries.push(StoredEntry::Record(record));
    }

    fn remove(&mut self, id: &str) -> Option<InstallationRecord> {
        let idx = self
            .entries
            .iter()
            .position(|entry| matches!(entry, StoredEntry::Record(r) if r.id == id))?;
        match self.entries.remove(idx) {
            StoredEntry::Record(record) => Some(record),
            StoredEntry::Unreadable(_) => None,
        }
    }

    fn into_records(self) -> Vec<InstallationRecord> {
        self.entries
            .into_iter()
            .filter_map(|entry| match entry {
                StoredEntry::Record(record) => Some(record),
                StoredEntry::Unreadable(_) => None,
            })
            .collect()
    }
}

fn unique_snippet_slug(list: &StoredList, base: &str) -> String {
    let taken = |candidate: &str| list.records().any(|r| r.slug == candidate);
    if !taken(base) {
        return base.to_string();
    }
    let mut n = 2u32;
    loop {
        let candidate = format!("{base}-{n}");
        if !taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}
