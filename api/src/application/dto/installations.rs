use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::application::use_cases::snippets::list_snippets::StoredSnippet;
use crate::domain::installations::InstallationRecord;

/// Installation as shown to administrators. Access tokens never leave the service.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct InstallationView {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub slug: String,
    pub name: String,
    pub repository_url: String,
    pub branch: String,
    pub has_access_token: bool,
    pub webhook_secret: String,
    pub webhook_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_import: Option<DateTime<Utc>>,
}

impl InstallationView {
    pub fn from_record(record: &InstallationRecord, webhook_url: String) -> Self {
        let snippet = record.snippet();
        Self {
            id: record.id.clone(),
            kind: record.kind.as_str().to_string(),
            slug: record.slug.clone(),
            name: record.display_name().to_string(),
            repository_url: record.repository_url.clone(),
            branch: record.branch.clone(),
            has_access_token: !record.access_token.is_empty(),
            webhook_secret: record.webhook_secret.clone(),
            webhook_url,
            files: snippet.map(|s| s.files.clone()),
            last_import: snippet.and_then(|s| s.last_import),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SnippetFileView {
    pub file: String,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
    pub name: String,
    pub description: String,
    pub created_at: String,
    pub status: String,
}

impl From<StoredSnippet> for SnippetFileView {
    fn from(value: StoredSnippet) -> Self {
        Self {
            file: value.file,
            size: value.size,
            modified: value.modified,
            name: value.metadata.name,
            description: value.metadata.description,
            created_at: value.metadata.created_at,
            status: value.metadata.status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::installations::InstallationKind;

    #[test]
    fn view_hides_access_token() {
        let record = InstallationRecord {
            id: "1".into(),
            kind: InstallationKind::Plugin,
            slug: "p".into(),
            repository_url: "https://github.com/a/p".into(),
            branch: "main".into(),
            access_token: "ghp_secret".into(),
            webhook_secret: "w".into(),
            name: None,
        };
        let view = InstallationView::from_record(&record, "http://x/api/installations/1/webhook".into());
        let json = serde_json::to_string(&view).unwrap();
        assert!(!json.contains("ghp_secret"));
        assert!(view.has_access_token);
        assert_eq!(view.name, "p");
        assert!(view.files.is_none());
    }
}
