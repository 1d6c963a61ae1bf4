use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_BRANCH: &str = "main";

fn default_branch() -> String {
    DEFAULT_BRANCH.to_string()
}

/// A tracked deployment sourced from a repository.
///
/// Stored as a flat JSON object; the `type` field selects the kind and, for
/// snippets, carries the imported file bookkeeping alongside the common fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallationRecord {
    pub id: String,
    #[serde(flatten)]
    pub kind: InstallationKind,
    pub slug: String,
    #[serde(default)]
    pub repository_url: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub webhook_secret: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum InstallationKind {
    Plugin,
    Theme,
    Snippet(SnippetDetails),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnippetDetails {
    /// Generated filenames in import order.
    #[serde(default)]
    pub files: Vec<String>,
    /// Generated filename -> source path relative to the imported subtree.
    #[serde(default)]
    pub sources: BTreeMap<String, String>,
    #[serde(default)]
    pub last_import: Option<DateTime<Utc>>,
}

/// Installable package types that live in a host directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PackageKind {
    Plugin,
    Theme,
}

impl PackageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PackageKind::Plugin => "plugin",
            PackageKind::Theme => "theme",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PackageKind::Plugin => "Plugin",
            PackageKind::Theme => "Theme",
        }
    }
}

impl fmt::Display for PackageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PackageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plugin" => Ok(PackageKind::Plugin),
            "theme" => Ok(PackageKind::Theme),
            other => Err(format!("unknown installation type: {other}")),
        }
    }
}

impl From<PackageKind> for InstallationKind {
    fn from(kind: PackageKind) -> Self {
        match kind {
            PackageKind::Plugin => InstallationKind::Plugin,
            PackageKind::Theme => InstallationKind::Theme,
        }
    }
}

impl InstallationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstallationKind::Plugin => "plugin",
            InstallationKind::Theme => "theme",
            InstallationKind::Snippet(_) => "snippet",
        }
    }

    pub fn package_kind(&self) -> Option<PackageKind> {
        match self {
            InstallationKind::Plugin => Some(PackageKind::Plugin),
            InstallationKind::Theme => Some(PackageKind::Theme),
            InstallationKind::Snippet(_) => None,
        }
    }
}

impl InstallationRecord {
    pub fn is_snippet(&self) -> bool {
        matches!(self.kind, InstallationKind::Snippet(_))
    }

    pub fn snippet(&self) -> Option<&SnippetDetails> {
        match &self.kind {
            InstallationKind::Snippet(details) => Some(details),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.slug)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plugin_record_serializes_with_type_tag() {
        let record = InstallationRecord {
            id: "abc".into(),
            kind: InstallationKind::Plugin,
            slug: "hello".into(),
            repository_url: "https://github.com/acme/hello".into(),
            branch: "main".into(),
            access_token: String::new(),
            webhook_secret: "s".into(),
            name: None,
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["type"], "plugin");
        assert_eq!(value["slug"], "hello");
        assert!(value.get("files").is_none());
        assert!(value.get("name").is_none());
    }

    #[test]
    fn snippet_record_reads_legacy_layout() {
        let value = json!({
            "id": "s-1",
            "type": "snippet",
            "slug": "demo-site",
            "repository_url": "https://github.com/acme/demo-site",
            "files": ["flygit-demo-site-hello.php"],
            "sources": { "flygit-demo-site-hello.php": "hello.php" },
        });
        let record: InstallationRecord = serde_json::from_value(value).unwrap();
        let details = record.snippet().unwrap();
        assert_eq!(details.files, vec!["flygit-demo-site-hello.php"]);
        assert_eq!(
            details.sources.get("flygit-demo-site-hello.php").map(String::as_str),
            Some("hello.php")
        );
        assert_eq!(record.branch, "main");
        assert_eq!(record.webhook_secret, "");
        assert!(details.last_import.is_none());
    }

    #[test]
    fn package_kind_parses_case_insensitively() {
        assert_eq!("Theme".parse::<PackageKind>(), Ok(PackageKind::Theme));
        assert!("snippet".parse::<PackageKind>().is_err());
    }
}
