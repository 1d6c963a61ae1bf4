use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static TRAILING_CLOSE_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\?>\s*$").expect("valid regex"));
static NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"@name:\s*(.+)$").expect("valid regex"));
static DESCRIPTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@description:\s*(.+)$").expect("valid regex"));
static CREATED_AT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@created_at:\s*(.+)$").expect("valid regex"));
static STATUS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@status:\s*(.+)$").expect("valid regex"));

const METADATA_SCAN_LINES: usize = 80;
const HEADER_END_MARKER: &str = "// <Internal Doc End>";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SnippetMetadata {
    pub name: String,
    pub description: String,
    pub created_at: String,
    pub status: String,
}

/// Strips the BOM, the opening PHP tag and a trailing close tag.
pub fn normalize_snippet_content(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }
    let content = raw.strip_prefix('\u{feff}').unwrap_or(raw).trim_start();
    let content = if let Some(rest) = content.strip_prefix("<?php") {
        rest.trim_start()
    } else if let Some(rest) = content.strip_prefix("<?") {
        rest.trim_start()
    } else {
        content
    };
    TRAILING_CLOSE_TAG_RE
        .replace(content, "")
        .trim()
        .to_string()
}

/// The doc block the snippet runner expects at the top of every file.
pub fn snippet_header(file_name: &str, created_at: DateTime<Utc>) -> String {
    let display_name = file_name.strip_suffix(".php").unwrap_or(file_name);
    let timestamp = created_at.format("%Y-%m-%d %H:%M:%S");
    format!(
        "<?php\n// <Internal Doc Start>\n/*\n*\n* @description: \n* @tags: \n* @group: \n* @name: FlyGit {display_name}\n* @type: PHP\n* @status: draft\n* @created_by: 1\n* @created_at: {timestamp}\n* @updated_at: \n* @is_valid: 1\n* @updated_by: 1\n* @priority: 10\n* @run_at: all\n* @load_as_file: \n* @condition: {{\"status\":\"no\",\"run_if\":\"assertive\",\"items\":[[]]}}\n*/\n?>\n<?php if (!defined(\"ABSPATH\")) {{ return;}} {HEADER_END_MARKER} ?>"
    )
}

/// Full file body: header, then the normalized source when there is any.
pub fn render_snippet(file_name: &str, raw: &[u8], created_at: DateTime<Utc>) -> String {
    let code = normalize_snippet_content(&String::from_utf8_lossy(raw));
    let mut out = snippet_header(file_name, created_at);
    if !code.is_empty() {
        out.push('\n');
        out.push_str(&code);
    }
    out.push('\n');
    out
}

pub fn extract_snippet_metadata(contents: &str) -> SnippetMetadata {
    let mut metadata = SnippetMetadata::default();
    for line in contents.lines().take(METADATA_SCAN_LINES) {
        if line.trim() == HEADER_END_MARKER {
            break;
        }
        if let Some(caps) = NAME_RE.captures(line) {
            metadata.name = caps[1].trim().to_string();
        } else if let Some(caps) = DESCRIPTION_RE.captures(line) {
            metadata.description = caps[1].trim().to_string();
        } else if let Some(caps) = CREATED_AT_RE.captures(line) {
            metadata.created_at = caps[1].trim().to_string();
        } else if let Some(caps) = STATUS_RE.captures(line) {
            metadata.status = caps[1].trim().to_string();
        }
    }
    metadata
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn normalize_strips_tags_and_bom() {
        assert_eq!(
            normalize_snippet_content("\u{feff}  <?php\n\necho 'hi';\n?>\n  "),
            "echo 'hi';"
        );
        assert_eq!(normalize_snippet_content("<? echo 1;"), "echo 1;");
        assert_eq!(normalize_snippet_content("plain();\n"), "plain();");
        assert_eq!(normalize_snippet_content(""), "");
        assert_eq!(normalize_snippet_content("<?php\n"), "");
    }

    #[test]
    fn render_places_code_after_header() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        let body = render_snippet("flygit-demo-hello.php", b"<?php\nadd_action('init', 'x');\n", at);
        assert!(body.starts_with("<?php\n// <Internal Doc Start>"));
        assert!(body.contains("* @name: FlyGit flygit-demo-hello\n"));
        assert!(body.contains("* @created_at: 2024-05-01 12:30:00\n"));
        assert!(body.ends_with("// <Internal Doc End> ?>\nadd_action('init', 'x');\n"));
    }

    #[test]
    fn render_without_code_ends_after_header() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let body = render_snippet("flygit-a-b.php", b"<?php ?>", at);
        assert!(body.ends_with("// <Internal Doc End> ?>\n"));
    }

    #[test]
    fn metadata_round_trips_through_header() {
        let at = Utc.with_ymd_and_hms(2023, 1, 2, 3, 4, 5).unwrap();
        let body = render_snippet("flygit-site-tools.php", b"echo 1;", at);
        let metadata = extract_snippet_metadata(&body);
        assert_eq!(metadata.name, "FlyGit flygit-site-tools");
        assert_eq!(metadata.description, "");
        assert_eq!(metadata.created_at, "2023-01-02 03:04:05");
        assert_eq!(metadata.status, "draft");
    }

    #[test]
    fn metadata_scan_stops_at_end_marker() {
        let contents = "<?php\n// <Internal Doc End>\n* @name: later\n";
        assert_eq!(extract_snippet_metadata(contents).name, "");
    }
}
