use once_cell::sync::Lazy;
use regex::Regex;

static KEY_DISALLOWED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9_\-]").expect("valid regex"));
static SLUG_SEPARATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("valid regex"));

/// Lowercases and strips everything outside `[a-z0-9_-]`.
pub fn sanitize_key(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    KEY_DISALLOWED_RE.replace_all(&lowered, "").into_owned()
}

/// Lowercases and collapses every run of non-alphanumerics into a single `-`.
pub fn slugify(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    SLUG_SEPARATOR_RE
        .replace_all(&lowered, "-")
        .trim_matches('-')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_key_drops_punctuation() {
        assert_eq!(sanitize_key("My-Theme"), "my-theme");
        assert_eq!(sanitize_key("my.theme_v2"), "mytheme_v2");
        assert_eq!(sanitize_key("..."), "");
    }

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("util/helper"), "util-helper");
        assert_eq!(slugify("  Demo Site!! "), "demo-site");
        assert_eq!(slugify("a__b--c"), "a-b-c");
        assert_eq!(slugify("///"), "");
    }
}
