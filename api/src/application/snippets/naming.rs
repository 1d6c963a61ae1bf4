use std::collections::{BTreeMap, HashSet};

use crate::domain::installations::slug::slugify;

pub const SNIPPET_FILE_PREFIX: &str = "flygit-";
const SNIPPET_EXTENSION: &str = ".php";
const EMPTY_COMPONENT_FALLBACK: &str = "snippet";

/// Picks the storage filename for one imported source file.
///
/// A filename that previously mapped to `source_path` is reused so re-imports
/// keep stable names. New names are built from the slug and the source path
/// and suffixed with `-2`, `-3`, ... until they clash with neither `used`
/// (names taken in this batch) nor `on_disk`.
pub fn snippet_file_name(
    slug: &str,
    source_path: &str,
    used: &HashSet<String>,
    previous_sources: &BTreeMap<String, String>,
    on_disk: &HashSet<String>,
) -> String {
    if let Some(existing) = previous_sources
        .iter()
        .find(|(file, source)| source.as_str() == source_path && !used.contains(file.as_str()))
        .map(|(file, _)| file.clone())
    {
        return existing;
    }

    let base = format!(
        "{SNIPPET_FILE_PREFIX}{}-{}",
        component(slug),
        component(strip_extension(source_path))
    );
    let mut candidate = format!("{base}{SNIPPET_EXTENSION}");
    let mut n = 2u32;
    while used.contains(&candidate) || on_disk.contains(&candidate) {
        candidate = format!("{base}-{n}{SNIPPET_EXTENSION}");
        n += 1;
    }
    candidate
}

fn component(raw: &str) -> String {
    let slug = slugify(raw);
    if slug.is_empty() {
        EMPTY_COMPONENT_FALLBACK.to_string()
    } else {
        slug
    }
}

fn strip_extension(path: &str) -> &str {
    let file_start = path.rfind('/').map(|i| i + 1).unwrap_or(0);
    match path[file_start..].rfind('.') {
        Some(dot) if dot > 0 => &path[..file_start + dot],
        _ => path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn none() -> HashSet<String> {
        HashSet::new()
    }

    #[test]
    fn builds_name_from_slug_and_path() {
        let name = snippet_file_name("demo-site", "hello.php", &none(), &BTreeMap::new(), &none());
        assert_eq!(name, "flygit-demo-site-hello.php");

        let nested = snippet_file_name(
            "demo-site",
            "util/helper.php",
            &none(),
            &BTreeMap::new(),
            &none(),
        );
        assert_eq!(nested, "flygit-demo-site-util-helper.php");
    }

    #[test]
    fn reuses_previous_name_for_same_source() {
        let mut previous = BTreeMap::new();
        previous.insert("flygit-demo-site-hello-2.php".to_string(), "hello.php".to_string());
        let on_disk: HashSet<String> = ["flygit-demo-site-hello-2.php".to_string()].into();

        let name = snippet_file_name("demo-site", "hello.php", &none(), &previous, &on_disk);
        assert_eq!(name, "flygit-demo-site-hello-2.php");
    }

    #[test]
    fn reimport_is_idempotent() {
        let mut used = HashSet::new();
        let first = snippet_file_name("demo-site", "a/b.php", &used, &BTreeMap::new(), &none());
        used.insert(first.clone());

        let mut previous = BTreeMap::new();
        previous.insert(first.clone(), "a/b.php".to_string());
        let on_disk: HashSet<String> = [first.clone()].into();
        let second = snippet_file_name("demo-site", "a/b.php", &none(), &previous, &on_disk);
        assert_eq!(first, second);
    }

    #[test]
    fn changed_path_gets_new_non_colliding_name() {
        let mut previous = BTreeMap::new();
        previous.insert("flygit-demo-site-a-b.php".to_string(), "a/b.php".to_string());
        let on_disk: HashSet<String> = ["flygit-demo-site-a-b.php".to_string()].into();

        // `a-b.php` slugifies to the same base as `a/b.php`.
        let name = snippet_file_name("demo-site", "a-b.php", &none(), &previous, &on_disk);
        assert_eq!(name, "flygit-demo-site-a-b-2.php");
    }

    #[test]
    fn previous_name_already_used_in_batch_is_not_reused() {
        let mut previous = BTreeMap::new();
        previous.insert("flygit-s-x.php".to_string(), "x.php".to_string());
        let used: HashSet<String> = ["flygit-s-x.php".to_string()].into();

        let name = snippet_file_name("s", "x.php", &used, &previous, &none());
        assert_eq!(name, "flygit-s-x-2.php");
    }

    #[test]
    fn suffix_skips_names_taken_in_batch_and_on_disk() {
        let used: HashSet<String> = ["flygit-s-x.php".to_string()].into();
        let on_disk: HashSet<String> = ["flygit-s-x-2.php".to_string()].into();
        let name = snippet_file_name("s", "x.php", &used, &BTreeMap::new(), &on_disk);
        assert_eq!(name, "flygit-s-x-3.php");
    }

    #[test]
    fn degenerate_components_fall_back() {
        let name = snippet_file_name("!!!", ".php", &none(), &BTreeMap::new(), &none());
        assert_eq!(name, "flygit-snippet-php.php");
        assert_eq!(strip_extension("dir.v2/file"), "dir.v2/file");
        assert_eq!(strip_extension("dir/file.inc.php"), "dir/file.inc");
    }
}
