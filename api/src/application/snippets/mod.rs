pub mod content;
pub mod naming;

/// Repository subtree imported as snippets.
pub const SNIPPET_SOURCE_DIR: &str = "php";
