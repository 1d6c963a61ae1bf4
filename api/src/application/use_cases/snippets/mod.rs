pub mod import_from_repository;
pub mod list_snippets;
