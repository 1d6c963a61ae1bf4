pub mod option_store;
pub mod package_fetcher;
pub mod package_installer;
pub mod repository_content;
pub mod snippet_storage;
