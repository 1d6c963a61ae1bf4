mod option_store_file;
mod snippet_storage_fs;

pub use option_store_file::FileOptionStore;
pub use snippet_storage_fs::FilesystemSnippetStorage;
