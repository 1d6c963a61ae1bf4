pub mod installation;
pub mod slug;

pub use installation::{InstallationKind, InstallationRecord, PackageKind, SnippetDetails};
