mod filesystem_installer;
mod package_fetcher_reqwest;

pub use filesystem_installer::FilesystemPackageInstaller;
pub use package_fetcher_reqwest::ReqwestPackageFetcher;
