use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use walkdir::WalkDir;

use crate::application::errors::InstallationError;
use crate::application::ports::package_installer::PackageInstaller;
use crate::domain::installations::PackageKind;

/// Installs packages into the host's plugin and theme directories.
pub struct FilesystemPackageInstaller {
    plugins_dir: PathBuf,
    themes_dir: PathBuf,
}

impl FilesystemPackageInstaller {
    pub fn new(plugins_dir: impl Into<PathBuf>, themes_dir: impl Into<PathBuf>) -> Self {
        Self {
            plugins_dir: plugins_dir.into(),
            themes_dir: themes_dir.into(),
        }
    }

    pub fn root_for(&self, kind: PackageKind) -> &Path {
        match kind {
            PackageKind::Plugin => &self.plugins_dir,
            PackageKind::Theme => &self.themes_dir,
        }
    }

    fn target_for(&self, kind: PackageKind, slug: &str) -> Result<PathBuf, InstallationError> {
        if slug.is_empty() || slug.contains(['/', '\\']) || slug.starts_with('.') {
            return Err(InstallationError::InvalidSlug);
        }
        Ok(self.root_for(kind).join(slug))
    }

    fn extract_archive(archive: &[u8], dest_root: &Path) -> Result<(), InstallationError> {
        let reader = std::io::Cursor::new(archive);
        let mut archive = zip::ZipArchive::new(reader)
            .map_err(|e| InstallationError::ExtractionFailed(anyhow::anyhow!(e)))?;

        let dest_root = dest_root.canonicalize().map_err(fs_error)?;

        for i in 0..archive.len() {
            let mut file = archive
                .by_index(i)
                .map_err(|e| InstallationError::ExtractionFailed(anyhow::anyhow!(e)))?;
            let Some(rel_path) = file.enclosed_name().map(|p| p.to_path_buf()) else {
                tracing::warn!(entry = %file.name(), "archive_entry_outside_root_skipped");
                continue;
            };

            if let Some(mode) = file.unix_mode() {
                if (mode & 0o170000) == 0o120000 {
                    continue;
                }
            }

            let outpath = dest_root.join(&rel_path);
            if !outpath.starts_with(&dest_root) {
                continue;
            }

            if file.is_dir() {
                std::fs::create_dir_all(&outpath).map_err(fs_error)?;
            } else {
                if let Some(parent) = outpath.parent() {
                    std::fs::create_dir_all(parent).map_err(fs_error)?;
                }
                let mut outfile = std::fs::File::create(&outpath).map_err(fs_error)?;
                std::io::copy(&mut file, &mut outfile)
                    .map_err(|e| InstallationError::ExtractionFailed(anyhow::anyhow!(e)))?;
            }
        }

        Ok(())
    }

    /// First top-level directory in name order, else the extraction root when
    /// it holds loose files.
    fn locate_source(extracted: &Path) -> Result<PathBuf, InstallationError> {
        let mut entries: Vec<(String, bool)> = std::fs::read_dir(extracted)
            .map_err(fs_error)?
            .filter_map(Result::ok)
            .filter_map(|entry| {
                let name = entry.file_name().to_str()?.to_string();
                if name.starts_with('.') {
                    return None;
                }
                let is_dir = entry.file_type().ok()?.is_dir();
                Some((name, is_dir))
            })
            .collect();
        entries.sort();

        if entries.is_empty() {
            return Err(InstallationError::MissingSourceContent(
                "The extracted package did not contain any installable files.".into(),
            ));
        }
        Ok(entries
            .iter()
            .find(|(_, is_dir)| *is_dir)
            .map(|(name, _)| extracted.join(name))
            .unwrap_or_else(|| extracted.to_path_buf()))
    }

    fn copy_tree(source: &Path, target: &Path) -> Result<(), InstallationError> {
        for entry in WalkDir::new(source).follow_links(false) {
            let entry = entry.map_err(|e| fs_error(e.into()))?;
            let rel = entry
                .path()
                .strip_prefix(source)
                .map_err(|e| InstallationError::FilesystemPermission(anyhow::anyhow!(e)))?;
            let dest = target.join(rel);
            let file_type = entry.file_type();
            if file_type.is_dir() {
                std::fs::create_dir_all(&dest).map_err(fs_error)?;
            } else if file_type.is_file() {
                std::fs::copy(entry.path(), &dest).map_err(fs_error)?;
            }
        }
        Ok(())
    }

    fn install_blocking(archive: &[u8], target: &Path) -> Result<(), InstallationError> {
        let workdir = tempfile::Builder::new()
            .prefix("flygit")
            .tempdir()
            .map_err(fs_error)?;
        Self::extract_archive(archive, workdir.path())?;
        let source = Self::locate_source(workdir.path())?;

        match std::fs::symlink_metadata(target) {
            Ok(meta) if meta.is_dir() => std::fs::remove_dir_all(target).map_err(fs_error)?,
            Ok(_) => std::fs::remove_file(target).map_err(fs_error)?,
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(fs_error(err)),
        }
        std::fs::create_dir_all(target).map_err(fs_error)?;
        Self::copy_tree(&source, target)
    }
}

fn fs_error(err: std::io::Error) -> InstallationError {
    InstallationError::FilesystemPermission(anyhow::anyhow!(err))
}

#[async_trait]
impl PackageInstaller for FilesystemPackageInstaller {
    async fn install(
        &self,
        kind: PackageKind,
        slug: &str,
        archive: &[u8],
    ) -> Result<PathBuf, InstallationError> {
        let target = self.target_for(kind, slug)?;
        let archive_vec = archive.to_vec();
        let target_for_install = target.clone();
        tokio::task::spawn_blocking(move || {
            FilesystemPackageInstaller::install_blocking(&archive_vec, &target_for_install)
        })
        .await
        .map_err(|e| InstallationError::FilesystemPermission(anyhow::anyhow!(e)))??;
        Ok(target)
    }

    async fn remove(&self, kind: PackageKind, slug: &str) -> Result<(), InstallationError> {
        let target = self.target_for(kind, slug)?;
        match tokio::fs::symlink_metadata(&target).await {
            Ok(meta) if meta.is_dir() => {
                tokio::fs::remove_dir_all(&target).await.map_err(fs_error)?;
                return Ok(());
            }
            Ok(_) => {
                tokio::fs::remove_file(&target).await.map_err(fs_error)?;
                return Ok(());
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(fs_error(err)),
        }

        if kind == PackageKind::Plugin {
            let single_file = self.root_for(kind).join(format!("{slug}.php"));
            match tokio::fs::remove_file(&single_file).await {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => return Err(fs_error(err)),
            }
        }
        tracing::debug!(kind = %kind, slug = %slug, "package_already_absent");
        Ok(())
    }
}
