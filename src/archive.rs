//! The release source archive
//!
//! One compressed tarball, named deterministically from package and
//! version. The build pipelines only ever reference it; creating it is
//! its own invokable step.

use axoasset::LocalAsset;
use camino::Utf8PathBuf;
use tracing::info;

use crate::config::Config;
use crate::errors::{DistError, DistResult};
use crate::tasks::PackageRelease;

/// Tar up the release source tree as `{package}-{version}.tar.gz`
///
/// The archive's contents sit under a `{package}-{version}/` root so it
/// unpacks the way every downstream build script expects. Overwrites
/// any previous archive at the same path.
pub fn create_archive(config: &Config, release: &PackageRelease) -> DistResult<Utf8PathBuf> {
    LocalAsset::tar_gz_dir(
        &config.source_dir,
        &release.archive_path,
        Some(release.archive_base_name()),
    )?;
    info!("created source archive at {}", release.archive_path);
    Ok(release.archive_path.clone())
}

/// Check the release's archive exists where the pipelines expect it
pub fn require_archive(release: &PackageRelease) -> DistResult<()> {
    if release.archive_path.exists() {
        Ok(())
    } else {
        Err(DistError::MissingSourceArchive {
            archive_name: release.archive_name.clone(),
            archive_path: release.archive_path.clone(),
        })
    }
}
