#![deny(missing_docs)]
#![allow(clippy::result_large_err)]

//! # vmdist
//!
//! This is the library at the core of the `vmdist` CLI. It packages a
//! software release into installable OS packages (RPM and DEB) across a
//! matrix of distributions, versions, and architectures, building each
//! matrix cell inside its own disposable Vagrant machine.
//!
//! The shape of a build:
//!
//! 1. [`config::Config::resolve`][] folds CLI flags, one environment
//!    snapshot, and version-control identity into a single immutable
//!    config
//! 2. [`tasks::gather_pipeline`][] computes everything a pipeline will
//!    do: host directory layout, the build manifest, the rendered
//!    package descriptor, the build matrix, and the execution policies
//! 3. [`tasks::run_pipeline`][] lays the files down (manifest and
//!    descriptor are fully written before any worker boots) and hands
//!    the matrix to [`workers::run_matrix`][], which provisions, builds
//!    on, and destroys one worker machine per matrix cell

use camino::Utf8PathBuf;

use config::Config;
use tasks::{BuildReport, PackageRelease};
use workers::VagrantRuntime;

pub mod archive;
pub mod changelog;
pub mod config;
pub mod descriptor;
pub mod errors;
pub mod manifest;
pub mod platform;
pub mod tasks;
pub mod workers;
#[cfg(test)]
mod tests;

pub use errors::{DistError, DistResult};

/// A map where the order matters
pub type SortedMap<K, V> = std::collections::BTreeMap<K, V>;

/// vmdist create-archive -- tar up the release source tree
pub fn do_create_archive(config: &Config) -> DistResult<Utf8PathBuf> {
    let release = PackageRelease::new(config);
    archive::create_archive(config, &release)
}

/// vmdist build-rpm -- run the RPM pipeline over the yum matrix
pub fn do_build_rpm(config: &Config) -> DistResult<BuildReport> {
    let release = PackageRelease::new(config);
    let plan = tasks::gather_pipeline(config, &release, platform::PlatformFamily::Rpm)?;
    let runtime = VagrantRuntime::new(plan.host_dir.clone());
    tasks::run_pipeline(&release, &plan, &runtime)
}

/// vmdist build-deb -- run the DEB pipeline over the apt matrix
pub fn do_build_deb(config: &Config) -> DistResult<BuildReport> {
    let release = PackageRelease::new(config);
    let plan = tasks::gather_pipeline(config, &release, platform::PlatformFamily::Deb)?;
    let runtime = VagrantRuntime::new(plan.host_dir.clone());
    tasks::run_pipeline(&release, &plan, &runtime)
}

/// vmdist update-versions -- stamp the new release into both changelogs
///
/// Returns the files that were updated.
pub fn do_update_versions(config: &Config) -> DistResult<Vec<Utf8PathBuf>> {
    let release = PackageRelease::new(config);
    let deb_changelog = config
        .root_dir
        .join(tasks::DEB_CONTROL_DIR)
        .join("changelog");
    let rpm_spec_template = config
        .root_dir
        .join(tasks::RPM_HOST_DIR)
        .join(format!("{}.spec.in", release.name));

    changelog::prepend_debian_changelog(&deb_changelog, &release, &config.packager)?;
    changelog::update_rpm_spec_template(&rpm_spec_template, &release, &config.packager)?;

    Ok(vec![deb_changelog, rpm_spec_template])
}
