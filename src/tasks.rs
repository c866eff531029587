//! Code to compute and run the release pipelines
//!
//! A pipeline is one platform family's end-to-end build: check the
//! source archive exists, lay out the host directory, write the build
//! manifest and (for RPM) the rendered package descriptor, then hand
//! the matrix to the worker lifecycle manager. Everything a worker will
//! read is on disk before the first worker boots.
//!
//! The RPM and DEB pipelines are fully independent -- separate host
//! directories, separate manifests, separate worker sets -- and each
//! CLI invocation runs exactly one of them, so two requested pipelines
//! never interleave.

use axoasset::LocalAsset;
use camino::Utf8PathBuf;
use semver::Version;
use serde::Serialize;
use time::OffsetDateTime;
use tracing::info;

use crate::archive::require_archive;
use crate::config::Config;
use crate::errors::DistResult;
use crate::platform::{
    deb_build_matrix, rpm_build_matrix, BuildTarget, PlatformFamily, RPM_DISTRIBUTION,
};
use crate::workers::{ExecutionPolicy, FailurePolicy, TargetOutcome, WorkerRuntime};
use crate::{descriptor, manifest, workers, SortedMap};

/// Host directory for the RPM pipeline
pub const RPM_HOST_DIR: &str = "yum";
/// Host directory for the DEB pipeline
pub const DEB_HOST_DIR: &str = "apt";
/// The Debian control directory copied into the DEB workspace
pub const DEB_CONTROL_DIR: &str = "debian";
/// Output repository directory inside a host dir
pub const REPOSITORIES_DIR: &str = "repositories";
/// Scratch workspace inside a host dir, reset every run
pub const TMP_DIR: &str = "tmp";
/// File name of the build manifest workers source
pub const MANIFEST_NAME: &str = "env.sh";

/// One release of one package
///
/// Created once per invocation and shared read-only with every
/// component downstream.
#[derive(Debug, Clone)]
pub struct PackageRelease {
    /// The package name
    pub name: String,
    /// The upstream version
    pub version: Version,
    /// When the release happened (UTC)
    pub release_time: OffsetDateTime,
    /// The deterministic archive file name, `{name}-{version}.tar.gz`
    pub archive_name: String,
    /// Absolute path the archive lives at
    pub archive_path: Utf8PathBuf,
}

impl PackageRelease {
    /// The release a Config describes
    pub fn new(config: &Config) -> Self {
        let archive_name = format!("{}-{}.tar.gz", config.package, config.version);
        let archive_path = config.root_dir.join(&archive_name);
        Self {
            name: config.package.clone(),
            version: config.version.clone(),
            release_time: config.release_time,
            archive_name,
            archive_path,
        }
    }

    /// The directory name the archive unpacks to
    pub fn archive_base_name(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }

    /// The full packaging version, upstream version plus packaging
    /// revision
    pub fn package_version(&self) -> String {
        format!("{}-1", self.version)
    }
}

/// A descriptor template and where its rendering goes
#[derive(Debug, Clone)]
pub struct DescriptorJob {
    /// The template file
    pub template: Utf8PathBuf,
    /// The fresh path the rendered descriptor is written to
    pub dest: Utf8PathBuf,
    /// The token mapping to substitute
    pub tokens: SortedMap<&'static str, String>,
}

/// Everything one pipeline invocation will do, computed up front
#[derive(Debug)]
pub struct PipelinePlan {
    /// Which family this pipeline builds for
    pub family: PlatformFamily,
    /// The pipeline's host directory (Vagrantfile, manifest, scratch)
    pub host_dir: Utf8PathBuf,
    /// Output repository directory (created if missing)
    pub repositories_dir: Utf8PathBuf,
    /// Scratch workspace (reset every run)
    pub tmp_dir: Utf8PathBuf,
    /// The manifest to write before any worker boots
    pub manifest: manifest::BuildManifest,
    /// The descriptor to render before any worker boots (RPM only)
    pub descriptor: Option<DescriptorJob>,
    /// Control directory to copy into the scratch workspace (DEB only)
    pub control_dir: Option<Utf8PathBuf>,
    /// The build matrix, in enumeration order
    pub targets: Vec<BuildTarget>,
    /// How the matrix is walked
    pub execution: ExecutionPolicy,
    /// What a failure does to the rest of the matrix
    pub failure: FailurePolicy,
}

/// What a pipeline run produced, one entry per processed target
#[derive(Debug, Serialize)]
pub struct BuildReport {
    /// Which family was built
    pub family: PlatformFamily,
    /// Per-target outcomes, in matrix order
    pub targets: Vec<TargetOutcome>,
}

/// Compute the plan for one family's pipeline
pub fn gather_pipeline(
    config: &Config,
    release: &PackageRelease,
    family: PlatformFamily,
) -> DistResult<PipelinePlan> {
    let (host_dir, manifest, descriptor, control_dir, targets) = match family {
        PlatformFamily::Rpm => {
            let host_dir = config.root_dir.join(RPM_HOST_DIR);
            let tmp_dir = host_dir.join(TMP_DIR);
            let descriptor = DescriptorJob {
                template: host_dir.join(format!("{}.spec.in", release.name)),
                dest: tmp_dir
                    .join(RPM_DISTRIBUTION)
                    .join(format!("{}.spec", release.name)),
                tokens: descriptor::release_tokens(release),
            };
            (
                host_dir,
                manifest::rpm_manifest(release, &config.rpm_depends),
                Some(descriptor),
                None,
                rpm_build_matrix()?,
            )
        }
        PlatformFamily::Deb => (
            config.root_dir.join(DEB_HOST_DIR),
            manifest::deb_manifest(release, &config.deb_depends),
            None,
            Some(config.root_dir.join(DEB_CONTROL_DIR)),
            deb_build_matrix()?,
        ),
    };

    // concurrency defaults to the matrix size; the failure policy
    // follows the execution policy unless someone grows a flag for it
    let execution = if config.parallel {
        ExecutionPolicy::Concurrent {
            max_workers: config.max_workers.unwrap_or(targets.len()),
        }
    } else {
        ExecutionPolicy::Sequential
    };
    let failure = if config.parallel {
        FailurePolicy::CollectAll
    } else {
        FailurePolicy::FailFast
    };

    Ok(PipelinePlan {
        family,
        repositories_dir: host_dir.join(REPOSITORIES_DIR),
        tmp_dir: host_dir.join(TMP_DIR),
        host_dir,
        manifest,
        descriptor,
        control_dir,
        targets,
        execution,
        failure,
    })
}

/// Run a pipeline plan against a worker runtime
pub fn run_pipeline(
    release: &PackageRelease,
    plan: &PipelinePlan,
    runtime: &dyn WorkerRuntime,
) -> DistResult<BuildReport> {
    // the archive is referenced, never regenerated here
    require_archive(release)?;

    info!("building {} packages for {}", plan.family, release.name);

    LocalAsset::create_dir_all(&plan.repositories_dir)?;
    if plan.tmp_dir.exists() {
        LocalAsset::remove_dir_all(&plan.tmp_dir)?;
    }
    LocalAsset::create_dir_all(&plan.tmp_dir)?;
    LocalAsset::copy_file_to_dir(&release.archive_path, &plan.tmp_dir)?;
    if let Some(control_dir) = &plan.control_dir {
        LocalAsset::copy_dir_to_dir(control_dir, plan.tmp_dir.join(DEB_CONTROL_DIR))?;
    }

    // everything the workers read must be fully written before any of
    // them boots
    plan.manifest.write(&plan.host_dir.join(MANIFEST_NAME))?;
    if let Some(job) = &plan.descriptor {
        descriptor::render_file(&job.template, &job.dest, &job.tokens)?;
    }

    let targets = workers::run_matrix(runtime, &plan.targets, plan.execution, plan.failure)?;

    Ok(BuildReport {
        family: plan.family,
        targets,
    })
}
