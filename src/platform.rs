//! Information about the platforms we build packages for
//!
//! The compatibility tables below are deliberately plain consts: the
//! enumeration order of a build matrix must be reproducible across runs
//! (log correlation depends on it), so everything is declared in the
//! order it should be walked.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::errors::{DistError, DistResult};

/// The key for referring to the RPM ecosystem as a "family"
pub const FAMILY_RPM: &str = "rpm";
/// The key for referring to the DEB ecosystem as a "family"
pub const FAMILY_DEB: &str = "deb";

/// The packaging ecosystem a pipeline targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformFamily {
    /// RPM-based distributions (yum pipeline)
    Rpm,
    /// DEB-based distributions (apt pipeline)
    Deb,
}

impl PlatformFamily {
    /// The family's string key
    pub fn as_str(&self) -> &'static str {
        match self {
            PlatformFamily::Rpm => FAMILY_RPM,
            PlatformFamily::Deb => FAMILY_DEB,
        }
    }
}

impl fmt::Display for PlatformFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One cell of a build matrix
///
/// A value object: once generated it's never mutated, and its composed
/// [`BuildTarget::id`][] uniquely names the worker machine that builds it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildTarget {
    /// The packaging ecosystem this target belongs to
    pub family: PlatformFamily,
    /// Distribution name (e.g. "centos", "debian", "ubuntu")
    pub distribution: String,
    /// OS version or code name (e.g. "7", "stretch", "17.04")
    pub os_version: String,
    /// CPU architecture (e.g. "x86_64", "i386", "amd64")
    pub arch: String,
}

impl BuildTarget {
    fn new(family: PlatformFamily, distribution: &str, os_version: &str, arch: &str) -> Self {
        Self {
            family,
            distribution: distribution.to_owned(),
            os_version: os_version.to_owned(),
            arch: arch.to_owned(),
        }
    }

    /// The composed identifier that names this target's worker machine
    pub fn id(&self) -> String {
        format!("{}-{}-{}", self.distribution, self.os_version, self.arch)
    }
}

/// The one distribution the RPM pipeline targets
pub const RPM_DISTRIBUTION: &str = "centos";

/// OS version -> supported architectures for the RPM family
pub const RPM_VERSION_ARCHES: &[(&str, &[&str])] = &[("6", &["x86_64"]), ("7", &["x86_64"])];

/// (distribution, code name) pairs for the DEB family
pub const DEB_CODE_NAMES: &[(&str, &str)] = &[
    ("debian", "stretch"),
    ("ubuntu", "16.04"),
    ("ubuntu", "17.04"),
];

/// Architectures the DEB family builds for
pub const DEB_ARCHES: &[&str] = &["i386", "amd64"];

/// Architectures that are only valid on the listed code names.
///
/// An architecture absent from this table is valid everywhere; 32-bit
/// images only exist for zesty.
const DEB_ARCH_ONLY_ON: &[(&str, &[&str])] = &[("i386", &["17.04"])];

/// Whether an architecture is supported on a given OS version of a family
pub fn arch_supported(family: PlatformFamily, os_version: &str, arch: &str) -> bool {
    match family {
        PlatformFamily::Rpm => true,
        PlatformFamily::Deb => DEB_ARCH_ONLY_ON
            .iter()
            .find(|(restricted, _)| *restricted == arch)
            .map(|(_, only_on)| only_on.contains(&os_version))
            .unwrap_or(true),
    }
}

/// Enumerate the RPM build matrix in declared order
pub fn rpm_build_matrix() -> DistResult<Vec<BuildTarget>> {
    let mut targets = vec![];
    for (os_version, arches) in RPM_VERSION_ARCHES {
        for arch in *arches {
            if !arch_supported(PlatformFamily::Rpm, os_version, arch) {
                continue;
            }
            targets.push(BuildTarget::new(
                PlatformFamily::Rpm,
                RPM_DISTRIBUTION,
                os_version,
                arch,
            ));
        }
    }
    check_unique_ids(PlatformFamily::Rpm, &targets)?;
    Ok(targets)
}

/// Enumerate the DEB build matrix in declared order
pub fn deb_build_matrix() -> DistResult<Vec<BuildTarget>> {
    let mut targets = vec![];
    for (distribution, code_name) in DEB_CODE_NAMES {
        for arch in DEB_ARCHES {
            if !arch_supported(PlatformFamily::Deb, code_name, arch) {
                continue;
            }
            targets.push(BuildTarget::new(
                PlatformFamily::Deb,
                distribution,
                code_name,
                arch,
            ));
        }
    }
    check_unique_ids(PlatformFamily::Deb, &targets)?;
    Ok(targets)
}

/// Two cells with the same id would double-provision one machine name
fn check_unique_ids(family: PlatformFamily, targets: &[BuildTarget]) -> DistResult<()> {
    let mut seen = BTreeSet::new();
    for target in targets {
        let id = target.id();
        if !seen.insert(id.clone()) {
            return Err(DistError::DuplicateBuildTarget { family, id });
        }
    }
    Ok(())
}
