//! Configuration, resolved once at startup
//!
//! Everything configurable is folded into one immutable [`Config`][]
//! before any pipeline work begins: CLI flags win, then a single
//! captured snapshot of the environment, then values asked of the
//! version-control tool. Components never look at the environment
//! themselves -- they get the Config passed in.

use axoasset::LocalAsset;
use axoprocess::Cmd;
use camino::Utf8PathBuf;
use semver::Version;
use time::format_description::well_known::Rfc3339;
use time::{OffsetDateTime, UtcOffset};

use crate::errors::{DistError, DistResult};
use crate::SortedMap;

/// Environment variable naming the package to release
pub const ENV_PACKAGE: &str = "PACKAGE";
/// Environment variable naming the version to release
pub const ENV_VERSION: &str = "VERSION";
/// Environment variable enabling concurrent builds (value "yes")
pub const ENV_PARALLEL: &str = "PARALLEL";
/// Debian's conventional packager-name override
pub const ENV_DEB_FULLNAME: &str = "DEBFULLNAME";
/// Generic packager-name override
pub const ENV_NAME: &str = "NAME";
/// Debian's conventional packager-email override
pub const ENV_DEB_EMAIL: &str = "DEBEMAIL";
/// Generic packager-email override
pub const ENV_EMAIL: &str = "EMAIL";

/// Who gets credited in changelog stanzas
///
/// Either field may legitimately be empty: an unset identity is not an
/// error, the stanza just carries an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackagerIdent {
    /// Full name
    pub name: String,
    /// Email address
    pub email: String,
}

/// Raw values collected from the CLI, before env/vcs fallback
#[derive(Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Package name override
    pub package: Option<String>,
    /// Version override
    pub version: Option<String>,
    /// RFC 3339 release-time override
    pub release_time: Option<String>,
    /// Run matrix cells concurrently
    pub parallel: bool,
    /// Bound on concurrently provisioned workers
    pub max_workers: Option<usize>,
    /// Dependency list for RPM builds
    pub rpm_depends: Vec<String>,
    /// Dependency list for DEB builds
    pub deb_depends: Vec<String>,
    /// Directory to archive for create-archive
    pub source_dir: Option<Utf8PathBuf>,
}

/// The one immutable configuration value everything gets handed
#[derive(Debug, Clone)]
pub struct Config {
    /// The package being released
    pub package: String,
    /// The upstream version being released
    pub version: Version,
    /// When this release happened (UTC)
    pub release_time: OffsetDateTime,
    /// Whether to run matrix cells concurrently
    pub parallel: bool,
    /// Bound on concurrently provisioned workers (None = matrix size)
    pub max_workers: Option<usize>,
    /// Who gets credited in changelogs
    pub packager: PackagerIdent,
    /// Package names the RPM builds depend on
    pub rpm_depends: Vec<String>,
    /// Package names the DEB builds depend on
    pub deb_depends: Vec<String>,
    /// The project root all pipeline paths hang off of
    pub root_dir: Utf8PathBuf,
    /// The directory create-archive tars up
    pub source_dir: Utf8PathBuf,
}

impl Config {
    /// Capture the process environment as an immutable snapshot
    pub fn capture_env() -> SortedMap<String, String> {
        std::env::vars().collect()
    }

    /// Resolve a Config from CLI args, an environment snapshot, and a
    /// version-control identity source
    ///
    /// Fails before anything touches the filesystem if a required value
    /// (package name, version) can't be resolved.
    pub fn resolve(
        args: ConfigArgs,
        env: &SortedMap<String, String>,
        vcs: &dyn VcsIdentity,
    ) -> DistResult<Self> {
        let package = args
            .package
            .or_else(|| env.get(ENV_PACKAGE).cloned())
            .ok_or(DistError::MissingPackageName)?;
        let raw_version = args
            .version
            .or_else(|| env.get(ENV_VERSION).cloned())
            .ok_or(DistError::MissingVersion)?;
        let version = raw_version
            .parse()
            .map_err(|details| DistError::VersionParse {
                version: raw_version,
                details,
            })?;

        let release_time = match args.release_time {
            Some(stamp) => OffsetDateTime::parse(&stamp, &Rfc3339)
                .map_err(|details| DistError::ReleaseTimeParse { stamp, details })?,
            None => vcs
                .latest_commit_time()
                .unwrap_or_else(OffsetDateTime::now_utc),
        }
        .to_offset(UtcOffset::UTC);

        let parallel = args.parallel
            || env
                .get(ENV_PARALLEL)
                .map(|value| value == "yes")
                .unwrap_or(false);

        let packager = PackagerIdent {
            name: env
                .get(ENV_DEB_FULLNAME)
                .or_else(|| env.get(ENV_NAME))
                .cloned()
                .or_else(|| vcs.user_name())
                .unwrap_or_default(),
            email: env
                .get(ENV_DEB_EMAIL)
                .or_else(|| env.get(ENV_EMAIL))
                .cloned()
                .or_else(|| vcs.user_email())
                .unwrap_or_default(),
        };

        let root_dir = LocalAsset::current_dir()?;
        let source_dir = match args.source_dir {
            Some(dir) => root_dir.join(dir),
            None => root_dir.clone(),
        };

        Ok(Config {
            package,
            version,
            release_time,
            parallel,
            max_workers: args.max_workers,
            packager,
            rpm_depends: args.rpm_depends,
            deb_depends: args.deb_depends,
            root_dir,
            source_dir,
        })
    }
}

/// What we ask the version-control tool for
///
/// A trait so tests can substitute a deterministic fake instead of
/// shelling out to git.
pub trait VcsIdentity {
    /// The committer name, if configured
    fn user_name(&self) -> Option<String>;
    /// The committer email, if configured
    fn user_email(&self) -> Option<String>;
    /// The author time of the most recent commit
    fn latest_commit_time(&self) -> Option<OffsetDateTime>;
}

/// The real thing: `git config` and `git log` in the current directory
pub struct Git;

impl VcsIdentity for Git {
    fn user_name(&self) -> Option<String> {
        git_config_value("user.name")
    }

    fn user_email(&self) -> Option<String> {
        git_config_value("user.email")
    }

    fn latest_commit_time(&self) -> Option<OffsetDateTime> {
        let output = Cmd::new("git", "read the latest commit time")
            .arg("log")
            .arg("-n")
            .arg("1")
            .arg("--format=%aI")
            .check(false)
            .output()
            .ok()?;
        if !output.status.success() {
            return None;
        }
        let stamp = String::from_utf8_lossy(&output.stdout).trim().to_owned();
        OffsetDateTime::parse(&stamp, &Rfc3339).ok()
    }
}

fn git_config_value(key: &str) -> Option<String> {
    let output = Cmd::new("git", format!("read {key} from git config"))
        .arg("config")
        .arg("--get")
        .arg(key)
        .check(false)
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let value = String::from_utf8_lossy(&output.stdout).trim().to_owned();
    (!value.is_empty()).then_some(value)
}
