//! All the clap stuff for parsing/documenting the cli

use camino::Utf8PathBuf;
use clap::{
    builder::{PossibleValuesParser, TypedValueParser},
    Args, Parser, Subcommand, ValueEnum,
};
use tracing::level_filters::LevelFilter;

use vmdist::config::ConfigArgs;

#[derive(Parser, Clone, Debug)]
#[clap(about, long_about = None)]
#[clap(bin_name = "vmdist")]
/// Native Linux package building for software releases.
///
/// Every build target (distribution x version x architecture) gets its
/// own disposable Vagrant machine; `vmdist` writes the build manifest
/// and package descriptor, boots the machine, runs the build, and tears
/// the machine down.
pub struct Cli {
    /// Subcommand to run
    #[clap(subcommand)]
    pub command: Commands,

    /// How verbose logging should be (log level)
    #[clap(long, short)]
    #[clap(default_value_t = LevelFilter::WARN)]
    #[clap(value_parser = PossibleValuesParser::new(["off", "error", "warn", "info", "debug", "trace"]).map(|s| s.parse::<LevelFilter>().expect("possible values are valid")))]
    #[clap(help_heading = "GLOBAL OPTIONS", global = true)]
    pub verbose: LevelFilter,

    /// The format of the output
    #[clap(long, short, value_enum)]
    #[clap(default_value_t = OutputFormat::Human)]
    #[clap(help_heading = "GLOBAL OPTIONS", global = true)]
    pub output_format: OutputFormat,

    /// The name of the package being released
    ///
    /// Falls back to the PACKAGE environment variable.
    #[clap(long)]
    #[clap(help_heading = "GLOBAL OPTIONS", global = true)]
    pub package: Option<String>,

    /// The upstream version being released (semver)
    ///
    /// Falls back to the VERSION environment variable.
    #[clap(long)]
    #[clap(help_heading = "GLOBAL OPTIONS", global = true)]
    pub version: Option<String>,

    /// RFC 3339 timestamp to stamp this release with
    ///
    /// Defaults to the latest commit's author time, then to now.
    #[clap(long)]
    #[clap(help_heading = "GLOBAL OPTIONS", global = true)]
    pub release_time: Option<String>,

    /// Build matrix cells concurrently instead of one at a time
    ///
    /// Equivalent to PARALLEL=yes in the environment. Concurrent builds
    /// run every cell to completion and report all failures together;
    /// sequential builds abort at the first failure.
    #[clap(long)]
    #[clap(help_heading = "GLOBAL OPTIONS", global = true)]
    pub parallel: bool,

    /// Upper bound on concurrently provisioned worker machines
    ///
    /// Defaults to the size of the build matrix.
    #[clap(long)]
    #[clap(help_heading = "GLOBAL OPTIONS", global = true)]
    pub max_workers: Option<usize>,

    /// A package name the RPM builds depend on (repeatable)
    #[clap(long = "rpm-depends")]
    #[clap(help_heading = "GLOBAL OPTIONS", global = true)]
    pub rpm_depends: Vec<String>,

    /// A package name the DEB builds depend on (repeatable)
    #[clap(long = "deb-depends")]
    #[clap(help_heading = "GLOBAL OPTIONS", global = true)]
    pub deb_depends: Vec<String>,

    /// The directory create-archive tars up (defaults to the current
    /// directory)
    #[clap(long)]
    #[clap(help_heading = "GLOBAL OPTIONS", global = true)]
    pub source_dir: Option<Utf8PathBuf>,
}

impl Cli {
    /// The raw config values this invocation provided
    pub fn config_args(&self) -> ConfigArgs {
        ConfigArgs {
            package: self.package.clone(),
            version: self.version.clone(),
            release_time: self.release_time.clone(),
            parallel: self.parallel,
            max_workers: self.max_workers,
            rpm_depends: self.rpm_depends.clone(),
            deb_depends: self.deb_depends.clone(),
            source_dir: self.source_dir.clone(),
        }
    }
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Create the release source archive ({package}-{version}.tar.gz)
    CreateArchive(CreateArchiveArgs),
    /// Build RPM packages for every target in the yum matrix
    #[clap(visible_alias = "release-rpm")]
    BuildRpm(BuildArgs),
    /// Build DEB packages for every target in the apt matrix
    #[clap(visible_alias = "release-deb")]
    BuildDeb(BuildArgs),
    /// Stamp the new release into the Debian changelog and the RPM spec
    /// template
    UpdateVersions(UpdateVersionsArgs),
}

#[derive(Args, Clone, Debug)]
pub struct CreateArchiveArgs {}

#[derive(Args, Clone, Debug)]
pub struct BuildArgs {}

#[derive(Args, Clone, Debug)]
pub struct UpdateVersionsArgs {}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
}
