//! Errors!

use miette::Diagnostic;
use thiserror::Error;

/// Result alias for vmdist
pub type DistResult<T> = std::result::Result<T, DistError>;

/// The set of errors vmdist can produce
#[derive(Debug, Error, Diagnostic)]
#[non_exhaustive]
pub enum DistError {
    /// A file operation failed
    #[error(transparent)]
    #[diagnostic(transparent)]
    Asset(#[from] axoasset::AxoassetError),

    /// An external process failed to run or signaled failure
    #[error(transparent)]
    #[diagnostic(transparent)]
    Process(#[from] axoprocess::AxoprocessError),

    /// No package name anywhere we looked
    #[error("no package name is configured")]
    #[diagnostic(help("pass --package or set the PACKAGE environment variable"))]
    MissingPackageName,

    /// No package version anywhere we looked
    #[error("no package version is configured")]
    #[diagnostic(help("pass --version or set the VERSION environment variable"))]
    MissingVersion,

    /// The configured version wasn't semver
    #[error("failed to parse package version {version}")]
    VersionParse {
        /// The string we were given
        version: String,
        /// What semver had to say about it
        #[source]
        details: semver::Error,
    },

    /// The configured release time wasn't RFC 3339
    #[error("failed to parse release time {stamp} as an RFC 3339 timestamp")]
    ReleaseTimeParse {
        /// The string we were given
        stamp: String,
        /// Parse failure details
        #[source]
        details: time::error::Parse,
    },

    /// A release timestamp refused to format
    #[error("failed to format the release timestamp")]
    TimestampFormat {
        /// Format failure details
        #[source]
        details: time::error::Format,
    },

    /// The source archive the pipeline depends on isn't there
    #[error("source archive {archive_name} not found at {archive_path}")]
    #[diagnostic(help("run `vmdist create-archive` to produce it"))]
    MissingSourceArchive {
        /// The deterministic archive file name
        archive_name: String,
        /// Where we expected to find it
        archive_path: camino::Utf8PathBuf,
    },

    /// Two matrix cells composed the same worker id, which would
    /// double-provision one machine name
    #[error("build matrix for {family} contains duplicate target id {id}")]
    DuplicateBuildTarget {
        /// The platform family whose matrix collided
        family: crate::platform::PlatformFamily,
        /// The colliding worker id
        id: String,
    },

    /// A manifest line wasn't KEY=VALUE
    #[error("failed to parse manifest line {line:?}")]
    #[diagnostic(help("manifest lines are KEY=VALUE"))]
    ManifestParse {
        /// The offending line
        line: String,
    },

    /// A quoted manifest list never closed its quote
    #[error("manifest value for {key} is missing its closing quote")]
    ManifestUnterminatedList {
        /// The key whose value ran off the end of the file
        key: String,
    },

    /// One or more workers failed, reported after every in-flight
    /// worker has finished
    #[error("{count} of {total} build targets failed: {failed}")]
    #[diagnostic(help("worker logs are above; fix the build and rerun the pipeline"))]
    WorkerBuildsFailed {
        /// How many targets failed
        count: usize,
        /// How many targets the matrix contained
        total: usize,
        /// Comma-separated failed worker ids
        failed: String,
    },
}
