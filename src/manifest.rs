//! Producing (and parsing) the build manifests workers consume
//!
//! A manifest is a line-oriented `KEY=VALUE` file, sourceable by the
//! worker's provisioning shell. The dependency list is one key whose
//! value is a double-quoted, newline-joined block. Each invocation
//! overwrites the manifest unconditionally; there are no merge
//! semantics, which is what keeps reruns idempotent.

use std::fmt::Write as _;

use axoasset::LocalAsset;
use camino::{Utf8Path, Utf8PathBuf};
use tracing::info;

use crate::errors::{DistError, DistResult};
use crate::tasks::PackageRelease;

/// Manifest key for the source archive file name (RPM family only)
pub const KEY_SOURCE_ARCHIVE: &str = "SOURCE_ARCHIVE";
/// Manifest key for the package name
pub const KEY_PACKAGE: &str = "PACKAGE";
/// Manifest key for the upstream version
pub const KEY_VERSION: &str = "VERSION";
/// Manifest key for the dependency list
pub const KEY_DEPENDED_PACKAGES: &str = "DEPENDED_PACKAGES";

/// A manifest value: a plain scalar or an ordered list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestValue {
    /// A single-line value
    Scalar(String),
    /// An ordered list, rendered as a quoted newline-joined block
    List(Vec<String>),
}

/// Build parameters handed to a worker, as ordered key/value pairs
///
/// Order is preserved so the written file is byte-for-byte reproducible.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildManifest {
    entries: Vec<(String, ManifestValue)>,
}

impl BuildManifest {
    /// An empty manifest
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a scalar entry
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.entries
            .push((key.to_owned(), ManifestValue::Scalar(value.into())));
    }

    /// Append a list entry
    pub fn set_list(&mut self, key: &str, values: impl IntoIterator<Item = String>) {
        self.entries.push((
            key.to_owned(),
            ManifestValue::List(values.into_iter().collect()),
        ));
    }

    /// Look up a scalar entry
    pub fn scalar(&self, key: &str) -> Option<&str> {
        self.entries.iter().find_map(|(k, v)| match v {
            ManifestValue::Scalar(value) if k == key => Some(value.as_str()),
            _ => None,
        })
    }

    /// Look up a list entry
    pub fn list(&self, key: &str) -> Option<&[String]> {
        self.entries.iter().find_map(|(k, v)| match v {
            ManifestValue::List(values) if k == key => Some(values.as_slice()),
            _ => None,
        })
    }

    /// Render the manifest to its on-disk form
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.entries {
            match value {
                ManifestValue::Scalar(value) => {
                    writeln!(out, "{key}={value}").unwrap();
                }
                ManifestValue::List(values) => {
                    writeln!(out, "{key}=\"{}\"", values.join("\n")).unwrap();
                }
            }
        }
        out
    }

    /// Write the manifest, overwriting anything already at `dest`
    pub fn write(&self, dest: &Utf8Path) -> DistResult<Utf8PathBuf> {
        let path = LocalAsset::write_new_all(&self.render(), dest)?;
        info!("wrote build manifest to {path}");
        Ok(path)
    }

    /// Parse a rendered manifest back into entries
    pub fn parse(text: &str) -> DistResult<Self> {
        let mut manifest = BuildManifest::new();
        let mut lines = text.lines();
        while let Some(line) = lines.next() {
            if line.is_empty() {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(DistError::ManifestParse {
                    line: line.to_owned(),
                });
            };
            let Some(quoted) = value.strip_prefix('"') else {
                manifest.set(key, value);
                continue;
            };
            let mut items = vec![];
            if let Some(only) = quoted.strip_suffix('"') {
                if !only.is_empty() {
                    items.push(only.to_owned());
                }
            } else {
                items.push(quoted.to_owned());
                loop {
                    let Some(next) = lines.next() else {
                        return Err(DistError::ManifestUnterminatedList {
                            key: key.to_owned(),
                        });
                    };
                    if let Some(last) = next.strip_suffix('"') {
                        items.push(last.to_owned());
                        break;
                    }
                    items.push(next.to_owned());
                }
            }
            manifest.set_list(key, items);
        }
        Ok(manifest)
    }
}

/// The manifest the RPM pipeline's workers source
pub fn rpm_manifest(release: &PackageRelease, depends: &[String]) -> BuildManifest {
    let mut manifest = BuildManifest::new();
    manifest.set(KEY_SOURCE_ARCHIVE, release.archive_name.as_str());
    manifest.set(KEY_PACKAGE, release.name.as_str());
    manifest.set(KEY_VERSION, release.version.to_string());
    manifest.set_list(KEY_DEPENDED_PACKAGES, depends.iter().cloned());
    manifest
}

/// The manifest the DEB pipeline's workers source
pub fn deb_manifest(release: &PackageRelease, depends: &[String]) -> BuildManifest {
    let mut manifest = BuildManifest::new();
    manifest.set(KEY_PACKAGE, release.name.as_str());
    manifest.set(KEY_VERSION, release.version.to_string());
    manifest.set_list(KEY_DEPENDED_PACKAGES, depends.iter().cloned());
    manifest
}
