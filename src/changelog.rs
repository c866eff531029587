//! Version-bump mutations of the changelogs
//!
//! Two documents track releases: the Debian changelog (strictly
//! prepend-only -- everything that was there before stays byte-identical
//! below the new stanza) and the `%changelog` section of the RPM spec
//! template (append-under-heading, with the `Release:` counter reset
//! back to 1 for the new upstream version).

use axoasset::LocalAsset;
use camino::Utf8Path;
use time::format_description::well_known::Rfc2822;
use time::macros::format_description;
use tracing::info;

use crate::config::PackagerIdent;
use crate::errors::{DistError, DistResult};
use crate::tasks::PackageRelease;

/// The message every release stanza carries
pub const CHANGELOG_MESSAGE: &str = "New upstream release.";

/// The heading the RPM stanza is inserted under
const RPM_CHANGELOG_HEADING: &str = "%changelog";

/// The fresh Debian changelog stanza for this release
pub fn debian_stanza(release: &PackageRelease, packager: &PackagerIdent) -> DistResult<String> {
    let date = release
        .release_time
        .format(&Rfc2822)
        .map_err(|details| DistError::TimestampFormat { details })?;
    Ok(format!(
        "{} ({}) unstable; urgency=low\n\n  * {}\n\n -- {} <{}>  {}\n",
        release.name,
        release.package_version(),
        CHANGELOG_MESSAGE,
        packager.name,
        packager.email,
        date,
    ))
}

/// The fresh RPM `%changelog` stanza for this release
pub fn rpm_stanza(release: &PackageRelease, packager: &PackagerIdent) -> DistResult<String> {
    let format = format_description!("[weekday repr:short] [month repr:short] [day] [year]");
    let date = release
        .release_time
        .format(&format)
        .map_err(|details| DistError::TimestampFormat { details })?;
    Ok(format!(
        "* {} {} <{}> - {}\n- {}\n",
        date,
        packager.name,
        packager.email,
        release.package_version(),
        CHANGELOG_MESSAGE,
    ))
}

/// Prepend this release's stanza to the Debian changelog
///
/// The prior contents (if any) are preserved verbatim as a suffix.
pub fn prepend_debian_changelog(
    path: &Utf8Path,
    release: &PackageRelease,
    packager: &PackagerIdent,
) -> DistResult<()> {
    let prior = load_or_empty(path)?;
    let updated = format!("{}\n{}", debian_stanza(release, packager)?, prior);
    LocalAsset::write_new_all(&updated, path)?;
    info!("prepended release stanza to {path}");
    Ok(())
}

/// Insert this release's stanza under the spec template's `%changelog`
/// heading and reset the `Release:` field to 1
///
/// A template with no `%changelog` heading is left unchanged.
pub fn update_rpm_spec_template(
    path: &Utf8Path,
    release: &PackageRelease,
    packager: &PackagerIdent,
) -> DistResult<()> {
    let prior = load_or_empty(path)?;
    let stanza = rpm_stanza(release, packager)?;

    let mut updated = String::with_capacity(prior.len() + stanza.len() + 1);
    let mut inserted = false;
    for line in prior.split_inclusive('\n') {
        updated.push_str(line);
        if !inserted && line.trim_end() == RPM_CHANGELOG_HEADING {
            updated.push_str(&stanza);
            updated.push('\n');
            inserted = true;
        }
    }
    let updated = reset_release_field(&updated);

    LocalAsset::write_new_all(&updated, path)?;
    info!("inserted release stanza into {path}");
    Ok(())
}

/// Reset the first `Release:<ws><digits>` field to 1, keeping
/// whitespace and any trailing text (like `%{?dist}`) intact
fn reset_release_field(content: &str) -> String {
    let mut done = false;
    let mut out = String::with_capacity(content.len());
    for line in content.split_inclusive('\n') {
        if !done {
            if let Some(rest) = line.strip_prefix("Release:") {
                let ws_len = rest.len() - rest.trim_start().len();
                let (ws, tail) = rest.split_at(ws_len);
                let digits = tail.chars().take_while(|c| c.is_ascii_digit()).count();
                if ws_len > 0 && digits > 0 {
                    out.push_str("Release:");
                    out.push_str(ws);
                    out.push('1');
                    out.push_str(&tail[digits..]);
                    done = true;
                    continue;
                }
            }
        }
        out.push_str(line);
    }
    out
}

fn load_or_empty(path: &Utf8Path) -> DistResult<String> {
    if path.exists() {
        Ok(LocalAsset::load_string(path)?)
    } else {
        Ok(String::new())
    }
}
