//! Rendering templated package descriptors
//!
//! Descriptors (like an RPM spec file) are shipped as templates with
//! `@TOKEN@` placeholders. Rendering is an explicit token-to-value
//! substitution with a declared policy for everything else: an unmatched
//! token passes through verbatim. That's deliberate, not an error --
//! templates get rendered in multiple independent passes, each pass
//! filling in the tokens it knows about. Tokens never span lines.

use axoasset::LocalAsset;
use camino::{Utf8Path, Utf8PathBuf};
use tracing::info;

use crate::errors::DistResult;
use crate::tasks::PackageRelease;
use crate::SortedMap;

/// The character that brackets a template token
pub const TOKEN_DELIMITER: char = '@';

/// Token name for the package name
pub const TOKEN_PACKAGE: &str = "PACKAGE";
/// Token name for the upstream version
pub const TOKEN_VERSION: &str = "VERSION";

/// The token mapping a release provides to its descriptors
pub fn release_tokens(release: &PackageRelease) -> SortedMap<&'static str, String> {
    let mut tokens = SortedMap::new();
    tokens.insert(TOKEN_PACKAGE, release.name.clone());
    tokens.insert(TOKEN_VERSION, release.version.to_string());
    tokens
}

/// Substitute `@TOKEN@` placeholders in a template
///
/// Pure and repeatable: identical inputs always produce identical
/// output, and input with no recognized tokens comes back unchanged.
pub fn render(template: &str, tokens: &SortedMap<&str, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find(TOKEN_DELIMITER) {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find(|c| c == TOKEN_DELIMITER || c == '\n') {
            Some(end) if after[end..].starts_with(TOKEN_DELIMITER) => {
                let name = &after[..end];
                match tokens.get(name) {
                    Some(value) if !name.is_empty() => out.push_str(value),
                    _ => {
                        // unmatched token: emit it exactly as we found it
                        out.push(TOKEN_DELIMITER);
                        out.push_str(name);
                        out.push(TOKEN_DELIMITER);
                    }
                }
                rest = &after[end + 1..];
            }
            _ => {
                // no closing delimiter on this line, the '@' is literal
                out.push(TOKEN_DELIMITER);
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Render a template file to a fresh path, creating intermediate
/// directories as needed
pub fn render_file(
    template: &Utf8Path,
    dest: &Utf8Path,
    tokens: &SortedMap<&str, String>,
) -> DistResult<Utf8PathBuf> {
    let template_text = LocalAsset::load_string(template)?;
    let rendered = render(&template_text, tokens);
    let path = LocalAsset::write_new_all(&rendered, dest)?;
    info!("rendered package descriptor to {path}");
    Ok(path)
}
