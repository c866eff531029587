//! Tests for build manifest rendering, writing, and parsing

use camino::{Utf8Path, Utf8PathBuf};
use temp_dir::TempDir;

use super::mock::{test_release, TEST_PACKAGE};
use crate::errors::DistError;
use crate::manifest::{
    deb_manifest, rpm_manifest, BuildManifest, KEY_DEPENDED_PACKAGES, KEY_PACKAGE,
    KEY_SOURCE_ARCHIVE, KEY_VERSION,
};

fn deps(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

#[test]
fn rpm_manifest_renders_sourceable_keys() {
    let release = test_release(Utf8Path::new("/fake/root"));
    let manifest = rpm_manifest(&release, &deps(&["cmake", "pkg-config"]));
    assert_eq!(
        manifest.render(),
        "SOURCE_ARCHIVE=arrow-1.2.3.tar.gz\n\
         PACKAGE=arrow\n\
         VERSION=1.2.3\n\
         DEPENDED_PACKAGES=\"cmake\npkg-config\"\n"
    );
}

#[test]
fn deb_manifest_has_no_source_archive_key() {
    let release = test_release(Utf8Path::new("/fake/root"));
    let manifest = deb_manifest(&release, &deps(&["debhelper"]));
    assert_eq!(manifest.scalar(KEY_SOURCE_ARCHIVE), None);
    assert_eq!(manifest.scalar(KEY_PACKAGE), Some(TEST_PACKAGE));
}

#[test]
fn manifest_round_trips() {
    let release = test_release(Utf8Path::new("/fake/root"));
    let manifest = rpm_manifest(&release, &deps(&["cmake", "libtool", "pkg-config"]));
    let parsed = BuildManifest::parse(&manifest.render()).unwrap();
    assert_eq!(parsed.scalar(KEY_PACKAGE), Some("arrow"));
    assert_eq!(parsed.scalar(KEY_VERSION), Some("1.2.3"));
    assert_eq!(
        parsed.list(KEY_DEPENDED_PACKAGES),
        Some(deps(&["cmake", "libtool", "pkg-config"]).as_slice())
    );
    assert_eq!(parsed, manifest);
}

#[test]
fn empty_dependency_list_round_trips() {
    let release = test_release(Utf8Path::new("/fake/root"));
    let manifest = deb_manifest(&release, &[]);
    let parsed = BuildManifest::parse(&manifest.render()).unwrap();
    assert_eq!(parsed.list(KEY_DEPENDED_PACKAGES).map(<[String]>::len), Some(0));
}

#[test]
fn single_dependency_round_trips() {
    let release = test_release(Utf8Path::new("/fake/root"));
    let manifest = deb_manifest(&release, &deps(&["debhelper"]));
    let parsed = BuildManifest::parse(&manifest.render()).unwrap();
    assert_eq!(
        parsed.list(KEY_DEPENDED_PACKAGES),
        Some(deps(&["debhelper"]).as_slice())
    );
}

#[test]
fn keyless_line_is_a_parse_error() {
    let result = BuildManifest::parse("PACKAGE=arrow\nnot a manifest line\n");
    assert!(matches!(result, Err(DistError::ManifestParse { .. })));
}

#[test]
fn unterminated_list_is_a_parse_error() {
    let result = BuildManifest::parse("DEPENDED_PACKAGES=\"cmake\nlibtool\n");
    assert!(matches!(
        result,
        Err(DistError::ManifestUnterminatedList { .. })
    ));
}

#[test]
fn write_overwrites_whatever_was_there() {
    let dir = TempDir::new().unwrap();
    let root = Utf8PathBuf::from_path_buf(dir.path().to_owned()).unwrap();
    let dest = root.join("env.sh");
    std::fs::write(&dest, "LEFTOVER=from a previous run\n").unwrap();

    let release = test_release(&root);
    let manifest = deb_manifest(&release, &deps(&["debhelper"]));
    manifest.write(&dest).unwrap();

    let written = std::fs::read_to_string(&dest).unwrap();
    assert_eq!(written, manifest.render());
    assert!(!written.contains("LEFTOVER"));
}
