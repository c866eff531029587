//! Tests for config resolution

use time::macros::datetime;

use super::mock::FakeVcs;
use crate::config::{Config, ConfigArgs, ENV_PACKAGE, ENV_PARALLEL, ENV_VERSION};
use crate::errors::DistError;
use crate::SortedMap;

fn env(pairs: &[(&str, &str)]) -> SortedMap<String, String> {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

fn base_args() -> ConfigArgs {
    ConfigArgs {
        package: Some("arrow".to_owned()),
        version: Some("1.2.3".to_owned()),
        release_time: Some("2017-03-01T10:30:00Z".to_owned()),
        ..Default::default()
    }
}

#[test]
fn missing_package_name_is_fatal() {
    let args = ConfigArgs {
        package: None,
        ..base_args()
    };
    let result = Config::resolve(args, &env(&[]), &FakeVcs::default());
    assert!(matches!(result, Err(DistError::MissingPackageName)));
}

#[test]
fn missing_version_is_fatal() {
    let args = ConfigArgs {
        version: None,
        ..base_args()
    };
    let result = Config::resolve(args, &env(&[]), &FakeVcs::default());
    assert!(matches!(result, Err(DistError::MissingVersion)));
}

#[test]
fn package_and_version_fall_back_to_the_env_snapshot() {
    let args = ConfigArgs {
        package: None,
        version: None,
        ..base_args()
    };
    let env = env(&[(ENV_PACKAGE, "arrow"), (ENV_VERSION, "2.0.0")]);
    let config = Config::resolve(args, &env, &FakeVcs::default()).unwrap();
    assert_eq!(config.package, "arrow");
    assert_eq!(config.version.to_string(), "2.0.0");
}

#[test]
fn non_semver_version_is_fatal() {
    let args = ConfigArgs {
        version: Some("one point two".to_owned()),
        ..base_args()
    };
    let result = Config::resolve(args, &env(&[]), &FakeVcs::default());
    assert!(matches!(result, Err(DistError::VersionParse { .. })));
}

#[test]
fn parallel_env_switch_means_yes_exactly() {
    let on = Config::resolve(base_args(), &env(&[(ENV_PARALLEL, "yes")]), &FakeVcs::default())
        .unwrap();
    assert!(on.parallel);

    let off = Config::resolve(base_args(), &env(&[(ENV_PARALLEL, "1")]), &FakeVcs::default())
        .unwrap();
    assert!(!off.parallel);
}

#[test]
fn packager_overrides_beat_version_control() {
    let vcs = FakeVcs {
        name: Some("Git Name".to_owned()),
        email: Some("git@example.com".to_owned()),
        ..Default::default()
    };
    let env = env(&[
        ("DEBFULLNAME", "Deb Name"),
        ("NAME", "Plain Name"),
        ("EMAIL", "plain@example.com"),
    ]);
    let config = Config::resolve(base_args(), &env, &vcs).unwrap();
    assert_eq!(config.packager.name, "Deb Name");
    assert_eq!(config.packager.email, "plain@example.com");
}

#[test]
fn version_control_identity_is_the_last_fallback() {
    let vcs = FakeVcs {
        name: Some("Git Name".to_owned()),
        email: Some("git@example.com".to_owned()),
        ..Default::default()
    };
    let config = Config::resolve(base_args(), &env(&[]), &vcs).unwrap();
    assert_eq!(config.packager.name, "Git Name");
    assert_eq!(config.packager.email, "git@example.com");
}

#[test]
fn unset_identity_is_empty_strings_not_an_error() {
    let config = Config::resolve(base_args(), &env(&[]), &FakeVcs::default()).unwrap();
    assert_eq!(config.packager.name, "");
    assert_eq!(config.packager.email, "");
}

#[test]
fn release_time_falls_back_to_the_latest_commit() {
    let vcs = FakeVcs {
        commit_time: Some(datetime!(2017-03-01 19:30 +9)),
        ..Default::default()
    };
    let args = ConfigArgs {
        release_time: None,
        ..base_args()
    };
    let config = Config::resolve(args, &env(&[]), &vcs).unwrap();
    // normalized to UTC
    assert_eq!(config.release_time, datetime!(2017-03-01 10:30 UTC));
}

#[test]
fn explicit_release_time_wins() {
    let vcs = FakeVcs {
        commit_time: Some(datetime!(2001-01-01 0:00 UTC)),
        ..Default::default()
    };
    let config = Config::resolve(base_args(), &env(&[]), &vcs).unwrap();
    assert_eq!(config.release_time, datetime!(2017-03-01 10:30 UTC));
}

#[test]
fn garbage_release_time_is_fatal() {
    let args = ConfigArgs {
        release_time: Some("yesterday".to_owned()),
        ..base_args()
    };
    let result = Config::resolve(args, &env(&[]), &FakeVcs::default());
    assert!(matches!(result, Err(DistError::ReleaseTimeParse { .. })));
}
