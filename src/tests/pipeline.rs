//! End-to-end pipeline tests against a fake worker runtime

use camino::Utf8PathBuf;
use temp_dir::TempDir;

use super::mock::{test_config, test_packager, FakeRuntime};
use crate::errors::DistError;
use crate::platform::PlatformFamily;
use crate::tasks::{gather_pipeline, run_pipeline, PackageRelease};

fn temp_root() -> (TempDir, Utf8PathBuf) {
    let dir = TempDir::new().unwrap();
    let root = Utf8PathBuf::from_path_buf(dir.path().to_owned()).unwrap();
    (dir, root)
}

fn write(path: &Utf8PathBuf, contents: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

#[test]
fn rpm_pipeline_prepares_files_then_walks_the_matrix() {
    let (_dir, root) = temp_root();
    write(&root.join("arrow-1.2.3.tar.gz"), "not really a tarball");
    write(
        &root.join("yum").join("arrow.spec.in"),
        "Name: @PACKAGE@\nVersion: @VERSION@\nRelease: 1%{?dist}\n\n%changelog\n",
    );

    let mut config = test_config(&root);
    config.rpm_depends = vec!["cmake".to_owned(), "pkg-config".to_owned()];
    let release = PackageRelease::new(&config);
    let plan = gather_pipeline(&config, &release, PlatformFamily::Rpm).unwrap();

    let mut runtime = FakeRuntime::new();
    // the manifest and the rendered descriptor must both be on disk
    // before the first worker boots
    runtime.require_on_provision = vec![
        root.join("yum").join("env.sh"),
        root.join("yum").join("tmp").join("centos").join("arrow.spec"),
    ];

    let report = run_pipeline(&release, &plan, &runtime).unwrap();

    // concurrency disabled: centos-6 then centos-7, each immediately
    // followed by its own teardown
    assert_eq!(
        runtime.events(),
        [
            "destroy-all",
            "provision centos-6-x86_64",
            "build centos-6-x86_64",
            "destroy centos-6-x86_64",
            "provision centos-7-x86_64",
            "build centos-7-x86_64",
            "destroy centos-7-x86_64",
        ]
    );
    assert_eq!(report.family, PlatformFamily::Rpm);
    assert_eq!(report.targets.len(), 2);

    let manifest = std::fs::read_to_string(root.join("yum").join("env.sh")).unwrap();
    assert_eq!(
        manifest,
        "SOURCE_ARCHIVE=arrow-1.2.3.tar.gz\n\
         PACKAGE=arrow\n\
         VERSION=1.2.3\n\
         DEPENDED_PACKAGES=\"cmake\npkg-config\"\n"
    );

    let spec =
        std::fs::read_to_string(root.join("yum").join("tmp").join("centos").join("arrow.spec"))
            .unwrap();
    assert_eq!(
        spec,
        "Name: arrow\nVersion: 1.2.3\nRelease: 1%{?dist}\n\n%changelog\n"
    );

    // the archive rode along into the scratch workspace
    assert!(root
        .join("yum")
        .join("tmp")
        .join("arrow-1.2.3.tar.gz")
        .exists());
    assert!(root.join("yum").join("repositories").exists());
}

#[test]
fn deb_pipeline_copies_the_control_dir() {
    let (_dir, root) = temp_root();
    write(&root.join("arrow-1.2.3.tar.gz"), "not really a tarball");
    write(&root.join("debian").join("control"), "Source: arrow\n");

    let config = test_config(&root);
    let release = PackageRelease::new(&config);
    let plan = gather_pipeline(&config, &release, PlatformFamily::Deb).unwrap();

    let runtime = FakeRuntime::new();
    run_pipeline(&release, &plan, &runtime).unwrap();

    let control =
        std::fs::read_to_string(root.join("apt").join("tmp").join("debian").join("control"))
            .unwrap();
    assert_eq!(control, "Source: arrow\n");

    // no SOURCE_ARCHIVE key in the apt manifest
    let manifest = std::fs::read_to_string(root.join("apt").join("env.sh")).unwrap();
    assert!(!manifest.contains("SOURCE_ARCHIVE"));

    // all four deb targets ran
    let provisions = runtime
        .events()
        .iter()
        .filter(|event| event.starts_with("provision "))
        .count();
    assert_eq!(provisions, 4);
}

#[test]
fn missing_archive_aborts_before_anything_happens() {
    let (_dir, root) = temp_root();
    write(
        &root.join("yum").join("arrow.spec.in"),
        "Name: @PACKAGE@\n%changelog\n",
    );

    let config = test_config(&root);
    let release = PackageRelease::new(&config);
    let plan = gather_pipeline(&config, &release, PlatformFamily::Rpm).unwrap();

    let runtime = FakeRuntime::new();
    let result = run_pipeline(&release, &plan, &runtime);

    assert!(matches!(
        result,
        Err(DistError::MissingSourceArchive { .. })
    ));
    assert!(runtime.events().is_empty());
    assert!(!root.join("yum").join("env.sh").exists());
}

#[test]
fn scratch_workspace_is_reset_between_runs() {
    let (_dir, root) = temp_root();
    write(&root.join("arrow-1.2.3.tar.gz"), "not really a tarball");
    write(&root.join("debian").join("control"), "Source: arrow\n");
    write(
        &root.join("apt").join("tmp").join("stale.txt"),
        "leftover from a failed run",
    );

    let config = test_config(&root);
    let release = PackageRelease::new(&config);
    let plan = gather_pipeline(&config, &release, PlatformFamily::Deb).unwrap();

    run_pipeline(&release, &plan, &FakeRuntime::new()).unwrap();

    assert!(!root.join("apt").join("tmp").join("stale.txt").exists());
}

#[test]
fn parallel_config_selects_a_concurrent_collect_all_plan() {
    let (_dir, root) = temp_root();
    let mut config = test_config(&root);
    config.parallel = true;
    let release = PackageRelease::new(&config);
    let plan = gather_pipeline(&config, &release, PlatformFamily::Deb).unwrap();

    assert_eq!(
        plan.execution,
        crate::workers::ExecutionPolicy::Concurrent { max_workers: 4 }
    );
    assert_eq!(plan.failure, crate::workers::FailurePolicy::CollectAll);
}

#[test]
fn update_versions_touches_both_changelogs() {
    let (_dir, root) = temp_root();
    write(
        &root.join("yum").join("arrow.spec.in"),
        "Name: @PACKAGE@\nRelease: 4\n\n%changelog\n",
    );

    let config = test_config(&root);
    let updated = crate::do_update_versions(&config).unwrap();
    assert_eq!(
        updated,
        [
            root.join("debian").join("changelog"),
            root.join("yum").join("arrow.spec.in"),
        ]
    );

    let changelog = std::fs::read_to_string(root.join("debian").join("changelog")).unwrap();
    assert!(changelog.starts_with("arrow (1.2.3-1) unstable; urgency=low\n"));

    let spec = std::fs::read_to_string(root.join("yum").join("arrow.spec.in")).unwrap();
    assert!(spec.contains("Release: 1\n"));
    let stanza = crate::changelog::rpm_stanza(
        &PackageRelease::new(&config),
        &test_packager(),
    )
    .unwrap();
    assert!(spec.contains(&stanza));
}
