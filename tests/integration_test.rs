//! Integration tests for the setup workflow
//!
//! These tests drive the library against seeded temporary vcpkg trees, so
//! no network or git access is needed, plus a couple of smoke tests against
//! the compiled binary.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tivoli_prebuild::config::{EnvOverrides, SetupOptions};
use tivoli_prebuild::platform::HostPlatform;
use tivoli_prebuild::vcpkg::{VcpkgRepo, resolve_install_dir};

/// Lay out a tree that already looks bootstrapped: executable plus the
/// root marker, so ensure_installed decides against fetching.
fn seed_bootstrapped_tree(path: &Path, exe_name: &str) {
    fs::create_dir_all(path).unwrap();
    fs::write(path.join(exe_name), "fake binary").unwrap();
    fs::write(path.join(".vcpkg-root"), "").unwrap();
}

fn options_in(dir: &Path) -> SetupOptions {
    SetupOptions {
        build_root: dir.join("build"),
        ports_path: dir.join("ports-src"),
        vcpkg_root: Some(dir.join("tree")),
        ..Default::default()
    }
}

#[test]
fn test_ensure_installed_is_idempotent_and_refreshes_ports() {
    let dir = tempfile::tempdir().unwrap();
    let options = options_in(dir.path());
    let ports_src = options.ports_path.clone();
    fs::create_dir_all(ports_src.join("zlib")).unwrap();
    fs::write(ports_src.join("zlib/portfile.cmake"), "v1").unwrap();

    // The legacy variant never runs git or a bootstrap script when the tree
    // is already healthy, which keeps this test offline.
    let repo = VcpkgRepo::with_platform(
        options,
        &EnvOverrides::default(),
        HostPlatform::LinuxLegacy,
    )
    .unwrap();
    seed_bootstrapped_tree(repo.path(), "vcpkg");

    repo.ensure_installed().unwrap();
    let overlaid = repo.path().join("ports").join("zlib").join("portfile.cmake");
    assert_eq!(fs::read_to_string(&overlaid).unwrap(), "v1");

    // Second run: still no fetch, but the overlay is refreshed.
    fs::write(ports_src.join("zlib/portfile.cmake"), "v2").unwrap();
    repo.ensure_installed().unwrap();
    assert_eq!(fs::read_to_string(&overlaid).unwrap(), "v2");

    // The fake executable must have survived both runs untouched.
    assert_eq!(
        fs::read_to_string(repo.path().join("vcpkg")).unwrap(),
        "fake binary"
    );
    assert!(!repo.lock_file().exists());
}

#[test]
fn test_desktop_config_output() {
    let dir = tempfile::tempdir().unwrap();
    let options = options_in(dir.path());
    let build_root = options.build_root.clone();

    let repo = VcpkgRepo::with_platform(
        options,
        &EnvOverrides::default(),
        HostPlatform::LinuxDefault,
    )
    .unwrap();
    assert_eq!(repo.host_triplet(), "x64-linux");
    assert_eq!(repo.target_triplet(), "x64-linux");

    repo.write_config().unwrap();
    let content = fs::read_to_string(build_root.join("vcpkg.cmake")).unwrap();

    // The emitted file always uses forward slashes, so compare against a
    // normalized root.
    let root = repo.path().display().to_string().replace('\\', "/");
    let toolchain = format!("{root}/scripts/buildsystems/vcpkg.cmake");
    assert_eq!(content.matches(toolchain.as_str()).count(), 2);
    assert_eq!(
        content
            .matches(&format!("{root}/installed/x64-linux\""))
            .count(),
        1
    );
    assert_eq!(
        content
            .matches(&format!("{root}/installed/x64-linux/tools\""))
            .count(),
        1
    );
    assert!(content.contains("FATAL_ERROR"));
    assert!(!content.contains('\\'));
    assert!(!content.contains("HIFI_ANDROID_PRECOMPILED"));
}

#[test]
fn test_android_config_output() {
    let dir = tempfile::tempdir().unwrap();
    let mut options = options_in(dir.path());
    options.android = true;
    options.android_packages = Some(dir.path().join("packages.json"));
    let build_root = options.build_root.clone();

    let repo = VcpkgRepo::with_platform(
        options,
        &EnvOverrides::default(),
        HostPlatform::LinuxDefault,
    )
    .unwrap();
    assert_eq!(repo.host_triplet(), "x64-linux");
    assert_eq!(repo.target_triplet(), "arm64-android");

    repo.write_config().unwrap();
    let content = fs::read_to_string(build_root.join("vcpkg.cmake")).unwrap();

    assert!(content.contains("set(HIFI_ANDROID_PRECOMPILED \""));
    assert!(content.contains("installed/arm64-android\""));
    assert!(content.contains("installed/x64-linux/tools\""));
    assert!(!content.contains("FATAL_ERROR"));
    assert!(!content.contains('\\'));
}

#[test]
fn test_default_desktop_path_sits_under_home() {
    let Some(home) = dirs::home_dir() else {
        eprintln!("Skipping test: no home directory");
        return;
    };

    let path = resolve_install_dir(&SetupOptions::default(), &EnvOverrides::default()).unwrap();
    assert_eq!(path, home.join("tivoli").join("vcpkg").join("desktop"));

    let android = SetupOptions {
        android: true,
        ..Default::default()
    };
    let android_path = resolve_install_dir(&android, &EnvOverrides::default()).unwrap();
    assert_eq!(android_path, home.join("tivoli").join("vcpkg").join("android"));
}

/// Stand-in vcpkg executable that records the environment it was handed and
/// succeeds.
#[cfg(unix)]
fn seed_fake_vcpkg(path: &Path) {
    use std::os::unix::fs::PermissionsExt;

    let exe = path.join("vcpkg");
    fs::write(
        &exe,
        "#!/bin/sh\nprintf '%s' \"$QT_CMAKE_PREFIX_PATH\" > seen-env.txt\nexit 0\n",
    )
    .unwrap();
    fs::set_permissions(&exe, fs::Permissions::from_mode(0o755)).unwrap();
}

#[cfg(unix)]
#[test]
fn test_install_dependencies_records_qt_hint() {
    let dir = tempfile::tempdir().unwrap();
    let mut options = options_in(dir.path());
    let qt = dir.path().join("qt-prefix");
    options.qt_path = Some(qt.clone());
    let build_root = options.build_root.clone();

    let repo = VcpkgRepo::with_platform(
        options,
        &EnvOverrides::default(),
        HostPlatform::LinuxDefault,
    )
    .unwrap();
    seed_fake_vcpkg(repo.path());

    repo.install_dependencies().unwrap();

    // The hint lands in the build-root store, in the mirrored copy inside
    // the tree, and in the environment the manager was invoked with.
    let value = qt.to_string_lossy().into_owned();
    assert_eq!(
        fs::read_to_string(build_root.join("_env").join("QT_CMAKE_PREFIX_PATH.txt")).unwrap(),
        value
    );
    assert_eq!(
        fs::read_to_string(repo.path().join("_env").join("QT_CMAKE_PREFIX_PATH.txt")).unwrap(),
        value
    );
    assert_eq!(
        fs::read_to_string(repo.path().join("seen-env.txt")).unwrap(),
        value
    );
}

#[cfg(unix)]
#[test]
fn test_install_dependencies_without_hint_writes_no_qt_var() {
    let dir = tempfile::tempdir().unwrap();
    let options = options_in(dir.path());
    let build_root = options.build_root.clone();

    let repo = VcpkgRepo::with_platform(
        options,
        &EnvOverrides::default(),
        HostPlatform::LinuxDefault,
    )
    .unwrap();
    seed_fake_vcpkg(repo.path());

    repo.install_dependencies().unwrap();

    assert!(
        !build_root
            .join("_env")
            .join("QT_CMAKE_PREFIX_PATH.txt")
            .exists()
    );
    assert!(
        !repo
            .path()
            .join("_env")
            .join("QT_CMAKE_PREFIX_PATH.txt")
            .exists()
    );
    // Both install invocations still ran.
    assert!(repo.path().join("seen-env.txt").exists());
}

/// Get the path to the prebuild binary
fn get_prebuild_binary() -> PathBuf {
    let target_dir = std::env::var_os("CARGO_TARGET_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("target"));

    let bin_name = if cfg!(windows) {
        "prebuild.exe"
    } else {
        "prebuild"
    };
    target_dir.join("debug").join(bin_name)
}

#[test]
fn test_completion_generation() {
    let prebuild = get_prebuild_binary();
    if !prebuild.exists() {
        eprintln!("Skipping test: prebuild binary not found at {:?}", prebuild);
        return;
    }

    let output = Command::new(&prebuild)
        .args(["completion", "bash"])
        .output()
        .expect("Failed to execute prebuild completion");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("prebuild"));
}

#[test]
fn test_setup_requires_android_manifest() {
    let prebuild = get_prebuild_binary();
    if !prebuild.exists() {
        eprintln!("Skipping test: prebuild binary not found at {:?}", prebuild);
        return;
    }

    let output = Command::new(&prebuild)
        .args(["setup", "--android"])
        .output()
        .expect("Failed to execute prebuild setup");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--android-packages"));
}

#[test]
fn test_clean_without_tree_reports_and_creates_nothing() {
    let prebuild = get_prebuild_binary();
    if !prebuild.exists() {
        eprintln!("Skipping test: prebuild binary not found at {:?}", prebuild);
        return;
    }

    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("never-created");

    let output = Command::new(&prebuild)
        .args(["clean", "--vcpkg-root"])
        .arg(&target)
        .env_remove("HIFI_VCPKG_PATH")
        .output()
        .expect("Failed to execute prebuild clean");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Nothing to clean"));
    assert!(!target.exists());
}
