//! Run configuration.

use std::path::PathBuf;

/// Everything a setup run needs, parsed from the command line.
#[derive(Debug, Clone, Default)]
pub struct SetupOptions {
    /// Target the android client instead of the desktop build.
    pub android: bool,
    /// Explicit vcpkg directory, overriding the computed default.
    pub vcpkg_root: Option<PathBuf>,
    /// Outer build directory receiving `vcpkg.cmake` and the `_env` store.
    pub build_root: PathBuf,
    /// Project port recipes overlaid onto the vcpkg tree.
    pub ports_path: PathBuf,
    /// JSON manifest of prebuilt android packages.
    pub android_packages: Option<PathBuf>,
    /// Qt prefix handed through to the nested builds.
    pub qt_path: Option<PathBuf>,
    pub force_bootstrap: bool,
    pub force_build: bool,
}

/// Overrides read from the process environment exactly once at startup.
/// Later code works from this record and never consults the environment;
/// a variable set to the empty string still counts as set.
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    /// `HIFI_VCPKG_PATH`: use this installation directory outright.
    pub vcpkg_path: Option<PathBuf>,
    /// `HIFI_VCPKG_BASE`: base directory for the computed default path.
    pub vcpkg_base: Option<PathBuf>,
    /// `HIFI_ANDROID_PRECOMPILED`: where android package archives unpack.
    pub android_precompiled: Option<PathBuf>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        Self {
            vcpkg_path: std::env::var_os("HIFI_VCPKG_PATH").map(PathBuf::from),
            vcpkg_base: std::env::var_os("HIFI_VCPKG_BASE").map(PathBuf::from),
            android_precompiled: std::env::var_os("HIFI_ANDROID_PRECOMPILED").map(PathBuf::from),
        }
    }
}
