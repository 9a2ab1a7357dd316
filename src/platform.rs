//! Host platform detection and the per-platform bootstrap table.
//!
//! The host is classified exactly once at startup into a closed set of
//! variants; everything downstream works from the resolved [`PlatformSpec`]
//! record and never probes the OS again.

use std::fs;

/// vcpkg triplet used for the Android client build.
pub const ANDROID_TRIPLET: &str = "arm64-android";

/// Supported build hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostPlatform {
    Windows,
    MacOs,
    /// Any Linux that builds vcpkg from source.
    LinuxDefault,
    /// Debian 9 hosts, which cannot build vcpkg and receive a prebuilt
    /// archive instead.
    LinuxLegacy,
}

/// How the vcpkg tree is obtained when a bootstrap is needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStrategy {
    /// Clone the upstream repository and run its bootstrap script.
    SourceBuild,
    /// Download and unpack a prebuilt archive.
    Prebuilt {
        url: &'static str,
        sha512: &'static str,
    },
}

/// Resolved per-platform data. Plain values only, so the rest of the tool
/// stays free of platform switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformSpec {
    /// File name of the vcpkg executable inside the tree.
    pub exe_name: &'static str,
    /// File name of the bootstrap script shipped by vcpkg.
    pub bootstrap_script: &'static str,
    /// Triplet the build host compiles tools for.
    pub host_triplet: &'static str,
    /// Extra environment applied while the bootstrap script runs.
    pub bootstrap_env: &'static [(&'static str, &'static str)],
    pub fetch: FetchStrategy,
}

const LINUX_PREBUILT_URL: &str =
    "https://cdn.tivolicloud.com/dependencies/vcpkg/vcpkg-linux-client.tar";
const LINUX_PREBUILT_SHA512: &str = "6a1ce47ef6621e699a4627e8821ad32528c82fce62a6939d35b205da2d299aaa405b5f392df4a9e5343dd6a296516e341105fbb2dd8b48864781d129d7fba10d";

impl HostPlatform {
    /// Classify the machine this process runs on.
    pub fn detect() -> Self {
        if cfg!(target_os = "windows") {
            HostPlatform::Windows
        } else if cfg!(target_os = "macos") {
            HostPlatform::MacOs
        } else {
            classify_linux(&fs::read_to_string("/etc/issue").unwrap_or_default())
        }
    }

    pub fn spec(self) -> PlatformSpec {
        match self {
            HostPlatform::Windows => PlatformSpec {
                exe_name: "vcpkg.exe",
                bootstrap_script: "bootstrap-vcpkg.bat",
                host_triplet: "x64-windows",
                bootstrap_env: &[],
                fetch: FetchStrategy::SourceBuild,
            },
            HostPlatform::MacOs => PlatformSpec {
                exe_name: "vcpkg",
                bootstrap_script: "bootstrap-vcpkg.sh",
                host_triplet: "x64-osx",
                bootstrap_env: &[("MACOSX_DEPLOYMENT_TARGET", "10.15")],
                fetch: FetchStrategy::SourceBuild,
            },
            HostPlatform::LinuxDefault => PlatformSpec {
                exe_name: "vcpkg",
                bootstrap_script: "bootstrap-vcpkg.sh",
                host_triplet: "x64-linux",
                bootstrap_env: &[],
                fetch: FetchStrategy::SourceBuild,
            },
            HostPlatform::LinuxLegacy => PlatformSpec {
                exe_name: "vcpkg",
                bootstrap_script: "bootstrap-vcpkg.sh",
                host_triplet: "x64-linux",
                bootstrap_env: &[],
                fetch: FetchStrategy::Prebuilt {
                    url: LINUX_PREBUILT_URL,
                    sha512: LINUX_PREBUILT_SHA512,
                },
            },
        }
    }
}

/// Distros are told apart by the first line of `/etc/issue`.
fn classify_linux(issue: &str) -> HostPlatform {
    if issue.starts_with("Debian GNU/Linux 9") {
        HostPlatform::LinuxLegacy
    } else {
        HostPlatform::LinuxDefault
    }
}
