//! Prebuilt android dependencies.
//!
//! The android client does not build its native dependencies on the device
//! toolchain; it unpacks a prebuilt vcpkg bundle plus a set of per-package
//! archives described by an external JSON manifest.

use crate::download;
use crate::platform::ANDROID_TRIPLET;
use anyhow::{Context, Result};
use colored::*;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub const PREBUILT_BUNDLE_URL: &str =
    "https://cdn.tivolicloud.com/dependencies/vcpkg/vcpkg-arm64-android.tar.gz";

/// Recorded digest of the prebuilt bundle. Kept on file even while
/// verification for it is switched off below.
pub const PREBUILT_BUNDLE_SHA512: &str = "832f82a4d090046bdec25d313e20f56ead45b54dd06eee3798c5c8cbdd64cce4067692b1c3f26a89afe6ff9917c10e4b601c118bea06d23f8adbfe5c0ec12bc3";

/// Archives whose published checksums intermittently mismatch a fresh
/// download even though the same file hashes clean afterwards. Verification
/// is skipped for these names only.
const CHECKSUM_DISABLED: &[&str] = &["vcpkg-arm64-android.tar.gz"];

pub fn checksum_disabled(file: &str) -> bool {
    CHECKSUM_DISABLED.contains(&file)
}

/// External description of the prebuilt android packages.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageManifest {
    pub base_url: String,
    pub packages: BTreeMap<String, AndroidPackage>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AndroidPackage {
    /// Archive file name; also selects the extraction method.
    pub file: String,
    /// Full download URL, overriding `baseUrl` + `file`.
    #[serde(default)]
    pub url: Option<String>,
    /// S3 object version pin, appended as a query parameter.
    #[serde(default)]
    pub version_id: Option<String>,
    /// SHA512 hex digest; verified when present.
    #[serde(default)]
    pub checksum: Option<String>,
}

impl PackageManifest {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read package manifest {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Invalid package manifest {}", path.display()))
    }

    pub fn package_url(&self, package: &AndroidPackage) -> String {
        let mut url = match &package.url {
            Some(url) => url.clone(),
            None => format!("{}/{}", self.base_url.trim_end_matches('/'), package.file),
        };
        if let Some(version) = &package.version_id {
            url.push_str("?versionId=");
            url.push_str(version);
        }
        url
    }
}

/// Unpack the prebuilt arm64 vcpkg bundle into `<vcpkg path>/installed`
/// unless that triplet is already present.
pub fn ensure_prebuilt_bundle(vcpkg_path: &Path) -> Result<()> {
    let installed = vcpkg_path.join("installed");
    if installed.join(ANDROID_TRIPLET).is_dir() {
        println!(
            "   {} Prebuilt {} bundle already installed",
            "⚡".green(),
            ANDROID_TRIPLET
        );
        return Ok(());
    }

    println!("{} Installing the prebuilt android bundle...", "📦".blue());
    let file = PREBUILT_BUNDLE_URL.rsplit('/').next().unwrap_or_default();
    let sha512 = (!checksum_disabled(file)).then_some(PREBUILT_BUNDLE_SHA512);
    download::download_and_extract(PREBUILT_BUNDLE_URL, &installed, sha512)
}

/// Install every manifest package under `dest_root`. A package whose
/// directory already exists is skipped; presence of the directory is the
/// only install marker.
pub fn install_packages(manifest: &PackageManifest, dest_root: &Path) -> Result<()> {
    for (name, package) in &manifest.packages {
        let dest = dest_root.join(name);
        if dest.is_dir() {
            println!("   {} {} already present", "⚡".green(), name);
            continue;
        }

        println!("   {} Installing {} ({})", "📦".blue(), name.bold(), package.file);
        let sha512 = if checksum_disabled(&package.file) {
            None
        } else {
            package.checksum.as_deref()
        };
        // The URL may point at an opaque path; `file` names the archive.
        download::download_and_extract_as(
            &manifest.package_url(package),
            &dest,
            &package.file,
            sha512,
        )
        .with_context(|| format!("Failed to install android package {}", name))?;
    }
    Ok(())
}
