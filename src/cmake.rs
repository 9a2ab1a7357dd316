//! Generation of the `vcpkg.cmake` include consumed by the outer build.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Everything the generated file embeds.
#[derive(Debug, Clone)]
pub struct ConfigParams {
    /// The vcpkg CMake toolchain file inside the managed tree.
    pub toolchain_file: PathBuf,
    /// Install root for the target triplet.
    pub install_root: PathBuf,
    /// Tools directory for the host triplet.
    pub tools_dir: PathBuf,
    /// Absolute path of the prebuilt android binaries; present only for
    /// android output, which also drops the staleness guard.
    pub android_precompiled: Option<PathBuf>,
}

/// Aborts a configure run whose cached toolchain file no longer matches the
/// one this tool computed.
const STALENESS_GUARD: &str = r#"if(NOT (CMAKE_TOOLCHAIN_FILE_UNCACHED STREQUAL CMAKE_TOOLCHAIN_FILE))
    message(FATAL_ERROR "CMAKE_TOOLCHAIN_FILE has changed, please wipe the build directory and rerun cmake")
endif()
"#;

/// Render the file content. All backslashes are normalized to forward
/// slashes so Windows paths embed portably.
pub fn render(params: &ConfigParams) -> String {
    let mut out = format!(
        r#"# this file auto-generated by prebuild
get_filename_component(CMAKE_TOOLCHAIN_FILE "{toolchain}" ABSOLUTE CACHE)
get_filename_component(CMAKE_TOOLCHAIN_FILE_UNCACHED "{toolchain}" ABSOLUTE)
set(VCPKG_INSTALL_ROOT "{install}")
set(VCPKG_TOOLS_DIR "{tools}")
"#,
        toolchain = params.toolchain_file.display(),
        install = params.install_root.display(),
        tools = params.tools_dir.display(),
    );

    match &params.android_precompiled {
        Some(precompiled) => out.push_str(&format!(
            "set(HIFI_ANDROID_PRECOMPILED \"{}\")\n",
            precompiled.display()
        )),
        None => out.push_str(STALENESS_GUARD),
    }

    out.replace('\\', "/")
}

/// Write the rendered config as `<build root>/vcpkg.cmake`.
pub fn write_config(build_root: &Path, params: &ConfigParams) -> Result<PathBuf> {
    fs::create_dir_all(build_root)
        .with_context(|| format!("Failed to create {}", build_root.display()))?;
    let path = build_root.join("vcpkg.cmake");
    fs::write(&path, render(params))
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}
