//! Environment passing between this tool and nested builds.
//!
//! Two mechanisms live here:
//!
//! - [`EnvOverlay`]: extra variables applied to a single child process, on
//!   top of the inherited environment. The tool never writes into its own
//!   process environment.
//! - [`EnvFileStore`]: variables persisted as files under `<build root>/_env`
//!   and mirrored into the vcpkg tree, because the CMake runs nested inside
//!   vcpkg cannot see anything this process exports.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Per-invocation environment additions.
#[derive(Debug, Clone, Default)]
pub struct EnvOverlay {
    vars: BTreeMap<String, String>,
}

impl EnvOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.vars.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Pairs in a shape `Command::envs` accepts directly.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for EnvOverlay {
    fn from_iter<T: IntoIterator<Item = (&'a str, &'a str)>>(iter: T) -> Self {
        let mut overlay = EnvOverlay::new();
        for (name, value) in iter {
            overlay.set(name, value);
        }
        overlay
    }
}

/// One variable per file, stored as `<root>/<NAME>.txt` with the raw value
/// as the entire file content.
#[derive(Debug, Clone)]
pub struct EnvFileStore {
    root: PathBuf,
}

impl EnvFileStore {
    pub fn new(build_root: &Path) -> Self {
        Self {
            root: build_root.join("_env"),
        }
    }

    fn var_file(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}.txt", name))
    }

    /// Overwrites the variable with exactly `value`. No newline is appended.
    pub fn write_var(&self, name: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.root)
            .with_context(|| format!("Failed to create {}", self.root.display()))?;
        let file = self.var_file(name);
        fs::write(&file, value)
            .with_context(|| format!("Failed to store {} in {}", name, file.display()))
    }

    /// Returns the stored value byte for byte.
    pub fn read_var(&self, name: &str) -> Result<String> {
        let file = self.var_file(name);
        fs::read_to_string(&file)
            .with_context(|| format!("Failed to read {} from {}", name, file.display()))
    }

    /// Replaces `dest` with a full copy of the store. The replace is
    /// delete-then-copy, not atomic: an interruption leaves a partial tree
    /// until the next run replaces it again.
    pub fn mirror_to(&self, dest: &Path) -> Result<()> {
        fs::create_dir_all(&self.root)
            .with_context(|| format!("Failed to create {}", self.root.display()))?;
        if dest.exists() {
            fs::remove_dir_all(dest)
                .with_context(|| format!("Failed to remove {}", dest.display()))?;
        }
        copy_dir_all(&self.root, dest)
            .with_context(|| format!("Failed to mirror {} to {}", self.root.display(), dest.display()))
    }
}

/// Recursive directory copy. Creates `dst` and all parents.
pub(crate) fn copy_dir_all(src: &Path, dst: &Path) -> Result<()> {
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let ty = entry.file_type()?;
        if ty.is_dir() {
            copy_dir_all(&entry.path(), &dst.join(entry.file_name()))?;
        } else {
            fs::copy(entry.path(), dst.join(entry.file_name()))?;
        }
    }
    Ok(())
}
