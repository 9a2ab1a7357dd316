//! The managed vcpkg tree.
//!
//! One [`VcpkgRepo`] owns a complete per-flavor vcpkg installation: where it
//! lives, how it is bootstrapped, the project ports overlaid onto it, and the
//! dependency bundles installed into it. Construction resolves every path and
//! platform fact up front; the later steps only act on that state.

use crate::android;
use crate::cmake::{self, ConfigParams};
use crate::config::{EnvOverrides, SetupOptions};
use crate::download;
use crate::environment::{EnvFileStore, EnvOverlay, copy_dir_all};
use crate::platform::{ANDROID_TRIPLET, FetchStrategy, HostPlatform, PlatformSpec};
use anyhow::{Context, Result, bail};
use colored::*;
use git2::Repository;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

const VCPKG_GIT_URL: &str = "https://github.com/microsoft/vcpkg.git";

/// Installation-path precedence, first match wins: the environment override,
/// the explicit command-line root, then the per-flavor default under the
/// base directory. Purely computed; nothing is created.
pub fn resolve_install_dir(options: &SetupOptions, env: &EnvOverrides) -> Result<PathBuf> {
    if let Some(path) = &env.vcpkg_path {
        return Ok(path.clone());
    }
    if let Some(root) = &options.vcpkg_root {
        return Ok(root.clone());
    }
    let base = match &env.vcpkg_base {
        Some(base) => base.clone(),
        None => dirs::home_dir()
            .context("Could not find home directory")?
            .join("tivoli")
            .join("vcpkg"),
    };
    let flavor = if options.android { "android" } else { "desktop" };
    Ok(base.join(flavor))
}

pub struct VcpkgRepo {
    options: SetupOptions,
    platform: PlatformSpec,
    /// Root of the managed tree.
    path: PathBuf,
    /// Sibling `<path>.lock`. Computed for older tooling that looked for it;
    /// no lock is ever taken on it.
    lock_file: PathBuf,
    exe: PathBuf,
    bootstrap_script: PathBuf,
    target_triplet: &'static str,
    /// Where android package archives unpack. `None` for desktop runs.
    android_precompiled: Option<PathBuf>,
    env_store: EnvFileStore,
}

impl VcpkgRepo {
    pub fn new(options: SetupOptions, env: &EnvOverrides) -> Result<Self> {
        Self::with_platform(options, env, HostPlatform::detect())
    }

    /// Constructor with the host variant supplied by the caller; `new` is a
    /// thin wrapper over this.
    pub fn with_platform(
        options: SetupOptions,
        env: &EnvOverrides,
        host: HostPlatform,
    ) -> Result<Self> {
        let platform = host.spec();
        let path = resolve_install_dir(&options, env)?;
        fs::create_dir_all(&path)
            .with_context(|| format!("Failed to create vcpkg directory {}", path.display()))?;

        let mut lock_os = path.clone().into_os_string();
        lock_os.push(".lock");
        let lock_file = PathBuf::from(lock_os);

        let exe = path.join(platform.exe_name);
        let bootstrap_script = path.join(platform.bootstrap_script);
        let target_triplet = if options.android {
            ANDROID_TRIPLET
        } else {
            platform.host_triplet
        };
        let android_precompiled = options.android.then(|| {
            env.android_precompiled
                .clone()
                .unwrap_or_else(|| path.join("android"))
        });
        let env_store = EnvFileStore::new(&options.build_root);

        println!("{} Using vcpkg path {}", "📦".blue(), path.display());

        Ok(Self {
            options,
            platform,
            path,
            lock_file,
            exe,
            bootstrap_script,
            target_triplet,
            android_precompiled,
            env_store,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lock_file(&self) -> &Path {
        &self.lock_file
    }

    pub fn exe(&self) -> &Path {
        &self.exe
    }

    pub fn host_triplet(&self) -> &'static str {
        self.platform.host_triplet
    }

    pub fn target_triplet(&self) -> &'static str {
        self.target_triplet
    }

    pub fn android_precompiled(&self) -> Option<&Path> {
        self.android_precompiled.as_deref()
    }

    /// Bring the tree to a bootstrapped state, then refresh the ports
    /// overlay. Calling this on a healthy tree fetches nothing but still
    /// replaces the ports.
    pub fn ensure_installed(&self) -> Result<()> {
        let mut fetch = false;
        if self.options.force_bootstrap {
            println!("{} Forced bootstrap requested", "!".yellow());
            fetch = true;
        }
        if !fetch && !self.exe.is_file() {
            println!(
                "{} Missing vcpkg executable {}",
                "!".yellow(),
                self.exe.display()
            );
            fetch = true;
        }
        if !fetch {
            let marker = self.path.join(".vcpkg-root");
            if !marker.is_file() {
                println!("{} Missing root marker {}", "!".yellow(), marker.display());
                fetch = true;
            }
        }

        match (self.platform.fetch, fetch) {
            (FetchStrategy::SourceBuild, true) => {
                self.clone_upstream()?;
                self.bootstrap()?;
            }
            (FetchStrategy::SourceBuild, false) => self.update_checkout()?,
            (FetchStrategy::Prebuilt { url, sha512 }, true) => {
                println!("{} Fetching prebuilt vcpkg...", "📦".blue());
                download::download_and_extract(url, &self.path, Some(sha512))?;
            }
            (FetchStrategy::Prebuilt { .. }, false) => {}
        }

        self.overlay_ports()
    }

    fn clone_upstream(&self) -> Result<()> {
        if self.path.join(".git").exists() {
            println!(
                "   {} Reusing existing checkout at {}",
                "⚡".green(),
                self.path.display()
            );
            return Ok(());
        }

        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.blue} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_chars("⣾⣽⣻⢿⡿⣟⣯⣷"),
        );
        pb.set_message(format!("Cloning {}...", VCPKG_GIT_URL));
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        match Repository::clone(VCPKG_GIT_URL, &self.path) {
            Ok(_) => {
                pb.finish_with_message(format!("{} Cloned vcpkg", "✓".green()));
                Ok(())
            }
            Err(err) => {
                pb.finish_with_message(format!("{} Clone failed", "x".red()));
                Err(anyhow::anyhow!(
                    "Failed to clone {} into {}: {}",
                    VCPKG_GIT_URL,
                    self.path.display(),
                    err
                ))
            }
        }
    }

    fn bootstrap(&self) -> Result<()> {
        println!(
            "{} Bootstrapping vcpkg in {}...",
            "🔨".yellow(),
            self.path.display()
        );

        let overlay: EnvOverlay = self.platform.bootstrap_env.iter().copied().collect();
        let mut cmd = if cfg!(target_os = "windows") {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(&self.bootstrap_script);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg(&self.bootstrap_script);
            c
        };
        let status = cmd
            .current_dir(&self.path)
            .envs(overlay.iter())
            .status()
            .with_context(|| format!("Failed to run {}", self.bootstrap_script.display()))?;
        if !status.success() {
            bail!(
                "Bootstrap script {} failed with {}",
                self.bootstrap_script.display(),
                status
            );
        }
        Ok(())
    }

    /// Fast-forward an existing checkout to the upstream default branch tip.
    fn update_checkout(&self) -> Result<()> {
        println!(
            "{} Updating vcpkg at {}...",
            "📦".blue(),
            self.path.display()
        );

        let script = "git fetch origin && git reset --hard origin/master";
        let status = if cfg!(target_os = "windows") {
            Command::new("cmd")
                .args(["/C", script])
                .current_dir(&self.path)
                .status()
        } else {
            Command::new("sh")
                .args(["-c", script])
                .current_dir(&self.path)
                .status()
        }
        .context("Failed to run git")?;

        if !status.success() {
            bail!("Failed to update vcpkg checkout at {}", self.path.display());
        }
        Ok(())
    }

    /// Replace `<path>/ports` with the project overlay. A symlink is
    /// unlinked, a directory is deleted; delete-then-copy is not atomic and
    /// an interruption leaves a partial tree until the next run.
    fn overlay_ports(&self) -> Result<()> {
        let source = &self.options.ports_path;
        if !source.is_dir() {
            bail!("Ports directory {} does not exist", source.display());
        }

        let dest = self.path.join("ports");
        if let Ok(meta) = fs::symlink_metadata(&dest) {
            if meta.file_type().is_symlink() {
                // Directory symlinks on Windows only come off with remove_dir.
                fs::remove_file(&dest)
                    .or_else(|_| fs::remove_dir(&dest))
                    .with_context(|| format!("Failed to unlink {}", dest.display()))?;
            } else if meta.is_dir() {
                fs::remove_dir_all(&dest)
                    .with_context(|| format!("Failed to remove {}", dest.display()))?;
            } else {
                fs::remove_file(&dest)
                    .with_context(|| format!("Failed to remove {}", dest.display()))?;
            }
        }

        println!("{} Replacing vcpkg ports with {}", "📦".blue(), source.display());
        copy_dir_all(source, &dest)
            .with_context(|| format!("Failed to copy ports from {}", source.display()))
    }

    /// Invoke the managed vcpkg executable. Every call carries the explicit
    /// `--vcpkg-root` argument, runs inside the tree, and applies `env` on
    /// top of the inherited environment.
    pub fn run(&self, args: &[&str], env: &EnvOverlay) -> Result<()> {
        println!(
            "   {} vcpkg --vcpkg-root {} {}",
            "⚙".cyan(),
            self.path.display(),
            args.join(" ")
        );

        let status = Command::new(&self.exe)
            .arg("--vcpkg-root")
            .arg(&self.path)
            .args(args)
            .current_dir(&self.path)
            .envs(env.iter())
            .status()
            .with_context(|| format!("Failed to run {}", self.exe.display()))?;
        if !status.success() {
            bail!("vcpkg {} failed with {}", args.join(" "), status);
        }
        Ok(())
    }

    /// Install the dependency bundles: host tools always, client deps for
    /// desktop, prebuilt archives for android.
    pub fn install_dependencies(&self) -> Result<()> {
        let mut build_env = EnvOverlay::new();
        if let Some(qt) = &self.options.qt_path {
            // The CMake runs nested inside vcpkg cannot see this process's
            // environment, so the value also crosses over as a file.
            build_env.set("QT_CMAKE_PREFIX_PATH", qt.to_string_lossy());
            self.env_store
                .write_var("QT_CMAKE_PREFIX_PATH", &qt.to_string_lossy())?;
        }

        println!("{} Passing environment on to vcpkg", "📦".blue());
        self.env_store.mirror_to(&self.path.join("_env"))?;

        if self.options.android {
            self.install_android_binaries()?;
        }

        println!("{} Installing host tools...", "📦".blue());
        self.run(
            &[
                "install",
                "--triplet",
                self.platform.host_triplet,
                "hifi-host-tools",
            ],
            &build_env,
        )?;

        if !self.options.android {
            println!("{} Installing client dependencies...", "📦".blue());
            self.run(
                &[
                    "install",
                    "--triplet",
                    self.target_triplet,
                    "hifi-client-deps",
                ],
                &build_env,
            )?;
        }
        Ok(())
    }

    fn install_android_binaries(&self) -> Result<()> {
        android::ensure_prebuilt_bundle(&self.path)?;

        let Some(manifest_path) = &self.options.android_packages else {
            bail!("An android package manifest is required (--android-packages)");
        };
        let Some(dest_root) = &self.android_precompiled else {
            bail!("No android precompiled path resolved for a desktop run");
        };

        let manifest = android::PackageManifest::load(manifest_path)?;
        println!(
            "{} Installing {} android packages into {}",
            "📦".blue(),
            manifest.packages.len(),
            dest_root.display()
        );
        android::install_packages(&manifest, dest_root)
    }

    /// Emit `<build root>/vcpkg.cmake` for the outer build.
    pub fn write_config(&self) -> Result<()> {
        let android_precompiled = match &self.android_precompiled {
            Some(p) => Some(
                std::path::absolute(p)
                    .with_context(|| format!("Failed to resolve {}", p.display()))?,
            ),
            None => None,
        };
        let params = ConfigParams {
            toolchain_file: self
                .path
                .join("scripts")
                .join("buildsystems")
                .join("vcpkg.cmake"),
            install_root: self.path.join("installed").join(self.target_triplet),
            tools_dir: self
                .path
                .join("installed")
                .join(self.platform.host_triplet)
                .join("tools"),
            android_precompiled,
        };

        let path = cmake::write_config(&self.options.build_root, &params)?;
        println!("{} Wrote build config {}", "✓".green(), path.display());
        Ok(())
    }

    /// Remove the whole managed tree. A missing tree is fine.
    pub fn clean(&self) -> Result<()> {
        if !self.path.exists() {
            println!("{} Nothing to clean at {}", "✓".green(), self.path.display());
            return Ok(());
        }
        println!(
            "{} Cleaning vcpkg installation at {}...",
            "🧹".yellow(),
            self.path.display()
        );
        fs::remove_dir_all(&self.path)
            .with_context(|| format!("Failed to remove {}", self.path.display()))?;
        println!("{} Installation removed.", "✓".green());
        Ok(())
    }

    /// Remove only vcpkg's temporary build trees, keeping installed
    /// artifacts in place.
    pub fn wipe_builds(&self) -> Result<()> {
        let buildtrees = self.path.join("buildtrees");
        if !buildtrees.exists() {
            println!("{} No build trees to remove.", "✓".green());
            return Ok(());
        }
        println!(
            "{} Removing build trees at {}...",
            "🧹".yellow(),
            buildtrees.display()
        );
        fs::remove_dir_all(&buildtrees)
            .with_context(|| format!("Failed to remove {}", buildtrees.display()))?;
        println!("{} Build trees removed.", "✓".green());
        Ok(())
    }
}
