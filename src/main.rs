//! # prebuild CLI Entry Point
//!
//! Parses CLI arguments using clap and routes to the setup workflow.
//!
//! ## Command Structure
//!
//! - **setup**: bootstrap vcpkg, overlay ports, install dependency bundles,
//!   write the CMake glue
//! - **clean**: remove the managed installation (or only its build trees)
//! - **doctor**: check the host for required tools
//! - **completion**: shell completion scripts

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use colored::*;
use std::path::PathBuf;
use std::process::Command;

use tivoli_prebuild::config::{EnvOverrides, SetupOptions};
use tivoli_prebuild::platform::HostPlatform;
use tivoli_prebuild::vcpkg::{VcpkgRepo, resolve_install_dir};

#[cfg(windows)]
#[link(name = "kernel32")]
unsafe extern "system" {
    fn SetConsoleOutputCP(wCodePageID: u32) -> i32;
    fn SetConsoleCP(wCodePageID: u32) -> i32;
}

#[cfg(windows)]
fn enable_windows_utf8_console() {
    unsafe {
        SetConsoleOutputCP(65001);
        SetConsoleCP(65001);
    }
}

#[cfg(not(windows))]
fn enable_windows_utf8_console() {}

#[derive(Parser)]
#[command(name = "prebuild")]
#[command(about = "Prepares a machine for building the Tivoli client", version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bootstrap vcpkg, overlay ports, and install the dependency bundles
    Setup {
        /// Target the android client instead of the desktop build
        #[arg(long)]
        android: bool,
        /// Use an explicit vcpkg directory instead of the computed default
        #[arg(long, value_name = "DIR")]
        vcpkg_root: Option<PathBuf>,
        /// Build directory that receives vcpkg.cmake and the _env store
        #[arg(long, value_name = "DIR", default_value = "build")]
        build_root: PathBuf,
        /// Directory of project port recipes overlaid onto the vcpkg tree
        #[arg(long, value_name = "DIR", default_value = "cmake/ports")]
        ports_path: PathBuf,
        /// JSON manifest of prebuilt android packages (required with --android)
        #[arg(long, value_name = "FILE")]
        android_packages: Option<PathBuf>,
        /// Qt prefix passed through to the nested builds
        #[arg(long, value_name = "DIR")]
        qt_path: Option<PathBuf>,
        /// Redo the vcpkg bootstrap even if the tree looks complete
        #[arg(long)]
        force_bootstrap: bool,
        /// Wipe the installation first and rebuild everything from scratch
        #[arg(long)]
        force_build: bool,
    },
    /// Remove the managed vcpkg installation
    Clean {
        /// Operate on the android tree instead of the desktop one
        #[arg(long)]
        android: bool,
        /// Use an explicit vcpkg directory instead of the computed default
        #[arg(long, value_name = "DIR")]
        vcpkg_root: Option<PathBuf>,
        /// Only remove temporary build trees, keep installed artifacts
        #[arg(long)]
        builds: bool,
    },
    /// Check this machine for the tools the bootstrap needs
    Doctor,
    /// Generate shell completion scripts
    Completion { shell: Shell },
}

fn main() -> Result<()> {
    enable_windows_utf8_console();

    let cli = Cli::parse();
    match cli.command {
        Commands::Setup {
            android,
            vcpkg_root,
            build_root,
            ports_path,
            android_packages,
            qt_path,
            force_bootstrap,
            force_build,
        } => run_setup(SetupOptions {
            android,
            vcpkg_root,
            build_root,
            ports_path,
            android_packages,
            qt_path,
            force_bootstrap,
            force_build,
        }),
        Commands::Clean {
            android,
            vcpkg_root,
            builds,
        } => run_clean(android, vcpkg_root, builds),
        Commands::Doctor => run_doctor(),
        Commands::Completion { shell } => {
            let mut cmd = Cli::command();
            let bin_name = cmd.get_name().to_string();
            generate(shell, &mut cmd, bin_name, &mut std::io::stdout());
            Ok(())
        }
    }
}

fn run_setup(options: SetupOptions) -> Result<()> {
    if options.android && options.android_packages.is_none() {
        anyhow::bail!("--android requires an --android-packages manifest");
    }

    let force_build = options.force_build;
    let repo = VcpkgRepo::new(options, &EnvOverrides::from_env())?;
    if force_build {
        repo.clean()?;
    }
    repo.ensure_installed()?;
    repo.install_dependencies()?;
    repo.write_config()?;

    println!("{} Build environment ready.", "✓".green());
    Ok(())
}

fn run_clean(android: bool, vcpkg_root: Option<PathBuf>, builds: bool) -> Result<()> {
    let options = SetupOptions {
        android,
        vcpkg_root,
        build_root: PathBuf::from("build"),
        ports_path: PathBuf::from("cmake/ports"),
        ..Default::default()
    };
    let env = EnvOverrides::from_env();

    // Constructing the repo creates the installation directory, so an absent
    // tree is reported before that.
    let path = resolve_install_dir(&options, &env)?;
    if !path.exists() {
        println!("{} Nothing to clean at {}", "✓".green(), path.display());
        return Ok(());
    }

    let repo = VcpkgRepo::new(options, &env)?;
    if builds {
        repo.wipe_builds()
    } else {
        repo.clean()
    }
}

fn run_doctor() -> Result<()> {
    println!("{} {}", "🔧".cyan(), "Checking build prerequisites".bold());
    println!();

    let host = HostPlatform::detect();
    let spec = host.spec();
    println!(
        "   {} Platform: {:?} (host triplet {})",
        "✓".green(),
        host,
        spec.host_triplet
    );

    for (tool, why) in [
        ("git", "needed to keep the vcpkg checkout current"),
        ("cmake", "needed by the vcpkg bootstrap and the outer build"),
    ] {
        match Command::new(tool).arg("--version").output() {
            Ok(out) if out.status.success() => {
                let version = String::from_utf8_lossy(&out.stdout);
                let first_line = version.lines().next().unwrap_or("unknown version");
                println!("   {} {}: {}", "✓".green(), tool, first_line);
            }
            _ => println!("   {} {} not found ({})", "x".red(), tool, why),
        }
    }

    let env = EnvOverrides::from_env();
    for android in [false, true] {
        let options = SetupOptions {
            android,
            ..Default::default()
        };
        let path = resolve_install_dir(&options, &env)?;
        let state = if path.exists() {
            "present".green()
        } else {
            "not created yet".yellow()
        };
        let flavor = if android { "android" } else { "desktop" };
        println!("   {} {} tree: {} ({})", "ℹ".blue(), flavor, path.display(), state);
    }

    Ok(())
}
