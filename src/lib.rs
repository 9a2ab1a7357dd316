//! # prebuild - Tivoli client build bootstrapper
//!
//! prebuild prepares a machine for compiling the Tivoli client. It manages a
//! private vcpkg tree per build flavor, installs the project's dependency
//! bundles into it, and emits the `vcpkg.cmake` glue the outer CMake build
//! includes.
//!
//! ## Quick Start
//!
//! ```bash
//! # Desktop build environment
//! prebuild setup --build-root build
//!
//! # Android build environment
//! prebuild setup --android --android-packages android/packages.json
//! ```
//!
//! ## Module Organization
//!
//! - [`vcpkg`] - The managed vcpkg tree and the setup workflow
//! - [`platform`] - Host classification and the per-platform bootstrap table
//! - [`android`] - Prebuilt android bundle and package manifest handling
//! - [`download`] - Archive download, verification, and extraction

/// Prebuilt android bundle and package manifest handling.
pub mod android;

/// Generation of the `vcpkg.cmake` include file.
pub mod cmake;

/// Run configuration from CLI and environment.
pub mod config;

/// Archive download, digest verification, and extraction.
pub mod download;

/// Environment overlays and the file-based environment store.
pub mod environment;

/// Host platform detection and bootstrap data.
pub mod platform;

/// The managed vcpkg tree and the setup workflow.
pub mod vcpkg;
