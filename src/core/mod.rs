//! Core data structures for Drydock.
//!
//! This module contains the foundational types used throughout Drydock:
//! - Rooted build paths and typed flag records
//! - Languages, packages and the target environment
//! - The description builder API and the Drydock.toml manifest

pub mod description;
pub mod environment;
pub mod flags;
pub mod language;
pub mod manifest;
pub mod package;
pub mod path;

pub use description::{Description, Executable, Library, LibraryKind, PkgConfig, TargetHandle};
pub use environment::{Environment, Platform, ToolchainId};
pub use manifest::{Manifest, MANIFEST_NAME};
pub use package::{Package, PackageRequest};
pub use path::BuildPath;
