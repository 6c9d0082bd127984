//! Drydock - a meta-build-system generator for C and C++
//!
//! This crate provides the core library functionality for Drydock:
//! project descriptions, package resolution, build graph compilation and
//! the Ninja, Make and MSBuild backends.

pub mod backend;
pub mod builder;
pub mod core;
pub mod errors;
pub mod ops;
pub mod resolver;
pub mod util;

/// Test doubles and fixtures for Drydock unit tests.
///
/// This module is only available when compiling with `--cfg test`. It
/// provides a fake package query and ready-made projects.
#[cfg(test)]
pub mod test_support;

pub use backend::{Backend, BackendId, EmitContext};
pub use builder::compiler::GraphCompiler;
pub use builder::graph::{BuildGraph, CompiledGraph};
pub use core::{description::Description, environment::Environment, manifest::Manifest};
pub use errors::GenerateError;
pub use resolver::{PackageQuery, PackageResolver, PkgConfigQuery};
