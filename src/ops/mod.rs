//! High-level operations.
//!
//! This module contains the implementation of Drydock commands.

pub mod generate;

pub use generate::{
    compile, configure, find_manifest, generate, generate_with, package_query, parse_library_kind,
    select_backends, GenerateOptions, GenerateResult, Project,
};
