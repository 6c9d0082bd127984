//! Build graph construction.
//!
//! A [`Description`](crate::core::description::Description) is compiled
//! against an [`Environment`](crate::core::environment::Environment) into a
//! [`CompiledGraph`]: files, edges, rules and targets, with every flag
//! typed and every path rooted. Backends only ever read the compiled graph.

pub mod compiler;
pub mod cycle;
pub mod graph;
pub mod link;
pub mod pkg_config;
pub mod toolchain;

pub use compiler::GraphCompiler;
pub use graph::{BuildGraph, CompiledGraph, Edge, EdgePhase, Recipe, TargetKind};
pub use toolchain::{Rule, RuleKind, Toolchain};
