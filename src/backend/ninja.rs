//! Ninja backend.
//!
//! Writes a single `build.ninja`. The graph maps onto Ninja almost one to
//! one: rules become `rule` blocks with their command templates, edges
//! become `build` statements with per-edge flag variables, and secondary
//! outputs (import libraries) become implicit outputs so `$out` names the
//! primary file only.
//!
//! Source and install paths are written relative to the `$srcdir` and
//! install directory variables defined at the top of the file.

use std::fmt::Write as _;

use crate::builder::graph::{CompiledGraph, Edge, FileId, Recipe};
use crate::builder::toolchain::{DepStyle, ToolVar};
use crate::core::path::{BuildPath, InstallRoot, Root};
use crate::errors::EmissionError;

use super::command::{self, ArgRenderer};
use super::{check_reserved, install_outputs, rule_defaults, Backend, BackendId, EmitContext, RenderedFile};

/// Name of the generated build file.
pub const BUILD_FILE: &str = "build.ninja";

const RESERVED: &[&str] = &["all", "install"];

/// Emits `build.ninja`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NinjaBackend;

impl Backend for NinjaBackend {
    fn id(&self) -> BackendId {
        BackendId::Ninja
    }

    fn render(&self, graph: &CompiledGraph, ctx: &EmitContext<'_>) -> Result<Vec<RenderedFile>, EmissionError> {
        for edge in graph.edges() {
            command::check_edge("ninja", edge)?;
        }
        check_reserved("ninja", graph, RESERVED)?;

        let mut out = String::new();
        write_build_file(&mut out, graph, ctx).map_err(|e| EmissionError::Render {
            backend: "ninja".to_string(),
            message: e.to_string(),
        })?;
        Ok(vec![RenderedFile::new(BUILD_FILE, out)])
    }
}

/// Escape a path on a `build` or `default` line.
pub fn escape_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for c in path.chars() {
        match c {
            '$' => out.push_str("$$"),
            ' ' => out.push_str("$ "),
            ':' => out.push_str("$:"),
            c => out.push(c),
        }
    }
    out
}

/// Escape text in a variable value.
pub fn escape_value(value: &str) -> String {
    value.replace('$', "$$")
}

/// A path on a `build` line, relative to its root's variable.
fn build_path(path: &BuildPath) -> String {
    match path.root() {
        Root::Source if path.is_root() => "$srcdir".to_string(),
        Root::Source => format!("$srcdir/{}", escape_path(path.as_str())),
        Root::Install(root) => format!("${}/{}", root.var_name(), escape_path(path.as_str())),
        Root::Build | Root::External => escape_path(path.as_str()),
    }
}

fn paths(graph: &CompiledGraph, ids: &[FileId]) -> String {
    ids.iter()
        .map(|&id| build_path(graph.path(id)))
        .collect::<Vec<_>>()
        .join(" ")
}

fn write_build_file(out: &mut String, graph: &CompiledGraph, ctx: &EmitContext<'_>) -> std::fmt::Result {
    writeln!(out, "# Generated by drydock for {}. Do not edit.", graph.project().name)?;
    writeln!(out, "ninja_required_version = 1.7")?;
    writeln!(out)?;

    writeln!(out, "srcdir = {}", escape_value(ctx.srcdir()))?;
    for root in InstallRoot::ALL {
        writeln!(out, "{} = {}", root.var_name(), escape_value(&ctx.install_dir(root)))?;
    }
    for var in ToolVar::ALL {
        writeln!(out, "{} = {}", var.as_str(), escape_value(ctx.env().tools().get(var)))?;
    }
    writeln!(out)?;

    for rule in graph.rules().values() {
        writeln!(out, "rule {}", rule.name)?;
        writeln!(out, "  command = {}", crate::builder::graph::template(&rule.command))?;
        writeln!(out, "  description = {} $out", rule.label)?;
        match rule.deps {
            DepStyle::Gcc => {
                writeln!(out, "  depfile = $out.d")?;
                writeln!(out, "  deps = gcc")?;
            }
            DepStyle::Msvc => writeln!(out, "  deps = msvc")?,
            DepStyle::None => {}
        }
        writeln!(out)?;
    }

    let concrete = |path: &BuildPath| escape_value(&ctx.shell().quote(&ctx.concrete(path)));
    let renderer = ArgRenderer {
        shell: ctx.shell(),
        escape: escape_value,
        path: &concrete,
    };

    for &id in graph.topo_order() {
        let edge = graph.edge(id);
        if let Recipe::Rule(rule_name) = &edge.recipe {
            write_edge(out, graph, ctx, &renderer, edge, rule_name)?;
        }
    }

    writeln!(out, "build all: phony {}", paths(graph, &rule_defaults(graph)))?;
    writeln!(out, "build install: phony {}", paths(graph, &install_outputs(graph)))?;
    writeln!(out)?;
    writeln!(out, "default all")?;
    Ok(())
}

fn write_edge(
    out: &mut String,
    graph: &CompiledGraph,
    ctx: &EmitContext<'_>,
    renderer: &ArgRenderer<'_>,
    edge: &Edge,
    rule_name: &str,
) -> std::fmt::Result {
    let (primary, secondary) = edge.outputs.split_at(edge.outputs.len().min(1));

    write!(out, "build {}", paths(graph, primary))?;
    if !secondary.is_empty() {
        write!(out, " | {}", paths(graph, secondary))?;
    }
    write!(out, ": {}", rule_name)?;
    if !edge.inputs.is_empty() {
        write!(out, " {}", paths(graph, &edge.inputs))?;
    }
    if !edge.implicit.is_empty() {
        write!(out, " | {}", paths(graph, &edge.implicit))?;
    }
    if !edge.order_only.is_empty() {
        write!(out, " || {}", paths(graph, &edge.order_only))?;
    }
    writeln!(out)?;

    if let Some(rule) = graph.rule(rule_name) {
        for var in rule.flag_vars() {
            let flags = renderer.flags(ctx.toolchain(), command::flag_values(edge, var));
            if !flags.is_empty() {
                writeln!(out, "  {} = {}", var.as_str(), flags)?;
            }
        }
    }
    for (name, value) in &edge.vars {
        writeln!(out, "  {} = {}", name, escape_value(&ctx.shell().quote(value)))?;
    }
    writeln!(out)
}
