//! Make backend.
//!
//! Writes a `Makefile` for GNU make. Make has no rule templates with
//! per-edge variables, so every recipe is rendered in full. Source and
//! install paths go through the `$(srcdir)` and install directory variables
//! both on rule lines and in recipes; install paths are prefixed with
//! `$(DESTDIR)` for staged installs.
//!
//! Header dependencies come from the compiler's depfiles, included at the
//! end of the file. Rules that report headers any other way (MSVC
//! `/showIncludes`) are rejected.

use std::fmt::Write as _;

use crate::builder::graph::{CompiledGraph, Edge, EdgePhase, FileId, Recipe};
use crate::builder::toolchain::{DepStyle, Rule, Token, ToolVar};
use crate::core::path::{BuildPath, InstallRoot, Root};
use crate::errors::EmissionError;

use super::command::{self, ArgRenderer, Shell};
use super::{check_reserved, install_outputs, rule_defaults, Backend, BackendId, EmitContext, RenderedFile};

/// Name of the generated build file.
pub const BUILD_FILE: &str = "Makefile";

const RESERVED: &[&str] = &["all", "install", "clean"];

/// Emits a `Makefile`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeBackend;

impl Backend for MakeBackend {
    fn id(&self) -> BackendId {
        BackendId::Make
    }

    fn render(&self, graph: &CompiledGraph, ctx: &EmitContext<'_>) -> Result<Vec<RenderedFile>, EmissionError> {
        validate(graph)?;

        let mut out = String::new();
        write_makefile(&mut out, graph, ctx).map_err(|e| EmissionError::Render {
            backend: "make".to_string(),
            message: e.to_string(),
        })?;
        Ok(vec![RenderedFile::new(BUILD_FILE, out)])
    }
}

fn unsupported(feature: String) -> EmissionError {
    EmissionError::UnsupportedGraphFeature {
        backend: "make".to_string(),
        feature,
    }
}

fn validate(graph: &CompiledGraph) -> Result<(), EmissionError> {
    for edge in graph.edges() {
        command::check_edge("make", edge)?;
    }
    check_reserved("make", graph, RESERVED)?;

    for rule in graph.rules().values() {
        if rule.deps == DepStyle::Msvc {
            return Err(unsupported(format!(
                "header dependencies reported with /showIncludes (rule `{}`)",
                rule.name
            )));
        }
    }

    for file in graph.files() {
        let text = file.path.as_str();
        let colon = match file.path.root() {
            // A drive letter is the only colon an absolute path may carry.
            Root::External => text.get(2..).is_some_and(|rest| rest.contains(':')),
            _ => text.contains(':'),
        };
        if colon || text.contains(['%', '*', '?', '\t']) {
            return Err(unsupported(format!("the file name `{}`", file.path)));
        }
    }
    Ok(())
}

/// Variable name for a tool command (`$(CC)`).
fn tool_var(var: ToolVar) -> &'static str {
    match var {
        ToolVar::Cc => "CC",
        ToolVar::Cxx => "CXX",
        ToolVar::Ar => "AR",
        ToolVar::Ld => "LD",
    }
}

/// Escape a path on a rule line.
pub fn escape_target(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for c in path.chars() {
        match c {
            '$' => out.push_str("$$"),
            ' ' => out.push_str("\\ "),
            '#' => out.push_str("\\#"),
            c => out.push(c),
        }
    }
    out
}

/// Escape recipe text. Make only interprets `$` there.
pub fn escape_recipe(text: &str) -> String {
    text.replace('$', "$$")
}

/// Make variable reference for a rooted path's directory, if any.
fn root_var(path: &BuildPath) -> Option<String> {
    match path.root() {
        Root::Source => Some("$(srcdir)".to_string()),
        Root::Install(root) => Some(format!("$(DESTDIR)$({})", root.var_name())),
        Root::Build | Root::External => None,
    }
}

/// A path on a rule line.
fn target_path(path: &BuildPath) -> String {
    match root_var(path) {
        Some(var) if path.is_root() => var,
        Some(var) => format!("{}/{}", var, escape_target(path.as_str())),
        None => escape_target(path.as_str()),
    }
}

/// A path in a recipe, quoted for the shell.
fn recipe_path(shell: Shell, path: &BuildPath) -> String {
    let quoted = escape_recipe(&shell.quote(path.as_str()));
    match root_var(path) {
        Some(var) if path.is_root() => var,
        Some(var) => format!("{}/{}", var, quoted),
        None => quoted,
    }
}

fn target_paths(graph: &CompiledGraph, ids: &[FileId]) -> String {
    ids.iter()
        .map(|&id| target_path(graph.path(id)))
        .collect::<Vec<_>>()
        .join(" ")
}

fn write_makefile(out: &mut String, graph: &CompiledGraph, ctx: &EmitContext<'_>) -> std::fmt::Result {
    let shell = ctx.shell();

    writeln!(out, "# Generated by drydock for {}. Do not edit.", graph.project().name)?;
    writeln!(out)?;
    writeln!(out, "srcdir = {}", escape_recipe(ctx.srcdir()))?;
    for root in InstallRoot::ALL {
        writeln!(out, "{} = {}", root.var_name(), escape_recipe(&ctx.install_dir(root)))?;
    }
    writeln!(out, "DESTDIR ?=")?;
    writeln!(out)?;
    for var in ToolVar::ALL {
        writeln!(out, "{} = {}", tool_var(var), escape_recipe(ctx.env().tools().get(var)))?;
    }
    writeln!(out)?;
    writeln!(out, ".PHONY: all install clean")?;
    writeln!(out, ".SUFFIXES:")?;
    writeln!(out, ".DELETE_ON_ERROR:")?;
    writeln!(out)?;
    writeln!(out, "all: {}", target_paths(graph, &rule_defaults(graph)))?;
    writeln!(out)?;

    let path = |p: &BuildPath| recipe_path(shell, p);
    let renderer = ArgRenderer {
        shell,
        escape: escape_recipe,
        path: &path,
    };

    let mut depfiles = Vec::new();
    let mut cleaned = Vec::new();
    for &id in graph.topo_order() {
        let edge = graph.edge(id);
        let Recipe::Rule(rule_name) = &edge.recipe else {
            continue;
        };
        let Some(rule) = graph.rule(rule_name) else {
            continue;
        };
        if rule.deps == DepStyle::Gcc {
            if let Some(&first) = edge.outputs.first() {
                depfiles.push(graph.path(first).with_suffix(".d"));
            }
        }
        if edge.phase == EdgePhase::Build {
            cleaned.extend(edge.outputs.iter().map(|&f| graph.path(f).clone()));
        }
        write_edge(out, graph, ctx, &renderer, edge, rule)?;
    }

    writeln!(out, "install: {}", target_paths(graph, &install_outputs(graph)))?;
    writeln!(out)?;

    cleaned.extend(depfiles.iter().cloned());
    write!(out, "clean:\n\t")?;
    let listed = cleaned
        .iter()
        .map(|p| recipe_path(shell, p))
        .collect::<Vec<_>>()
        .join(" ");
    match shell {
        Shell::Posix => writeln!(out, "rm -f {}", listed)?,
        Shell::Cmd => writeln!(out, "-del /Q /F {}", listed.replace('/', "\\"))?,
    }

    if !depfiles.is_empty() {
        writeln!(out)?;
        let listed = depfiles
            .iter()
            .map(|p| target_path(p))
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(out, "-include {}", listed)?;
    }
    Ok(())
}

fn write_edge(
    out: &mut String,
    graph: &CompiledGraph,
    ctx: &EmitContext<'_>,
    renderer: &ArgRenderer<'_>,
    edge: &Edge,
    rule: &Rule,
) -> std::fmt::Result {
    let Some((&primary, secondary)) = edge.outputs.split_first() else {
        return Ok(());
    };

    write!(out, "{}:", target_path(graph.path(primary)))?;
    for &input in edge.inputs.iter().chain(&edge.implicit) {
        write!(out, " {}", target_path(graph.path(input)))?;
    }
    if !edge.order_only.is_empty() {
        write!(out, " | {}", target_paths(graph, &edge.order_only))?;
    }
    writeln!(out)?;

    // Make does not create output directories.
    let mut dirs: Vec<BuildPath> = Vec::new();
    for &output in &edge.outputs {
        if let Some(dir) = graph.path(output).parent() {
            if !dirs.contains(&dir) {
                dirs.push(dir);
            }
        }
    }
    for dir in &dirs {
        let dir = recipe_path(ctx.shell(), dir);
        match ctx.shell() {
            Shell::Posix => writeln!(out, "\t@mkdir -p {}", dir)?,
            Shell::Cmd => {
                let dir = dir.replace('/', "\\");
                writeln!(out, "\t@if not exist {} mkdir {}", dir, dir)?
            }
        }
    }

    let mut words: Vec<String> = Vec::with_capacity(rule.command.len() + 1);
    for token in &rule.command {
        let word = render_token(graph, ctx, renderer, edge, token);
        if !word.is_empty() {
            words.push(word);
        }
        // Phony rules for every header, so a deleted header does not stop
        // make when the stale depfile is included.
        if rule.deps == DepStyle::Gcc && matches!(token, Token::Depfile) {
            words.push("-MP".to_string());
        }
    }
    writeln!(out, "\t{}", words.join(" "))?;

    for &output in secondary {
        writeln!(out, "{}: {} ;", target_path(graph.path(output)), target_path(graph.path(primary)))?;
    }
    writeln!(out)
}

/// Render one command token for an edge.
fn render_token(
    graph: &CompiledGraph,
    ctx: &EmitContext<'_>,
    renderer: &ArgRenderer<'_>,
    edge: &Edge,
    token: &Token,
) -> String {
    let first_output = || edge.outputs.first().map(|&f| graph.path(f));
    match token {
        Token::Lit(text) => escape_recipe(text),
        Token::Tool(var) => format!("$({})", tool_var(*var)),
        Token::Flags(var) => renderer.flags(ctx.toolchain(), command::flag_values(edge, *var)),
        Token::Inputs => edge
            .inputs
            .iter()
            .map(|&f| recipe_path(ctx.shell(), graph.path(f)))
            .collect::<Vec<_>>()
            .join(" "),
        Token::Output => first_output()
            .map(|p| recipe_path(ctx.shell(), p))
            .unwrap_or_default(),
        Token::Depfile => first_output()
            .map(|p| recipe_path(ctx.shell(), &p.with_suffix(".d")))
            .unwrap_or_default(),
        Token::Var(name) => edge
            .vars
            .get(*name)
            .map(|v| escape_recipe(&ctx.shell().quote(v)))
            .unwrap_or_default(),
        Token::Join(inner) => inner
            .iter()
            .map(|t| render_token(graph, ctx, renderer, edge, t))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::environment::{Platform, ToolchainId};
    use crate::test_support::fixtures;

    fn render(graph: &CompiledGraph, env: &crate::core::environment::Environment) -> Result<String, EmissionError> {
        let files = MakeBackend.render(graph, &EmitContext::new(env))?;
        Ok(files[0].contents.clone())
    }

    #[test]
    fn test_escaping() {
        assert_eq!(escape_target("my file.c"), "my\\ file.c");
        assert_eq!(escape_target("a#b$c"), "a\\#b$$c");
        assert_eq!(escape_recipe("-DPRICE=$5"), "-DPRICE=$$5");
    }

    #[test]
    fn test_hello_makefile() {
        let env = fixtures::linux_env();
        let make = render(&fixtures::hello_graph(&env), &env).unwrap();

        assert!(make.contains("srcdir = ..\n"));
        assert!(make.contains("DESTDIR ?=\n"));
        assert!(make.contains("CC = gcc\n"));
        assert!(make.contains("all: libinner.a libhello.a app\n"));
        assert!(make.contains(
            "inner.dir/src/inner.o: $(srcdir)/src/inner.c $(srcdir)/include/hello.h\n\t@mkdir -p inner.dir/src\n"
        ));
        assert!(make.contains(
            "\t$(CC) -I$(srcdir)/include -I/usr/include/ogg -MD -MF inner.dir/src/inner.o.d -MP -c $(srcdir)/src/inner.c -o inner.dir/src/inner.o\n"
        ));
        assert!(make.contains("app: app.dir/src/main.o libhello.a libinner.a\n"));
        assert!(make.contains("\t$(CC) -L/usr/lib/ogg -o app app.dir/src/main.o libhello.a libinner.a -logg\n"));
        assert!(make.contains("\trm -f libhello.a && $(AR) rcs libhello.a hello.dir/src/hello.o\n"));
        assert!(make.contains("$(DESTDIR)$(libdir)/pkgconfig/hello.pc: hello.pc\n"));
        assert!(make.contains(
            "install: $(DESTDIR)$(bindir)/app $(DESTDIR)$(libdir)/libhello.a $(DESTDIR)$(includedir)/hello.h $(DESTDIR)$(libdir)/pkgconfig/hello.pc\n"
        ));
        assert!(make.contains("-include inner.dir/src/inner.o.d hello.dir/src/hello.o.d app.dir/src/main.o.d"));
        assert!(!make.contains("\nhello.pc:"));
    }

    #[test]
    fn test_depfiles_list_headers_as_phony_targets() {
        let env = fixtures::linux_env();
        let make = render(&fixtures::hello_graph(&env), &env).unwrap();

        let compiles: Vec<&str> = make.lines().filter(|l| l.starts_with("\t$(CC)") && l.contains(" -c ")).collect();
        assert_eq!(compiles.len(), 3);
        for line in compiles {
            assert!(line.contains(".o.d -MP -c "), "{}", line);
        }
        assert!(!make.contains("-MP -MP"));
    }

    #[test]
    fn test_shared_library_outputs() {
        use crate::core::description::{Description, Executable, Library, LibraryKind};
        use crate::resolver::PackageResolver;
        use std::sync::Arc;

        let mut desc = Description::new("demo");
        desc.library(
            Library::new("foo")
                .kind(LibraryKind::Shared)
                .sources(["foo.c"])
                .version("1.2.3", "1"),
        )
        .unwrap();
        desc.executable(Executable::new("app").sources(["main.c"]).libs(["foo"]))
            .unwrap();
        let env = fixtures::linux_env();
        let resolver = PackageResolver::new(Arc::new(crate::test_support::FakeQuery::new()));
        let graph = crate::builder::GraphCompiler::new(&env, &resolver)
            .compile(&desc)
            .unwrap();

        let make = render(&graph, &env).unwrap();
        assert!(make.contains("libfoo.so.1: libfoo.so.1.2.3\n\tln -sf libfoo.so.1.2.3 libfoo.so.1\n"));
        assert!(make.contains("app: app.dir/main.o libfoo.so | libfoo.so.1\n"));
    }

    #[test]
    fn test_msvc_dependency_scanning_rejected() {
        let env = fixtures::project_env(Platform::Windows, ToolchainId::Msvc);
        let err = render(&fixtures::hello_graph(&env), &env).unwrap_err();
        assert!(matches!(err, EmissionError::UnsupportedGraphFeature { .. }));
        assert!(err.to_string().contains("/showIncludes"));
    }

    #[test]
    fn test_mingw_uses_cmd() {
        let env = fixtures::project_env(Platform::Windows, ToolchainId::Gcc);
        let make = render(&fixtures::hello_graph(&env), &env).unwrap();
        assert!(make.contains("\t@if not exist inner.dir\\src mkdir inner.dir\\src\n"));
        assert!(make.contains("cmd /c copy /Y"));
    }
}
