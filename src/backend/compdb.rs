//! `compile_commands.json` for IDE integration.
//!
//! One entry per compile edge, with the full argument vector the build
//! tool would run. Paths are absolute so editors can use the database from
//! any working directory.

use std::path::Path;

use serde::Serialize;

use crate::builder::graph::{CompiledGraph, Edge, EdgePhase};
use crate::builder::toolchain::{Piece, RuleKind, Token};
use crate::errors::EmissionError;

use super::command;
use super::{EmitContext, RenderedFile};

/// Name of the generated database.
pub const COMPILE_COMMANDS: &str = "compile_commands.json";

/// compile_commands.json entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct CompileCommand {
    directory: String,
    file: String,
    arguments: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<String>,
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

/// Render the compilation database for every compile edge.
pub fn render(graph: &CompiledGraph, ctx: &EmitContext<'_>) -> Result<RenderedFile, EmissionError> {
    let directory = display(&crate::util::fs::absolute_lexical(ctx.builddir()));

    let mut commands = Vec::new();
    for (_, edge) in graph.ordered(EdgePhase::Build) {
        let Some(rule) = edge.rule_name().and_then(|name| graph.rule(name)) else {
            continue;
        };
        if !matches!(rule.kind, RuleKind::Compile(_)) {
            continue;
        }
        let Some(&source) = edge.inputs.first() else {
            continue;
        };

        let mut arguments = Vec::new();
        for token in &rule.command {
            arguments.extend(words(graph, ctx, edge, token));
        }
        commands.push(CompileCommand {
            directory: directory.clone(),
            file: display(&ctx.absolute(graph.path(source))),
            arguments,
            output: edge.outputs.first().map(|&f| display(&ctx.absolute(graph.path(f)))),
        });
    }
    tracing::debug!("{} entries in {}", commands.len(), COMPILE_COMMANDS);

    let json = serde_json::to_string_pretty(&commands).map_err(|e| EmissionError::Render {
        backend: "compile_commands".to_string(),
        message: e.to_string(),
    })?;
    Ok(RenderedFile::new(COMPILE_COMMANDS, json + "\n"))
}

/// Command-line words of one token, unquoted.
fn words(graph: &CompiledGraph, ctx: &EmitContext<'_>, edge: &Edge, token: &Token) -> Vec<String> {
    let absolute = |id| display(&ctx.absolute(graph.path(id)));
    match token {
        Token::Lit(text) => vec![text.clone()],
        Token::Tool(var) => {
            let command = ctx.env().tools().get(*var);
            shlex::split(command).unwrap_or_else(|| vec![command.to_string()])
        }
        Token::Flags(var) => command::flag_values(edge, *var)
            .into_iter()
            .flat_map(|value| ctx.toolchain().render_flag(value))
            .map(|arg| {
                arg.0
                    .iter()
                    .map(|piece| match piece {
                        Piece::Text(text) => text.clone(),
                        Piece::Path(path) => display(&ctx.absolute(path)),
                    })
                    .collect::<String>()
            })
            .collect(),
        Token::Inputs => edge.inputs.iter().map(|&f| absolute(f)).collect(),
        Token::Output => edge.outputs.first().map(|&f| absolute(f)).into_iter().collect(),
        Token::Depfile => edge
            .outputs
            .first()
            .map(|&f| format!("{}.d", absolute(f)))
            .into_iter()
            .collect(),
        Token::Var(name) => edge.vars.get(*name).cloned().into_iter().collect(),
        Token::Join(inner) => vec![inner
            .iter()
            .map(|t| words(graph, ctx, edge, t).concat())
            .collect::<String>()],
    }
}
