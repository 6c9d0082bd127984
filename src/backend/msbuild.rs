//! MSBuild backend.
//!
//! Writes a Visual Studio solution and one `.vcxproj` per compiled target,
//! all in the build directory. Each source becomes a `ClCompile` item
//! carrying the exact flags and object name of its compile edge; library
//! dependencies are passed explicitly to the linker and project references
//! only order the builds.
//!
//! MSBuild runs MSVC itself and has no notion of install steps, symlinks or
//! order-only inputs. Graphs that need any of these are rejected.

use std::collections::{BTreeSet, HashMap};

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::builder::graph::{CompiledGraph, Edge, EdgePhase, FileId, TargetId, TargetKind};
use crate::builder::toolchain::{FlagVar, RuleKind};
use crate::core::environment::ToolchainId;
use crate::core::language::Language;
use crate::core::path::{BuildPath, Root};
use crate::errors::EmissionError;
use crate::util::hash::Fingerprint;

use super::command::{self, ArgRenderer, Shell};
use super::{Backend, BackendId, EmitContext, RenderedFile};

const MSBUILD_NS: &str = "http://schemas.microsoft.com/developer/msbuild/2003";
const CPP_PROJECT_TYPE: &str = "8BC9CEB8-8B4A-11D0-8D11-00A0C91BC942";
const CONFIGURATION: &str = "Release";
const PLATFORM: &str = "x64";

/// Emits `<project>.sln` and `<target>.vcxproj` files.
#[derive(Debug, Clone, Copy, Default)]
pub struct MsbuildBackend;

impl Backend for MsbuildBackend {
    fn id(&self) -> BackendId {
        BackendId::Msbuild
    }

    fn render(&self, graph: &CompiledGraph, ctx: &EmitContext<'_>) -> Result<Vec<RenderedFile>, EmissionError> {
        validate(graph, ctx)?;

        let projects: Vec<ProjectInfo> = graph
            .targets()
            .iter()
            .enumerate()
            .filter(|(_, t)| t.kind.is_library() || t.kind == TargetKind::Executable)
            .map(|(id, t)| ProjectInfo {
                target: id,
                name: t.name.clone(),
                guid: project_guid(&graph.project().name, &t.name),
            })
            .collect();
        let guids: HashMap<TargetId, &ProjectInfo> = projects.iter().map(|p| (p.target, p)).collect();

        let mut files = Vec::with_capacity(projects.len() + 1);
        for project in &projects {
            let contents = render_project(graph, ctx, project, &guids)?;
            files.push(RenderedFile::new(format!("{}.vcxproj", project.name), contents));
        }
        files.push(RenderedFile::new(
            format!("{}.sln", graph.project().name),
            render_solution(&projects),
        ));
        Ok(files)
    }
}

#[derive(Debug, Clone)]
struct ProjectInfo {
    target: TargetId,
    name: String,
    guid: String,
}

/// Stable project GUID derived from the project and target names.
fn project_guid(project: &str, target: &str) -> String {
    let mut fp = Fingerprint::new();
    fp.update_str("vcxproj").update_str(project).update_str(target);
    fp.finish_guid()
}

fn unsupported(feature: impl Into<String>) -> EmissionError {
    EmissionError::UnsupportedGraphFeature {
        backend: "msbuild".to_string(),
        feature: feature.into(),
    }
}

fn xml_error(e: impl std::fmt::Display) -> EmissionError {
    EmissionError::Render {
        backend: "msbuild".to_string(),
        message: e.to_string(),
    }
}

fn validate(graph: &CompiledGraph, ctx: &EmitContext<'_>) -> Result<(), EmissionError> {
    let toolchain = ctx.env().toolchain_id();
    if toolchain != ToolchainId::Msvc {
        return Err(unsupported(format!(
            "the {} toolchain (MSBuild projects drive MSVC only)",
            toolchain
        )));
    }

    for edge in graph.edges() {
        command::check_edge("msbuild", edge)?;
        let owner = &graph.target(edge.owner).name;
        if edge.phase == EdgePhase::Install {
            return Err(unsupported(format!("install steps (target `{}`)", owner)));
        }
        if !edge.order_only.is_empty() {
            return Err(unsupported(format!("order-only inputs (target `{}`)", owner)));
        }
        if rule_kind(graph, edge) == Some(RuleKind::Symlink) {
            return Err(unsupported(format!("symlinks (target `{}`)", owner)));
        }
    }
    Ok(())
}

fn rule_kind(graph: &CompiledGraph, edge: &Edge) -> Option<RuleKind> {
    edge.rule_name().and_then(|name| graph.rule(name)).map(|r| r.kind)
}

/// Escape MSBuild's special characters in property and item text.
pub fn escape_msbuild(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '%' => out.push_str("%25"),
            '$' => out.push_str("%24"),
            '@' => out.push_str("%40"),
            ';' => out.push_str("%3B"),
            '\'' => out.push_str("%27"),
            '*' => out.push_str("%2A"),
            '?' => out.push_str("%3F"),
            c => out.push(c),
        }
    }
    out
}

/// A path relative to the build directory, Windows style.
fn windows_path(ctx: &EmitContext<'_>, path: &BuildPath) -> String {
    ctx.concrete(path).replace('/', "\\")
}

fn item_path(ctx: &EmitContext<'_>, graph: &CompiledGraph, file: FileId) -> String {
    escape_msbuild(&windows_path(ctx, graph.path(file)))
}

/// Minimal element writer over quick-xml.
struct Xml {
    writer: Writer<Vec<u8>>,
}

impl Xml {
    fn new() -> Result<Self, EmissionError> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
            .map_err(xml_error)?;
        Ok(Xml { writer })
    }

    fn element(name: &str, attrs: &[(&str, &str)]) -> BytesStart<'static> {
        let mut start = BytesStart::new(name.to_string());
        for &attr in attrs {
            start.push_attribute(attr);
        }
        start
    }

    fn start(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<(), EmissionError> {
        self.writer
            .write_event(Event::Start(Xml::element(name, attrs)))
            .map_err(xml_error)
    }

    fn end(&mut self, name: &str) -> Result<(), EmissionError> {
        self.writer
            .write_event(Event::End(BytesEnd::new(name)))
            .map_err(xml_error)
    }

    fn empty(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<(), EmissionError> {
        self.writer
            .write_event(Event::Empty(Xml::element(name, attrs)))
            .map_err(xml_error)
    }

    fn text(&mut self, name: &str, text: &str) -> Result<(), EmissionError> {
        self.start(name, &[])?;
        self.writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(xml_error)?;
        self.end(name)
    }

    fn finish(self) -> Result<String, EmissionError> {
        let mut contents = String::from_utf8(self.writer.into_inner()).map_err(xml_error)?;
        contents.push('\n');
        Ok(contents)
    }
}

fn render_project(
    graph: &CompiledGraph,
    ctx: &EmitContext<'_>,
    project: &ProjectInfo,
    guids: &HashMap<TargetId, &ProjectInfo>,
) -> Result<String, EmissionError> {
    let target = graph.target(project.target);
    let edges: Vec<&Edge> = graph.edges_of(project.target).map(|(_, e)| e).collect();
    let compiles: Vec<(&Edge, Language)> = edges
        .iter()
        .filter_map(|e| match rule_kind(graph, e) {
            Some(RuleKind::Compile(lang)) => Some((*e, lang)),
            _ => None,
        })
        .collect();
    let final_edge = edges.iter().copied().find(|e| {
        matches!(
            rule_kind(graph, e),
            Some(RuleKind::Archive | RuleKind::LinkShared(_) | RuleKind::LinkExecutable(_))
        )
    });

    let configuration_type = match target.kind {
        TargetKind::StaticLibrary => "StaticLibrary",
        TargetKind::SharedLibrary => "DynamicLibrary",
        _ => "Application",
    };
    let primary = target
        .outputs
        .first()
        .map(|&f| graph.path(f).file_name().to_string())
        .unwrap_or_else(|| target.name.clone());
    let (target_name, target_ext) = match primary.rfind('.') {
        Some(dot) => (&primary[..dot], &primary[dot..]),
        None => (primary.as_str(), ""),
    };

    let flag_path = |p: &BuildPath| escape_msbuild(&Shell::Cmd.quote(&windows_path(ctx, p)));
    let renderer = ArgRenderer {
        shell: Shell::Cmd,
        escape: escape_msbuild,
        path: &flag_path,
    };
    let config = format!("{}|{}", CONFIGURATION, PLATFORM);

    let mut xml = Xml::new()?;
    xml.start("Project", &[("DefaultTargets", "Build"), ("xmlns", MSBUILD_NS)])?;

    xml.start("ItemGroup", &[("Label", "ProjectConfigurations")])?;
    xml.start("ProjectConfiguration", &[("Include", &config)])?;
    xml.text("Configuration", CONFIGURATION)?;
    xml.text("Platform", PLATFORM)?;
    xml.end("ProjectConfiguration")?;
    xml.end("ItemGroup")?;

    xml.start("PropertyGroup", &[("Label", "Globals")])?;
    xml.text("ProjectGuid", &format!("{{{}}}", project.guid))?;
    xml.text("RootNamespace", &escape_msbuild(&target.name))?;
    xml.text("Keyword", "Win32Proj")?;
    xml.end("PropertyGroup")?;

    xml.empty("Import", &[("Project", "$(VCTargetsPath)\\Microsoft.Cpp.Default.props")])?;
    xml.start("PropertyGroup", &[("Label", "Configuration")])?;
    xml.text("ConfigurationType", configuration_type)?;
    xml.text("PlatformToolset", "$(DefaultPlatformToolset)")?;
    xml.end("PropertyGroup")?;
    xml.empty("Import", &[("Project", "$(VCTargetsPath)\\Microsoft.Cpp.props")])?;

    xml.start("PropertyGroup", &[])?;
    xml.text("OutDir", "$(MSBuildProjectDirectory)\\")?;
    xml.text("IntDir", &format!("{}.dir\\", escape_msbuild(&target.name)))?;
    xml.text("TargetName", &escape_msbuild(target_name))?;
    xml.text("TargetExt", &escape_msbuild(target_ext))?;
    xml.end("PropertyGroup")?;

    if let Some(edge) = final_edge {
        let objects: BTreeSet<FileId> = compiles
            .iter()
            .flat_map(|(e, _)| e.outputs.iter().copied())
            .collect();
        let tool = if target.kind == TargetKind::StaticLibrary {
            "Lib"
        } else {
            "Link"
        };

        xml.start("ItemDefinitionGroup", &[])?;
        xml.start(tool, &[])?;
        if tool == "Link" {
            let options = renderer.flags(ctx.toolchain(), command::flag_values(edge, FlagVar::Ldflags));
            if !options.is_empty() {
                xml.text("AdditionalOptions", &format!("{} %(AdditionalOptions)", options))?;
            }

            let mut dependencies: Vec<String> = edge
                .inputs
                .iter()
                .filter(|f| !objects.contains(f))
                .map(|&f| item_path(ctx, graph, f))
                .collect();
            for value in command::flag_values(edge, FlagVar::Ldlibs) {
                dependencies.extend(ctx.toolchain().render_flag(value).iter().map(|a| renderer.arg(a)));
            }
            if !dependencies.is_empty() {
                dependencies.push("%(AdditionalDependencies)".to_string());
                xml.text("AdditionalDependencies", &dependencies.join(";"))?;
            }
        }
        xml.end(tool)?;
        xml.end("ItemDefinitionGroup")?;
    }

    if !compiles.is_empty() {
        xml.start("ItemGroup", &[])?;
        for (edge, lang) in &compiles {
            let Some(&source) = edge.inputs.first() else {
                continue;
            };
            xml.start("ClCompile", &[("Include", &item_path(ctx, graph, source))])?;
            let options = renderer.flags(ctx.toolchain(), command::flag_values(edge, FlagVar::Compile(*lang)));
            if !options.is_empty() {
                xml.text("AdditionalOptions", &format!("{} %(AdditionalOptions)", options))?;
            }
            if let Some(&object) = edge.outputs.first() {
                xml.text("ObjectFileName", &item_path(ctx, graph, object))?;
            }
            let compile_as = if *lang == Language::Cxx {
                "CompileAsCpp"
            } else {
                "CompileAsC"
            };
            xml.text("CompileAs", compile_as)?;
            xml.end("ClCompile")?;
        }
        xml.end("ItemGroup")?;
    }

    let headers: BTreeSet<FileId> = compiles
        .iter()
        .flat_map(|(e, _)| e.implicit.iter().copied())
        .filter(|&f| graph.path(f).root() == Root::Source)
        .collect();
    if !headers.is_empty() {
        xml.start("ItemGroup", &[])?;
        for header in headers {
            xml.empty("ClInclude", &[("Include", &item_path(ctx, graph, header))])?;
        }
        xml.end("ItemGroup")?;
    }

    let references: Vec<&ProjectInfo> = target.deps.iter().filter_map(|d| guids.get(d).copied()).collect();
    if !references.is_empty() {
        xml.start("ItemGroup", &[])?;
        for reference in references {
            let include = format!("{}.vcxproj", escape_msbuild(&reference.name));
            xml.start("ProjectReference", &[("Include", &include)])?;
            xml.text("Project", &format!("{{{}}}", reference.guid))?;
            xml.text("LinkLibraryDependencies", "false")?;
            xml.end("ProjectReference")?;
        }
        xml.end("ItemGroup")?;
    }

    xml.empty("Import", &[("Project", "$(VCTargetsPath)\\Microsoft.Cpp.targets")])?;
    xml.end("Project")?;
    xml.finish()
}

fn render_solution(projects: &[ProjectInfo]) -> String {
    let config = format!("{}|{}", CONFIGURATION, PLATFORM);
    let mut lines = vec![
        String::new(),
        "Microsoft Visual Studio Solution File, Format Version 12.00".to_string(),
        "# Visual Studio Version 17".to_string(),
    ];
    for project in projects {
        lines.push(format!(
            "Project(\"{{{}}}\") = \"{}\", \"{}.vcxproj\", \"{{{}}}\"",
            CPP_PROJECT_TYPE, project.name, project.name, project.guid
        ));
        lines.push("EndProject".to_string());
    }
    lines.push("Global".to_string());
    lines.push("\tGlobalSection(SolutionConfigurationPlatforms) = preSolution".to_string());
    lines.push(format!("\t\t{} = {}", config, config));
    lines.push("\tEndGlobalSection".to_string());
    lines.push("\tGlobalSection(ProjectConfigurationPlatforms) = postSolution".to_string());
    for project in projects {
        lines.push(format!("\t\t{{{}}}.{}.ActiveCfg = {}", project.guid, config, config));
        lines.push(format!("\t\t{{{}}}.{}.Build.0 = {}", project.guid, config, config));
    }
    lines.push("\tEndGlobalSection".to_string());
    lines.push("EndGlobal".to_string());
    lines.push(String::new());
    lines.join("\r\n")
}
