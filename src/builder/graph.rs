//! The backend-agnostic build graph.
//!
//! [`BuildGraph`] is the mutable form used while a description is compiled.
//! It enforces the single-producer invariant as edges are added. Calling
//! [`BuildGraph::finish`] checks for cycles and freezes it into a
//! [`CompiledGraph`], which is all a backend ever sees.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use petgraph::graph::DiGraph;
use serde::Serialize;
use serde_json::json;

use crate::builder::cycle::find_cycle;
use crate::builder::toolchain::{Rule, Token};
use crate::core::description::ProjectInfo;
use crate::core::flags::FlagList;
use crate::core::language::Language;
use crate::core::path::{BuildPath, Root};
use crate::errors::ConfigurationError;

pub type FileId = usize;
pub type EdgeId = usize;
pub type TargetId = usize;

/// A file and the edge that produces it, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileNode {
    pub path: BuildPath,
    pub producer: Option<EdgeId>,
}

/// What a target builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Header,
    StaticLibrary,
    SharedLibrary,
    Executable,
    PackageExport,
}

impl TargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Header => "header",
            TargetKind::StaticLibrary => "static_library",
            TargetKind::SharedLibrary => "shared_library",
            TargetKind::Executable => "executable",
            TargetKind::PackageExport => "package_export",
        }
    }

    pub fn is_library(&self) -> bool {
        matches!(self, TargetKind::StaticLibrary | TargetKind::SharedLibrary)
    }
}

/// A named build product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetNode {
    pub name: String,
    pub kind: TargetKind,
    /// Primary output first (the archive, library, executable or `.pc`)
    pub outputs: Vec<FileId>,
    /// Language whose driver links the target
    pub language: Option<Language>,
    /// Targets this one was declared to link against, in order
    pub deps: Vec<TargetId>,
}

/// How an edge produces its outputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipe {
    /// Run a rule from the graph's rule table
    Rule(String),
    /// Write fixed contents, computed at generation time
    Generated { contents: String },
}

/// When an edge runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgePhase {
    Build,
    Install,
}

/// One build step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub owner: TargetId,
    pub recipe: Recipe,
    /// Explicit inputs, passed on the command line
    pub inputs: Vec<FileId>,
    /// Inputs that trigger a rebuild but are not passed (headers)
    pub implicit: Vec<FileId>,
    /// Inputs that must exist first but never trigger a rebuild
    pub order_only: Vec<FileId>,
    pub outputs: Vec<FileId>,
    pub flags: FlagList,
    /// Per-edge variables referenced by the rule (`target` for symlinks)
    pub vars: BTreeMap<String, String>,
    pub phase: EdgePhase,
}

impl Edge {
    pub fn new(owner: TargetId, recipe: Recipe) -> Self {
        Edge {
            owner,
            recipe,
            inputs: Vec::new(),
            implicit: Vec::new(),
            order_only: Vec::new(),
            outputs: Vec::new(),
            flags: FlagList::new(),
            vars: BTreeMap::new(),
            phase: EdgePhase::Build,
        }
    }

    pub fn rule(owner: TargetId, rule: &Rule) -> Self {
        Edge::new(owner, Recipe::Rule(rule.name.clone()))
    }

    pub fn inputs(mut self, files: impl IntoIterator<Item = FileId>) -> Self {
        self.inputs.extend(files);
        self
    }

    pub fn implicit(mut self, files: impl IntoIterator<Item = FileId>) -> Self {
        self.implicit.extend(files);
        self
    }

    pub fn order_only(mut self, files: impl IntoIterator<Item = FileId>) -> Self {
        self.order_only.extend(files);
        self
    }

    pub fn outputs(mut self, files: impl IntoIterator<Item = FileId>) -> Self {
        self.outputs.extend(files);
        self
    }

    pub fn flags(mut self, flags: FlagList) -> Self {
        self.flags = flags;
        self
    }

    pub fn var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    pub fn phase(mut self, phase: EdgePhase) -> Self {
        self.phase = phase;
        self
    }

    /// Every file the edge reads, in order: explicit, implicit, order-only.
    pub fn all_inputs(&self) -> impl Iterator<Item = FileId> + '_ {
        self.inputs
            .iter()
            .chain(&self.implicit)
            .chain(&self.order_only)
            .copied()
    }

    pub fn rule_name(&self) -> Option<&str> {
        match &self.recipe {
            Recipe::Rule(name) => Some(name),
            Recipe::Generated { .. } => None,
        }
    }
}

/// Mutable graph under construction.
#[derive(Debug, Clone)]
pub struct BuildGraph {
    project: ProjectInfo,
    files: Vec<FileNode>,
    index: HashMap<BuildPath, FileId>,
    targets: Vec<TargetNode>,
    edges: Vec<Edge>,
    rules: BTreeMap<String, Rule>,
    defaults: Vec<FileId>,
}

impl BuildGraph {
    pub fn new(project: ProjectInfo) -> Self {
        BuildGraph {
            project,
            files: Vec::new(),
            index: HashMap::new(),
            targets: Vec::new(),
            edges: Vec::new(),
            rules: BTreeMap::new(),
            defaults: Vec::new(),
        }
    }

    /// Add a file, or return the existing id for the same normalized path.
    pub fn add_file(&mut self, path: BuildPath) -> FileId {
        if let Some(&id) = self.index.get(&path) {
            return id;
        }
        let id = self.files.len();
        self.index.insert(path.clone(), id);
        self.files.push(FileNode {
            path,
            producer: None,
        });
        id
    }

    pub fn add_target(&mut self, name: impl Into<String>, kind: TargetKind) -> TargetId {
        self.targets.push(TargetNode {
            name: name.into(),
            kind,
            outputs: Vec::new(),
            language: None,
            deps: Vec::new(),
        });
        self.targets.len() - 1
    }

    pub fn target_mut(&mut self, id: TargetId) -> &mut TargetNode {
        &mut self.targets[id]
    }

    pub fn target(&self, id: TargetId) -> &TargetNode {
        &self.targets[id]
    }

    pub fn file(&self, id: FileId) -> &FileNode {
        &self.files[id]
    }

    /// Register a rule. Rules are keyed by name; re-adding is a no-op.
    pub fn add_rule(&mut self, rule: Rule) -> &Rule {
        self.rules.entry(rule.name.clone()).or_insert(rule)
    }

    /// Add an edge, claiming its outputs.
    ///
    /// Fails without modifying the graph if any output already has a
    /// producer or lives outside the build and install trees.
    pub fn add_edge(&mut self, edge: Edge) -> Result<EdgeId, ConfigurationError> {
        debug_assert!(edge
            .rule_name()
            .map_or(true, |name| self.rules.contains_key(name)));

        let mut claimed = BTreeSet::new();
        for &output in &edge.outputs {
            let file = &self.files[output];
            if matches!(file.path.root(), Root::Source | Root::External) {
                return Err(ConfigurationError::InvalidPath {
                    path: file.path.to_string(),
                    reason: "generated files must live in the build or install directory".to_string(),
                });
            }

            let first = match file.producer {
                Some(existing) => Some(self.edges[existing].owner),
                None if !claimed.insert(output) => Some(edge.owner),
                None => None,
            };
            if let Some(first) = first {
                return Err(ConfigurationError::DuplicateProducer {
                    path: file.path.to_string(),
                    first: self.targets[first].name.clone(),
                    second: self.targets[edge.owner].name.clone(),
                });
            }
        }

        let id = self.edges.len();
        for &output in &edge.outputs {
            self.files[output].producer = Some(id);
        }
        tracing::debug!(
            "edge {} for `{}`: {} -> {}",
            id,
            self.targets[edge.owner].name,
            edge.rule_name().unwrap_or("generated"),
            edge.outputs
                .iter()
                .map(|&o| self.files[o].path.to_string())
                .collect::<Vec<_>>()
                .join(" ")
        );
        self.edges.push(edge);
        Ok(id)
    }

    /// Mark a file as built by default.
    pub fn add_default(&mut self, file: FileId) {
        if !self.defaults.contains(&file) {
            self.defaults.push(file);
        }
    }

    /// Check for cycles and freeze the graph.
    pub fn finish(self) -> Result<CompiledGraph, ConfigurationError> {
        // Edge dependency relation: producer -> consumer.
        let mut edge_graph: DiGraph<EdgeId, ()> = DiGraph::new();
        let nodes: Vec<_> = (0..self.edges.len()).map(|i| edge_graph.add_node(i)).collect();
        let mut consumers: Vec<BTreeSet<EdgeId>> = vec![BTreeSet::new(); self.edges.len()];
        for (id, edge) in self.edges.iter().enumerate() {
            for input in edge.all_inputs() {
                if let Some(producer) = self.files[input].producer {
                    if consumers[producer].insert(id) {
                        edge_graph.add_edge(nodes[producer], nodes[id], ());
                    }
                }
            }
        }

        if let Some(cycle) = find_cycle(&edge_graph) {
            let owners = cycle.iter().map(|n| self.edges[edge_graph[*n]].owner);
            return Err(self.cycle_error(owners));
        }

        // Target relation induced by edges: owner of producer -> owner of consumer.
        let mut target_graph: DiGraph<TargetId, ()> = DiGraph::new();
        let tnodes: Vec<_> = (0..self.targets.len()).map(|i| target_graph.add_node(i)).collect();
        let mut seen = BTreeSet::new();
        for (producer, users) in consumers.iter().enumerate() {
            let from = self.edges[producer].owner;
            for &user in users {
                let to = self.edges[user].owner;
                if from != to && seen.insert((from, to)) {
                    target_graph.add_edge(tnodes[from], tnodes[to], ());
                }
            }
        }
        if let Some(cycle) = find_cycle(&target_graph) {
            let owners = cycle.iter().map(|n| target_graph[*n]);
            return Err(self.cycle_error(owners));
        }

        // Kahn's algorithm; the lowest ready edge id goes first.
        let mut pending: Vec<usize> = vec![0; self.edges.len()];
        for users in &consumers {
            for &user in users {
                pending[user] += 1;
            }
        }
        let mut ready: BTreeSet<EdgeId> = (0..self.edges.len()).filter(|&e| pending[e] == 0).collect();
        let mut order = Vec::with_capacity(self.edges.len());
        while let Some(edge) = ready.pop_first() {
            order.push(edge);
            for &user in &consumers[edge] {
                pending[user] -= 1;
                if pending[user] == 0 {
                    ready.insert(user);
                }
            }
        }

        tracing::info!(
            "build graph: {} targets, {} edges, {} files",
            self.targets.len(),
            self.edges.len(),
            self.files.len()
        );

        Ok(CompiledGraph {
            project: self.project,
            files: self.files,
            targets: self.targets,
            edges: self.edges,
            rules: self.rules,
            defaults: self.defaults,
            order,
        })
    }

    /// Name the targets of a cycle in order, closing the loop.
    fn cycle_error(&self, owners: impl Iterator<Item = TargetId>) -> ConfigurationError {
        let mut targets: Vec<String> = Vec::new();
        for owner in owners {
            let name = &self.targets[owner].name;
            if !targets.contains(name) {
                targets.push(name.clone());
            }
        }
        if let Some(first) = targets.first().cloned() {
            targets.push(first);
        }
        ConfigurationError::DependencyCycle { targets }
    }
}

/// A validated, immutable build graph.
#[derive(Debug, Clone)]
pub struct CompiledGraph {
    project: ProjectInfo,
    files: Vec<FileNode>,
    targets: Vec<TargetNode>,
    edges: Vec<Edge>,
    rules: BTreeMap<String, Rule>,
    defaults: Vec<FileId>,
    order: Vec<EdgeId>,
}

impl CompiledGraph {
    pub fn project(&self) -> &ProjectInfo {
        &self.project
    }

    pub fn files(&self) -> &[FileNode] {
        &self.files
    }

    pub fn path(&self, id: FileId) -> &BuildPath {
        &self.files[id].path
    }

    pub fn producer(&self, id: FileId) -> Option<EdgeId> {
        self.files[id].producer
    }

    pub fn targets(&self) -> &[TargetNode] {
        &self.targets
    }

    pub fn target(&self, id: TargetId) -> &TargetNode {
        &self.targets[id]
    }

    /// Look up a target by name.
    pub fn target_named(&self, name: &str) -> Option<(TargetId, &TargetNode)> {
        self.targets.iter().enumerate().find(|(_, t)| t.name == name)
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.edges[id]
    }

    /// Edges owned by a target, in insertion order.
    pub fn edges_of(&self, target: TargetId) -> impl Iterator<Item = (EdgeId, &Edge)> {
        self.edges
            .iter()
            .enumerate()
            .filter(move |(_, e)| e.owner == target)
    }

    pub fn rules(&self) -> &BTreeMap<String, Rule> {
        &self.rules
    }

    pub fn rule(&self, name: &str) -> Option<&Rule> {
        self.rules.get(name)
    }

    /// Files built by default.
    pub fn defaults(&self) -> &[FileId] {
        &self.defaults
    }

    /// Edges in dependency order, producers before consumers.
    pub fn topo_order(&self) -> &[EdgeId] {
        &self.order
    }

    /// Edges of one phase, in dependency order.
    pub fn ordered(&self, phase: EdgePhase) -> impl Iterator<Item = (EdgeId, &Edge)> {
        self.order
            .iter()
            .map(move |&id| (id, &self.edges[id]))
            .filter(move |(_, e)| e.phase == phase)
    }

    /// Edges that write generated contents, with the file they write.
    pub fn generated(&self) -> impl Iterator<Item = (FileId, &str)> {
        self.edges.iter().filter_map(|e| match &e.recipe {
            Recipe::Generated { contents } => e.outputs.first().map(|&f| (f, contents.as_str())),
            Recipe::Rule(_) => None,
        })
    }

    /// A JSON rendering for inspection.
    pub fn describe(&self) -> serde_json::Value {
        let paths = |ids: &[FileId]| -> Vec<String> {
            ids.iter().map(|&id| self.files[id].path.to_string()).collect()
        };

        let rules: Vec<_> = self
            .rules
            .values()
            .map(|rule| {
                json!({
                    "name": rule.name,
                    "kind": rule.kind,
                    "label": rule.label,
                    "deps": rule.deps,
                    "command": template(&rule.command),
                })
            })
            .collect();

        let targets: Vec<_> = self
            .targets
            .iter()
            .map(|t| {
                json!({
                    "name": t.name,
                    "kind": t.kind,
                    "outputs": paths(&t.outputs),
                    "deps": t.deps.iter().map(|&d| self.targets[d].name.clone()).collect::<Vec<_>>(),
                })
            })
            .collect();

        let edges: Vec<_> = self
            .order
            .iter()
            .map(|&id| {
                let e = &self.edges[id];
                let recipe = match &e.recipe {
                    Recipe::Rule(name) => json!({ "rule": name }),
                    Recipe::Generated { contents } => json!({ "generated": contents }),
                };
                json!({
                    "id": id,
                    "owner": self.targets[e.owner].name,
                    "recipe": recipe,
                    "phase": e.phase,
                    "inputs": paths(&e.inputs),
                    "implicit": paths(&e.implicit),
                    "order_only": paths(&e.order_only),
                    "outputs": paths(&e.outputs),
                    "flags": e.flags,
                    "vars": e.vars,
                })
            })
            .collect();

        json!({
            "project": self.project.name,
            "version": self.project.version,
            "rules": rules,
            "targets": targets,
            "edges": edges,
            "defaults": paths(&self.defaults),
        })
    }
}

/// Render a command template with ninja-style placeholders.
pub fn template(tokens: &[Token]) -> String {
    fn one(token: &Token) -> String {
        match token {
            Token::Lit(s) => s.clone(),
            Token::Tool(var) => format!("${}", var.as_str()),
            Token::Flags(var) => format!("${}", var.as_str()),
            Token::Inputs => "$in".to_string(),
            Token::Output => "$out".to_string(),
            Token::Depfile => "$out.d".to_string(),
            Token::Var(name) => format!("${}", name),
            Token::Join(inner) => inner.iter().map(one).collect(),
        }
    }
    tokens.iter().map(one).collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::toolchain::{self, RuleKind};
    use crate::core::environment::{Platform, ToolchainId};

    fn project() -> ProjectInfo {
        ProjectInfo {
            name: "demo".into(),
            version: None,
        }
    }

    fn compile_rule() -> Rule {
        toolchain::for_id(ToolchainId::Gcc, Platform::Linux)
            .unwrap()
            .rule(RuleKind::Compile(Language::C))
            .unwrap()
    }

    fn build(path: &str) -> BuildPath {
        BuildPath::build(path).unwrap()
    }

    #[test]
    fn test_add_file_is_idempotent() {
        let mut g = BuildGraph::new(project());
        let a = g.add_file(build("x/./a.o"));
        let b = g.add_file(build("x/a.o"));
        assert_eq!(a, b);
    }

    #[test]
    fn test_duplicate_producer_names_both_targets() {
        let mut g = BuildGraph::new(project());
        let rule = g.add_rule(compile_rule()).clone();
        let foo = g.add_target("foo", TargetKind::StaticLibrary);
        let bar = g.add_target("bar", TargetKind::StaticLibrary);
        let src = g.add_file(BuildPath::source("a.c").unwrap());
        let obj = g.add_file(build("a.o"));

        g.add_edge(Edge::rule(foo, &rule).inputs([src]).outputs([obj]))
            .unwrap();
        let err = g
            .add_edge(Edge::rule(bar, &rule).inputs([src]).outputs([obj]))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::DuplicateProducer {
                path: "a.o".into(),
                first: "foo".into(),
                second: "bar".into(),
            }
        );
    }

    #[test]
    fn test_sources_cannot_be_outputs() {
        let mut g = BuildGraph::new(project());
        let rule = g.add_rule(compile_rule()).clone();
        let t = g.add_target("t", TargetKind::Executable);
        let src = g.add_file(BuildPath::source("a.c").unwrap());
        assert!(matches!(
            g.add_edge(Edge::rule(t, &rule).outputs([src])),
            Err(ConfigurationError::InvalidPath { .. })
        ));
    }

    #[test]
    fn test_edge_cycle_names_targets() {
        let mut g = BuildGraph::new(project());
        let rule = g.add_rule(compile_rule()).clone();
        let a = g.add_target("a", TargetKind::StaticLibrary);
        let b = g.add_target("b", TargetKind::StaticLibrary);
        let fa = g.add_file(build("a.out"));
        let fb = g.add_file(build("b.out"));
        g.add_edge(Edge::rule(a, &rule).inputs([fb]).outputs([fa])).unwrap();
        g.add_edge(Edge::rule(b, &rule).inputs([fa]).outputs([fb])).unwrap();

        let err = g.finish().unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::DependencyCycle {
                targets: vec!["a".into(), "b".into(), "a".into()]
            }
        );
    }

    #[test]
    fn test_topological_order_is_deterministic() {
        let mut g = BuildGraph::new(project());
        let rule = g.add_rule(compile_rule()).clone();
        let t = g.add_target("t", TargetKind::Executable);
        let exe = g.add_file(build("app"));
        let o1 = g.add_file(build("a.o"));
        let o2 = g.add_file(build("b.o"));
        let s1 = g.add_file(BuildPath::source("a.c").unwrap());
        let s2 = g.add_file(BuildPath::source("b.c").unwrap());

        // The consumer is added first; it must still come last.
        g.add_edge(Edge::rule(t, &rule).inputs([o1, o2]).outputs([exe]))
            .unwrap();
        g.add_edge(Edge::rule(t, &rule).inputs([s2]).outputs([o2])).unwrap();
        g.add_edge(Edge::rule(t, &rule).inputs([s1]).outputs([o1])).unwrap();

        let compiled = g.finish().unwrap();
        assert_eq!(compiled.topo_order(), &[1, 2, 0]);
    }

    #[test]
    fn test_describe_is_json() {
        let mut g = BuildGraph::new(project());
        let rule = g.add_rule(compile_rule()).clone();
        let t = g.add_target("t", TargetKind::Executable);
        let s = g.add_file(BuildPath::source("a.c").unwrap());
        let o = g.add_file(build("a.o"));
        g.add_edge(Edge::rule(t, &rule).inputs([s]).outputs([o])).unwrap();

        let value = g.finish().unwrap().describe();
        assert_eq!(value["project"], "demo");
        assert_eq!(value["edges"][0]["inputs"][0], "{srcdir}/a.c");
        assert_eq!(value["edges"][0]["recipe"]["rule"], "c_compile");
        assert_eq!(
            value["rules"][0]["command"],
            "$cc $cflags -MD -MF $out.d -c $in -o $out"
        );
    }
}
