//! Compile a [`Description`] into a [`CompiledGraph`].
//!
//! Everything that can be rejected is rejected before the first edge is
//! added: references are resolved and checked, the declared dependency
//! relation is checked for cycles, and every package is resolved. Edges are
//! then added target by target in declaration order, followed by install
//! edges.
//!
//! Link flags follow one propagation policy. A static library's packages,
//! link-phase options and `link_options` are forwarded to everything that
//! links it, directly or through other static libraries, each exactly once.
//! A shared library encapsulates its dependencies: consumers link the
//! shared library alone and get a runtime search path for it.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use petgraph::graph::DiGraph;

use crate::builder::cycle::find_cycle;
use crate::builder::graph::{
    BuildGraph, CompiledGraph, Edge, EdgePhase, FileId, Recipe, TargetId, TargetKind,
};
use crate::builder::link::LinkTable;
use crate::builder::pkg_config::PcFile;
use crate::builder::toolchain::{GenericOption, RuleKind, SharedLibraryNames, Toolchain};
use crate::core::description::{
    Description, Executable, Library, LibraryKind, PackageRef, PkgConfig, TargetDecl, TargetRef,
};
use crate::core::environment::Environment;
use crate::core::flags::{Flag, FlagList, FlagOrigin, FlagValue, Phase};
use crate::core::language::Language;
use crate::core::package::{Package, PackageRequest};
use crate::core::path::{BuildPath, InstallRoot};
use crate::errors::{ConfigurationError, GenerateError};
use crate::resolver::PackageResolver;

/// Turns descriptions into graphs for one environment.
#[derive(Debug, Clone, Copy)]
pub struct GraphCompiler<'a> {
    env: &'a Environment,
    resolver: &'a PackageResolver,
}

impl<'a> GraphCompiler<'a> {
    pub fn new(env: &'a Environment, resolver: &'a PackageResolver) -> Self {
        GraphCompiler { env, resolver }
    }

    /// Validate a description and build its graph.
    pub fn compile(&self, desc: &Description) -> Result<CompiledGraph, GenerateError> {
        tracing::info!(
            "compiling `{}` ({} targets) for {}",
            desc.project().name,
            desc.targets().len(),
            self.env.key()
        );

        let planned = plan(desc, self.env)?;
        check_declared_cycles(desc, &planned)?;
        let packages = self.resolve_packages(&planned)?;

        let mut table = LinkTable::new();
        for (id, item) in planned.iter().enumerate() {
            if let Planned::Unit(unit) = item {
                if let Some(kind) = unit.library_kind() {
                    table.insert(id, kind, unit.libs.clone());
                }
            }
        }

        let mut graph = BuildGraph::new(desc.project().clone());
        for (decl, item) in desc.targets().iter().zip(&planned) {
            graph.add_target(decl.name(), item.kind());
        }

        let mut state = Compilation {
            env: self.env,
            tc: self.env.toolchain(),
            desc,
            planned: &planned,
            packages,
            table,
            products: vec![None; planned.len()],
            graph,
        };

        state.name_outputs()?;
        for id in 0..planned.len() {
            state.add_target_edges(id)?;
        }
        state.add_installs()?;

        Ok(state.graph.finish()?)
    }

    /// Resolve every referenced package: all at once in parallel, then read
    /// back per target in declaration order so the first failure reported
    /// is deterministic.
    fn resolve_packages(&self, planned: &[Planned<'_>]) -> Result<Vec<Vec<Arc<Package>>>, GenerateError> {
        let mut requests: Vec<PackageRequest> = Vec::new();
        for item in planned {
            if let Planned::Unit(unit) = item {
                for &request in &unit.packages {
                    if !requests.contains(request) {
                        requests.push(request.clone());
                    }
                }
            }
        }

        tracing::debug!("resolving {} packages", requests.len());
        self.resolver.prefetch(&requests, self.env);

        planned
            .iter()
            .map(|item| match item {
                Planned::Unit(unit) => unit
                    .packages
                    .iter()
                    .map(|request| {
                        self.resolver
                            .resolve(request, self.env)
                            .map_err(GenerateError::from)
                    })
                    .collect::<Result<Vec<_>, GenerateError>>(),
                _ => Ok(Vec::new()),
            })
            .collect()
    }
}

/// A library or executable after its references were resolved.
#[derive(Debug)]
struct Unit<'d> {
    name: &'d str,
    kind: TargetKind,
    sources: Vec<(BuildPath, Language)>,
    headers: Vec<BuildPath>,
    include_dirs: Vec<BuildPath>,
    libs: Vec<TargetId>,
    /// Subset of `libs` linked with every member
    whole_archive: Vec<TargetId>,
    packages: Vec<&'d PackageRequest>,
    options: Vec<GenericOption>,
    compile_options: &'d [String],
    link_options: &'d [String],
    version: Option<&'d str>,
    soversion: Option<&'d str>,
}

impl Unit<'_> {
    fn library_kind(&self) -> Option<LibraryKind> {
        match self.kind {
            TargetKind::StaticLibrary => Some(LibraryKind::Static),
            TargetKind::SharedLibrary => Some(LibraryKind::Shared),
            _ => None,
        }
    }
}

#[derive(Debug)]
enum Planned<'d> {
    Header(BuildPath),
    Unit(Unit<'d>),
    Export { decl: &'d PkgConfig, library: TargetId },
}

impl Planned<'_> {
    fn kind(&self) -> TargetKind {
        match self {
            Planned::Header(_) => TargetKind::Header,
            Planned::Unit(unit) => unit.kind,
            Planned::Export { .. } => TargetKind::PackageExport,
        }
    }

    fn deps(&self) -> &[TargetId] {
        match self {
            Planned::Header(_) => &[],
            Planned::Unit(unit) => &unit.libs,
            Planned::Export { library, .. } => std::slice::from_ref(library),
        }
    }
}

/// The fields libraries and executables share.
struct Declared<'d> {
    name: &'d str,
    sources: &'d [String],
    headers: &'d [String],
    include_dirs: &'d [String],
    libs: &'d [TargetRef],
    whole_archive: &'d [TargetRef],
    packages: &'d [PackageRef],
    options: &'d [String],
    compile_options: &'d [String],
    link_options: &'d [String],
}

impl<'d> From<&'d Library> for Declared<'d> {
    fn from(lib: &'d Library) -> Self {
        Declared {
            name: &lib.name,
            sources: &lib.sources,
            headers: &lib.headers,
            include_dirs: &lib.include_dirs,
            libs: &lib.libs,
            whole_archive: &lib.whole_archive,
            packages: &lib.packages,
            options: &lib.options,
            compile_options: &lib.compile_options,
            link_options: &lib.link_options,
        }
    }
}

impl<'d> From<&'d Executable> for Declared<'d> {
    fn from(exe: &'d Executable) -> Self {
        Declared {
            name: &exe.name,
            sources: &exe.sources,
            headers: &exe.headers,
            include_dirs: &exe.include_dirs,
            libs: &exe.libs,
            whole_archive: &exe.whole_archive,
            packages: &exe.packages,
            options: &exe.options,
            compile_options: &exe.compile_options,
            link_options: &exe.link_options,
        }
    }
}

fn plan<'d>(desc: &'d Description, env: &Environment) -> Result<Vec<Planned<'d>>, GenerateError> {
    let mut planned = Vec::with_capacity(desc.targets().len());

    for decl in desc.targets() {
        let item = match decl {
            TargetDecl::Header { path } => Planned::Header(BuildPath::source(path)?),
            TargetDecl::Library(lib) => {
                let kind = match lib.kind.unwrap_or(env.default_library_kind()) {
                    LibraryKind::Static => TargetKind::StaticLibrary,
                    LibraryKind::Shared => TargetKind::SharedLibrary,
                };
                let mut unit = plan_unit(desc, kind, Declared::from(lib))?;
                unit.version = lib.version.as_deref();
                unit.soversion = lib.soversion.as_deref();
                Planned::Unit(unit)
            }
            TargetDecl::Executable(exe) => {
                Planned::Unit(plan_unit(desc, TargetKind::Executable, Declared::from(exe))?)
            }
            TargetDecl::PackageExport(pc) => {
                let from = pc.target_name();
                let reference = pc
                    .library
                    .clone()
                    .unwrap_or_else(|| TargetRef::Name(pc.name.clone()));
                let handle = desc.lookup(&reference, &from)?;
                match desc.target(handle) {
                    Some(TargetDecl::Library(_)) => Planned::Export {
                        decl: pc,
                        library: handle.index(),
                    },
                    other => {
                        return Err(ConfigurationError::InvalidDependency {
                            from,
                            name: other.map(TargetDecl::name).unwrap_or_default(),
                            reason: "only libraries can be exported".to_string(),
                        }
                        .into())
                    }
                }
            }
        };
        planned.push(item);
    }

    for item in &planned {
        let Planned::Unit(unit) = item else { continue };
        for &lib in &unit.whole_archive {
            if planned[lib].kind() != TargetKind::StaticLibrary {
                return Err(ConfigurationError::InvalidDependency {
                    from: unit.name.to_string(),
                    name: desc.targets()[lib].name(),
                    reason: "only static libraries can be linked whole".to_string(),
                }
                .into());
            }
        }
    }

    Ok(planned)
}

fn plan_unit<'d>(desc: &'d Description, kind: TargetKind, d: Declared<'d>) -> Result<Unit<'d>, GenerateError> {
    let mut sources = Vec::new();
    let mut headers = Vec::new();
    for source in d.sources {
        let path = BuildPath::source(source)?;
        match Language::from_path(path.as_str()) {
            Some(lang) => sources.push((path, lang)),
            None if Language::is_header(path.as_str()) => headers.push(path),
            None => {
                return Err(ConfigurationError::InvalidPath {
                    path: source.clone(),
                    reason: format!("`{}` lists a file that is not a C, C++ or Objective-C source", d.name),
                }
                .into())
            }
        }
    }
    if sources.is_empty() {
        return Err(ConfigurationError::EmptySources {
            name: d.name.to_string(),
        }
        .into());
    }

    for header in d.headers {
        headers.push(BuildPath::source(header)?);
    }

    let include_dirs = d
        .include_dirs
        .iter()
        .map(|dir| BuildPath::source_dir(dir))
        .collect::<Result<Vec<_>, _>>()?;

    let mut libs = Vec::new();
    for reference in d.libs {
        let handle = desc.lookup(reference, d.name)?;
        match desc.target(handle) {
            Some(TargetDecl::Library(_)) => libs.push(handle.index()),
            Some(other) => {
                return Err(ConfigurationError::InvalidDependency {
                    from: d.name.to_string(),
                    name: other.name(),
                    reason: format!("{} targets cannot be linked", other.kind_str()),
                }
                .into())
            }
            None => {
                return Err(ConfigurationError::UnknownTarget {
                    name: format!("#{}", handle.index()),
                    from: d.name.to_string(),
                }
                .into())
            }
        }
    }

    let mut whole_archive = Vec::new();
    for reference in d.whole_archive {
        let id = desc.lookup(reference, d.name)?.index();
        if !matches!(desc.targets()[id], TargetDecl::Library(_)) {
            return Err(ConfigurationError::InvalidDependency {
                from: d.name.to_string(),
                name: desc.targets()[id].name(),
                reason: "only static libraries can be linked whole".to_string(),
            }
            .into());
        }
        if !libs.contains(&id) {
            libs.push(id);
        }
        if !whole_archive.contains(&id) {
            whole_archive.push(id);
        }
    }

    let packages = d
        .packages
        .iter()
        .map(|p| desc.lookup_package(p, d.name))
        .collect::<Result<Vec<_>, _>>()?;

    let options = d
        .options
        .iter()
        .map(|o| o.parse::<GenericOption>())
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Unit {
        name: d.name,
        kind,
        sources,
        headers,
        include_dirs,
        libs,
        whole_archive,
        packages,
        options,
        compile_options: d.compile_options,
        link_options: d.link_options,
        version: None,
        soversion: None,
    })
}

/// Reject cycles in the declared relation before any edge exists.
fn check_declared_cycles(desc: &Description, planned: &[Planned<'_>]) -> Result<(), ConfigurationError> {
    let mut graph: DiGraph<TargetId, ()> = DiGraph::new();
    let nodes: Vec<_> = (0..planned.len()).map(|id| graph.add_node(id)).collect();
    for (id, item) in planned.iter().enumerate() {
        for &dep in item.deps() {
            graph.add_edge(nodes[id], nodes[dep], ());
        }
    }

    match find_cycle(&graph) {
        Some(cycle) => {
            let mut targets: Vec<String> = cycle
                .iter()
                .map(|&n| desc.targets()[graph[n]].name())
                .collect();
            if let Some(first) = targets.first().cloned() {
                targets.push(first);
            }
            Err(ConfigurationError::DependencyCycle { targets })
        }
        None => Ok(()),
    }
}

/// Files a target produces.
#[derive(Debug, Clone)]
struct Product {
    primary: FileId,
    import_library: Option<FileId>,
    /// What consumers put on their link line
    link_file: FileId,
    /// Soname link the loader needs at run time, when it is its own file
    runtime: Option<FileId>,
    shared_names: Option<SharedLibraryNames>,
    outputs: Vec<FileId>,
}

struct Compilation<'a, 'd> {
    env: &'a Environment,
    tc: &'a dyn Toolchain,
    desc: &'d Description,
    planned: &'a [Planned<'d>],
    packages: Vec<Vec<Arc<Package>>>,
    table: LinkTable,
    products: Vec<Option<Product>>,
    graph: BuildGraph,
}

impl Compilation<'_, '_> {
    fn unit(&self, id: TargetId) -> Option<&Unit<'_>> {
        match &self.planned[id] {
            Planned::Unit(unit) => Some(unit),
            _ => None,
        }
    }

    fn product(&self, id: TargetId) -> Result<&Product, GenerateError> {
        self.products[id].as_ref().ok_or_else(|| {
            ConfigurationError::InvalidDependency {
                from: self.graph.target(id).name.clone(),
                name: self.graph.target(id).name.clone(),
                reason: "target has no outputs".to_string(),
            }
            .into()
        })
    }

    /// Name the outputs of every library and executable up front, so a
    /// target can link a library declared after it.
    fn name_outputs(&mut self) -> Result<(), GenerateError> {
        let planned = self.planned;
        let tc = self.tc;
        for (id, item) in planned.iter().enumerate() {
            let Planned::Unit(unit) = item else { continue };

            let product = match unit.kind {
                TargetKind::StaticLibrary => {
                    let file = self.build_file(&tc.static_library_name(unit.name))?;
                    Product {
                        primary: file,
                        import_library: None,
                        link_file: file,
                        runtime: None,
                        shared_names: None,
                        outputs: vec![file],
                    }
                }
                TargetKind::SharedLibrary => {
                    let names = tc.shared_library_names(unit.name, unit.version, unit.soversion);
                    let file = self.build_file(&names.file)?;
                    let mut outputs = vec![file];
                    let import_library = match &names.import_library {
                        Some(implib) => {
                            let implib = self.build_file(implib)?;
                            outputs.push(implib);
                            Some(implib)
                        }
                        None => None,
                    };
                    for (link, _) in &names.symlinks {
                        outputs.push(self.build_file(link)?);
                    }
                    let link_file = self.build_file(&names.link_name)?;
                    let runtime = match &names.soname {
                        Some(soname) if soname != &names.file && soname != &names.link_name => {
                            Some(self.build_file(soname)?)
                        }
                        _ => None,
                    };
                    Product {
                        primary: file,
                        import_library,
                        link_file,
                        runtime,
                        shared_names: Some(names),
                        outputs,
                    }
                }
                TargetKind::Executable => {
                    let file = self.build_file(&tc.executable_name(unit.name))?;
                    Product {
                        primary: file,
                        import_library: None,
                        link_file: file,
                        runtime: None,
                        shared_names: None,
                        outputs: vec![file],
                    }
                }
                TargetKind::Header | TargetKind::PackageExport => continue,
            };

            let language = self.driver_language(unit);
            let node = self.graph.target_mut(id);
            node.outputs = product.outputs.clone();
            node.language = Some(language);
            node.deps = unit.libs.clone();
            self.products[id] = Some(product);
        }
        Ok(())
    }

    fn build_file(&mut self, path: &str) -> Result<FileId, ConfigurationError> {
        Ok(self.graph.add_file(BuildPath::build(path)?))
    }

    /// The driver that links a target: C++ when any object in the target
    /// or its static closure is C++, and likewise for Objective-C.
    fn driver_language(&self, unit: &Unit<'_>) -> Language {
        let mut languages: BTreeSet<Language> = unit.sources.iter().map(|(_, l)| *l).collect();
        for dep in self.table.closure(&unit.libs) {
            if self.table.kind(dep) == Some(LibraryKind::Static) {
                if let Some(dep_unit) = self.unit(dep) {
                    languages.extend(dep_unit.sources.iter().map(|(_, l)| *l));
                }
            }
        }

        let cxx = languages.iter().any(Language::needs_cxx_linker);
        let objc = languages
            .iter()
            .any(|l| matches!(l, Language::ObjC | Language::ObjCxx));
        match (cxx, objc) {
            (true, true) => Language::ObjCxx,
            (true, false) => Language::Cxx,
            (false, true) => Language::ObjC,
            (false, false) => Language::C,
        }
    }

    fn add_target_edges(&mut self, id: TargetId) -> Result<(), GenerateError> {
        let planned = self.planned;
        match &planned[id] {
            Planned::Header(_) => Ok(()),
            Planned::Unit(unit) => self.add_unit_edges(id, unit),
            Planned::Export { decl, library } => self.add_export_edge(id, decl, *library),
        }
    }

    fn add_unit_edges(&mut self, id: TargetId, unit: &Unit<'_>) -> Result<(), GenerateError> {
        let tc = self.tc;
        tracing::debug!("adding edges for {} `{}`", unit.kind.as_str(), unit.name);

        let compile_flags = self.compile_flags(id, unit);
        let headers: Vec<FileId> = unit
            .headers
            .iter()
            .map(|h| self.graph.add_file(h.clone()))
            .collect();

        let mut objects = Vec::with_capacity(unit.sources.len());
        for (source, language) in &unit.sources {
            let rule = self.graph.add_rule(tc.rule(RuleKind::Compile(*language))?).clone();
            let object = format!("{}.dir/{}", unit.name, tc.object_name(strip_extension(source.as_str())));
            let input = self.graph.add_file(source.clone());
            let output = self.build_file(&object)?;
            self.graph.add_edge(
                Edge::rule(id, &rule)
                    .inputs([input])
                    .implicit(headers.iter().copied())
                    .outputs([output])
                    .flags(compile_flags.clone()),
            )?;
            objects.push(output);
        }

        let closure = self.table.closure(&unit.libs);
        let statics: Vec<TargetId> = closure
            .iter()
            .copied()
            .filter(|&t| self.table.kind(t) == Some(LibraryKind::Static))
            .collect();
        let product = self.product(id)?.clone();

        if unit.kind == TargetKind::StaticLibrary {
            // Archives never pass link flags; the edge records what its
            // consumers will link.
            let rule = self.graph.add_rule(tc.rule(RuleKind::Archive)?).clone();
            let mut flags = FlagList::new();
            flags.merge(self.contribution(id, false));
            for &dep in &statics {
                flags.merge(self.contribution(dep, true));
            }
            let mut implicit = Vec::new();
            for &dep in &closure {
                implicit.push(self.product(dep)?.link_file);
            }
            self.graph.add_edge(
                Edge::rule(id, &rule)
                    .inputs(objects)
                    .implicit(implicit)
                    .outputs([product.primary])
                    .flags(flags),
            )?;
            self.graph.add_default(product.primary);
            return Ok(());
        }

        let language = self.graph.target(id).language.unwrap_or(Language::C);
        let kind = if unit.kind == TargetKind::SharedLibrary {
            RuleKind::LinkShared(language)
        } else {
            RuleKind::LinkExecutable(language)
        };
        let rule = self.graph.add_rule(tc.rule(kind)?).clone();

        let mut flags = FlagList::new();
        flags.merge(self.global_flags(Phase::Link));
        if let Some(names) = &product.shared_names {
            let implib = product
                .import_library
                .map(|f| self.graph.file(f).path.clone());
            flags.merge(
                tc.shared_link_flags(names, implib.as_ref(), unit.version, unit.soversion)
                    .into_iter()
                    .map(|v| Flag::link(FlagOrigin::Toolchain, v)),
            );
        }
        flags.merge(self.contribution(id, false));
        for &dep in &statics {
            flags.merge(self.contribution(dep, true));
        }

        // Linked outputs all live at the top of the build directory.
        let shared: Vec<TargetId> = closure
            .iter()
            .copied()
            .filter(|&t| self.table.kind(t) == Some(LibraryKind::Shared))
            .collect();
        if !shared.is_empty() {
            flags.merge(
                tc.runtime_search_flags(".")
                    .into_iter()
                    .map(|v| Flag::link(FlagOrigin::Toolchain, v)),
            );
        }
        let indirect = if self.env.platform().is_elf() {
            self.table.indirect_shared(&closure)
        } else {
            Vec::new()
        };
        if !indirect.is_empty() {
            flags.merge(
                tc.link_search_flags(".")
                    .into_iter()
                    .map(|v| Flag::link(FlagOrigin::Toolchain, v)),
            );
        }

        let mut inputs = objects;
        let mut order_only = Vec::new();
        for &dep in &closure {
            let dep = self.product(dep)?;
            inputs.push(dep.link_file);
            order_only.extend(dep.runtime);
        }
        let mut implicit = Vec::new();
        for &dep in &indirect {
            implicit.push(self.product(dep)?.link_file);
        }

        let mut outputs = vec![product.primary];
        outputs.extend(product.import_library);
        self.graph.add_edge(
            Edge::rule(id, &rule)
                .inputs(inputs)
                .implicit(implicit)
                .order_only(order_only)
                .outputs(outputs)
                .flags(flags),
        )?;

        if let Some(names) = &product.shared_names {
            for (link, target) in &names.symlinks {
                let rule = self.graph.add_rule(tc.rule(RuleKind::Symlink)?).clone();
                let link = self.build_file(link)?;
                let pointee = self.build_file(target)?;
                self.graph.add_edge(
                    Edge::rule(id, &rule)
                        .implicit([pointee])
                        .outputs([link])
                        .var("target", target.clone()),
                )?;
            }
        }

        for &output in &product.outputs {
            self.graph.add_default(output);
        }
        Ok(())
    }

    /// Compile flags: global, toolchain, target options, include
    /// directories, packages, then raw compile options.
    fn compile_flags(&self, id: TargetId, unit: &Unit<'_>) -> FlagList {
        let origin = FlagOrigin::Target(unit.name.to_string());
        let mut flags = FlagList::new();

        flags.merge(self.global_flags(Phase::Compile));
        if unit.kind == TargetKind::SharedLibrary {
            flags.merge(
                self.tc
                    .shared_object_flags()
                    .into_iter()
                    .map(|v| Flag::compile(FlagOrigin::Toolchain, v)),
            );
        }
        flags.merge(self.option_flags(&unit.options, &origin, Phase::Compile));
        flags.merge(unit.include_dirs.iter().map(|dir| {
            Flag::compile(origin.clone(), FlagValue::IncludeDir { path: dir.clone() })
        }));
        for package in &self.packages[id] {
            flags.merge(package.compile_flags());
        }
        flags.merge(
            unit.compile_options
                .iter()
                .map(|o| Flag::compile(origin.clone(), FlagValue::arg(o.clone()))),
        );
        flags
    }

    fn global_flags(&self, phase: Phase) -> Vec<Flag> {
        self.option_flags(self.env.global_options(), &FlagOrigin::Global, phase)
    }

    fn option_flags(&self, options: &[GenericOption], origin: &FlagOrigin, phase: Phase) -> Vec<Flag> {
        options
            .iter()
            .flat_map(|o| self.tc.translate(o))
            .filter(|(p, _)| *p == phase)
            .map(|(phase, value)| Flag {
                origin: origin.clone(),
                phase,
                value,
            })
            .collect()
    }

    /// Link flags a target contributes itself: link-phase options, package
    /// link flags, then raw link options. When `forwarded`, they are tagged
    /// as coming from a dependency.
    fn contribution(&self, id: TargetId, forwarded: bool) -> Vec<Flag> {
        let Some(unit) = self.unit(id) else {
            return Vec::new();
        };
        let own = FlagOrigin::Target(unit.name.to_string());
        let dependency = FlagOrigin::Dependency(unit.name.to_string());

        let mut flags = self.option_flags(&unit.options, &own, Phase::Link);
        for package in &self.packages[id] {
            flags.extend(package.link_flags());
        }
        flags.extend(
            unit.link_options
                .iter()
                .map(|o| Flag::link(own.clone(), FlagValue::arg(o.clone()))),
        );
        for &lib in &unit.whole_archive {
            if let Some(product) = &self.products[lib] {
                let path = self.graph.file(product.link_file).path.clone();
                flags.push(Flag::link(own.clone(), FlagValue::WholeArchive { path }));
            }
        }

        if forwarded {
            for flag in &mut flags {
                flag.origin = dependency.clone();
            }
        }
        flags
    }

    fn add_export_edge(&mut self, id: TargetId, decl: &PkgConfig, library: TargetId) -> Result<(), GenerateError> {
        let planned = self.planned;
        let Planned::Unit(unit) = &planned[library] else {
            return Ok(());
        };
        let closure = self.table.closure(&unit.libs);
        let static_export = self.table.kind(library) == Some(LibraryKind::Static);

        let mut seen = HashSet::new();
        let mut cflags = Vec::new();
        for &member in std::iter::once(&library).chain(&closure) {
            for package in &self.packages[member] {
                if seen.insert(package.name.clone()) {
                    cflags.extend(package.compile.iter().cloned());
                }
            }
        }

        let (link_libraries, libs) = if static_export {
            let names = closure
                .iter()
                .filter_map(|&t| self.unit(t).map(|u| u.name.to_string()))
                .collect();
            let mut libs: Vec<FlagValue> = self
                .contribution(library, false)
                .into_iter()
                .map(|f| f.value)
                .collect();
            for &dep in &closure {
                if self.table.kind(dep) == Some(LibraryKind::Static) {
                    libs.extend(self.contribution(dep, true).into_iter().map(|f| f.value));
                }
            }
            (names, libs)
        } else {
            (Vec::new(), Vec::new())
        };

        let project = self.desc.project();
        let contents = PcFile {
            name: &decl.name,
            description: decl
                .description
                .clone()
                .unwrap_or_else(|| format!("{} library", unit.name)),
            version: decl
                .version
                .clone()
                .or_else(|| project.version.clone())
                .unwrap_or_else(|| "0".to_string()),
            requires: &decl.requires,
            library: unit.name,
            link_libraries,
            cflags,
            libs,
        }
        .render(self.env.install_dirs())?;

        let file = self.build_file(&decl.target_name())?;
        self.graph
            .add_edge(Edge::new(id, Recipe::Generated { contents }).outputs([file]))?;
        self.graph.add_default(file);

        let node = self.graph.target_mut(id);
        node.outputs = vec![file];
        node.deps = vec![library];
        self.products[id] = Some(Product {
            primary: file,
            import_library: None,
            link_file: file,
            runtime: None,
            shared_names: None,
            outputs: vec![file],
        });
        Ok(())
    }

    /// Install edges for the declared install list, then for every
    /// package export that installs itself. Each target is installed once.
    fn add_installs(&mut self) -> Result<(), GenerateError> {
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        for reference in self.desc.installs() {
            let id = self.desc.lookup(reference, "install")?.index();
            if seen.insert(id) {
                order.push(id);
            }
        }
        for (id, item) in self.planned.iter().enumerate() {
            if let Planned::Export { decl, .. } = item {
                if decl.install && seen.insert(id) {
                    order.push(id);
                }
            }
        }

        for id in order {
            self.add_install(id)?;
        }
        Ok(())
    }

    fn add_install(&mut self, id: TargetId) -> Result<(), GenerateError> {
        let planned = self.planned;
        match &planned[id] {
            Planned::Header(path) => {
                let input = self.graph.add_file(path.clone());
                let rel = path.as_str().strip_prefix("include/").unwrap_or(path.as_str());
                self.install_file(id, input, InstallRoot::Includedir, rel, false)?;
            }
            Planned::Export { decl, .. } => {
                let input = self.product(id)?.primary;
                let rel = format!("pkgconfig/{}", decl.target_name());
                self.install_file(id, input, InstallRoot::Libdir, &rel, false)?;
            }
            Planned::Unit(unit) => {
                let product = self.product(id)?.clone();
                let file_name = self.graph.file(product.primary).path.file_name().to_string();
                match unit.kind {
                    TargetKind::Executable => {
                        self.install_file(id, product.primary, InstallRoot::Bindir, &file_name, true)?;
                    }
                    TargetKind::StaticLibrary => {
                        self.install_file(id, product.primary, InstallRoot::Libdir, &file_name, false)?;
                    }
                    _ => {
                        let dir = if self.env.platform().is_windows_like() {
                            InstallRoot::Bindir
                        } else {
                            InstallRoot::Libdir
                        };
                        self.install_file(id, product.primary, dir, &file_name, true)?;
                        if let Some(implib) = product.import_library {
                            let name = self.graph.file(implib).path.file_name().to_string();
                            self.install_file(id, implib, InstallRoot::Libdir, &name, false)?;
                        }
                        if let Some(names) = &product.shared_names {
                            for (link, target) in &names.symlinks {
                                let rule = self.graph.add_rule(self.tc.rule(RuleKind::Symlink)?).clone();
                                let output = self
                                    .graph
                                    .add_file(BuildPath::install(InstallRoot::Libdir, link)?);
                                let pointee = self
                                    .graph
                                    .add_file(BuildPath::install(InstallRoot::Libdir, target)?);
                                self.graph.add_edge(
                                    Edge::rule(id, &rule)
                                        .implicit([pointee])
                                        .outputs([output])
                                        .var("target", target.clone())
                                        .phase(EdgePhase::Install),
                                )?;
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn install_file(
        &mut self,
        owner: TargetId,
        input: FileId,
        root: InstallRoot,
        rel: &str,
        executable: bool,
    ) -> Result<FileId, GenerateError> {
        let rule = self
            .graph
            .add_rule(self.tc.rule(RuleKind::Install { executable })?)
            .clone();
        let output = self.graph.add_file(BuildPath::install(root, rel)?);
        self.graph.add_edge(
            Edge::rule(owner, &rule)
                .inputs([input])
                .outputs([output])
                .phase(EdgePhase::Install),
        )?;
        Ok(output)
    }
}

/// `src/inner.cpp` -> `src/inner`
fn strip_extension(path: &str) -> &str {
    let name_start = path.rfind('/').map_or(0, |i| i + 1);
    match path[name_start..].rfind('.') {
        Some(0) | None => path,
        Some(dot) => &path[..name_start + dot],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ToolchainError;
    use crate::resolver::ResolutionError;
    use crate::test_support::*;

    fn compile_with(desc: &Description, env: &Environment, query: FakeQuery) -> Result<CompiledGraph, GenerateError> {
        let resolver = PackageResolver::new(Arc::new(query));
        GraphCompiler::new(env, &resolver).compile(desc)
    }

    fn compile(desc: &Description) -> CompiledGraph {
        compile_with(desc, &linux_gcc(), ogg_query()).unwrap()
    }

    fn edge<'g>(g: &'g CompiledGraph, target: &str, rule: &str) -> &'g Edge {
        let (id, _) = g.target_named(target).unwrap();
        g.edges_of(id)
            .map(|(_, e)| e)
            .find(|e| e.rule_name() == Some(rule))
            .unwrap_or_else(|| panic!("no {} edge for {}", rule, target))
    }

    fn paths(g: &CompiledGraph, ids: &[FileId]) -> Vec<String> {
        ids.iter().map(|&id| g.path(id).to_string()).collect()
    }

    fn count(edge: &Edge, value: &FlagValue) -> usize {
        edge.flags.iter().filter(|f| &f.value == value).count()
    }

    fn has_arg(edge: &Edge, arg: &str) -> bool {
        count(edge, &FlagValue::arg(arg)) > 0
    }

    fn configuration(err: GenerateError) -> ConfigurationError {
        match err {
            GenerateError::Configuration(e) => e,
            other => panic!("expected a configuration error, got {:?}", other),
        }
    }

    #[test]
    fn test_static_chain_forwards_package_once() {
        let g = compile(&hello_app());
        let ogg = FlagValue::library("ogg");

        let inner = edge(&g, "inner", "archive");
        assert_eq!(count(inner, &ogg), 1);

        let hello = edge(&g, "hello", "archive");
        assert_eq!(paths(&g, &hello.implicit), vec!["libinner.a"]);
        let forwarded: Vec<_> = hello.flags.iter().filter(|f| f.value == ogg).collect();
        assert_eq!(forwarded.len(), 1);
        assert_eq!(forwarded[0].origin, FlagOrigin::Dependency("inner".into()));

        let app = edge(&g, "app", "cxx_link");
        assert_eq!(
            paths(&g, &app.inputs),
            vec!["app.dir/main.o", "libhello.a", "libinner.a"]
        );
        assert_eq!(count(app, &ogg), 1);
    }

    #[test]
    fn test_link_options_follow_static_libraries() {
        let mut desc = Description::new("demo");
        desc.library(Library::new("inner").sources(["inner.c"]).link_options(["-Wl,--as-needed"]))
            .unwrap();
        desc.library(
            Library::new("wrapper")
                .kind(LibraryKind::Shared)
                .sources(["wrapper.c"])
                .libs(["inner"]),
        )
        .unwrap();
        desc.executable(Executable::new("app").sources(["main.c"]).libs(["inner", "wrapper"]))
            .unwrap();
        let g = compile(&desc);

        let app = edge(&g, "app", "c_link");
        let forwarded: Vec<_> = app
            .flags
            .iter()
            .filter(|f| f.value == FlagValue::arg("-Wl,--as-needed"))
            .collect();
        assert_eq!(forwarded.len(), 1);
        assert_eq!(forwarded[0].origin, FlagOrigin::Dependency("inner".into()));

        let wrapper = edge(&g, "wrapper", "c_link_shared");
        assert!(has_arg(wrapper, "-Wl,--as-needed"));
    }

    #[test]
    fn test_shared_library_encapsulates_its_dependencies() {
        let mut desc = Description::new("demo");
        let ogg = desc.package(PackageRequest::new("ogg"));
        desc.library(Library::new("core").sources(["core.c"]).packages([ogg]))
            .unwrap();
        desc.library(
            Library::new("inner")
                .kind(LibraryKind::Shared)
                .sources(["inner.c"])
                .libs(["core"]),
        )
        .unwrap();
        desc.executable(Executable::new("app").sources(["main.c"]).libs(["inner"]))
            .unwrap();
        let g = compile(&desc);
        let ogg = FlagValue::library("ogg");

        let compile = edge(&g, "inner", "c_compile");
        assert!(compile
            .flags
            .iter()
            .any(|f| f.value == FlagValue::arg("-fPIC") && f.origin == FlagOrigin::Toolchain));

        let inner = edge(&g, "inner", "c_link_shared");
        assert_eq!(paths(&g, &inner.inputs), vec!["inner.dir/inner.o", "libcore.a"]);
        assert_eq!(count(inner, &ogg), 1);
        assert!(has_arg(inner, "-Wl,-soname,libinner.so"));

        let app = edge(&g, "app", "c_link");
        assert_eq!(paths(&g, &app.inputs), vec!["app.dir/main.o", "libinner.so"]);
        assert_eq!(count(app, &ogg), 0);
        assert!(has_arg(app, "-Wl,-rpath,$ORIGIN"));
    }

    #[test]
    fn test_indirect_shared_dependencies_on_elf() {
        let mut desc = Description::new("demo");
        desc.library(Library::new("s2").kind(LibraryKind::Shared).sources(["s2.c"]))
            .unwrap();
        desc.library(
            Library::new("s1")
                .kind(LibraryKind::Shared)
                .sources(["s1.c"])
                .libs(["s2"]),
        )
        .unwrap();
        desc.executable(Executable::new("app").sources(["main.c"]).libs(["s1"]))
            .unwrap();
        let g = compile(&desc);

        let app = edge(&g, "app", "c_link");
        assert_eq!(paths(&g, &app.inputs), vec!["app.dir/main.o", "libs1.so"]);
        assert_eq!(paths(&g, &app.implicit), vec!["libs2.so"]);
        assert!(has_arg(app, "-Wl,-rpath-link,."));
    }

    #[test]
    fn test_versioned_shared_library() {
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
        let g = compile(&desc);

        let (_, foo) = g.target_named("foo").unwrap();
        assert_eq!(
            paths(&g, &foo.outputs),
            vec!["libfoo.so.1.2.3", "libfoo.so.1", "libfoo.so"]
        );
        assert!(has_arg(edge(&g, "foo", "c_link_shared"), "-Wl,-soname,libfoo.so.1"));

        let symlink = edge(&g, "foo", "symlink");
        assert_eq!(paths(&g, &symlink.outputs), vec!["libfoo.so.1"]);
        assert_eq!(symlink.vars["target"], "libfoo.so.1.2.3");

        let app = edge(&g, "app", "c_link");
        assert_eq!(paths(&g, &app.inputs), vec!["app.dir/main.o", "libfoo.so"]);
        assert_eq!(paths(&g, &app.order_only), vec!["libfoo.so.1"]);
    }

    #[test]
    fn test_compile_flag_order() {
        let env = linux_gcc().with_global_options(["optimize=2"]).unwrap();
        let mut desc = Description::new("demo");
        let ogg = desc.package(PackageRequest::new("ogg"));
        desc.library(
            Library::new("lib")
                .sources(["lib.c"])
                .options(["warnings=all"])
                .include_dirs(["include"])
                .packages([ogg])
                .compile_options(["-fno-common"]),
        )
        .unwrap();
        let g = compile_with(&desc, &env, ogg_query()).unwrap();

        let compile = edge(&g, "lib", "c_compile");
        let origins: Vec<_> = compile.flags.iter().map(|f| f.origin.clone()).collect();
        let target = FlagOrigin::Target("lib".into());
        assert_eq!(
            origins,
            vec![
                FlagOrigin::Global,
                target.clone(),
                target.clone(),
                FlagOrigin::Package("ogg".into()),
                target,
            ]
        );
        let values: Vec<_> = compile.flags.iter().map(|f| f.value.clone()).collect();
        assert_eq!(values[0], FlagValue::arg("-O2"));
        assert_eq!(values[1], FlagValue::arg("-Wall"));
        assert_eq!(values[4], FlagValue::arg("-fno-common"));
        assert!(compile.flags.iter().all(|f| f.phase == Phase::Compile));
    }

    #[test]
    fn test_include_dir_may_be_the_source_root() {
        let mut desc = Description::new("demo");
        desc.executable(Executable::new("app").sources(["main.c"]).include_dirs(["."]))
            .unwrap();
        let g = compile(&desc);
        let compile = edge(&g, "app", "c_compile");
        assert!(compile.flags.iter().any(|f| matches!(
            &f.value,
            FlagValue::IncludeDir { path } if path.is_root()
        )));
    }

    #[test]
    fn test_declared_cycle_rejected_before_resolution() {
        let mut desc = Description::new("demo");
        let ogg = desc.package(PackageRequest::new("ogg"));
        desc.library(Library::new("a").sources(["a.c"]).libs(["b"]).packages([ogg]))
            .unwrap();
        desc.library(Library::new("b").sources(["b.c"]).libs(["a"]))
            .unwrap();

        let fake = Arc::new(ogg_query());
        let resolver = PackageResolver::new(fake.clone());
        let env = linux_gcc();
        let err = GraphCompiler::new(&env, &resolver).compile(&desc).unwrap_err();

        assert_eq!(
            configuration(err),
            ConfigurationError::DependencyCycle {
                targets: vec!["a".into(), "b".into(), "a".into()]
            }
        );
        assert_eq!(fake.total_calls(), 0);
    }

    #[test]
    fn test_reference_errors() {
        let mut desc = Description::new("demo");
        desc.executable(Executable::new("app").sources(["main.c"]).libs(["nope"]))
            .unwrap();
        assert_eq!(
            configuration(compile_with(&desc, &linux_gcc(), ogg_query()).unwrap_err()),
            ConfigurationError::UnknownTarget {
                name: "nope".into(),
                from: "app".into()
            }
        );

        let mut desc = Description::new("demo");
        desc.executable(Executable::new("tool").sources(["tool.c"])).unwrap();
        desc.executable(Executable::new("app").sources(["main.c"]).libs(["tool"]))
            .unwrap();
        assert!(matches!(
            configuration(compile_with(&desc, &linux_gcc(), ogg_query()).unwrap_err()),
            ConfigurationError::InvalidDependency { .. }
        ));

        let mut desc = Description::new("demo");
        desc.executable(Executable::new("app").sources(["main.c"]).packages(["zlib"]))
            .unwrap();
        assert!(matches!(
            configuration(compile_with(&desc, &linux_gcc(), ogg_query()).unwrap_err()),
            ConfigurationError::UnknownPackage { .. }
        ));
    }

    #[test]
    fn test_empty_sources() {
        let mut desc = Description::new("demo");
        desc.library(Library::new("x").headers(["x.h"])).unwrap();
        assert_eq!(
            configuration(compile_with(&desc, &linux_gcc(), ogg_query()).unwrap_err()),
            ConfigurationError::EmptySources { name: "x".into() }
        );

        let mut desc = Description::new("demo");
        desc.library(Library::new("y").sources(["only.h"])).unwrap();
        assert!(matches!(
            configuration(compile_with(&desc, &linux_gcc(), ogg_query()).unwrap_err()),
            ConfigurationError::EmptySources { .. }
        ));
    }

    #[test]
    fn test_unknown_option() {
        let mut desc = Description::new("demo");
        desc.executable(Executable::new("app").sources(["main.c"]).options(["frobnicate"]))
            .unwrap();
        let err = compile_with(&desc, &linux_gcc(), ogg_query()).unwrap_err();
        assert!(matches!(
            err,
            GenerateError::Toolchain(ToolchainError::UnknownOption { .. })
        ));
    }

    #[test]
    fn test_object_collision_is_duplicate_producer() {
        let mut desc = Description::new("demo");
        desc.library(Library::new("x").sources(["a.c", "a.cpp"])).unwrap();
        assert_eq!(
            configuration(compile_with(&desc, &linux_gcc(), ogg_query()).unwrap_err()),
            ConfigurationError::DuplicateProducer {
                path: "x.dir/a.o".into(),
                first: "x".into(),
                second: "x".into(),
            }
        );
    }

    #[test]
    fn test_first_resolution_failure_in_declaration_order() {
        let mut desc = Description::new("demo");
        let a = desc.package(PackageRequest::new("alpha"));
        let b = desc.package(PackageRequest::new("beta"));
        desc.executable(Executable::new("one").sources(["one.c"]).packages([b]))
            .unwrap();
        desc.executable(Executable::new("two").sources(["two.c"]).packages([a]))
            .unwrap();

        let err = compile_with(&desc, &linux_gcc(), FakeQuery::new()).unwrap_err();
        match err {
            GenerateError::Resolution(ResolutionError::PackageNotFound { package, .. }) => {
                assert_eq!(package, "beta")
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_install_edges() {
        let mut desc = hello_app();
        desc.header_file("include/hello/api.h").unwrap();
        desc.install(["app", "inner", "include/hello/api.h"]);
        let g = compile(&desc);

        let installed: Vec<_> = g
            .edges()
            .iter()
            .filter(|e| e.phase == EdgePhase::Install)
            .flat_map(|e| paths(&g, &e.outputs))
            .collect();
        assert_eq!(
            installed,
            vec!["{bindir}/app", "{libdir}/libinner.a", "{includedir}/hello/api.h"]
        );
        assert_eq!(edge(&g, "app", "install_program").inputs.len(), 1);
        assert!(g
            .defaults()
            .iter()
            .all(|&f| !g.path(f).to_string().starts_with('{')));
    }

    #[test]
    fn test_pkg_config_export() {
        let mut desc = hello_app();
        desc.pkg_config(PkgConfig::new("hello")).unwrap();
        let g = compile(&desc);

        let generated: Vec<_> = g.generated().collect();
        assert_eq!(generated.len(), 1);
        let (file, contents) = generated[0];
        assert_eq!(g.path(file).to_string(), "hello.pc");
        assert!(contents.contains("Version: 1.0\n"));
        assert!(contents.contains("Cflags: -I${includedir} -I/usr/include/ogg\n"));
        assert!(contents.contains("Libs: -L${libdir} -lhello -linner -L/usr/lib/ogg -logg\n"));

        let install = g
            .edges()
            .iter()
            .find(|e| e.phase == EdgePhase::Install)
            .unwrap();
        assert_eq!(paths(&g, &install.outputs), vec!["{libdir}/pkgconfig/hello.pc"]);
    }

    fn whole_archives(edge: &Edge) -> Vec<(String, FlagOrigin)> {
        edge.flags
            .iter()
            .filter_map(|f| match &f.value {
                FlagValue::WholeArchive { path } => Some((path.to_string(), f.origin.clone())),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_whole_archive_dependency() {
        let mut desc = Description::new("demo");
        desc.library(Library::new("plugins").kind(LibraryKind::Static).sources(["plugins.c"]))
            .unwrap();
        desc.executable(Executable::new("app").sources(["main.c"]).whole_archive(["plugins"]))
            .unwrap();
        let g = compile(&desc);

        let app = edge(&g, "app", "c_link");
        assert_eq!(paths(&g, &app.inputs), vec!["app.dir/main.o", "libplugins.a"]);
        assert_eq!(
            whole_archives(app),
            vec![("libplugins.a".to_string(), FlagOrigin::Target("app".into()))]
        );
    }

    #[test]
    fn test_whole_archive_follows_static_libraries() {
        let mut desc = Description::new("demo");
        desc.library(Library::new("plugins").kind(LibraryKind::Static).sources(["plugins.c"]))
            .unwrap();
        desc.library(
            Library::new("host")
                .kind(LibraryKind::Static)
                .sources(["host.c"])
                .whole_archive(["plugins"]),
        )
        .unwrap();
        desc.library(
            Library::new("module")
                .kind(LibraryKind::Shared)
                .sources(["module.c"])
                .libs(["host"]),
        )
        .unwrap();
        let g = compile(&desc);

        let module = edge(&g, "module", "c_link_shared");
        assert_eq!(
            whole_archives(module),
            vec![("libplugins.a".to_string(), FlagOrigin::Dependency("host".into()))]
        );
        let archive = edge(&g, "host", "archive");
        assert_eq!(whole_archives(archive).len(), 1);
    }

    #[test]
    fn test_whole_archive_requires_static_library() {
        let mut desc = Description::new("demo");
        desc.library(Library::new("plugins").kind(LibraryKind::Shared).sources(["plugins.c"]))
            .unwrap();
        desc.executable(Executable::new("app").sources(["main.c"]).whole_archive(["plugins"]))
            .unwrap();
        let err = configuration(compile_with(&desc, &linux_gcc(), ogg_query()).unwrap_err());
        assert!(matches!(
            err,
            ConfigurationError::InvalidDependency { ref from, ref name, .. } if from == "app" && name == "plugins"
        ));
    }

    #[test]
    fn test_export_must_name_a_library() {
        let mut desc = Description::new("demo");
        desc.executable(Executable::new("app").sources(["main.c"])).unwrap();
        desc.pkg_config(PkgConfig::new("app")).unwrap();
        assert!(matches!(
            configuration(compile_with(&desc, &linux_gcc(), ogg_query()).unwrap_err()),
            ConfigurationError::InvalidDependency { .. }
        ));
    }

    #[test]
    fn test_msvc_dll_links_through_import_library() {
        let mut desc = Description::new("demo");
        desc.library(Library::new("foo").kind(LibraryKind::Shared).sources(["foo.c"]))
            .unwrap();
        desc.executable(Executable::new("app").sources(["main.c"]).libs(["foo"]))
            .unwrap();
        let g = compile_with(&desc, &windows_msvc(), ogg_query()).unwrap();

        let foo = edge(&g, "foo", "c_link_shared");
        assert_eq!(paths(&g, &foo.outputs), vec!["foo.dll", "foo.lib"]);
        assert_eq!(paths(&g, &edge(&g, "foo", "c_compile").outputs), vec!["foo.dir/foo.obj"]);

        let app = edge(&g, "app", "c_link");
        assert_eq!(paths(&g, &app.inputs), vec!["app.dir/main.obj", "foo.lib"]);
        assert_eq!(paths(&g, &app.outputs), vec!["app.exe"]);
    }

    #[test]
    fn test_objective_c_on_msvc_is_unsupported() {
        let mut desc = Description::new("demo");
        desc.executable(Executable::new("app").sources(["main.m"])).unwrap();
        let err = compile_with(&desc, &windows_msvc(), ogg_query()).unwrap_err();
        assert!(matches!(
            err,
            GenerateError::Toolchain(ToolchainError::UnsupportedToolchainOperation { .. })
        ));
    }

    #[test]
    fn test_compilation_is_deterministic() {
        let a = compile(&hello_app()).describe();
        let b = compile(&hello_app()).describe();
        assert_eq!(a, b);
    }

    #[test]
    fn test_strip_extension() {
        assert_eq!(strip_extension("src/inner.cpp"), "src/inner");
        assert_eq!(strip_extension("a.b/c"), "a.b/c");
        assert_eq!(strip_extension("src/.hidden"), "src/.hidden");
    }
}
