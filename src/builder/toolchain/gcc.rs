//! GCC/Clang toolchain.
//!
//! Both compilers accept the same driver syntax; what changes per platform
//! is how shared libraries are named and linked.

use crate::core::environment::{Platform, ToolchainId};
use crate::core::flags::{FlagValue, Phase};
use crate::core::language::Language;
use crate::core::path::BuildPath;
use crate::errors::ToolchainError;

use super::{
    install_rule, symlink_rule, Arg, DepStyle, FlagVar, GenericOption, OptLevel, Rule, RuleKind,
    SharedLibraryNames, Token, ToolVar, Toolchain, Warnings,
};

/// GCC-style driver (gcc, clang, MinGW, Cygwin).
#[derive(Debug, Clone)]
pub struct GccToolchain {
    id: ToolchainId,
    platform: Platform,
}

impl GccToolchain {
    pub fn new(id: ToolchainId, platform: Platform) -> Self {
        GccToolchain { id, platform }
    }

    fn driver(lang: Language) -> ToolVar {
        if lang.needs_cxx_linker() {
            ToolVar::Cxx
        } else {
            ToolVar::Cc
        }
    }
}

fn arg(s: &str) -> FlagValue {
    FlagValue::arg(s)
}

impl Toolchain for GccToolchain {
    fn id(&self) -> ToolchainId {
        self.id
    }

    fn platform(&self) -> Platform {
        self.platform
    }

    fn rule(&self, kind: RuleKind) -> Result<Rule, ToolchainError> {
        let rule = match kind {
            RuleKind::Compile(lang) => {
                let label = match lang {
                    Language::C => "CC",
                    Language::Cxx => "CXX",
                    Language::ObjC => "OBJC",
                    Language::ObjCxx => "OBJCXX",
                };
                Rule::new(
                    kind,
                    label,
                    vec![
                        Token::Tool(Self::driver(lang)),
                        Token::Flags(FlagVar::Compile(lang)),
                        Token::lit("-MD"),
                        Token::lit("-MF"),
                        Token::Depfile,
                        Token::lit("-c"),
                        Token::Inputs,
                        Token::lit("-o"),
                        Token::Output,
                    ],
                )
                .with_deps(DepStyle::Gcc)
            }

            RuleKind::Archive => Rule::new(
                kind,
                "AR",
                vec![
                    Token::lit("rm"),
                    Token::lit("-f"),
                    Token::Output,
                    Token::lit("&&"),
                    Token::Tool(ToolVar::Ar),
                    Token::lit("rcs"),
                    Token::Output,
                    Token::Inputs,
                ],
            ),

            RuleKind::LinkExecutable(lang) => Rule::new(
                kind,
                "LINK",
                vec![
                    Token::Tool(Self::driver(lang)),
                    Token::Flags(FlagVar::Ldflags),
                    Token::lit("-o"),
                    Token::Output,
                    Token::Inputs,
                    Token::Flags(FlagVar::Ldlibs),
                ],
            ),

            RuleKind::LinkShared(lang) => {
                let shared = if self.platform == Platform::Darwin {
                    "-dynamiclib"
                } else {
                    "-shared"
                };
                Rule::new(
                    kind,
                    "SHLIB",
                    vec![
                        Token::Tool(Self::driver(lang)),
                        Token::lit(shared),
                        Token::Flags(FlagVar::Ldflags),
                        Token::lit("-o"),
                        Token::Output,
                        Token::Inputs,
                        Token::Flags(FlagVar::Ldlibs),
                    ],
                )
            }

            RuleKind::Install { executable } => install_rule(self.platform, executable),
            RuleKind::Symlink => symlink_rule(self.id, self.platform)?,
        };
        Ok(rule)
    }

    fn translate(&self, option: &GenericOption) -> Vec<(Phase, FlagValue)> {
        use Phase::{Compile, Link};

        match option {
            GenericOption::WarningsAsErrors => vec![(Compile, arg("-Werror"))],
            GenericOption::Warnings(Warnings::None) => vec![(Compile, arg("-w"))],
            GenericOption::Warnings(Warnings::Default) => Vec::new(),
            GenericOption::Warnings(Warnings::All) => vec![(Compile, arg("-Wall"))],
            GenericOption::Warnings(Warnings::Extra) => {
                vec![(Compile, arg("-Wall")), (Compile, arg("-Wextra"))]
            }
            GenericOption::Optimize(level) => {
                let flag = match level {
                    OptLevel::O0 => "-O0",
                    OptLevel::O1 => "-O1",
                    OptLevel::O2 => "-O2",
                    OptLevel::O3 | OptLevel::Speed => "-O3",
                    OptLevel::Size => "-Os",
                };
                vec![(Compile, arg(flag))]
            }
            GenericOption::Debug => vec![(Compile, arg("-g"))],
            // Windows images are always position independent.
            GenericOption::Pic if self.platform.is_windows_like() => Vec::new(),
            GenericOption::Pic => vec![(Compile, arg("-fPIC"))],
            GenericOption::Pthread => vec![(Compile, arg("-pthread")), (Link, arg("-pthread"))],
            GenericOption::Std(std) => vec![(Compile, FlagValue::arg(format!("-std={}", std)))],
            GenericOption::Define { name, value } => {
                vec![(Compile, FlagValue::define(name.clone(), value.clone()))]
            }
        }
    }

    fn render_flag(&self, flag: &FlagValue) -> Vec<Arg> {
        match flag {
            FlagValue::IncludeDir { path } => vec![Arg::prefixed("-I", path)],
            FlagValue::Define { name, value: None } => vec![Arg::text(format!("-D{}", name))],
            FlagValue::Define {
                name,
                value: Some(value),
            } => vec![Arg::text(format!("-D{}={}", name, value))],
            FlagValue::LibDir { path } => vec![Arg::prefixed("-L", path)],
            FlagValue::Library { name } => vec![Arg::text(format!("-l{}", name))],
            FlagValue::Arg { value } => vec![Arg::text(value.clone())],
            FlagValue::PathArg { prefix, path } => vec![Arg::prefixed(prefix.clone(), path)],
            FlagValue::WholeArchive { path } if self.platform == Platform::Darwin => {
                vec![Arg::prefixed("-Wl,-force_load,", path)]
            }
            FlagValue::WholeArchive { path } => vec![
                Arg::text("-Wl,--whole-archive"),
                Arg::prefixed("", path),
                Arg::text("-Wl,--no-whole-archive"),
            ],
        }
    }

    fn object_name(&self, stem: &str) -> String {
        format!("{}.o", stem)
    }

    fn static_library_name(&self, name: &str) -> String {
        format!("lib{}.a", name)
    }

    fn shared_library_names(
        &self,
        name: &str,
        version: Option<&str>,
        soversion: Option<&str>,
    ) -> SharedLibraryNames {
        match self.platform {
            Platform::Linux => {
                let dev = format!("lib{}.so", name);
                match (version, soversion) {
                    (Some(version), Some(soversion)) => {
                        let soname = format!("{}.{}", dev, soversion);
                        let file = format!("{}.{}", dev, version);
                        let mut symlinks = Vec::new();
                        if soname != file {
                            symlinks.push((soname.clone(), file.clone()));
                        }
                        symlinks.push((dev.clone(), soname.clone()));
                        SharedLibraryNames {
                            file,
                            import_library: None,
                            soname: Some(soname),
                            symlinks,
                            link_name: dev,
                        }
                    }
                    _ => SharedLibraryNames {
                        file: dev.clone(),
                        import_library: None,
                        soname: Some(dev.clone()),
                        symlinks: Vec::new(),
                        link_name: dev,
                    },
                }
            }
            Platform::Darwin => {
                let file = format!("lib{}.dylib", name);
                SharedLibraryNames {
                    file: file.clone(),
                    import_library: None,
                    soname: None,
                    symlinks: Vec::new(),
                    link_name: file,
                }
            }
            Platform::Windows | Platform::Cygwin => {
                let prefix = if self.platform == Platform::Cygwin {
                    "cyg"
                } else {
                    "lib"
                };
                let implib = format!("lib{}.dll.a", name);
                SharedLibraryNames {
                    file: format!("{}{}.dll", prefix, name),
                    import_library: Some(implib.clone()),
                    soname: None,
                    symlinks: Vec::new(),
                    link_name: implib,
                }
            }
        }
    }

    fn executable_name(&self, name: &str) -> String {
        if self.platform.is_windows_like() {
            format!("{}.exe", name)
        } else {
            name.to_string()
        }
    }

    fn shared_object_flags(&self) -> Vec<FlagValue> {
        if self.platform.is_windows_like() {
            Vec::new()
        } else {
            vec![arg("-fPIC")]
        }
    }

    fn shared_link_flags(
        &self,
        names: &SharedLibraryNames,
        import_library: Option<&BuildPath>,
        version: Option<&str>,
        soversion: Option<&str>,
    ) -> Vec<FlagValue> {
        match self.platform {
            Platform::Linux => names
                .soname
                .iter()
                .map(|soname| FlagValue::arg(format!("-Wl,-soname,{}", soname)))
                .collect(),
            Platform::Darwin => {
                let mut flags = vec![
                    arg("-install_name"),
                    FlagValue::arg(format!("@rpath/{}", names.file)),
                ];
                if let Some(version) = version {
                    flags.push(arg("-current_version"));
                    flags.push(arg(version));
                }
                if let Some(soversion) = soversion {
                    flags.push(arg("-compatibility_version"));
                    flags.push(arg(soversion));
                }
                flags
            }
            Platform::Windows | Platform::Cygwin => import_library
                .map(|implib| FlagValue::PathArg {
                    prefix: "-Wl,--out-implib,".to_string(),
                    path: implib.clone(),
                })
                .into_iter()
                .collect(),
        }
    }

    fn runtime_search_flags(&self, rel_dir: &str) -> Vec<FlagValue> {
        let origin = match self.platform {
            Platform::Linux => "$ORIGIN",
            Platform::Darwin => "@loader_path",
            Platform::Windows | Platform::Cygwin => return Vec::new(),
        };
        let dir = if rel_dir.is_empty() || rel_dir == "." {
            origin.to_string()
        } else {
            format!("{}/{}", origin, rel_dir)
        };
        vec![FlagValue::arg(format!("-Wl,-rpath,{}", dir))]
    }

    fn link_search_flags(&self, dir: &str) -> Vec<FlagValue> {
        if self.platform.is_elf() {
            vec![FlagValue::arg(format!("-Wl,-rpath-link,{}", dir))]
        } else {
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linux() -> GccToolchain {
        GccToolchain::new(ToolchainId::Gcc, Platform::Linux)
    }

    #[test]
    fn test_compile_rule_uses_depfile() {
        let rule = linux().rule(RuleKind::Compile(Language::Cxx)).unwrap();
        assert_eq!(rule.deps, DepStyle::Gcc);
        assert_eq!(rule.command[0], Token::Tool(ToolVar::Cxx));
        assert!(rule.command.contains(&Token::Depfile));
        assert_eq!(rule.label, "CXX");
    }

    #[test]
    fn test_objc_links_with_c_driver() {
        let rule = linux().rule(RuleKind::LinkExecutable(Language::ObjC)).unwrap();
        assert_eq!(rule.command[0], Token::Tool(ToolVar::Cc));
    }

    #[test]
    fn test_darwin_shared_rule() {
        let tc = GccToolchain::new(ToolchainId::Clang, Platform::Darwin);
        let rule = tc.rule(RuleKind::LinkShared(Language::C)).unwrap();
        assert_eq!(rule.command[1], Token::lit("-dynamiclib"));
        assert_eq!(tc.shared_library_names("foo", None, None).file, "libfoo.dylib");
    }

    #[test]
    fn test_translate_options() {
        let tc = linux();
        assert_eq!(
            tc.translate(&GenericOption::WarningsAsErrors),
            vec![(Phase::Compile, arg("-Werror"))]
        );
        assert_eq!(tc.translate(&GenericOption::Pthread).len(), 2);
        assert!(tc.translate(&GenericOption::Warnings(Warnings::Default)).is_empty());

        let mingw = GccToolchain::new(ToolchainId::Gcc, Platform::Windows);
        assert!(mingw.translate(&GenericOption::Pic).is_empty());
    }

    #[test]
    fn test_versioned_elf_names() {
        let names = linux().shared_library_names("foo", Some("1.2.3"), Some("1"));
        assert_eq!(names.file, "libfoo.so.1.2.3");
        assert_eq!(names.soname.as_deref(), Some("libfoo.so.1"));
        assert_eq!(
            names.symlinks,
            vec![
                ("libfoo.so.1".to_string(), "libfoo.so.1.2.3".to_string()),
                ("libfoo.so".to_string(), "libfoo.so.1".to_string()),
            ]
        );
        assert_eq!(names.link_name, "libfoo.so");
    }

    #[test]
    fn test_windows_names() {
        let mingw = GccToolchain::new(ToolchainId::Gcc, Platform::Windows);
        let names = mingw.shared_library_names("foo", None, None);
        assert_eq!(names.file, "libfoo.dll");
        assert_eq!(names.import_library.as_deref(), Some("libfoo.dll.a"));
        assert_eq!(mingw.executable_name("app"), "app.exe");

        let cygwin = GccToolchain::new(ToolchainId::Gcc, Platform::Cygwin);
        assert_eq!(cygwin.shared_library_names("foo", None, None).file, "cygfoo.dll");
    }

    #[test]
    fn test_render_flags() {
        let tc = linux();
        let inc = BuildPath::source("include").unwrap();
        assert_eq!(
            tc.render_flag(&FlagValue::IncludeDir { path: inc.clone() }),
            vec![Arg::prefixed("-I", &inc)]
        );
        assert_eq!(
            tc.render_flag(&FlagValue::define("NDEBUG", None)),
            vec![Arg::text("-DNDEBUG")]
        );
        assert_eq!(tc.render_flag(&FlagValue::library("ogg")), vec![Arg::text("-logg")]);
    }

    #[test]
    fn test_whole_archive_flags() {
        let plugins = BuildPath::build("libplugins.a").unwrap();
        let flag = FlagValue::WholeArchive { path: plugins.clone() };
        assert_eq!(
            linux().render_flag(&flag),
            vec![
                Arg::text("-Wl,--whole-archive"),
                Arg::prefixed("", &plugins),
                Arg::text("-Wl,--no-whole-archive"),
            ]
        );

        let darwin = GccToolchain::new(ToolchainId::Clang, Platform::Darwin);
        assert_eq!(
            darwin.render_flag(&flag),
            vec![Arg::prefixed("-Wl,-force_load,", &plugins)]
        );
    }

    #[test]
    fn test_rpath_flags() {
        let tc = linux();
        assert_eq!(
            tc.runtime_search_flags("."),
            vec![FlagValue::arg("-Wl,-rpath,$ORIGIN")]
        );
        assert_eq!(
            tc.runtime_search_flags("../lib"),
            vec![FlagValue::arg("-Wl,-rpath,$ORIGIN/../lib")]
        );
        let mingw = GccToolchain::new(ToolchainId::Gcc, Platform::Windows);
        assert!(mingw.runtime_search_flags(".").is_empty());
    }
}
