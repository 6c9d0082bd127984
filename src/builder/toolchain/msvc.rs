//! MSVC toolchain (Windows only).

use crate::core::environment::{Platform, ToolchainId};
use crate::core::flags::{FlagValue, Phase};
use crate::core::language::Language;
use crate::core::path::BuildPath;
use crate::errors::ToolchainError;

use super::{
    install_rule, Arg, DepStyle, FlagVar, GenericOption, OptLevel, Rule, RuleKind,
    SharedLibraryNames, Token, ToolVar, Toolchain, Warnings,
};

/// `cl.exe`, `lib.exe` and `link.exe`.
#[derive(Debug, Clone, Default)]
pub struct MsvcToolchain;

impl MsvcToolchain {
    pub fn new() -> Self {
        MsvcToolchain
    }

    fn unsupported(&self, operation: &str) -> ToolchainError {
        ToolchainError::UnsupportedToolchainOperation {
            toolchain: ToolchainId::Msvc.to_string(),
            platform: Platform::Windows.to_string(),
            operation: operation.to_string(),
        }
    }

    fn link_rule(&self, kind: RuleKind, lang: Language, dll: bool) -> Result<Rule, ToolchainError> {
        if matches!(lang, Language::ObjC | Language::ObjCxx) {
            return Err(self.unsupported("link Objective-C objects"));
        }
        let mut command = vec![Token::Tool(ToolVar::Ld), Token::lit("/nologo")];
        if dll {
            command.push(Token::lit("/DLL"));
        }
        command.extend([
            Token::Flags(FlagVar::Ldflags),
            Token::Join(vec![Token::lit("/OUT:"), Token::Output]),
            Token::Inputs,
            Token::Flags(FlagVar::Ldlibs),
        ]);
        Ok(Rule::new(kind, if dll { "SHLIB" } else { "LINK" }, command))
    }
}

fn arg(s: &str) -> FlagValue {
    FlagValue::arg(s)
}

impl Toolchain for MsvcToolchain {
    fn id(&self) -> ToolchainId {
        ToolchainId::Msvc
    }

    fn platform(&self) -> Platform {
        Platform::Windows
    }

    fn rule(&self, kind: RuleKind) -> Result<Rule, ToolchainError> {
        match kind {
            RuleKind::Compile(lang) => {
                let (label, force) = match lang {
                    Language::C => ("CC", "/TC"),
                    Language::Cxx => ("CXX", "/TP"),
                    Language::ObjC | Language::ObjCxx => {
                        return Err(self.unsupported(&format!("compile {} sources", lang)))
                    }
                };
                let mut command = vec![
                    Token::Tool(ToolVar::Cc),
                    Token::lit("/nologo"),
                    Token::lit("/showIncludes"),
                    Token::lit(force),
                ];
                if lang == Language::Cxx {
                    command.push(Token::lit("/EHsc"));
                }
                command.extend([
                    Token::Flags(FlagVar::Compile(lang)),
                    Token::lit("/c"),
                    Token::Inputs,
                    Token::Join(vec![Token::lit("/Fo"), Token::Output]),
                ]);
                Ok(Rule::new(kind, label, command).with_deps(DepStyle::Msvc))
            }

            RuleKind::Archive => Ok(Rule::new(
                kind,
                "LIB",
                vec![
                    Token::Tool(ToolVar::Ar),
                    Token::lit("/nologo"),
                    Token::Join(vec![Token::lit("/OUT:"), Token::Output]),
                    Token::Inputs,
                ],
            )),

            RuleKind::LinkExecutable(lang) => self.link_rule(kind, lang, false),
            RuleKind::LinkShared(lang) => self.link_rule(kind, lang, true),
            RuleKind::Install { executable } => Ok(install_rule(Platform::Windows, executable)),
            RuleKind::Symlink => Err(self.unsupported("create symlinks")),
        }
    }

    fn translate(&self, option: &GenericOption) -> Vec<(Phase, FlagValue)> {
        use Phase::{Compile, Link};

        match option {
            GenericOption::WarningsAsErrors => vec![(Compile, arg("/WX"))],
            GenericOption::Warnings(Warnings::None) => vec![(Compile, arg("/W0"))],
            GenericOption::Warnings(Warnings::Default) => Vec::new(),
            GenericOption::Warnings(Warnings::All) => vec![(Compile, arg("/W3"))],
            GenericOption::Warnings(Warnings::Extra) => vec![(Compile, arg("/W4"))],
            GenericOption::Optimize(level) => {
                let flag = match level {
                    OptLevel::O0 => "/Od",
                    OptLevel::O1 | OptLevel::Size => "/O1",
                    OptLevel::O2 | OptLevel::O3 | OptLevel::Speed => "/O2",
                };
                vec![(Compile, arg(flag))]
            }
            GenericOption::Debug => vec![(Compile, arg("/Zi")), (Link, arg("/DEBUG"))],
            GenericOption::Pic | GenericOption::Pthread => Vec::new(),
            GenericOption::Std(std) => vec![(Compile, FlagValue::arg(format!("/std:{}", std)))],
            GenericOption::Define { name, value } => {
                vec![(Compile, FlagValue::define(name.clone(), value.clone()))]
            }
        }
    }

    fn render_flag(&self, flag: &FlagValue) -> Vec<Arg> {
        match flag {
            FlagValue::IncludeDir { path } => vec![Arg::prefixed("/I", path)],
            FlagValue::Define { name, value: None } => vec![Arg::text(format!("/D{}", name))],
            FlagValue::Define {
                name,
                value: Some(value),
            } => vec![Arg::text(format!("/D{}={}", name, value))],
            FlagValue::LibDir { path } => vec![Arg::prefixed("/LIBPATH:", path)],
            FlagValue::Library { name } if name.ends_with(".lib") => vec![Arg::text(name.clone())],
            FlagValue::Library { name } => vec![Arg::text(format!("{}.lib", name))],
            FlagValue::Arg { value } => vec![Arg::text(value.clone())],
            FlagValue::PathArg { prefix, path } => vec![Arg::prefixed(prefix.clone(), path)],
            FlagValue::WholeArchive { path } => vec![Arg::prefixed("/WHOLEARCHIVE:", path)],
        }
    }

    fn object_name(&self, stem: &str) -> String {
        format!("{}.obj", stem)
    }

    fn static_library_name(&self, name: &str) -> String {
        format!("{}.lib", name)
    }

    fn shared_library_names(
        &self,
        name: &str,
        _version: Option<&str>,
        _soversion: Option<&str>,
    ) -> SharedLibraryNames {
        let implib = format!("{}.lib", name);
        SharedLibraryNames {
            file: format!("{}.dll", name),
            import_library: Some(implib.clone()),
            soname: None,
            symlinks: Vec::new(),
            link_name: implib,
        }
    }

    fn executable_name(&self, name: &str) -> String {
        format!("{}.exe", name)
    }

    fn shared_object_flags(&self) -> Vec<FlagValue> {
        Vec::new()
    }

    fn shared_link_flags(
        &self,
        _names: &SharedLibraryNames,
        import_library: Option<&BuildPath>,
        _version: Option<&str>,
        _soversion: Option<&str>,
    ) -> Vec<FlagValue> {
        import_library
            .map(|implib| FlagValue::PathArg {
                prefix: "/IMPLIB:".to_string(),
                path: implib.clone(),
            })
            .into_iter()
            .collect()
    }

    fn runtime_search_flags(&self, _rel_dir: &str) -> Vec<FlagValue> {
        Vec::new()
    }

    fn link_search_flags(&self, _dir: &str) -> Vec<FlagValue> {
        Vec::new()
    }
}
