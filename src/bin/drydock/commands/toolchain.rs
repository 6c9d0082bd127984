//! `drydock toolchain` command
//!
//! Shows the tool commands, rule templates and output names a toolchain
//! contributes, without reading a project.

use anyhow::Result;

use crate::cli::ToolchainArgs;
use drydock::builder::graph::template;
use drydock::builder::toolchain::{RuleKind, ToolVar};
use drydock::core::language::Language;
use drydock::core::{Environment, Platform, ToolchainId};
use drydock::GenerateError;

const LANGUAGES: [Language; 4] = [Language::C, Language::Cxx, Language::ObjC, Language::ObjCxx];

pub fn execute(args: ToolchainArgs) -> Result<()> {
    let platform = args.platform.unwrap_or_else(Platform::host);
    let id = args
        .toolchain
        .unwrap_or_else(|| ToolchainId::default_for(platform));
    let env = Environment::new(platform, id).map_err(GenerateError::from)?;
    let tc = env.toolchain();

    println!("Toolchain: {} on {}", id, platform);
    println!();

    println!("Tools:");
    for var in ToolVar::ALL {
        println!("  {:<4} {}", var.as_str(), env.tools().get(var));
    }
    println!();

    let mut kinds: Vec<RuleKind> = LANGUAGES.iter().map(|&l| RuleKind::Compile(l)).collect();
    kinds.push(RuleKind::Archive);
    kinds.extend(LANGUAGES.iter().map(|&l| RuleKind::LinkExecutable(l)));
    kinds.extend(LANGUAGES.iter().map(|&l| RuleKind::LinkShared(l)));
    kinds.push(RuleKind::Install { executable: false });
    kinds.push(RuleKind::Install { executable: true });
    kinds.push(RuleKind::Symlink);

    println!("Rules:");
    for kind in kinds {
        match tc.rule(kind) {
            Ok(rule) => println!("  {:<20} {}", rule.name, template(&rule.command)),
            Err(e) => println!("  {:<20} unsupported: {}", kind.name(), e),
        }
    }
    println!();

    let shared = tc.shared_library_names("foo", Some("1.2.3"), Some("1"));
    println!("Output names:");
    println!("  object          {}", tc.object_name("foo"));
    println!("  static library  {}", tc.static_library_name("foo"));
    println!("  shared library  {}", shared.file);
    if let Some(import) = &shared.import_library {
        println!("  import library  {}", import);
    }
    for (link, target) in &shared.symlinks {
        println!("  symlink         {} -> {}", link, target);
    }
    println!("  executable      {}", tc.executable_name("foo"));

    Ok(())
}
