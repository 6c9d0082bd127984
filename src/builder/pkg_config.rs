//! pkg-config descriptor generation.
//!
//! A `.pc` file is rendered from the exported library and its link closure
//! while the graph is compiled. Its contents travel in the graph as a
//! generated edge; backends write it out with the build files.

use std::path::Path;

use crate::core::environment::InstallDirs;
use crate::core::flags::FlagValue;
use crate::core::path::{InstallRoot, Root};
use crate::errors::ConfigurationError;
use crate::util::fs::to_slash;

/// Everything a `.pc` file says about one library.
#[derive(Debug, Clone)]
pub struct PcFile<'a> {
    pub name: &'a str,
    pub description: String,
    pub version: String,
    pub requires: &'a [String],
    /// Name passed to `-l` for the exported library
    pub library: &'a str,
    /// Other project libraries consumers must link too, in link order
    pub link_libraries: Vec<String>,
    /// Compile flags of packages in the library's closure
    pub cflags: Vec<FlagValue>,
    /// Link flags consumers must add after the libraries
    pub libs: Vec<FlagValue>,
}

impl PcFile<'_> {
    /// Render the descriptor text. Fields that would break the line-based
    /// format are rejected.
    pub fn render(&self, dirs: &InstallDirs) -> Result<String, ConfigurationError> {
        self.check_field("Name", self.name)?;
        self.check_field("Description", &self.description)?;
        self.check_field("Version", &self.version)?;
        for requirement in self.requires {
            self.check_field("Requires", requirement)?;
        }

        let mut out = String::new();

        out.push_str(&format!("prefix={}\n", to_slash(&dirs.prefix)));
        out.push_str("exec_prefix=${prefix}\n");
        out.push_str(&format!(
            "libdir={}\n",
            dir_var(dirs.raw(InstallRoot::Libdir), "${exec_prefix}")
        ));
        out.push_str(&format!(
            "includedir={}\n",
            dir_var(dirs.raw(InstallRoot::Includedir), "${prefix}")
        ));
        out.push('\n');

        out.push_str(&format!("Name: {}\n", self.name));
        out.push_str(&format!("Description: {}\n", self.description));
        out.push_str(&format!("Version: {}\n", self.version));
        out.push_str(&format!("Requires: {}\n", self.requires.join(", ")));

        let mut cflags = vec!["-I${includedir}".to_string()];
        cflags.extend(self.cflags.iter().filter_map(word));
        out.push_str(&format!("Cflags: {}\n", cflags.join(" ")));

        let mut libs = vec!["-L${libdir}".to_string(), format!("-l{}", self.library)];
        libs.extend(self.link_libraries.iter().map(|l| format!("-l{}", l)));
        libs.extend(self.libs.iter().filter_map(word));
        out.push_str(&format!("Libs: {}\n", libs.join(" ")));

        Ok(out)
    }

    fn check_field(&self, field: &str, value: &str) -> Result<(), ConfigurationError> {
        let empty_name = field == "Name" && value.trim().is_empty();
        if empty_name || value.contains(['\n', '\r', '\0']) {
            return Err(ConfigurationError::InvalidExportField {
                export: self.name.to_string(),
                field: field.to_string(),
                value: value.to_string(),
            });
        }
        Ok(())
    }
}

fn dir_var(dir: &Path, base: &str) -> String {
    if dir.is_absolute() {
        to_slash(dir)
    } else {
        format!("{}/{}", base, to_slash(dir))
    }
}

/// A flag in pkg-config (gcc) syntax. Paths inside the project have no
/// meaning to consumers and are dropped.
fn word(flag: &FlagValue) -> Option<String> {
    let text = match flag {
        FlagValue::IncludeDir { path } if path.root() == Root::External => {
            format!("-I{}", path.as_str())
        }
        FlagValue::LibDir { path } if path.root() == Root::External => {
            format!("-L{}", path.as_str())
        }
        FlagValue::PathArg { prefix, path } if path.root() == Root::External => {
            format!("{}{}", prefix, path.as_str())
        }
        FlagValue::IncludeDir { .. }
        | FlagValue::LibDir { .. }
        | FlagValue::PathArg { .. }
        | FlagValue::WholeArchive { .. } => {
            return None;
        }
        FlagValue::Define { name, value: None } => format!("-D{}", name),
        FlagValue::Define {
            name,
            value: Some(value),
        } => format!("-D{}={}", name, value),
        FlagValue::Library { name } => format!("-l{}", name),
        FlagValue::Arg { value } => value.clone(),
    };
    shlex::try_quote(&text).ok().map(|q| q.into_owned())
}
