//! Source languages.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Source language of a translation unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// C
    C,
    /// C++
    #[serde(alias = "cpp", alias = "c++")]
    Cxx,
    /// Objective-C
    #[serde(alias = "objective-c")]
    ObjC,
    /// Objective-C++
    #[serde(alias = "objective-c++")]
    ObjCxx,
}

impl Language {
    /// Get the language name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::C => "c",
            Language::Cxx => "c++",
            Language::ObjC => "objc",
            Language::ObjCxx => "objc++",
        }
    }

    /// Detect the language of a source file from its extension.
    ///
    /// Returns `None` for headers and unknown extensions.
    pub fn from_path(path: impl AsRef<Path>) -> Option<Language> {
        let ext = path.as_ref().extension()?.to_str()?;
        match ext {
            "c" => Some(Language::C),
            // Case-sensitive: `.C` is C++, `.c` is C.
            "cpp" | "cc" | "cxx" | "c++" | "C" => Some(Language::Cxx),
            "m" => Some(Language::ObjC),
            "mm" => Some(Language::ObjCxx),
            _ => None,
        }
    }

    /// Whether a path looks like a header file.
    pub fn is_header(path: impl AsRef<Path>) -> bool {
        matches!(
            path.as_ref().extension().and_then(|e| e.to_str()),
            Some("h" | "hh" | "hpp" | "hxx" | "h++" | "inl" | "ipp")
        )
    }

    /// Whether objects in this language need the C++ driver to link.
    pub fn needs_cxx_linker(&self) -> bool {
        matches!(self, Language::Cxx | Language::ObjCxx)
    }

    /// Name of the compile flags variable for this language.
    pub fn flags_var(&self) -> &'static str {
        match self {
            Language::C => "cflags",
            Language::Cxx => "cxxflags",
            Language::ObjC => "objcflags",
            Language::ObjCxx => "objcxxflags",
        }
    }

    /// Short identifier used in rule names.
    pub fn rule_prefix(&self) -> &'static str {
        match self {
            Language::C => "c",
            Language::Cxx => "cxx",
            Language::ObjC => "objc",
            Language::ObjCxx => "objcxx",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_from_extension() {
        assert_eq!(Language::from_path("src/a.c"), Some(Language::C));
        assert_eq!(Language::from_path("a.cpp"), Some(Language::Cxx));
        assert_eq!(Language::from_path("a.cc"), Some(Language::Cxx));
        assert_eq!(Language::from_path("a.C"), Some(Language::Cxx));
        assert_eq!(Language::from_path("a.m"), Some(Language::ObjC));
        assert_eq!(Language::from_path("a.mm"), Some(Language::ObjCxx));
        assert_eq!(Language::from_path("a.h"), None);
        assert_eq!(Language::from_path("Makefile"), None);
    }

    #[test]
    fn test_headers() {
        assert!(Language::is_header("include/a.hpp"));
        assert!(Language::is_header("a.h"));
        assert!(!Language::is_header("a.c"));
    }

    #[test]
    fn test_linker_driver() {
        assert!(!Language::C.needs_cxx_linker());
        assert!(Language::Cxx.needs_cxx_linker());
        assert!(Language::ObjCxx.needs_cxx_linker());
    }
}
