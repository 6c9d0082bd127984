//! Test doubles and fixtures shared by unit tests.
//!
//! [`FakeQuery`] stands in for pkg-config: it answers from a table and
//! counts how often each package was asked for, so memoization can be
//! checked without spawning processes.

pub mod fixtures;

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub use fixtures::*;

use crate::core::environment::{Environment, Platform, ToolchainId};
use crate::core::package::PackageKind;
use crate::resolver::query::split_words;
use crate::resolver::{PackageQuery, QueryFailure, QueryOutput};

/// In-memory package query.
#[derive(Debug, Default)]
pub struct FakeQuery {
    packages: HashMap<String, QueryOutput>,
    calls: Mutex<HashMap<String, usize>>,
    total: AtomicUsize,
    unavailable: bool,
}

impl FakeQuery {
    pub fn new() -> Self {
        FakeQuery::default()
    }

    /// Register a package with pkg-config style flag strings.
    pub fn with_package(mut self, name: &str, version: &str, cflags: &str, libs: &str) -> Self {
        self.packages.insert(
            name.to_string(),
            QueryOutput {
                cflags: split_words(cflags).unwrap(),
                libs: split_words(libs).unwrap(),
                version: Some(version.to_string()),
            },
        );
        self
    }

    /// Behave as if the query tool were missing.
    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    /// How many times `name` was queried.
    pub fn calls(&self, name: &str) -> usize {
        self.calls.lock().unwrap().get(name).copied().unwrap_or(0)
    }

    /// How many queries ran in total.
    pub fn total_calls(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}

impl PackageQuery for FakeQuery {
    fn query(&self, name: &str, _kind: PackageKind) -> Result<QueryOutput, QueryFailure> {
        *self.calls.lock().unwrap().entry(name.to_string()).or_default() += 1;
        self.total.fetch_add(1, Ordering::SeqCst);

        if self.unavailable {
            return Err(QueryFailure::Unavailable("pkg-config not found in PATH".to_string()));
        }
        self.packages
            .get(name)
            .cloned()
            .ok_or_else(|| QueryFailure::NotFound(Some(format!("Package {} was not found", name))))
    }
}

/// Linux with gcc, default directories.
pub fn linux_gcc() -> Environment {
    Environment::new(Platform::Linux, ToolchainId::Gcc).unwrap()
}

/// Darwin with clang.
pub fn darwin_clang() -> Environment {
    Environment::new(Platform::Darwin, ToolchainId::Clang).unwrap()
}

/// Windows with MSVC.
pub fn windows_msvc() -> Environment {
    Environment::new(Platform::Windows, ToolchainId::Msvc).unwrap()
}

/// Windows with MinGW gcc.
pub fn windows_mingw() -> Environment {
    Environment::new(Platform::Windows, ToolchainId::Gcc).unwrap()
}
