//! CLI integration tests for Drydock.
//!
//! These tests run the `drydock` binary against projects written to a
//! temporary directory. Packages are described manually so no test needs
//! pkg-config.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get the drydock binary command.
fn drydock() -> Command {
    let mut cmd = Command::cargo_bin("drydock").unwrap();
    cmd.env_remove("DRYDOCK_BUILDDIR");
    cmd
}

/// Create a temporary directory for test projects.
fn temp_dir() -> TempDir {
    TempDir::new().unwrap()
}

const MANIFEST: &str = r#"[project]
name = "calc"
version = "0.3.0"

[[package]]
name = "z"
include_dirs = ["/opt/z/include"]
lib_dirs = ["/opt/z/lib"]
libs = ["z"]

[[header]]
path = "include/calc.h"

[[library]]
name = "core"
sources = ["src/core/*.c"]
include_dirs = ["include"]
packages = ["z"]

[[executable]]
name = "calc"
sources = ["src/main.c"]
libs = ["core"]

[[pkg_config]]
name = "core"
description = "Calculator core"

[install]
targets = ["calc", "core", "include/calc.h"]
"#;

/// Write a project with the given manifest and the calc sources.
fn write_project(dir: &Path, manifest: &str) -> PathBuf {
    let root = dir.join("calc");
    let files = [
        ("Drydock.toml", manifest),
        ("include/calc.h", "int add(int, int);\n"),
        ("src/core/add.c", "int add(int a, int b) { return a + b; }\n"),
        ("src/core/sub.c", "int sub(int a, int b) { return a - b; }\n"),
        ("src/main.c", "#include \"calc.h\"\nint main(void) { return add(1, -1); }\n"),
    ];
    for (rel, content) in files {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
    root
}

/// `drydock generate` for Linux and gcc, ignoring the user's config.
fn generate(root: &Path) -> Command {
    let mut cmd = drydock();
    cmd.arg("generate")
        .arg("--manifest-path")
        .arg(root)
        .args(["--platform", "linux", "--toolchain", "gcc", "--no-global-config"]);
    cmd
}

// ============================================================================
// drydock generate
// ============================================================================

#[test]
fn test_generate_ninja() {
    let tmp = temp_dir();
    let root = write_project(tmp.path(), MANIFEST);

    generate(&root)
        .assert()
        .success()
        .stdout(predicate::str::contains("build.ninja"));

    let ninja = fs::read_to_string(root.join("build/build.ninja")).unwrap();
    assert!(ninja.contains("build core.dir/src/core/add.o: c_compile $srcdir/src/core/add.c"));
    assert!(ninja.contains("build core.dir/src/core/sub.o: c_compile $srcdir/src/core/sub.c"));
    assert!(ninja.contains("build calc: c_link calc.dir/src/main.o libcore.a"));
    assert!(ninja.contains("-I/opt/z/include"));
    assert!(ninja.contains("-L/opt/z/lib"));
    assert!(ninja.contains("-lz"));
    assert!(ninja.contains("build install: phony $bindir/calc $libdir/libcore.a $includedir/calc.h"));

    let pc = fs::read_to_string(root.join("build/core.pc")).unwrap();
    assert!(pc.contains("Name: core\n"));
    assert!(pc.contains("Description: Calculator core\n"));
    assert!(pc.contains("Version: 0.3.0\n"));
}

#[test]
fn test_generate_make_and_compile_commands() {
    let tmp = temp_dir();
    let root = write_project(tmp.path(), MANIFEST);

    generate(&root)
        .args(["--backend", "ninja,make", "--emit-compile-commands"])
        .assert()
        .success();

    let build = root.join("build");
    assert!(build.join("build.ninja").is_file());
    assert!(build.join("compile_commands.json").is_file());

    let makefile = fs::read_to_string(build.join("Makefile")).unwrap();
    assert!(makefile.contains("CC = gcc\n"));
    assert!(makefile.contains("calc: calc.dir/src/main.o libcore.a"));
    assert!(makefile.contains("install:"));

    let commands: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(build.join("compile_commands.json")).unwrap())
            .unwrap();
    assert_eq!(commands.as_array().unwrap().len(), 3);
}

#[test]
fn test_generate_is_repeatable() {
    let tmp = temp_dir();
    let root = write_project(tmp.path(), MANIFEST);

    generate(&root).assert().success();
    let first = fs::read_to_string(root.join("build/build.ninja")).unwrap();
    generate(&root).assert().success();
    let second = fs::read_to_string(root.join("build/build.ninja")).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_generate_custom_builddir_and_prefix() {
    let tmp = temp_dir();
    let root = write_project(tmp.path(), MANIFEST);

    generate(&root)
        .args(["--builddir", "out/linux", "--prefix", "/opt/calc"])
        .assert()
        .success();

    let ninja = fs::read_to_string(root.join("out/linux/build.ninja")).unwrap();
    assert!(ninja.contains("srcdir = ../..\n"));
    assert!(ninja.contains("prefix = /opt/calc\n"));
    assert!(ninja.contains("libdir = /opt/calc/lib\n"));
}

#[test]
fn test_generate_finds_manifest_from_cwd() {
    let tmp = temp_dir();
    let root = write_project(tmp.path(), MANIFEST);

    drydock()
        .args(["generate", "--platform", "linux", "--toolchain", "gcc", "--no-global-config"])
        .current_dir(root.join("src"))
        .assert()
        .success();

    assert!(root.join("build/build.ninja").is_file());
}

#[test]
fn test_unknown_target_fails_without_output() {
    let tmp = temp_dir();
    let manifest = MANIFEST.replace("libs = [\"core\"]", "libs = [\"nope\"]");
    let root = write_project(tmp.path(), &manifest);

    generate(&root)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("unknown target `nope`"));

    assert!(!root.join("build").exists());
}

#[test]
fn test_msbuild_rejects_gcc() {
    let tmp = temp_dir();
    let root = write_project(tmp.path(), MANIFEST);

    generate(&root)
        .args(["--backend", "ninja,msbuild"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("msbuild"));

    assert!(!root.join("build/build.ninja").exists());
}

#[test]
fn test_invalid_manifest_reports_path() {
    let tmp = temp_dir();
    let root = write_project(tmp.path(), "[project]\nname = \"calc\"\nbogus = 1\n");

    generate(&root)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Drydock.toml"));
}

#[test]
fn test_missing_manifest() {
    let tmp = temp_dir();

    drydock()
        .args(["generate", "--no-global-config"])
        .arg("--manifest-path")
        .arg(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("no Drydock.toml"));
}

// ============================================================================
// drydock graph / backends / toolchain / completions
// ============================================================================

#[test]
fn test_graph_prints_json() {
    let tmp = temp_dir();
    let root = write_project(tmp.path(), MANIFEST);

    let output = drydock()
        .arg("graph")
        .arg("--manifest-path")
        .arg(&root)
        .args(["--platform", "linux", "--toolchain", "gcc", "--no-global-config"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let graph: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(graph["project"], "calc");
    let targets: Vec<&str> = graph["targets"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert!(targets.contains(&"core"));
    assert!(targets.contains(&"calc"));
    assert!(!root.join("build").exists());
}

#[test]
fn test_backends_lists_all() {
    drydock()
        .arg("backends")
        .assert()
        .success()
        .stdout(predicate::str::contains("ninja"))
        .stdout(predicate::str::contains("make"))
        .stdout(predicate::str::contains("msbuild"));
}

#[test]
fn test_toolchain_shows_rules() {
    drydock()
        .args(["toolchain", "--platform", "windows", "--toolchain", "msvc"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/showIncludes"))
        .stdout(predicate::str::contains("foo.dll"));
}

#[test]
fn test_toolchain_rejects_msvc_on_linux() {
    drydock()
        .args(["toolchain", "--platform", "linux", "--toolchain", "msvc"])
        .assert()
        .failure()
        .code(1);
}

#[test]
fn test_unknown_backend_is_a_usage_error() {
    drydock()
        .args(["generate", "--backend", "scons"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid backend 'scons'"));
}

#[test]
fn test_completions() {
    drydock()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("drydock"));
}
