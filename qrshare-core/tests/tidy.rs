//! Style consistency checks for the core crate.
//!
//! Keeps modules small, bans catch-all module names and keeps console output
//! out of library code.

use std::fs;
use std::path::{Path, PathBuf};

/// Module size limit
const MAX_MODULE_LINES: usize = 500;

/// Anti-pattern module names
const BANNED_MODULE_NAMES: &[&str] = &[
    "utils", "util", "helpers", "helper", "common", "shared", "misc", "tools",
];

/// Output macros that belong in the CLI, not the library
const BANNED_OUTPUT_MACROS: &[&str] = &["println!", "eprintln!", "print!(", "eprint!(", "dbg!"];

fn rust_sources(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let Ok(entries) = fs::read_dir(dir) else {
        return files;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            files.extend(rust_sources(&path));
        } else if path.extension().is_some_and(|ext| ext == "rs") {
            files.push(path);
        }
    }

    files.sort();
    files
}

fn source_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("src")
}

/// Lines before the unit test module, if any.
fn non_test_lines(contents: &str) -> impl Iterator<Item = (usize, &str)> {
    contents
        .lines()
        .enumerate()
        .take_while(|(_, line)| line.trim() != "#[cfg(test)]")
}

#[test]
fn test_modules_within_size_limit() {
    let oversized: Vec<String> = rust_sources(&source_dir())
        .into_iter()
        .filter_map(|path| {
            let lines = fs::read_to_string(&path).ok()?.lines().count();
            (lines > MAX_MODULE_LINES).then(|| format!("{} ({lines} lines)", path.display()))
        })
        .collect();

    assert!(
        oversized.is_empty(),
        "Modules over {MAX_MODULE_LINES} lines: {oversized:?}"
    );
}

#[test]
fn test_no_catch_all_module_names() {
    let banned: Vec<String> = rust_sources(&source_dir())
        .into_iter()
        .filter(|path| {
            let stem = if path.file_stem().is_some_and(|s| s == "mod") {
                path.parent().and_then(Path::file_name)
            } else {
                path.file_stem()
            };
            stem.and_then(|s| s.to_str())
                .is_some_and(|name| BANNED_MODULE_NAMES.contains(&name))
        })
        .map(|path| path.display().to_string())
        .collect();

    assert!(banned.is_empty(), "Catch-all module names: {banned:?}");
}

#[test]
fn test_library_code_does_not_print() {
    let mut violations = Vec::new();

    for path in rust_sources(&source_dir()) {
        let Ok(contents) = fs::read_to_string(&path) else {
            continue;
        };
        for (index, line) in non_test_lines(&contents) {
            let code = line.split("//").next().unwrap_or_default();
            if BANNED_OUTPUT_MACROS.iter().any(|m| code.contains(m)) {
                violations.push(format!("{}:{}", path.display(), index + 1));
            }
        }
    }

    assert!(
        violations.is_empty(),
        "Console output in library code: {violations:?}"
    );
}
