//! Architectural Enforcement Integration Tests
//!
//! This package contains source-scanning tests that enforce the structural
//! rules of the tandem workspace:
//! - Proxies hold senders and signals, never locks
//! - No sleep() calls in production code
//!
//! The helpers below locate the workspace and split source files into their
//! production part and their `#[cfg(test)]` tail.

use std::fs;
use std::path::{Path, PathBuf};

/// Root of the workspace (two levels above this package)
#[must_use]
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
}

/// All `.rs` files below `dir`, relative to the workspace root
#[must_use]
pub fn rust_files(dir: &str) -> Vec<PathBuf> {
    let root = workspace_root().join(dir);
    walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("rs"))
        .map(|e| e.into_path())
        .collect()
}

/// A line of production code
pub struct SourceLine {
    /// File the line belongs to
    pub path: PathBuf,
    /// 1-based line number
    pub number: usize,
    /// Line text with any trailing `//` comment removed
    pub code: String,
}

/// Production lines of a file: everything before the first `#[cfg(test)]`,
/// with comments stripped
#[must_use]
pub fn production_lines(path: &Path) -> Vec<SourceLine> {
    let Ok(content) = fs::read_to_string(path) else {
        return Vec::new();
    };

    content
        .lines()
        .enumerate()
        .take_while(|(_, line)| line.trim() != "#[cfg(test)]")
        .map(|(idx, line)| SourceLine {
            path: path.to_path_buf(),
            number: idx + 1,
            code: line.split("//").next().unwrap_or(line).to_string(),
        })
        .collect()
}

/// Production lines containing any of `patterns`, formatted as
/// `path:line: code`
#[must_use]
pub fn find_violations(dirs: &[&str], patterns: &[&str]) -> Vec<String> {
    let mut violations = Vec::new();
    for dir in dirs {
        for path in rust_files(dir) {
            for line in production_lines(&path) {
                if patterns.iter().any(|p| line.code.contains(p)) {
                    violations.push(format!(
                        "{}:{}: {}",
                        line.path.display(),
                        line.number,
                        line.code.trim()
                    ));
                }
            }
        }
    }
    violations
}
