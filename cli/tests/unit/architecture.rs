//! Structural tests for layer boundaries.
//!
//! domain ← application ← infra ← commands/output. Each test scans the
//! non-test source of one layer for imports it must not have.

use std::path::{Path, PathBuf};

fn src_dir(layer: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("src").join(layer)
}

/// Collect all `.rs` files under a directory recursively.
fn collect_rs_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                files.extend(collect_rs_files(&path));
            } else if path.extension().and_then(|e| e.to_str()) == Some("rs") {
                files.push(path);
            }
        }
    }
    files
}

/// Non-comment lines before the first `#[cfg(test)]`.
fn production_lines(path: &Path) -> Vec<String> {
    let Ok(content) = std::fs::read_to_string(path) else {
        return Vec::new();
    };
    content
        .lines()
        .take_while(|l| !l.contains("#[cfg(test)]"))
        .filter(|l| {
            let trimmed = l.trim();
            !trimmed.starts_with("//") && !trimmed.starts_with("/*") && !trimmed.starts_with('*')
        })
        .map(String::from)
        .collect()
}

fn violations(layer: &str, forbidden: &[&str]) -> Vec<String> {
    let mut found = Vec::new();
    for file in collect_rs_files(&src_dir(layer)) {
        for (i, line) in production_lines(&file).iter().enumerate() {
            if forbidden.iter().any(|f| line.contains(f)) {
                found.push(format!("{}:{}: {}", file.display(), i + 1, line.trim()));
            }
        }
    }
    found
}

#[test]
fn test_layer_directories_exist() {
    for layer in ["domain", "application", "infra", "commands", "output"] {
        assert!(src_dir(layer).is_dir(), "missing src/{layer}");
    }
}

#[test]
fn test_domain_has_no_outward_or_io_imports() {
    let found = violations(
        "domain",
        &[
            "crate::application",
            "crate::infra",
            "crate::commands",
            "crate::output",
            "tokio::",
            "reqwest::",
            "std::fs::",
        ],
    );
    assert!(found.is_empty(), "domain imports outward:\n{}", found.join("\n"));
}

#[test]
fn test_application_does_not_import_infra_or_presentation() {
    let found = violations(
        "application",
        &["crate::infra", "crate::commands", "crate::output", "reqwest::"],
    );
    assert!(
        found.is_empty(),
        "application imports outward:\n{}",
        found.join("\n")
    );
}

#[test]
fn test_infra_does_not_import_presentation() {
    let found = violations("infra", &["crate::commands", "crate::output"]);
    assert!(found.is_empty(), "infra imports outward:\n{}", found.join("\n"));
}
