//! Workspace discovery and the initial scan.
//!
//! Walks the workspace root respecting .gitignore, collects C# sources
//! (skipping `bin`/`obj` build output), parses them in parallel, and
//! assembles the starting model. A file that fails to parse is reported
//! once and contributes nothing; the rest of the model is unaffected.

use ignore::WalkBuilder;
use rayon::prelude::*;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{info, warn};

use super::WorkspaceModel;
use crate::model::TypeDeclaration;
use crate::parser;

/// What a scan saw and what became of it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub files_found: usize,
    pub files_parsed: usize,
    pub files_failed: usize,
}

impl fmt::Display for ScanStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "found {} source files ({} parsed, {} failed)",
            self.files_found, self.files_parsed, self.files_failed
        )
    }
}

/// Enumerate all C# source files under a workspace root.
pub fn discover(root: &Path) -> Vec<PathBuf> {
    WalkBuilder::new(root)
        .hidden(true)
        .git_ignore(true)
        .git_global(true)
        .git_exclude(true)
        .build()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
        .map(|entry| entry.into_path())
        .filter(|path| parser::is_source_file(path) && !in_build_output(path))
        .collect()
}

/// Build-output directories are never part of the working set.
pub(crate) fn in_build_output(path: &Path) -> bool {
    path.components().any(|component| {
        component
            .as_os_str()
            .to_str()
            .is_some_and(|name| name.eq_ignore_ascii_case("bin") || name.eq_ignore_ascii_case("obj"))
    })
}

/// Parse every discovered file (in parallel) and assemble the model.
pub fn scan_workspace(root: &Path) -> (WorkspaceModel, ScanStats) {
    let files = discover(root);
    let mut stats = ScanStats {
        files_found: files.len(),
        ..Default::default()
    };

    let results: Mutex<Vec<(PathBuf, Option<Vec<TypeDeclaration>>)>> =
        Mutex::new(Vec::with_capacity(files.len()));

    files.par_iter().for_each(|path| {
        let outcome = match fs::read_to_string(path) {
            Ok(source) => match parser::parse(&source, path) {
                Ok(parsed) => Some(parsed.into_vec()),
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "skipping unparsable file");
                    None
                }
            },
            Err(err) => {
                warn!(path = %path.display(), error = %err, "skipping unreadable file");
                None
            }
        };
        if let Ok(mut out) = results.lock() {
            out.push((path.clone(), outcome));
        }
    });

    let mut results = results.into_inner().unwrap_or_default();
    // Parallel completion order is arbitrary; sorting keeps the assembled
    // model deterministic for identical inputs.
    results.sort_by(|(a, _), (b, _)| a.cmp(b));

    let mut model = WorkspaceModel::new();
    for (path, outcome) in results {
        let version = model.next_version(&path);
        match outcome {
            Some(types) => {
                stats.files_parsed += 1;
                model.replace_file(&path, types, version);
            }
            None => {
                stats.files_failed += 1;
                model.replace_file(&path, Vec::new(), version);
            }
        }
    }

    info!(%stats, types = model.len(), "workspace scan complete");
    (model, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn scan_collects_types_and_skips_build_output() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "src/Order.cs", "namespace App { public class Order { } }");
        write(root, "src/notes.txt", "not code");
        write(root, "bin/Debug/Gen.cs", "namespace App { public class Gen { } }");
        write(root, "obj/Temp.cs", "namespace App { public class Temp { } }");

        let (model, stats) = scan_workspace(root);
        assert_eq!(stats.files_found, 1);
        assert_eq!(stats.files_parsed, 1);
        assert_eq!(stats.files_failed, 0);
        assert!(model.find_type("App", "Order").is_some());
        assert!(model.find_type("App", "Gen").is_none());
    }

    #[test]
    fn unparsable_file_contributes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "Good.cs", "namespace App { public class Good { } }");
        write(root, "Bad.cs", "namespace App { class {{{");

        let (model, stats) = scan_workspace(root);
        assert_eq!(stats.files_found, 2);
        assert_eq!(stats.files_parsed, 1);
        assert_eq!(stats.files_failed, 1);
        assert_eq!(model.len(), 1);
        assert!(model.find_type("App", "Good").is_some());
    }

    #[test]
    fn discover_is_extension_driven() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "a.cs", "");
        write(root, "b.rs", "");
        write(root, "nested/deep/c.cs", "");

        let mut found = discover(root);
        found.sort();
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|p| p.extension().unwrap() == "cs"));
    }
}
