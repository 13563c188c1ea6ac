//! Entry point lookup inside an installed package

use crate::error::{DxError, DxResult};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

const MANIFEST: &str = "package.json";

#[derive(Debug, Deserialize)]
struct Manifest {
    main: Option<String>,
}

/// Find the module to load for the package at `resolved`.
///
/// The nearest ancestor of `resolved` (itself included) holding a
/// `package.json` is the package root. Its `main` field is probed the way
/// Node resolves files: as given, with `.js`, with `.cjs`, then as a
/// directory with `index.js`.
pub fn locate_entry_point(resolved: &Path) -> DxResult<PathBuf> {
    let no_entry = |path: &Path, reason: String| DxError::NoEntryPoint {
        path: path.to_path_buf(),
        reason,
    };

    let root = resolved
        .ancestors()
        .find(|dir| dir.join(MANIFEST).is_file())
        .ok_or_else(|| no_entry(resolved, format!("no {MANIFEST} found")))?;

    let manifest_path = root.join(MANIFEST);
    let raw = std::fs::read_to_string(&manifest_path)
        .map_err(|e| no_entry(root, format!("reading {MANIFEST}: {e}")))?;
    let manifest: Manifest = serde_json::from_str(&raw)
        .map_err(|e| no_entry(root, format!("invalid {MANIFEST}: {e}")))?;

    let main = manifest
        .main
        .filter(|m| !m.trim().is_empty())
        .ok_or_else(|| no_entry(root, format!("{MANIFEST} has no main field")))?;

    // `components` drops interior `.` segments such as `./lib`
    let base: PathBuf = root.join(main.trim()).components().collect();
    let candidates = [
        base.clone(),
        with_suffix(&base, ".js"),
        with_suffix(&base, ".cjs"),
        base.join("index.js"),
    ];

    let entry = candidates
        .into_iter()
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| no_entry(root, format!("main '{}' does not exist", main.trim())))?;

    debug!("Entry point: {}", entry.display());
    Ok(entry)
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut s = path.as_os_str().to_os_string();
    s.push(suffix);
    PathBuf::from(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn package(manifest: &str, files: &[&str]) -> TempDir {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(MANIFEST), manifest).unwrap();
        for file in files {
            let path = temp.path().join(file);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, "module.exports = () => 0;\n").unwrap();
        }
        temp
    }

    #[test]
    fn resolves_main_field() {
        let pkg = package(r#"{ "main": "./lib/index.js" }"#, &["lib/index.js"]);
        let entry = locate_entry_point(pkg.path()).unwrap();
        assert_eq!(entry, pkg.path().join("lib").join("index.js"));
    }

    #[test]
    fn probes_extensions_and_directory_index() {
        let pkg = package(r#"{ "main": "lib/cli" }"#, &["lib/cli.js"]);
        assert_eq!(
            locate_entry_point(pkg.path()).unwrap(),
            pkg.path().join("lib/cli.js")
        );

        let pkg = package(r#"{ "main": "lib/cli" }"#, &["lib/cli.cjs"]);
        assert_eq!(
            locate_entry_point(pkg.path()).unwrap(),
            pkg.path().join("lib/cli.cjs")
        );

        let pkg = package(r#"{ "main": "lib" }"#, &["lib/index.js"]);
        assert_eq!(
            locate_entry_point(pkg.path()).unwrap(),
            pkg.path().join("lib/index.js")
        );
    }

    #[test]
    fn finds_manifest_in_ancestor() {
        let pkg = package(r#"{ "main": "index.js" }"#, &["index.js"]);
        let nested = pkg.path().join("src").join("deep");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(
            locate_entry_point(&nested).unwrap(),
            pkg.path().join("index.js")
        );
    }

    #[test]
    fn missing_main_is_no_entry_point() {
        let pkg = package(r#"{ "name": "x" }"#, &["index.js"]);
        let err = locate_entry_point(pkg.path()).unwrap_err();
        assert!(matches!(err, DxError::NoEntryPoint { .. }));
        assert!(err.to_string().contains("no main field"));
    }

    #[test]
    fn main_pointing_nowhere_is_no_entry_point() {
        let pkg = package(r#"{ "main": "dist/cli.js" }"#, &[]);
        assert!(matches!(
            locate_entry_point(pkg.path()),
            Err(DxError::NoEntryPoint { .. })
        ));
    }

    #[test]
    fn invalid_manifest_is_no_entry_point() {
        let pkg = package("{ not json", &[]);
        assert!(matches!(
            locate_entry_point(pkg.path()),
            Err(DxError::NoEntryPoint { .. })
        ));
    }

    #[test]
    fn missing_manifest_is_no_entry_point() {
        let temp = TempDir::new().unwrap();
        // Ancestors of a temp dir carry no package.json
        let err = locate_entry_point(temp.path()).unwrap_err();
        assert!(err.to_string().contains("no package.json"));
    }
}
