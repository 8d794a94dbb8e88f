//! Repository file discovery: walks a root directory honoring `.gitignore`
//! and the configured exclude patterns, yielding only files whose extension
//! maps to a [`codegraph_core::SupportedLanguage`].

use std::path::{Path, PathBuf};

use codegraph_core::SupportedLanguage;
use ignore::WalkBuilder;

/// Build the list of indexable files under `root`. `exclude_patterns` are
/// glob-style patterns (matched against the relative path) layered on top
/// of whatever `.gitignore`/`.ignore` files `ignore` already respects.
pub fn discover_files(root: &Path, exclude_patterns: &[String]) -> Vec<PathBuf> {
    let overrides = build_overrides(root, exclude_patterns);

    let mut walker = WalkBuilder::new(root);
    walker.hidden(false).git_ignore(true).git_global(true).git_exclude(true);
    if let Some(overrides) = &overrides {
        walker.overrides(overrides.clone());
    }

    let mut files = Vec::new();
    for entry in walker.build().flatten() {
        let path = entry.path();
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        if SupportedLanguage::from_path(path).is_some() {
            files.push(path.to_path_buf());
        }
    }
    files.sort();
    files
}

fn build_overrides(root: &Path, exclude_patterns: &[String]) -> Option<ignore::overrides::Override> {
    if exclude_patterns.is_empty() {
        return None;
    }
    let mut builder = ignore::overrides::OverrideBuilder::new(root);
    for pattern in exclude_patterns {
        let negated = format!("!{pattern}");
        if builder.add(&negated).is_err() {
            continue;
        }
    }
    builder.build().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn discovers_only_supported_extensions() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.rs"), "fn main() {}").unwrap();
        fs::write(dir.path().join("notes.txt"), "hello").unwrap();

        let files = discover_files(dir.path(), &[]);
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("a.rs"));
    }

    #[test]
    fn respects_exclude_patterns() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("vendor")).unwrap();
        fs::write(dir.path().join("vendor/dep.rs"), "fn x() {}").unwrap();
        fs::write(dir.path().join("main.rs"), "fn main() {}").unwrap();

        let files = discover_files(dir.path(), &["vendor/**".to_string()]);
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("main.rs"));
    }
}
