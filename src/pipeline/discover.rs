//! Document discovery: find every target file below a root folder.
//!
//! The walk is lazy and unbounded in depth. Entries that cannot be read
//! (permission denied) are logged and skipped so one bad sub-folder never
//! hides the rest of the tree. Symlinked directories are not entered, so a
//! document reachable by two paths is found once; symlinked files are kept.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Lazily yield every regular file under `root` whose file name equals
/// `target_name`, ignoring ASCII/Unicode case.
///
/// Order is directory-walk order and is not sorted. Paths are absolute when
/// `root` is absolute.
pub fn discover_documents(root: &Path, target_name: &str) -> impl Iterator<Item = PathBuf> {
    let wanted = target_name.to_lowercase();

    WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(e) => {
                warn!("Skipping unreadable entry during discovery: {}", e);
                None
            }
        })
        .filter(move |e| e.file_name().to_string_lossy().to_lowercase() == wanted)
        .filter(is_file_or_link_to_file)
        .map(|e| {
            let path = e.into_path();
            debug!("Found plan file: {}", path.display());
            path
        })
}

fn is_file_or_link_to_file(entry: &walkdir::DirEntry) -> bool {
    if entry.file_type().is_file() {
        return true;
    }
    entry.path_is_symlink()
        && std::fs::metadata(entry.path())
            .map(|m| m.is_file())
            .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::fs;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, b"%PDF-1.4").unwrap();
    }

    #[test]
    fn finds_target_at_any_depth_ignoring_case() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        touch(&root.join("plan.pdf"));
        touch(&root.join("a/PLAN.PDF"));
        touch(&root.join("a/b/c/d/Plan.Pdf"));
        touch(&root.join("a/notes.pdf"));
        touch(&root.join("b/plan.pdf.bak"));
        touch(&root.join("b/myplan.pdf"));

        let found: BTreeSet<PathBuf> = discover_documents(root, "plan.pdf").collect();
        let expected: BTreeSet<PathBuf> = [
            root.join("plan.pdf"),
            root.join("a/PLAN.PDF"),
            root.join("a/b/c/d/Plan.Pdf"),
        ]
        .into_iter()
        .collect();
        assert_eq!(found, expected);
    }

    #[test]
    fn directories_named_like_target_are_ignored() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("plan.pdf")).unwrap();
        assert_eq!(discover_documents(dir.path(), "plan.pdf").count(), 0);
    }

    #[test]
    fn empty_tree_yields_nothing() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("x/y")).unwrap();
        assert_eq!(discover_documents(dir.path(), "plan.pdf").count(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_directory_is_not_walked_twice() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        touch(&root.join("a/plan.pdf"));
        std::os::unix::fs::symlink(root.join("a"), root.join("alias")).unwrap();

        let found: Vec<_> = discover_documents(root, "plan.pdf").collect();
        assert_eq!(found, vec![root.join("a/plan.pdf")]);
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_file_is_found() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        touch(&root.join("store/scan.pdf"));
        fs::create_dir_all(root.join("site")).unwrap();
        std::os::unix::fs::symlink(root.join("store/scan.pdf"), root.join("site/plan.pdf"))
            .unwrap();
        std::os::unix::fs::symlink(root.join("missing.pdf"), root.join("Plan.pdf")).unwrap();

        let found: Vec<_> = discover_documents(root, "plan.pdf").collect();
        assert_eq!(found, vec![root.join("site/plan.pdf")]);
    }

    #[test]
    fn custom_target_name() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("site/Survey.PDF"));
        touch(&dir.path().join("site/plan.pdf"));
        let found: Vec<_> = discover_documents(dir.path(), "survey.pdf").collect();
        assert_eq!(found, vec![dir.path().join("site/Survey.PDF")]);
    }
}
