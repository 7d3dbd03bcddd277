//! Lexical path helpers. Nothing here touches the file system.

use std::path::{Component, Path, PathBuf};

/// Normalize a path by processing `.` and `..` components lexically.
/// Symlinks are not followed.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !result.pop() {
                    result.push(component);
                }
            }
            _ => result.push(component),
        }
    }
    result
}

/// Check whether `path` lies under `dir`, comparing normalized components.
///
/// `/repo/packages/../../etc` is NOT under `/repo`.
pub fn is_path_under(path: &Path, dir: &Path) -> bool {
    normalize_path(path).starts_with(normalize_path(dir))
}

/// Check whether any component of `path` equals one of `names`.
///
/// Matches whole components: `dist` matches `pkg/dist/package.json` but not
/// `pkg/distribution/package.json`.
pub fn has_component(path: &Path, names: &[&str]) -> bool {
    path.components().any(|c| match c {
        Component::Normal(part) => part.to_str().is_some_and(|p| names.contains(&p)),
        _ => false,
    })
}
