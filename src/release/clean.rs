//! Remove build outputs, caches and staged artifacts from the checkout.

use std::path::PathBuf;

use anyhow::{Result, bail};
use log::debug;

use crate::config::Layout;
use crate::package::BINS_DIR;
use crate::runtime::{Runtime, is_path_under};

/// Top-level directories removed by [`clean`].
pub const CLEAN_DIRS: &[&str] = &[".cache", "build", "dist", "artifacts", "test/.tmp"];

/// Per-platform-package directories removed by [`clean`].
pub const CLEAN_PLATFORM_DIRS: &[&str] = &["dist", BINS_DIR];

/// Everything [`clean`] would remove that currently exists.
pub fn clean_targets<R: Runtime>(runtime: &R, layout: &Layout) -> Result<Vec<PathBuf>> {
    let mut targets: Vec<PathBuf> = CLEAN_DIRS.iter().map(|d| layout.root.join(d)).collect();

    let platform_dir = layout.platform_packages_dir();
    if runtime.is_dir(&platform_dir) {
        let mut packages = runtime.read_dir(&platform_dir)?;
        packages.sort();
        for package in packages.into_iter().filter(|p| runtime.is_dir(p)) {
            targets.extend(CLEAN_PLATFORM_DIRS.iter().map(|d| package.join(d)));
        }
    }

    targets.retain(|path| runtime.exists(path));
    Ok(targets)
}

/// Remove build outputs. Returns the removed paths.
#[tracing::instrument(skip(runtime))]
pub fn clean<R: Runtime>(runtime: &R, layout: &Layout) -> Result<Vec<PathBuf>> {
    let targets = clean_targets(runtime, layout)?;

    for path in &targets {
        if !is_path_under(path, &layout.root) || path == &layout.root {
            bail!(
                "Refusing to remove {} outside {}",
                path.display(),
                layout.root.display()
            );
        }
        debug!("Removing {:?}", path);
        if runtime.is_dir(path) {
            runtime.remove_dir_all(path)?;
        } else {
            runtime.remove_file(path)?;
        }
    }
    Ok(targets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::RealRuntime;
    use tempfile::tempdir;

    #[test]
    fn test_clean_removes_outputs_only() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        for rel in [
            ".cache/store/npm/a.tgz",
            "artifacts/a.tgz",
            "build/Release/whisper-addon.node",
            "test/.tmp/model.bin",
            "test/fixtures/jfk.wav",
            "packages/platform/x64-linux-cpu-gnu/bins/whisper-addon.node",
            "packages/platform/x64-linux-cpu-gnu/dist/index.js",
            "packages/platform/x64-linux-cpu-gnu/package.json",
            "src/index.ts",
        ] {
            let path = root.join(rel);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(&path, b"").unwrap();
        }

        let layout = Layout::new(root);
        let removed = clean(&RealRuntime, &layout).unwrap();

        assert_eq!(removed.len(), 6);
        assert!(!root.join(".cache").exists());
        assert!(!root.join("artifacts").exists());
        assert!(!root.join("test/.tmp").exists());
        assert!(!root.join("packages/platform/x64-linux-cpu-gnu/bins").exists());
        assert!(root.join("test/fixtures/jfk.wav").exists());
        assert!(root.join("packages/platform/x64-linux-cpu-gnu/package.json").exists());
        assert!(root.join("src/index.ts").exists());
    }

    #[test]
    fn test_clean_on_clean_tree() {
        let dir = tempdir().unwrap();
        let layout = Layout::new(dir.path());
        assert!(clean(&RealRuntime, &layout).unwrap().is_empty());
    }
}
