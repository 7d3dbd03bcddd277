//! Package manifests (`package.json`) and the store that lists, reads and
//! writes them.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::debug;
use serde_json::{Map, Value};

use crate::error::DistError;
use crate::runtime::{Runtime, has_component};

pub const MANIFEST_FILE: &str = "package.json";

/// Directories never searched for manifests: dependency installs, build
/// outputs, caches.
pub const EXCLUDED_DIRS: &[&str] = &["node_modules", "dist", "build", ".cache", ".git"];

const OPTIONAL_DEPENDENCIES: &str = "optionalDependencies";

/// A parsed manifest. Key order is preserved across a read/write cycle.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Manifest {
    fields: Map<String, Value>,
}

impl Manifest {
    pub fn parse(text: &str) -> Result<Self> {
        let fields: Map<String, Value> =
            serde_json::from_str(text).context("Manifest is not a JSON object")?;
        Ok(Self { fields })
    }

    /// Two-space indented JSON with a trailing newline.
    pub fn to_pretty(&self) -> Result<String> {
        let mut text = serde_json::to_string_pretty(&self.fields)?;
        text.push('\n');
        Ok(text)
    }

    pub fn name(&self) -> Option<&str> {
        self.fields.get("name").and_then(Value::as_str)
    }

    pub fn version(&self) -> Option<&str> {
        self.fields.get("version").and_then(Value::as_str)
    }

    /// Replace the top-level `version`. Manifests without one are left alone;
    /// returns whether a version was present.
    pub fn set_version(&mut self, version: &str) -> bool {
        match self.fields.get_mut("version") {
            Some(value) => {
                *value = Value::String(version.to_string());
                true
            }
            None => false,
        }
    }

    /// `(package, pinned version)` pairs from `optionalDependencies`.
    pub fn optional_dependencies(&self) -> Vec<(&str, &str)> {
        self.fields
            .get(OPTIONAL_DEPENDENCIES)
            .and_then(Value::as_object)
            .map(|deps| {
                deps.iter()
                    .map(|(name, pin)| (name.as_str(), pin.as_str().unwrap_or_default()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Pin every optional dependency to `version`; returns how many were pinned.
    pub fn pin_optional_dependencies(&mut self, version: &str) -> usize {
        match self
            .fields
            .get_mut(OPTIONAL_DEPENDENCIES)
            .and_then(Value::as_object_mut)
        {
            Some(deps) => {
                for pin in deps.values_mut() {
                    *pin = Value::String(version.to_string());
                }
                deps.len()
            }
            None => 0,
        }
    }
}

/// Storage of the manifest tree.
pub trait ManifestStore {
    /// Path of the main package's manifest.
    fn main_path(&self) -> PathBuf;

    /// Every manifest in the tree outside [`EXCLUDED_DIRS`].
    fn list(&self) -> Result<Vec<PathBuf>>;

    fn read(&self, path: &Path) -> Result<Manifest>;

    /// Replace a manifest in a single step.
    fn write(&self, path: &Path, manifest: &Manifest) -> Result<()>;
}

impl<S: ManifestStore + ?Sized> ManifestStore for &S {
    fn main_path(&self) -> PathBuf {
        (**self).main_path()
    }

    fn list(&self) -> Result<Vec<PathBuf>> {
        (**self).list()
    }

    fn read(&self, path: &Path) -> Result<Manifest> {
        (**self).read(path)
    }

    fn write(&self, path: &Path, manifest: &Manifest) -> Result<()> {
        (**self).write(path, manifest)
    }
}

/// [`ManifestStore`] over a repository checkout.
pub struct FsManifestStore<'a, R: Runtime> {
    runtime: &'a R,
    root: PathBuf,
}

impl<'a, R: Runtime> FsManifestStore<'a, R> {
    pub fn new(runtime: &'a R, root: PathBuf) -> Self {
        Self { runtime, root }
    }

    fn walk(&self, dir: &Path, found: &mut Vec<PathBuf>) -> Result<()> {
        for entry in self.runtime.read_dir(dir)? {
            let relative = entry.strip_prefix(&self.root).unwrap_or(&entry);
            if has_component(relative, EXCLUDED_DIRS) {
                continue;
            }
            if self.runtime.is_dir(&entry) {
                if self.runtime.is_symlink(&entry) {
                    debug!("Not following symlinked directory {:?}", entry);
                    continue;
                }
                self.walk(&entry, found)?;
            } else if entry.file_name().is_some_and(|n| n == MANIFEST_FILE) {
                found.push(entry);
            }
        }
        Ok(())
    }
}

impl<R: Runtime> ManifestStore for FsManifestStore<'_, R> {
    fn main_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    #[tracing::instrument(skip(self))]
    fn list(&self) -> Result<Vec<PathBuf>> {
        let mut found = Vec::new();
        self.walk(&self.root, &mut found)?;
        found.sort();
        debug!("Found {} manifest(s) under {:?}", found.len(), self.root);
        Ok(found)
    }

    fn read(&self, path: &Path) -> Result<Manifest> {
        let text = self
            .runtime
            .read_to_string(path)
            .map_err(|e| DistError::ManifestRead {
                path: path.to_path_buf(),
                reason: format!("{:#}", e),
            })?;
        let manifest = Manifest::parse(&text).map_err(|e| DistError::ManifestRead {
            path: path.to_path_buf(),
            reason: format!("{:#}", e),
        })?;
        Ok(manifest)
    }

    fn write(&self, path: &Path, manifest: &Manifest) -> Result<()> {
        let text = manifest.to_pretty()?;
        let mut staged = path.as_os_str().to_owned();
        staged.push(".tmp");
        let staged = PathBuf::from(staged);

        self.runtime
            .write(&staged, text.as_bytes())
            .and_then(|()| self.runtime.rename(&staged, path))
            .map_err(|e| {
                DistError::ManifestWrite {
                    paths: vec![path.to_path_buf()],
                    reason: format!("{:#}", e),
                }
                .into()
            })
    }
}
