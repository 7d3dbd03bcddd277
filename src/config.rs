//! Product constants and repository layout.

use anyhow::Result;
use log::debug;
use std::path::{Path, PathBuf};

use crate::platform::TargetTriple;
use crate::runtime::{Runtime, normalize_path};

/// Environment variable overriding the repository root.
pub const ROOT_ENV: &str = "WHISPER_DIST_ROOT";

/// Environment variable naming the CI step-output file.
pub const CI_OUTPUT_ENV: &str = "GITHUB_OUTPUT";

/// Naming of the distributed packages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    /// Registry scope, including the leading `@`
    pub namespace: String,
    pub name: String,
    /// File name of the native binary inside `bins/`
    pub binary: String,
}

impl Default for Product {
    fn default() -> Self {
        Self {
            namespace: "@spader".to_string(),
            name: "node-whisper-cpp".to_string(),
            binary: "whisper-addon.node".to_string(),
        }
    }
}

impl Product {
    /// `@spader/node-whisper-cpp`
    pub fn main_package(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }

    /// `@spader/node-whisper-cpp-x64-linux-cpu-gnu`
    pub fn platform_package(&self, triple: &TargetTriple) -> String {
        format!("{}-{}", self.main_package(), triple)
    }

    /// Prefix the package manager gives packed tarballs: the scope is
    /// flattened into the file name (`spader-node-whisper-cpp`).
    pub fn artifact_prefix(&self) -> String {
        let scope = self.namespace.trim_start_matches('@');
        if scope.is_empty() {
            self.name.clone()
        } else {
            format!("{}-{}", scope, self.name)
        }
    }
}

/// Locations of everything the tooling reads or writes, relative to the repo root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub root: PathBuf,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Main package manifest: `<root>/package.json`
    pub fn main_manifest(&self) -> PathBuf {
        self.root.join("package.json")
    }

    /// Where the build drops packed tarballs: `<root>/.cache/store/npm`
    pub fn build_store(&self) -> PathBuf {
        self.root.join(".cache").join("store").join("npm")
    }

    /// Publish staging directory: `<root>/artifacts`
    pub fn staging_dir(&self) -> PathBuf {
        self.root.join("artifacts")
    }

    /// In-repo platform packages: `<root>/packages/platform`
    pub fn platform_packages_dir(&self) -> PathBuf {
        self.root.join("packages").join("platform")
    }
}

/// Resolved configuration shared by every command.
#[derive(Debug, Clone)]
pub struct Config {
    pub product: Product,
    pub layout: Layout,
}

impl Config {
    /// Build the configuration. The root comes from the explicit argument,
    /// then [`ROOT_ENV`], then the current directory.
    pub fn new<R: Runtime>(runtime: &R, root: Option<PathBuf>) -> Result<Self> {
        let root = match root {
            Some(path) => path,
            None => match runtime.env_var(ROOT_ENV) {
                Ok(value) if !value.is_empty() => PathBuf::from(value),
                _ => runtime.current_dir()?,
            },
        };
        let root = absolutize(runtime, &root)?;
        debug!("Using repository root {:?}", root);

        Ok(Self {
            product: Product::default(),
            layout: Layout::new(root),
        })
    }
}

fn absolutize<R: Runtime>(runtime: &R, path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(normalize_path(path))
    } else {
        Ok(normalize_path(&runtime.current_dir()?.join(path)))
    }
}
