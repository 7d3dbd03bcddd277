use std::path::{Path, PathBuf};

use crate::config::Product;
use crate::platform::TargetTriple;

/// Directory inside every platform package that holds the native binary.
pub const BINS_DIR: &str = "bins";

/// Logical description of the platform package for one triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformPackage {
    name: String,
    triple: TargetTriple,
    binary: String,
}

impl PlatformPackage {
    pub fn new(product: &Product, triple: TargetTriple) -> Self {
        Self {
            name: product.platform_package(&triple),
            triple,
            binary: product.binary.clone(),
        }
    }

    /// Registry name, e.g. `@spader/node-whisper-cpp-x64-linux-cpu-gnu`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn triple(&self) -> TargetTriple {
        self.triple
    }

    /// Name of the in-repo directory: the package name without its
    /// `{namespace}/{product}-` prefix, which is the triple itself.
    pub fn local_dir_name(&self) -> String {
        self.triple.to_string()
    }

    /// Path segments of the package under a `node_modules` directory.
    pub fn module_path(&self) -> PathBuf {
        self.name.split('/').collect()
    }

    /// `<package_root>/bins/<binary>`
    pub fn binary_path(&self, package_root: &Path) -> PathBuf {
        package_root.join(BINS_DIR).join(&self.binary)
    }
}
