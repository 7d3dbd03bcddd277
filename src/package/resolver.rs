use std::path::{Path, PathBuf};

use log::debug;

use super::PlatformPackage;
use crate::config::Layout;
use crate::error::DistError;
use crate::runtime::Runtime;

/// Directory the package manager installs dependencies into.
const MODULES_DIR: &str = "node_modules";

/// Entry file probed to confirm an installed package.
const ENTRY_FILE: &str = "package.json";

/// One way of locating a platform package directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionStrategy {
    /// Package-manager lookup: `<dir>/node_modules/<name>/package.json` for
    /// `search_base` and each of its ancestors, nearest first.
    Installed { search_base: PathBuf },
    /// In-repo development layout: `<platform_dir>/<triple>`.
    Local { platform_dir: PathBuf },
}

impl ResolutionStrategy {
    /// Try this strategy. Every probed path is pushed onto `tried`.
    fn resolve<R: Runtime>(
        &self,
        runtime: &R,
        package: &PlatformPackage,
        tried: &mut Vec<PathBuf>,
    ) -> Option<PathBuf> {
        match self {
            ResolutionStrategy::Installed { search_base } => {
                let module_path = package.module_path();
                search_base.ancestors().find_map(|dir| {
                    let entry = dir.join(MODULES_DIR).join(&module_path).join(ENTRY_FILE);
                    tried.push(entry.clone());
                    if runtime.exists(&entry) {
                        entry.parent().map(Path::to_path_buf)
                    } else {
                        None
                    }
                })
            }
            ResolutionStrategy::Local { platform_dir } => {
                let dir = platform_dir.join(package.local_dir_name());
                tried.push(dir.clone());
                runtime.is_dir(&dir).then_some(dir)
            }
        }
    }

    fn label(&self) -> &'static str {
        match self {
            ResolutionStrategy::Installed { .. } => "installed",
            ResolutionStrategy::Local { .. } => "local",
        }
    }
}

/// Ordered chain of [`ResolutionStrategy`]; the first hit wins.
pub struct PackageResolver<'a, R: Runtime> {
    runtime: &'a R,
    strategies: Vec<ResolutionStrategy>,
}

impl<'a, R: Runtime> PackageResolver<'a, R> {
    pub fn new(runtime: &'a R, strategies: Vec<ResolutionStrategy>) -> Self {
        Self {
            runtime,
            strategies,
        }
    }

    /// Installed lookup from the repo root, then the repo's `packages/platform`.
    pub fn for_layout(runtime: &'a R, layout: &Layout) -> Self {
        Self::new(
            runtime,
            vec![
                ResolutionStrategy::Installed {
                    search_base: layout.root.clone(),
                },
                ResolutionStrategy::Local {
                    platform_dir: layout.platform_packages_dir(),
                },
            ],
        )
    }

    pub fn strategies(&self) -> &[ResolutionStrategy] {
        &self.strategies
    }

    /// Resolve the root directory of `package`.
    #[tracing::instrument(skip(self, package), fields(package = package.name()))]
    pub fn resolve_dir(&self, package: &PlatformPackage) -> Result<PathBuf, DistError> {
        let mut tried = Vec::new();
        for strategy in &self.strategies {
            if let Some(dir) = strategy.resolve(self.runtime, package, &mut tried) {
                debug!(
                    "Resolved {} via {} lookup: {:?}",
                    package.name(),
                    strategy.label(),
                    dir
                );
                return Ok(dir);
            }
        }

        Err(DistError::PackageResolution {
            package: package.name().to_string(),
            tried,
        })
    }
}
