use anyhow::Result;
use log::debug;
use std::path::PathBuf;

use crate::addon::{AddonLoader, DylibLoader};
use crate::config::Config;
use crate::package::{PackageResolver, PlatformPackage};
use crate::platform;
use crate::runtime::Runtime;

/// Show where the platform package for this process resolves, optionally
/// loading its binary
#[tracing::instrument(skip(runtime, root))]
pub fn resolve<R: Runtime>(runtime: R, root: Option<PathBuf>, load: bool) -> Result<()> {
    let config = Config::new(&runtime, root)?;
    let triple = platform::detect(&runtime)?;
    let package = PlatformPackage::new(&config.product, triple);

    let resolver = PackageResolver::for_layout(&runtime, &config.layout);
    let dir = resolver.resolve_dir(&package)?;
    debug!("Resolved {} to {:?}", package.name(), dir);

    println!("Triple: {}", triple);
    println!("Package: {}", package.name());
    println!("Directory: {}", dir.display());
    println!("Binary: {}", package.binary_path(&dir).display());

    if load {
        let addon = AddonLoader::new(runtime, DylibLoader, config).load()?;
        println!("Loaded: {}", addon.path().display());
    }
    Ok(())
}
