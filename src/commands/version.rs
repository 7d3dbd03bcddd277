use anyhow::Result;
use log::debug;
use std::path::PathBuf;

use crate::config::Config;
use crate::release::{BumpRequest, FsManifestStore, VersionLedger, export_ci_output};
use crate::runtime::Runtime;

/// Print the current release version
#[tracing::instrument(skip(runtime, root))]
pub fn current<R: Runtime>(runtime: R, root: Option<PathBuf>) -> Result<()> {
    let config = Config::new(&runtime, root)?;
    let store = FsManifestStore::new(&runtime, config.layout.root.clone());
    let version = VersionLedger::new(store).current()?;
    println!("{}", version);
    Ok(())
}

/// Bump the release version and stamp it into every manifest
#[tracing::instrument(skip(runtime, root))]
pub fn bump<R: Runtime>(runtime: R, root: Option<PathBuf>, request: &BumpRequest) -> Result<()> {
    let config = Config::new(&runtime, root)?;
    let store = FsManifestStore::new(&runtime, config.layout.root.clone());
    let bumped = VersionLedger::new(store).bump(request)?;

    for path in &bumped.stamped {
        let shown = path.strip_prefix(&config.layout.root).unwrap_or(path);
        println!("stamped {} -> {}", bumped.version, shown.display());
    }
    if bumped.pinned > 0 {
        println!(
            "stamped {} -> optionalDependencies ({})",
            bumped.version, bumped.pinned
        );
    }

    if let Some(output) = export_ci_output(&runtime, &bumped.version)? {
        debug!("Exported version to {:?}", output);
    }
    println!("{}", bumped.version);
    Ok(())
}
