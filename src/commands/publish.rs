use anyhow::Result;
use std::path::PathBuf;

use crate::config::Config;
use crate::release::{NpmRegistry, Publisher};
use crate::runtime::Runtime;

use super::current_release;

/// Publish the staging directory through npm
#[tracing::instrument(skip(runtime, root))]
pub async fn publish<R: Runtime>(runtime: R, root: Option<PathBuf>, dry_run: bool) -> Result<()> {
    let config = Config::new(&runtime, root)?;
    let (version, main_name) = current_release(&runtime, &config)?;

    let publisher = Publisher::new(
        &runtime,
        NpmRegistry::new(dry_run),
        config.layout.staging_dir(),
        main_name,
    )
    .expect_version(version);

    for path in publisher.publish().await? {
        if let Some(name) = path.file_name() {
            println!("published {}", name.to_string_lossy());
        }
    }
    Ok(())
}
