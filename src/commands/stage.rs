use anyhow::Result;
use std::path::PathBuf;

use crate::config::Config;
use crate::release::{StageFilter, Stager};
use crate::runtime::Runtime;

use super::current_release;

/// Copy this version's artifacts from the build store into staging
#[tracing::instrument(skip(runtime, root))]
pub fn stage<R: Runtime>(
    runtime: R,
    root: Option<PathBuf>,
    filter: Option<StageFilter>,
) -> Result<()> {
    let config = Config::new(&runtime, root)?;
    let (_, main_name) = current_release(&runtime, &config)?;

    let stager = Stager::new(
        &runtime,
        config.layout.build_store(),
        config.layout.staging_dir(),
    );
    let staged = stager.stage(&main_name, filter)?;

    for path in &staged {
        if let Some(name) = path.file_name() {
            println!("staged {}", name.to_string_lossy());
        }
    }
    println!(
        "{} artifact(s) in {}",
        staged.len(),
        stager.staging().display()
    );
    Ok(())
}
