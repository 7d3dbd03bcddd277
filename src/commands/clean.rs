use anyhow::Result;
use std::path::PathBuf;

use crate::config::Config;
use crate::release::clean::clean as clean_outputs;
use crate::runtime::Runtime;

/// Remove build outputs, caches and staged artifacts
#[tracing::instrument(skip(runtime, root))]
pub fn clean<R: Runtime>(runtime: R, root: Option<PathBuf>) -> Result<()> {
    let config = Config::new(&runtime, root)?;
    let removed = clean_outputs(&runtime, &config.layout)?;

    if removed.is_empty() {
        println!("Nothing to clean.");
        return Ok(());
    }
    for path in removed {
        let shown = path.strip_prefix(&config.layout.root).unwrap_or(&path);
        println!("removed {}", shown.display());
    }
    Ok(())
}
