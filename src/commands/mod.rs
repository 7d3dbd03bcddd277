//! Command implementations behind the CLI.
//!
//! Each command resolves the [`Config`] from the global `--root` flag, does
//! its work through the [`Runtime`] and prints its result to stdout.

use anyhow::Result;
use semver::Version;

use crate::config::Config;
use crate::release::{ArtifactNamer, FsManifestStore, VersionLedger};
use crate::runtime::Runtime;

mod clean;
mod detect;
mod publish;
mod resolve;
mod stage;
mod version;

pub use clean::clean;
pub use detect::detect;
pub use publish::publish;
pub use resolve::resolve;
pub use stage::stage;
pub use version::{bump, current};

/// Current release version and the main artifact name it implies.
fn current_release<R: Runtime>(runtime: &R, config: &Config) -> Result<(Version, String)> {
    let store = FsManifestStore::new(runtime, config.layout.root.clone());
    let version = VersionLedger::new(store).current()?;
    let main_name = ArtifactNamer::new(config.product.artifact_prefix()).main(&version);
    Ok((version, main_name))
}
