//! Native addon loading.
//!
//! [`load_addon`] is the process-wide entry point: it detects the target
//! triple, resolves the platform package and loads `bins/<binary>` once,
//! handing the same [`NativeAddon`] to every later caller.

mod loader;
mod native;

use std::sync::{Arc, OnceLock};

use log::warn;

pub use loader::{AddonLoader, NativeLoader};
pub use native::{
    BinaryFormat, BinaryInfo, DylibLoader, NativeAddon, check_compatible, inspect_binary,
};

use crate::config::{Config, Layout, Product};
use crate::error::DistError;
use crate::runtime::{RealRuntime, Runtime};

static ADDON: OnceLock<AddonLoader<RealRuntime, DylibLoader>> = OnceLock::new();

/// Load the addon for the running platform, once per process.
pub fn load_addon() -> Result<Arc<NativeAddon>, DistError> {
    ADDON
        .get_or_init(|| AddonLoader::new(RealRuntime, DylibLoader, loader_config(&RealRuntime)))
        .load()
}

/// Configuration for the process-wide loader. Falls back to `.` as the repo
/// root when it cannot be resolved.
fn loader_config<R: Runtime>(runtime: &R) -> Config {
    Config::new(runtime, None).unwrap_or_else(|e| {
        warn!("Could not resolve the repo root, using \".\": {:#}", e);
        Config {
            product: Product::default(),
            layout: Layout::new("."),
        }
    })
}
