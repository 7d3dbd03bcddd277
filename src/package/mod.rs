//! Platform package naming and directory resolution.
//!
//! A platform package carries the native binary for one target triple at the
//! fixed sub-path `bins/<binary>`. Resolution only answers *where* the package
//! directory is; it never checks that the binary is present.

mod descriptor;
mod resolver;

pub use descriptor::{BINS_DIR, PlatformPackage};
pub use resolver::{PackageResolver, ResolutionStrategy};
