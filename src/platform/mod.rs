//! Target identification.
//!
//! Maps the running process (architecture, operating system and acceleration
//! backend) onto exactly one of the triples that have prebuilt packages.

mod detection;
mod triple;

pub use detection::{BACKEND_ENV, NVIDIA_DRIVER_PROBE, detect};
pub use triple::{Arch, Backend, Os, TargetTriple};
