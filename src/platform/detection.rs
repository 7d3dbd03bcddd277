use std::path::Path;

use log::debug;

use super::{Arch, Backend, Os, TargetTriple};
use crate::error::DistError;
use crate::runtime::Runtime;

/// Environment variable that forces the acceleration backend.
pub const BACKEND_ENV: &str = "WHISPER_DIST_BACKEND";

/// Present when the NVIDIA kernel driver is loaded.
pub const NVIDIA_DRIVER_PROBE: &str = "/proc/driver/nvidia/version";

/// Derive the target triple for the running process.
///
/// Deterministic for a given environment and free of side effects. Fails with
/// [`DistError::UnsupportedPlatform`] when the combination has no prebuilt
/// package.
#[tracing::instrument(skip(runtime))]
pub fn detect<R: Runtime>(runtime: &R) -> Result<TargetTriple, DistError> {
    let host_arch = runtime.arch();
    let host_os = runtime.os();
    let override_backend = runtime.env_var(BACKEND_ENV).ok();

    let unsupported = |backend: &str| DistError::UnsupportedPlatform {
        arch: host_arch.clone(),
        os: host_os.clone(),
        backend: backend.to_string(),
    };

    let (arch, os) = match (Arch::from_host(&host_arch), Os::from_host(&host_os)) {
        (Some(arch), Some(os)) => (arch, os),
        _ => return Err(unsupported(override_backend.as_deref().unwrap_or("unknown"))),
    };

    let backend = match override_backend.as_deref() {
        Some(value) if !value.trim().is_empty() => {
            debug!("Backend forced by {}={}", BACKEND_ENV, value);
            value.parse::<Backend>().map_err(|_| unsupported(value))?
        }
        _ => default_backend(runtime, os),
    };

    let triple =
        TargetTriple::known(arch, os, backend).ok_or_else(|| unsupported(backend.as_str()))?;
    debug!("Detected target triple {}", triple);
    Ok(triple)
}

fn default_backend<R: Runtime>(runtime: &R, os: Os) -> Backend {
    match os {
        Os::Darwin => Backend::Metal,
        Os::Linux if runtime.exists(Path::new(NVIDIA_DRIVER_PROBE)) => Backend::Cuda,
        Os::Linux => Backend::Cpu,
    }
}
