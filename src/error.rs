//! Error taxonomy for detection, resolution, loading and release tooling.
//!
//! These errors travel inside `anyhow::Error`; callers that need to react to
//! a specific stage use `downcast_ref::<DistError>()`.

use std::path::PathBuf;

/// Errors raised by the runtime load path and the release tooling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DistError {
    /// No known target triple for this arch/os/backend combination
    UnsupportedPlatform {
        arch: String,
        os: String,
        backend: String,
    },
    /// Neither an installed nor a local platform package directory exists
    PackageResolution {
        package: String,
        tried: Vec<PathBuf>,
    },
    /// The binary was found but could not be loaded
    NativeLoad {
        triple: String,
        path: PathBuf,
        reason: String,
    },
    /// A manifest could not be read or parsed
    ManifestRead { path: PathBuf, reason: String },
    /// One or more manifests could not be written
    ManifestWrite { paths: Vec<PathBuf>, reason: String },
    /// Nothing to stage or publish
    NoArtifacts { dir: PathBuf },
}

impl DistError {
    /// Short name of the stage that failed, for log lines and exit messages.
    pub fn stage(&self) -> &'static str {
        match self {
            DistError::UnsupportedPlatform { .. } => "detection",
            DistError::PackageResolution { .. } => "resolution",
            DistError::NativeLoad { .. } => "loading",
            DistError::ManifestRead { .. } | DistError::ManifestWrite { .. } => "versioning",
            DistError::NoArtifacts { .. } => "release",
        }
    }
}

impl std::fmt::Display for DistError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DistError::UnsupportedPlatform { arch, os, backend } => write!(
                f,
                "Unsupported platform: no prebuilt package for arch={}, os={}, backend={}",
                arch, os, backend
            ),
            DistError::PackageResolution { package, tried } => {
                write!(f, "Could not resolve platform package {}; tried:", package)?;
                for path in tried {
                    write!(f, " {}", path.display())?;
                }
                Ok(())
            }
            DistError::NativeLoad {
                triple,
                path,
                reason,
            } => write!(
                f,
                "Failed to load native addon for {} from {}: {}",
                triple,
                path.display(),
                reason
            ),
            DistError::ManifestRead { path, reason } => {
                write!(f, "Failed to read manifest {}: {}", path.display(), reason)
            }
            DistError::ManifestWrite { paths, reason } => {
                write!(f, "Failed to write {} manifest(s):", paths.len())?;
                for path in paths {
                    write!(f, " {}", path.display())?;
                }
                write!(f, " ({})", reason)
            }
            DistError::NoArtifacts { dir } => {
                write!(f, "No artifacts found in {}", dir.display())
            }
        }
    }
}

impl std::error::Error for DistError {}

/// Extract the [`DistError`] at the root of an `anyhow` chain, if any.
pub fn dist_error(err: &anyhow::Error) -> Option<&DistError> {
    err.chain().find_map(|e| e.downcast_ref::<DistError>())
}
