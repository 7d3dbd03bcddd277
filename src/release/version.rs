//! The release version: read it, bump it, stamp it into every manifest.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Result, anyhow};
use log::{debug, info, warn};
use semver::{BuildMetadata, Prerelease, Version};

use super::manifest::ManifestStore;
use crate::config::CI_OUTPUT_ENV;
use crate::error::{DistError, dist_error};
use crate::runtime::Runtime;

/// Semantic component to increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BumpKind {
    Major,
    Minor,
    Patch,
}

/// What `bump` should produce: an increment of the current version or an
/// explicit version used verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BumpRequest {
    Kind(BumpKind),
    Explicit(Version),
}

impl FromStr for BumpRequest {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "major" => Ok(BumpRequest::Kind(BumpKind::Major)),
            "minor" => Ok(BumpRequest::Kind(BumpKind::Minor)),
            "patch" => Ok(BumpRequest::Kind(BumpKind::Patch)),
            "" => Err(anyhow!("Version must not be empty")),
            explicit => Version::parse(explicit)
                .map(BumpRequest::Explicit)
                .map_err(|e| {
                    anyhow!(
                        "Invalid version '{}': {} (expected major|minor|patch or a semantic version)",
                        explicit,
                        e
                    )
                }),
        }
    }
}

impl fmt::Display for BumpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BumpRequest::Kind(BumpKind::Major) => f.write_str("major"),
            BumpRequest::Kind(BumpKind::Minor) => f.write_str("minor"),
            BumpRequest::Kind(BumpKind::Patch) => f.write_str("patch"),
            BumpRequest::Explicit(version) => write!(f, "{}", version),
        }
    }
}

/// Next version after `current`. Lower components reset to zero and any
/// pre-release or build metadata is dropped.
pub fn apply(current: &Version, kind: BumpKind) -> Version {
    let (major, minor, patch) = match kind {
        BumpKind::Major => (current.major + 1, 0, 0),
        BumpKind::Minor => (current.major, current.minor + 1, 0),
        BumpKind::Patch => (current.major, current.minor, current.patch + 1),
    };
    Version {
        major,
        minor,
        patch,
        pre: Prerelease::EMPTY,
        build: BuildMetadata::EMPTY,
    }
}

/// Result of a successful bump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bumped {
    pub version: Version,
    /// Manifests whose `version` was rewritten
    pub stamped: Vec<PathBuf>,
    /// Optional-dependency pins rewritten in the main manifest
    pub pinned: usize,
}

/// Single source of truth for the release version.
pub struct VersionLedger<S: ManifestStore> {
    store: S,
}

impl<S: ManifestStore> VersionLedger<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Version declared by the main manifest.
    pub fn current(&self) -> Result<Version> {
        let path = self.store.main_path();
        let manifest = self.store.read(&path)?;
        let raw = manifest.version().ok_or_else(|| DistError::ManifestRead {
            path: path.clone(),
            reason: "missing \"version\" field".to_string(),
        })?;
        let version = Version::parse(raw).map_err(|e| DistError::ManifestRead {
            path: path.clone(),
            reason: format!("invalid version '{}': {}", raw, e),
        })?;
        Ok(version)
    }

    /// Stamp the new version into every manifest and pin the main manifest's
    /// optional dependencies to it.
    ///
    /// Each file is replaced in one write. A failing file does not stop the
    /// others; the failures are reported together once every file has been
    /// attempted. An unreadable manifest is reported as `ManifestRead`, ahead
    /// of any write failures.
    #[tracing::instrument(skip(self))]
    pub fn bump(&self, request: &BumpRequest) -> Result<Bumped> {
        let version = match request {
            BumpRequest::Kind(kind) => apply(&self.current()?, *kind),
            BumpRequest::Explicit(version) => version.clone(),
        };
        let target = version.to_string();
        let main_path = self.store.main_path();

        let mut paths = self.store.list()?;
        if !paths.contains(&main_path) {
            paths.insert(0, main_path.clone());
        }

        let mut stamped = Vec::new();
        let mut pinned = 0;
        let mut unreadable: Vec<(PathBuf, String)> = Vec::new();
        let mut failed = Vec::new();
        let mut reasons = Vec::new();

        for path in paths {
            let mut manifest = match self.store.read(&path) {
                Ok(manifest) => manifest,
                Err(e) => {
                    warn!("Failed to read {:?}: {:#}", path, e);
                    unreadable.push((path, read_reason(&e)));
                    continue;
                }
            };

            let had_version = manifest.set_version(&target);
            let pins = if path == main_path {
                manifest.pin_optional_dependencies(&target)
            } else {
                0
            };
            if !had_version && pins == 0 {
                debug!("No version field in {:?}, leaving it alone", path);
                continue;
            }

            match self.store.write(&path, &manifest) {
                Ok(()) => {
                    if had_version {
                        info!("stamped {} -> {:?}", target, path);
                        stamped.push(path);
                    }
                    pinned += pins;
                }
                Err(e) => {
                    warn!("Failed to stamp {:?}: {:#}", path, e);
                    reasons.push(format!("{:#}", e));
                    failed.push(path);
                }
            }
        }

        if let Some((first, _)) = unreadable.first() {
            let mut details: Vec<String> = unreadable
                .iter()
                .enumerate()
                .map(|(i, (path, reason))| {
                    if i == 0 {
                        reason.clone()
                    } else {
                        format!("{}: {}", path.display(), reason)
                    }
                })
                .collect();
            if !failed.is_empty() {
                details.push(format!("{} manifest(s) also failed to write", failed.len()));
            }
            return Err(DistError::ManifestRead {
                path: first.clone(),
                reason: details.join("; "),
            }
            .into());
        }
        if !failed.is_empty() {
            return Err(DistError::ManifestWrite {
                paths: failed,
                reason: reasons.join("; "),
            }
            .into());
        }

        if pinned > 0 {
            info!("stamped optionalDependencies -> {}", target);
        }
        Ok(Bumped {
            version,
            stamped,
            pinned,
        })
    }
}

/// The cause of a read failure without the path prefix the store may add.
fn read_reason(err: &anyhow::Error) -> String {
    match dist_error(err) {
        Some(DistError::ManifestRead { reason, .. }) => reason.clone(),
        _ => format!("{:#}", err),
    }
}

/// Hand the version to later CI steps when running under automation.
///
/// Appends `version=<version>` to the file named by `GITHUB_OUTPUT`; returns
/// the file written, if any.
pub fn export_ci_output<R: Runtime>(runtime: &R, version: &Version) -> Result<Option<PathBuf>> {
    match runtime.env_var(CI_OUTPUT_ENV) {
        Ok(path) if !path.is_empty() => {
            let path = PathBuf::from(path);
            runtime.append(&path, format!("version={}\n", version).as_bytes())?;
            debug!("Wrote version to CI output {:?}", path);
            Ok(Some(path))
        }
        _ => Ok(None),
    }
}
