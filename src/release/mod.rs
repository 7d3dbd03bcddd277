//! Release tooling: the version ledger, artifact staging and publishing.
//!
//! # Structure
//!
//! - `manifest` - `package.json` parsing and the manifest store
//! - `version` - Current version, bumps and stamping
//! - `artifact` - Artifact naming, classification and inspection
//! - `stage` - Copy build artifacts into the staging directory
//! - `publish` - Push staged artifacts to the registry
//! - `clean` - Remove build outputs

pub mod artifact;
pub mod clean;
pub mod manifest;
pub mod publish;
pub mod stage;
pub mod version;

pub use artifact::{Artifact, ArtifactKind, ArtifactNamer, PackedManifest, ReleaseSet};
pub use manifest::{FsManifestStore, Manifest, ManifestStore};
pub use publish::{NpmRegistry, Publisher, Registry};
pub use stage::{StageFilter, Stager};
pub use version::{BumpKind, BumpRequest, Bumped, VersionLedger, export_ci_output};
