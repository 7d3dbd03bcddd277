//! Packed release artifacts: naming, classification and inspection.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result, bail};
use flate2::read::GzDecoder;
use glob::Pattern;
use semver::Version;
use serde::Deserialize;

use crate::platform::TargetTriple;
use crate::runtime::Runtime;

/// File pattern of a packed artifact.
pub const ARTIFACT_PATTERN: &str = "*.tgz";

static ARTIFACT_GLOB: LazyLock<Option<Pattern>> =
    LazyLock::new(|| Pattern::new(ARTIFACT_PATTERN).ok());

/// Manifest path inside a packed tarball.
const PACKED_MANIFEST: &str = "package/package.json";

/// Whether an artifact is the platform-agnostic package or a platform package.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Main,
    Platform,
}

/// Deterministic artifact file names for one product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactNamer {
    prefix: String,
}

impl ArtifactNamer {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// `<product>-<version>.tgz`
    pub fn main(&self, version: &Version) -> String {
        format!("{}-{}.tgz", self.prefix, version)
    }

    /// `<product>-<triple>-<version>.tgz`
    pub fn platform(&self, triple: &TargetTriple, version: &Version) -> String {
        format!("{}-{}-{}.tgz", self.prefix, triple, version)
    }
}

/// Classify a file name against the main artifact name. Files that are not
/// packed artifacts yield `None`.
pub fn classify(file_name: &str, main_name: &str) -> Option<ArtifactKind> {
    if !ARTIFACT_GLOB
        .as_ref()
        .is_some_and(|pattern| pattern.matches(file_name))
    {
        return None;
    }
    if file_name == main_name {
        Some(ArtifactKind::Main)
    } else {
        Some(ArtifactKind::Platform)
    }
}

/// A packed artifact on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    pub kind: ArtifactKind,
}

impl Artifact {
    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }
}

/// Artifacts sharing one version: at most one main, any number of platform.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseSet {
    main: Option<Artifact>,
    platform: Vec<Artifact>,
}

impl ReleaseSet {
    /// Classify every artifact in `dir`.
    pub fn scan<R: Runtime>(runtime: &R, dir: &Path, main_name: &str) -> Result<Self> {
        let mut set = ReleaseSet::default();
        for path in runtime.read_dir(dir)? {
            if runtime.is_dir(&path) {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            match classify(name, main_name) {
                Some(ArtifactKind::Main) => {
                    set.main = Some(Artifact {
                        path,
                        kind: ArtifactKind::Main,
                    })
                }
                Some(ArtifactKind::Platform) => set.platform.push(Artifact {
                    path,
                    kind: ArtifactKind::Platform,
                }),
                None => {}
            }
        }
        set.platform.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(set)
    }

    pub fn main(&self) -> Option<&Artifact> {
        self.main.as_ref()
    }

    pub fn platform(&self) -> &[Artifact] {
        &self.platform
    }

    pub fn is_empty(&self) -> bool {
        self.main.is_none() && self.platform.is_empty()
    }

    pub fn len(&self) -> usize {
        self.platform.len() + usize::from(self.main.is_some())
    }

    /// All platform artifacts, then the main artifact.
    pub fn publish_order(&self) -> impl Iterator<Item = &Artifact> {
        self.platform.iter().chain(self.main.iter())
    }
}

/// Identity of a packed package, read from its embedded manifest.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PackedManifest {
    pub name: String,
    pub version: String,
}

/// Read `package/package.json` out of a packed `.tgz`.
#[tracing::instrument(skip(runtime))]
pub fn inspect<R: Runtime>(runtime: &R, path: &Path) -> Result<PackedManifest> {
    let reader = runtime.open(path)?;
    let mut archive = tar::Archive::new(GzDecoder::new(reader));

    for entry in archive
        .entries()
        .with_context(|| format!("Failed to read archive {}", path.display()))?
    {
        let mut entry = entry?;
        if entry.path()?.as_ref() != Path::new(PACKED_MANIFEST) {
            continue;
        }
        let mut text = String::new();
        entry.read_to_string(&mut text)?;
        return serde_json::from_str(&text)
            .with_context(|| format!("Invalid {} in {}", PACKED_MANIFEST, path.display()));
    }

    bail!("{} has no {}", path.display(), PACKED_MANIFEST)
}

#[cfg(test)]
pub(crate) mod test_support {
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;
    use std::path::Path;

    /// Build a packed tarball the way the package manager lays it out.
    pub fn packed_tarball(name: &str, version: &str) -> Vec<u8> {
        let manifest = format!(r#"{{"name": "{}", "version": "{}"}}"#, name, version);
        let mut builder = tar::Builder::new(Vec::new());
        for (path, content) in [
            ("package/package.json", manifest.as_str()),
            ("package/README.md", "readme"),
        ] {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_path(path).unwrap();
            header.set_mode(0o644);
            header.set_cksum();
            builder.append(&header, content.as_bytes()).unwrap();
        }
        let tar = builder.into_inner().unwrap();

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&tar).unwrap();
        encoder.finish().unwrap()
    }

    pub fn write_tarball(dir: &Path, file: &str, name: &str, version: &str) {
        std::fs::write(dir.join(file), packed_tarball(name, version)).unwrap();
    }
}
