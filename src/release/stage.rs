//! Copy the build's packed artifacts into the publish staging directory.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, info};

use super::artifact::{Artifact, ArtifactKind, ReleaseSet};
use crate::error::DistError;
use crate::runtime::Runtime;

/// Which artifacts to stage. `None` at the call site stages everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum StageFilter {
    /// Only the main package
    #[value(alias = "js")]
    Main,
    /// Only the platform packages
    #[value(alias = "addon")]
    Platform,
}

impl StageFilter {
    pub fn accepts(filter: Option<StageFilter>, kind: ArtifactKind) -> bool {
        match filter {
            None => true,
            Some(StageFilter::Main) => kind == ArtifactKind::Main,
            Some(StageFilter::Platform) => kind == ArtifactKind::Platform,
        }
    }
}

pub struct Stager<'a, R: Runtime> {
    runtime: &'a R,
    source: PathBuf,
    staging: PathBuf,
}

impl<'a, R: Runtime> Stager<'a, R> {
    pub fn new(runtime: &'a R, source: PathBuf, staging: PathBuf) -> Self {
        Self {
            runtime,
            source,
            staging,
        }
    }

    /// Replace the staging directory with the artifacts in the source that
    /// pass `filter`. Returns the staged paths.
    ///
    /// The staging directory is always emptied, even when nothing matches.
    #[tracing::instrument(skip(self))]
    pub fn stage(&self, main_name: &str, filter: Option<StageFilter>) -> Result<Vec<PathBuf>> {
        let set = if self.runtime.is_dir(&self.source) {
            ReleaseSet::scan(self.runtime, &self.source, main_name)?
        } else {
            debug!("Artifact source {:?} does not exist", self.source);
            ReleaseSet::default()
        };

        self.reset_staging()?;

        let selected: Vec<&Artifact> = set
            .publish_order()
            .filter(|artifact| StageFilter::accepts(filter, artifact.kind))
            .collect();

        let mut staged = Vec::with_capacity(selected.len());
        for artifact in selected {
            let target = self.staging.join(artifact.file_name());
            self.runtime
                .copy(&artifact.path, &target)
                .with_context(|| format!("Failed to stage {}", artifact.path.display()))?;
            info!("staged {}", artifact.file_name());
            staged.push(target);
        }

        if staged.is_empty() {
            return Err(DistError::NoArtifacts {
                dir: self.source.clone(),
            }
            .into());
        }
        Ok(staged)
    }

    fn reset_staging(&self) -> Result<()> {
        if self.runtime.exists(&self.staging) {
            debug!("Clearing staging directory {:?}", self.staging);
            self.runtime.remove_dir_all(&self.staging)?;
        }
        self.runtime.create_dir_all(&self.staging)
    }

    pub fn staging(&self) -> &Path {
        &self.staging
    }
}
