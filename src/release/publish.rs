//! Push staged artifacts to the package registry.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use log::{debug, info};
use semver::Version;

use super::artifact::{ReleaseSet, inspect};
use crate::error::DistError;
use crate::runtime::Runtime;

/// A package registry that accepts packed artifacts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Registry: Send + Sync {
    /// Publish one packed artifact.
    async fn publish(&self, artifact: &Path) -> Result<()>;
}

/// Publishes through the `npm` command line client.
#[derive(Debug, Clone)]
pub struct NpmRegistry {
    program: String,
    access: String,
    dry_run: bool,
}

impl NpmRegistry {
    pub fn new(dry_run: bool) -> Self {
        Self {
            program: "npm".to_string(),
            access: "public".to_string(),
            dry_run,
        }
    }

    /// Use another client binary with the same command line.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    fn args(&self, artifact: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "publish".into(),
            artifact.as_os_str().to_owned(),
            "--access".into(),
            self.access.clone().into(),
        ];
        if self.dry_run {
            args.push("--dry-run".into());
        }
        args
    }
}

#[async_trait]
impl Registry for NpmRegistry {
    #[tracing::instrument(skip(self))]
    async fn publish(&self, artifact: &Path) -> Result<()> {
        let args = self.args(artifact);
        debug!("Running {} {:?}", self.program, args);

        let status = tokio::process::Command::new(&self.program)
            .args(&args)
            .status()
            .await
            .with_context(|| format!("Failed to run {}", self.program))?;

        if !status.success() {
            bail!(
                "{} publish {} exited with {}",
                self.program,
                artifact.display(),
                status
            );
        }
        Ok(())
    }
}

/// Publishes the staging directory, platform artifacts before the main one.
pub struct Publisher<'a, R: Runtime, G: Registry> {
    runtime: &'a R,
    registry: G,
    staging: PathBuf,
    main_name: String,
    expected: Option<Version>,
}

impl<'a, R: Runtime, G: Registry> Publisher<'a, R, G> {
    pub fn new(
        runtime: &'a R,
        registry: G,
        staging: PathBuf,
        main_name: impl Into<String>,
    ) -> Self {
        Self {
            runtime,
            registry,
            staging,
            main_name: main_name.into(),
            expected: None,
        }
    }

    /// Refuse to publish any artifact whose packed version is not `version`.
    pub fn expect_version(mut self, version: Version) -> Self {
        self.expected = Some(version);
        self
    }

    /// Publish everything staged. Returns the artifacts in the order they
    /// were published.
    #[tracing::instrument(skip(self), fields(staging = ?self.staging))]
    pub async fn publish(&self) -> Result<Vec<PathBuf>> {
        let set = if self.runtime.is_dir(&self.staging) {
            ReleaseSet::scan(self.runtime, &self.staging, &self.main_name)?
        } else {
            ReleaseSet::default()
        };
        if set.is_empty() {
            return Err(DistError::NoArtifacts {
                dir: self.staging.clone(),
            }
            .into());
        }

        if let Some(expected) = &self.expected {
            self.check_versions(&set, expected)?;
        }

        let mut published = Vec::with_capacity(set.len());
        for artifact in set.publish_order() {
            info!("publishing {}", artifact.file_name());
            self.registry
                .publish(&artifact.path)
                .await
                .with_context(|| format!("Failed to publish {}", artifact.file_name()))?;
            published.push(artifact.path.clone());
        }
        Ok(published)
    }

    fn check_versions(&self, set: &ReleaseSet, expected: &Version) -> Result<()> {
        let expected = expected.to_string();
        for artifact in set.publish_order() {
            let packed = inspect(self.runtime, &artifact.path)?;
            if packed.version != expected {
                bail!(
                    "{} contains {}@{}, expected version {}; re-stage the release",
                    artifact.file_name(),
                    packed.name,
                    packed.version,
                    expected
                );
            }
        }
        Ok(())
    }
}
