use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, OnceLock, PoisonError};

use anyhow::Result;
use log::{debug, info, warn};

use crate::config::Config;
use crate::error::DistError;
use crate::package::{PackageResolver, PlatformPackage};
use crate::platform::{TargetTriple, detect};
use crate::runtime::Runtime;

/// Performs the actual dynamic load of a native binary.
pub trait NativeLoader: Send + Sync {
    type Handle: Send + Sync;

    fn load(&self, triple: TargetTriple, path: &Path) -> Result<Self::Handle>;
}

/// One load attempt. Callers that join it keep this handle and read its
/// outcome once it is set, whatever the loader does afterwards.
struct Attempt<H> {
    id: u64,
    outcome: OnceLock<Result<Arc<H>, DistError>>,
}

enum LoadState<H> {
    Unloaded,
    Loading(Arc<Attempt<H>>),
    Loaded(Arc<H>),
    Failed { attempt: u64 },
}

/// Loads the native addon for the running platform at most once.
///
/// Callers arriving while a load is in flight block until it settles and
/// receive its outcome. A success is cached for the lifetime of the loader.
/// A failure is handed to every caller that waited on that attempt; the next
/// call after it starts a new attempt.
pub struct AddonLoader<R: Runtime, L: NativeLoader> {
    runtime: R,
    native: L,
    config: Config,
    state: Mutex<LoadState<L::Handle>>,
    settled: Condvar,
    attempts: Mutex<u64>,
}

impl<R: Runtime, L: NativeLoader> AddonLoader<R, L> {
    pub fn new(runtime: R, native: L, config: Config) -> Self {
        Self {
            runtime,
            native,
            config,
            state: Mutex::new(LoadState::Unloaded),
            settled: Condvar::new(),
            attempts: Mutex::new(0),
        }
    }

    /// Return the loaded addon, loading it on first use.
    pub fn load(&self) -> Result<Arc<L::Handle>, DistError> {
        let mut state = self.lock_state();

        let joined = match &*state {
            LoadState::Loaded(handle) => return Ok(Arc::clone(handle)),
            LoadState::Loading(attempt) => Some(Arc::clone(attempt)),
            LoadState::Failed { attempt } => {
                debug!("Retrying native addon load after attempt {}", attempt);
                None
            }
            LoadState::Unloaded => None,
        };

        if let Some(attempt) = joined {
            debug!("Waiting on native addon load (attempt {})", attempt.id);
            loop {
                if let Some(outcome) = attempt.outcome.get() {
                    return outcome.clone();
                }
                state = self
                    .settled
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        }

        let attempt = Arc::new(Attempt {
            id: self.next_attempt(),
            outcome: OnceLock::new(),
        });
        *state = LoadState::Loading(Arc::clone(&attempt));
        drop(state);

        debug!("Starting native addon load (attempt {})", attempt.id);
        let outcome = catch_unwind(AssertUnwindSafe(|| self.load_uncached())).unwrap_or_else(
            |_| {
                Err(DistError::NativeLoad {
                    triple: "unknown".to_string(),
                    path: Default::default(),
                    reason: "native loader panicked".to_string(),
                })
            },
        );

        let mut state = self.lock_state();
        *state = match &outcome {
            Ok(handle) => LoadState::Loaded(Arc::clone(handle)),
            Err(error) => {
                warn!("Native addon load failed: {}", error);
                LoadState::Failed { attempt: attempt.id }
            }
        };
        let _ = attempt.outcome.set(outcome.clone());
        self.settled.notify_all();
        outcome
    }

    /// Whether a handle is cached.
    pub fn is_loaded(&self) -> bool {
        matches!(&*self.lock_state(), LoadState::Loaded(_))
    }

    /// Detect, resolve and load without touching the cache.
    #[tracing::instrument(skip(self))]
    fn load_uncached(&self) -> Result<Arc<L::Handle>, DistError> {
        let triple = detect(&self.runtime)?;
        let package = PlatformPackage::new(&self.config.product, triple);
        let dir = PackageResolver::for_layout(&self.runtime, &self.config.layout)
            .resolve_dir(&package)?;
        let path = package.binary_path(&dir);

        let handle = self
            .native
            .load(triple, &path)
            .map_err(|e| DistError::NativeLoad {
                triple: triple.to_string(),
                path: path.clone(),
                reason: format!("{:#}", e),
            })?;

        info!("Loaded native addon for {} from {:?}", triple, path);
        Ok(Arc::new(handle))
    }

    fn next_attempt(&self) -> u64 {
        let mut attempts = self
            .attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *attempts += 1;
        *attempts
    }

    fn lock_state(&self) -> MutexGuard<'_, LoadState<L::Handle>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
