//! Work coordination
//!
//! A [`WorkCoordinator`] owns the Pending/Processing/Completed partitions of
//! the current sweep. Two backends implement it:
//!
//! - [`LocalCoordinator`]: in-process, for a single worker process
//! - [`SharedStoreCoordinator`]: sets in a shared store, for a fleet

mod local;
mod schema;
mod shared;
mod store;
mod traits;

pub use local::LocalCoordinator;
pub use schema::KeySchema;
pub use shared::{SharedStoreCoordinator, WorkerStats};
pub use store::{MemoryStore, RedisStore, SetStore};
pub use traits::{
    CompletionOutcome, CoordinationError, CoordinationResult, CoordinatorStatus, InitOutcome,
    PartitionSnapshot, WorkCoordinator,
};

use crate::catalog::SourceCatalog;
use crate::config::{CoordinationBackend, CoordinationConfig};
use std::sync::Arc;

/// The coordinator selected by configuration
///
/// Keeps the concrete shared-store type around so callers can reach the
/// fleet-level views (worker counters, run history).
pub enum Coordinator {
    Local(Arc<LocalCoordinator>),
    Shared(Arc<SharedStoreCoordinator<RedisStore>>),
}

impl Coordinator {
    /// Builds the configured backend, connecting to the store if needed
    pub async fn from_config(
        config: &CoordinationConfig,
        catalog: Arc<dyn SourceCatalog>,
    ) -> CoordinationResult<Self> {
        let lease_timeout = lease_timeout(config);

        match config.backend {
            CoordinationBackend::Local => Ok(Self::Local(Arc::new(
                LocalCoordinator::new(catalog).with_lease_timeout(lease_timeout),
            ))),
            CoordinationBackend::SharedStore => {
                let store = RedisStore::connect(&config.store_url).await?;
                let coordinator = SharedStoreCoordinator::new(
                    Arc::new(store),
                    catalog,
                    KeySchema::new(&config.key_prefix),
                )
                .with_lease_timeout(lease_timeout);
                Ok(Self::Shared(Arc::new(coordinator)))
            }
        }
    }

    /// The backend as a trait object
    pub fn as_dyn(&self) -> Arc<dyn WorkCoordinator> {
        match self {
            Self::Local(local) => Arc::clone(local) as Arc<dyn WorkCoordinator>,
            Self::Shared(shared) => Arc::clone(shared) as Arc<dyn WorkCoordinator>,
        }
    }

    pub fn backend(&self) -> CoordinationBackend {
        match self {
            Self::Local(_) => CoordinationBackend::Local,
            Self::Shared(_) => CoordinationBackend::SharedStore,
        }
    }
}

const MAX_LEASE_TIMEOUT_SECS: u64 = 365 * 24 * 60 * 60;

/// Lease timeout from configuration; zero disables expiry
pub fn lease_timeout(config: &CoordinationConfig) -> Option<chrono::Duration> {
    match config.lease_timeout_secs {
        0 => None,
        secs => Some(chrono::Duration::seconds(
            secs.min(MAX_LEASE_TIMEOUT_SECS) as i64
        )),
    }
}
