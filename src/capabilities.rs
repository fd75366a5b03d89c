//! Injected capabilities
//!
//! Everything a rule may need from the outside world (record store,
//! authenticated identity, current time, engine configuration) travels in one
//! [`Capabilities`] value handed to each schema instance. Nothing here is a
//! process-wide singleton.

use std::sync::Arc;

use chrono::{Local, NaiveDateTime};

use crate::config::EngineConfig;
use crate::store::{MemoryStore, RecordId, RecordStore};

/// Accessor for the currently authenticated identity.
pub trait IdentityProvider: Send + Sync {
    /// Id of the authenticated user's record, if any.
    fn current_id(&self) -> Option<RecordId>;
}

/// No authenticated identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct Anonymous;

impl IdentityProvider for Anonymous {
    fn current_id(&self) -> Option<RecordId> {
        None
    }
}

/// A fixed authenticated identity.
#[derive(Debug, Clone, Copy)]
pub struct Authenticated(pub RecordId);

impl IdentityProvider for Authenticated {
    fn current_id(&self) -> Option<RecordId> {
        Some(self.0)
    }
}

/// Source of "now" for date comparisons.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Wall clock (local time).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Clock frozen at a given instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// Capabilities injected into a schema instance and, through the rule
/// context, into every predicate.
#[derive(Clone)]
pub struct Capabilities {
    store: Arc<dyn RecordStore>,
    identity: Arc<dyn IdentityProvider>,
    clock: Arc<dyn Clock>,
    config: Arc<EngineConfig>,
}

impl Capabilities {
    /// Creates capabilities around a store, with no identity, the system
    /// clock and the default configuration.
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            identity: Arc::new(Anonymous),
            clock: Arc::new(SystemClock),
            config: Arc::new(EngineConfig::default()),
        }
    }

    pub fn with_identity(mut self, identity: Arc<dyn IdentityProvider>) -> Self {
        self.identity = identity;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = Arc::new(config);
        self
    }

    pub fn store(&self) -> &dyn RecordStore {
        self.store.as_ref()
    }

    pub fn current_identity(&self) -> Option<RecordId> {
        self.identity.current_id()
    }

    pub fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

impl Default for Capabilities {
    /// An empty in-memory store with no tables.
    fn default() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }
}

impl std::fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capabilities")
            .field("identity", &self.identity.current_id())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
