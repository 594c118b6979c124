//! Backing-store provider.
//!
//! Holds the factory for the default [`RefDataSource`] and builds the shared
//! instance lazily on first use. The provider is an explicit handle passed to
//! whatever constructs caches and inserters; swapping the factory requires
//! exclusive access, so it happens during setup rather than under load.

use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::memory::InMemorySource;
use crate::source::RefDataSource;

/// Factory producing the shared storage port.
pub type SourceFactory = Arc<dyn Fn() -> Arc<dyn RefDataSource> + Send + Sync>;

/// Lazily-constructed, swappable holder of the default storage port.
pub struct SourceProvider {
    factory: SourceFactory,
    instance: OnceCell<Arc<dyn RefDataSource>>,
}

impl SourceProvider {
    /// Create a provider that will call `factory` on first use.
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> Arc<dyn RefDataSource> + Send + Sync + 'static,
    {
        Self {
            factory: Arc::new(factory),
            instance: OnceCell::new(),
        }
    }

    /// Create a provider that always hands out `source`.
    pub fn with_source(source: Arc<dyn RefDataSource>) -> Self {
        Self::new(move || Arc::clone(&source))
    }

    /// Create a provider backed by a fresh [`InMemorySource`].
    pub fn in_memory() -> Self {
        Self::new(|| Arc::new(InMemorySource::new()) as Arc<dyn RefDataSource>)
    }

    /// Current storage port, constructing it on first use.
    pub fn get(&self) -> Arc<dyn RefDataSource> {
        Arc::clone(self.instance.get_or_init(|| {
            tracing::debug!("Constructing reference-data source");
            (self.factory)()
        }))
    }

    /// Replace the factory and discard any instance already built from the old one.
    pub fn set_factory<F>(&mut self, factory: F)
    where
        F: Fn() -> Arc<dyn RefDataSource> + Send + Sync + 'static,
    {
        self.factory = Arc::new(factory);
        self.instance = OnceCell::new();
    }

    /// Whether the storage port has been constructed yet.
    pub fn is_initialized(&self) -> bool {
        self.instance.get().is_some()
    }
}

impl Default for SourceProvider {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl std::fmt::Debug for SourceProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceProvider")
            .field("initialized", &self.is_initialized())
            .finish()
    }
}
