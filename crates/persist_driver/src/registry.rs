//! Driver lookup by name.

use crate::driver::Driver;
use crate::file::FileDriver;
use crate::memory::MemoryDriver;
use std::collections::BTreeMap;
use std::fmt;

type Factory = Box<dyn Fn() -> Box<dyn Driver> + Send + Sync>;

/// Maps driver names to factories producing fresh, unopened drivers.
///
/// The default registry knows the bundled drivers:
/// - `mem` - [`MemoryDriver`]
/// - `file` - [`FileDriver`]
///
/// # Example
///
/// ```rust
/// use persist_driver::{DriverRegistry, MemoryDriver};
///
/// let mut registry = DriverRegistry::default();
/// registry.register("scratch", || Box::new(MemoryDriver::new()));
///
/// assert!(registry.create("scratch").is_some());
/// assert!(registry.create("mem").is_some());
/// assert!(registry.create("sqlite").is_none());
/// ```
pub struct DriverRegistry {
    factories: BTreeMap<String, Factory>,
}

impl DriverRegistry {
    /// Creates a registry with no drivers at all.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Registers a driver factory, replacing any previous one with the
    /// same name.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> Box<dyn Driver> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Box::new(factory));
        self
    }

    /// Instantiates the driver registered under `name`.
    #[must_use]
    pub fn create(&self, name: &str) -> Option<Box<dyn Driver>> {
        self.factories.get(name).map(|factory| factory())
    }

    /// Returns true if a driver is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Returns the registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry
            .register(MemoryDriver::NAME, || Box::new(MemoryDriver::new()))
            .register(FileDriver::NAME, || Box::new(FileDriver::new()));
        registry
    }
}

impl fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
