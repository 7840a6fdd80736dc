//! Database configuration.

use persist_value::Value;

/// Configuration for opening a database.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Name of the registered driver to bind.
    pub driver: String,

    /// Driver-specific configuration, handed to the driver's open step
    /// unchanged.
    pub driver_config: Value,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            driver: "file".to_string(),
            driver_config: Value::Null,
        }
    }
}

impl Config {
    /// Creates a configuration for the named driver with no options.
    #[must_use]
    pub fn new(driver: impl Into<String>) -> Self {
        Self {
            driver: driver.into(),
            ..Self::default()
        }
    }

    /// Sets the driver name.
    #[must_use]
    pub fn driver(mut self, name: impl Into<String>) -> Self {
        self.driver = name.into();
        self
    }

    /// Replaces the whole driver configuration value.
    #[must_use]
    pub fn driver_config(mut self, config: Value) -> Self {
        self.driver_config = config;
        self
    }

    /// Sets one driver option, turning a non-dict configuration into a
    /// dict first.
    #[must_use]
    pub fn option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        if !self.driver_config.is_dict() {
            self.driver_config = Value::empty_dict();
        }
        self.driver_config.set(key, value);
        self
    }
}
