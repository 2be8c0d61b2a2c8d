/// Log driver registration table
use crate::driver::{DriverContext, LogDriver};
use crate::error::ConfigError;
use std::collections::{BTreeMap, HashMap};

/// Builds a driver from the host supplied context.
pub type DriverConstructor = fn(&DriverContext) -> Result<Box<dyn LogDriver>, ConfigError>;

/// Checks a driver's option map before anything is constructed.
pub type OptionValidator = fn(&HashMap<String, String>) -> Result<(), ConfigError>;

struct Registration {
    constructor: DriverConstructor,
    validator: OptionValidator,
}

/// Maps driver names to their constructor and option validator.
///
/// Drivers are added explicitly during startup, e.g. with
/// [`amqp::register`](crate::amqp::register).
#[derive(Default)]
pub struct DriverRegistry {
    drivers: BTreeMap<String, Registration>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a driver under `name`. Names are unique.
    pub fn register(
        &mut self,
        name: &str,
        constructor: DriverConstructor,
        validator: OptionValidator,
    ) -> Result<(), ConfigError> {
        if self.drivers.contains_key(name) {
            return Err(ConfigError::DuplicateDriver(name.to_string()));
        }
        self.drivers.insert(
            name.to_string(),
            Registration {
                constructor,
                validator,
            },
        );
        log::debug!("Registered log driver {name}");
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.drivers.contains_key(name)
    }

    /// Names of every registered driver, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.drivers.keys().map(String::as_str)
    }

    /// Validate an option map against the named driver's allow-list.
    pub fn validate(&self, name: &str, config: &HashMap<String, String>) -> Result<(), ConfigError> {
        let registration = self.lookup(name)?;
        (registration.validator)(config)
    }

    /// Validate the context's options and build the named driver.
    pub fn create(&self, name: &str, ctx: &DriverContext) -> Result<Box<dyn LogDriver>, ConfigError> {
        let registration = self.lookup(name)?;
        (registration.validator)(&ctx.config)?;
        (registration.constructor)(ctx)
    }

    fn lookup(&self, name: &str) -> Result<&Registration, ConfigError> {
        self.drivers
            .get(name)
            .ok_or_else(|| ConfigError::UnknownDriver(name.to_string()))
    }
}
