use crate::error::ConfigError;
use crate::handler::RecordHandler;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Factory for a custom handler. Receives the free-form `args` table from
/// the handler's configuration entry.
pub type HandlerFactory =
    Box<dyn Fn(&Map<String, Value>) -> Result<Box<dyn RecordHandler>, ConfigError> + Send + Sync>;

/// Named factories for `type = "custom"` handler entries.
///
/// Applications register their handler types up front; configuration then
/// refers to them by the registered name through the `class` key.
#[derive(Default)]
pub struct HandlerRegistry {
    factories: HashMap<String, HandlerFactory>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` under `name`, replacing any earlier registration.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&Map<String, Value>) -> Result<Box<dyn RecordHandler>, ConfigError> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Box::new(factory));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn build(&self, name: &str, args: &Map<String, Value>) -> Result<Box<dyn RecordHandler>, ConfigError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| ConfigError::UnknownHandler(name.to_string()))?;
        factory(args)
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.factories.keys().collect();
        names.sort();
        f.debug_struct("HandlerRegistry").field("factories", &names).finish()
    }
}
