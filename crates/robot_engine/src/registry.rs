use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use robot_core::Configuration;
use robot_logging::robot_debug;

use crate::TransportFactory;

/// Process-wide defaults consulted by request jobs that were not given
/// their own configuration or transport.
///
/// Reads and writes are safe from any thread; readers observe either the
/// previous or the new value, never a mix.
#[derive(Default)]
pub struct GlobalRegistry {
    configuration: RwLock<Option<Arc<dyn Configuration>>>,
    transport_factory: RwLock<Option<Arc<dyn TransportFactory>>>,
}

impl GlobalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The shared instance used by [`RequestJob::new`](crate::RequestJob::new).
    pub fn global() -> Arc<GlobalRegistry> {
        static GLOBAL: OnceLock<Arc<GlobalRegistry>> = OnceLock::new();
        GLOBAL
            .get_or_init(|| Arc::new(GlobalRegistry::new()))
            .clone()
    }

    pub fn default_configuration(&self) -> Option<Arc<dyn Configuration>> {
        self.configuration
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_default_configuration(&self, configuration: Option<Arc<dyn Configuration>>) {
        robot_debug!(
            "default configuration {}",
            if configuration.is_some() { "set" } else { "cleared" }
        );
        *self
            .configuration
            .write()
            .unwrap_or_else(PoisonError::into_inner) = configuration;
    }

    pub fn transport_factory(&self) -> Option<Arc<dyn TransportFactory>> {
        self.transport_factory
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_transport_factory(&self, factory: Option<Arc<dyn TransportFactory>>) {
        robot_debug!(
            "transport factory {}",
            if factory.is_some() { "set" } else { "cleared" }
        );
        *self
            .transport_factory
            .write()
            .unwrap_or_else(PoisonError::into_inner) = factory;
    }
}

impl fmt::Debug for GlobalRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlobalRegistry")
            .field("configuration", &self.default_configuration().is_some())
            .field("transport_factory", &self.transport_factory().is_some())
            .finish()
    }
}

pub fn default_configuration() -> Option<Arc<dyn Configuration>> {
    GlobalRegistry::global().default_configuration()
}

pub fn set_default_configuration(configuration: Option<Arc<dyn Configuration>>) {
    GlobalRegistry::global().set_default_configuration(configuration);
}

pub fn transport_factory() -> Option<Arc<dyn TransportFactory>> {
    GlobalRegistry::global().transport_factory()
}

pub fn set_transport_factory(factory: Option<Arc<dyn TransportFactory>>) {
    GlobalRegistry::global().set_transport_factory(factory);
}
