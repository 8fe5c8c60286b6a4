//! Builder para `WorkflowEngine`.
//!
//! El registro es obligatorio; el resto de colaboradores tiene valor por
//! defecto:
//! - navegador: `NoopNavigator`
//! - bus de eventos: uno nuevo sin listeners
//! - configuración: `EngineConfig::default()`
//!
//! ```ignore
//! let engine = WorkflowEngine::builder(registry)
//!     .navigator(|screen: &str, params: &NavParams| router.push(screen, params))
//!     .shared_listener(log.clone())
//!     .build();
//! ```

use std::sync::Arc;

use crate::engine::{EngineConfig, WorkflowEngine};
use crate::event::{EventBus, EventListener};
use crate::navigation::{Navigator, NoopNavigator};
use crate::repo::WorkflowRegistry;

pub struct EngineBuilder {
    registry: Arc<WorkflowRegistry>,
    navigator: Arc<dyn Navigator>,
    events: Arc<EventBus>,
    listeners: Vec<Arc<dyn EventListener>>,
    config: EngineConfig,
}

impl EngineBuilder {
    pub(crate) fn new(registry: Arc<WorkflowRegistry>) -> Self {
        Self { registry,
               navigator: Arc::new(NoopNavigator),
               events: Arc::new(EventBus::new()),
               listeners: Vec::new(),
               config: EngineConfig::default() }
    }

    pub fn navigator<N>(self, navigator: N) -> Self
        where N: Navigator + 'static
    {
        self.shared_navigator(Arc::new(navigator))
    }

    pub fn shared_navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = navigator;
        self
    }

    /// Usa un bus existente (p. ej. compartido con la capa de analítica).
    pub fn event_bus(mut self, events: Arc<EventBus>) -> Self {
        self.events = events;
        self
    }

    /// Suscribe un listener al bus en `build`.
    pub fn listener<L>(self, listener: L) -> Self
        where L: EventListener + 'static
    {
        self.shared_listener(Arc::new(listener))
    }

    pub fn shared_listener(mut self, listener: Arc<dyn EventListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> WorkflowEngine {
        for listener in self.listeners {
            self.events.subscribe_arc(listener);
        }
        WorkflowEngine::from_parts(self.registry, self.navigator, self.events, self.config)
    }
}

impl std::fmt::Debug for EngineBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineBuilder")
         .field("registry", &self.registry.len())
         .field("listeners", &self.listeners.len())
         .field("config", &self.config)
         .finish()
    }
}
