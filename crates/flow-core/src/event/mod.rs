//! Eventos del workflow y bus de notificación.

mod bus;
mod types;

pub use bus::{EventBus, EventListener, InMemoryEventLog, ListenerId};
pub use types::{WorkflowEvent, WorkflowEventKind};
