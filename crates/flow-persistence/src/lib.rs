//! flow-persistence
//!
//! Adaptador de persistencia del estado de orquestación.
//!
//! Módulos:
//! - `record`: forma persistida de `WorkflowState` y su rehidratación a
//!   través del registro (hooks y predicados son código: nunca se persisten).
//! - `codec`: serialización JSON del registro.
//! - `store`: trait `StateStore` y backend en memoria.
//! - `adapter`: guardar/cargar directamente desde un `WorkflowEngine`.

pub mod adapter;
pub mod codec;
pub mod error;
pub mod record;
pub mod store;

pub use adapter::{load_engine, save_engine};
pub use codec::{from_json, to_json};
pub use error::PersistenceError;
pub use record::{restore, snapshot, PersistedState};
pub use store::{InMemoryStateStore, StateStore};
