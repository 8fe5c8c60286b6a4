//! Tipos de datos del engine: mapa de datos del workflow, estado mutable
//! canónico, historial y progreso.

pub mod data;
pub mod progress;
pub mod state;
pub mod timestamp;

pub use data::{data_map, data_to_value, merge_data, DataMap};
pub use progress::Progress;
pub use state::{HistoryEntry, Outcome, Rehydration, WorkflowState, WorkflowStatus};
