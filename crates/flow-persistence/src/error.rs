//! Errores de persistencia.

use flow_core::EngineError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("persisted workflow '{0}' is not registered")]
    UnknownWorkflow(String),
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),
    #[error("engine already runs workflow '{0}'")]
    Conflict(String),
    #[error(transparent)]
    Engine(#[from] EngineError),
}
