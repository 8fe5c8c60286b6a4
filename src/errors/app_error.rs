use flow_core::{DefinitionError, EngineError};
use flow_persistence::PersistenceError;
use thiserror::Error;

/// Error de nivel aplicación: agrega los errores de cada crate.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Definición inválida: {0}")]
    Definition(#[from] DefinitionError),
    #[error("Error del engine: {0}")]
    Engine(#[from] EngineError),
    #[error("Error de persistencia: {0}")]
    Persistence(#[from] PersistenceError),
    #[error("Error de configuración: {0}")]
    Config(String),
    #[error("Error en IO: {0}")]
    Io(#[from] std::io::Error),
}
