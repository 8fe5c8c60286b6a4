//! Inicialización del logging de la aplicación.
//!
//! Los crates de librería registran a través de la fachada `log`; el
//! subscriber de `tracing-subscriber` recoge esos registros con su puente
//! `tracing-log`.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::errors::AppError;

/// Instala el subscriber global con el filtro indicado (`"info"`,
/// `"warn,flow_core=debug"`, ...). Falla si el filtro no es válido o si ya
/// había un subscriber instalado.
pub fn init(filter: &str) -> Result<(), AppError> {
    let filter = EnvFilter::try_new(filter).map_err(|e| AppError::Config(format!("invalid log filter '{filter}': {e}")))?;
    tracing_subscriber::registry().with(filter)
                                  .with(tracing_subscriber::fmt::layer().without_time())
                                  .try_init()
                                  .map_err(|e| AppError::Config(format!("logging already initialised: {e}")))
}
