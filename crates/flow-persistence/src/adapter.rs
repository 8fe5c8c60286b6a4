//! Guardado y carga de un `WorkflowEngine` completo.

use flow_core::WorkflowEngine;

use crate::error::PersistenceError;
use crate::record::{restore, snapshot, PersistedState};
use crate::store::StateStore;

/// Persiste el estado actual del engine bajo `key` y devuelve el registro
/// guardado.
pub async fn save_engine<S>(engine: &WorkflowEngine, store: &S, key: &str) -> Result<PersistedState, PersistenceError>
    where S: StateStore + ?Sized
{
    let record = snapshot(&engine.get_state());
    store.save(key, &record).await?;
    Ok(record)
}

/// Carga el registro `key`, lo rehidrata a través del registro del engine y
/// reactiva el step actual.
///
/// Devuelve `Ok(true)` si quedó un workflow activo, `Ok(false)` si no había
/// registro o el registro era `Idle`. Falla con `Conflict` si el engine ya
/// ejecuta un workflow.
pub async fn load_engine<S>(engine: &WorkflowEngine, store: &S, key: &str) -> Result<bool, PersistenceError>
    where S: StateStore + ?Sized
{
    let Some(record) = store.load(key).await? else {
        log::debug!("no persisted state under '{}'", key);
        return Ok(false);
    };
    if let Some(active) = engine.active_workflow_id() {
        return Err(PersistenceError::Conflict(active));
    }
    let state = restore(&record, engine.registry())?;
    let active = state.is_active();
    engine.restore(state)?;
    if active {
        engine.reactivate()?;
    }
    Ok(active)
}
