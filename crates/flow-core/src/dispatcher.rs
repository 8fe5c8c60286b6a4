//! Función de transición pura `(state, action) -> state`.
//!
//! El engine es el único que llama a `reduce`, siempre bajo su punto de
//! transición serializado. Nada fuera de aquí muta un `WorkflowState`.
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::model::{merge_data, DataMap, HistoryEntry, Outcome, WorkflowState};
use crate::repo::WorkflowDefinition;

/// Acciones discretas aplicables al estado.
#[derive(Debug, Clone)]
pub enum Action {
    /// Arranca una ejecución nueva: completitud a cero, datos iniciales.
    Start {
        definition: Arc<WorkflowDefinition>,
        run_id: Uuid,
        data: DataMap,
    },
    SetData { key: String, value: Value },
    MergeData(DataMap),
    SetCurrentStep(Option<String>),
    /// Marca un step como completado y añade la entrada de historial. Es
    /// idempotente: un step ya completado no genera una segunda entrada.
    CompleteStep {
        step_id: String,
        completed_at: DateTime<Utc>,
        payload: Option<DataMap>,
    },
    Pause,
    Resume,
    DeferActivation(bool),
    /// Fija el desenlace terminal; el estado sigue legible hasta `Reset`.
    Conclude(Outcome),
    /// Vuelve a `Idle`: definición, datos e historial se descartan.
    Reset,
    /// Sustituye el estado completo (rehidratación desde persistencia).
    Restore(WorkflowState),
}

impl Action {
    pub fn label(&self) -> &'static str {
        match self {
            Action::Start { .. } => "start",
            Action::SetData { .. } => "set_data",
            Action::MergeData(_) => "merge_data",
            Action::SetCurrentStep(_) => "set_current_step",
            Action::CompleteStep { .. } => "complete_step",
            Action::Pause => "pause",
            Action::Resume => "resume",
            Action::DeferActivation(_) => "defer_activation",
            Action::Conclude(_) => "conclude",
            Action::Reset => "reset",
            Action::Restore(_) => "restore",
        }
    }
}

pub fn reduce(mut state: WorkflowState, action: Action) -> WorkflowState {
    log::debug!("dispatch {} (workflow={:?})", action.label(), state.workflow_id());
    match action {
        Action::Start { definition, run_id, data } => return WorkflowState::started(definition, run_id, data),
        Action::Reset => return WorkflowState::default(),
        Action::Restore(restored) => return restored,
        _ if state.definition.is_none() => {
            log::debug!("ignoring action on idle state");
            return state;
        }
        Action::SetData { key, value } => {
            state.data.insert(key, value);
        }
        Action::MergeData(patch) => merge_data(&mut state.data, patch),
        Action::SetCurrentStep(step_id) => {
            match step_id {
                Some(id) if !state.completion.contains_key(&id) => {
                    log::warn!("ignoring unknown current step '{}'", id);
                }
                other => state.current_step_id = other,
            }
        }
        Action::CompleteStep { step_id,
                               completed_at,
                               payload, } => {
            let workflow_id = state.workflow_id().map(str::to_string).unwrap_or_default();
            match state.completion.get_mut(&step_id) {
                Some(done) if !*done => {
                    *done = true;
                    state.history.push(HistoryEntry { workflow_id,
                                                      step_id,
                                                      completed_at,
                                                      data: payload });
                }
                Some(_) => log::debug!("step '{}' already completed", step_id),
                None => log::warn!("ignoring completion of unknown step '{}'", step_id),
            }
        }
        Action::Pause => state.paused = true,
        Action::Resume => state.paused = false,
        Action::DeferActivation(deferred) => state.activation_deferred = deferred,
        Action::Conclude(outcome) => {
            state.outcome = Some(outcome);
            state.current_step_id = None;
            state.paused = false;
            state.activation_deferred = false;
        }
    }
    state
}
