//! Registro persistido del estado de un workflow.
//!
//! Forma JSON:
//! `{workflowId, runId?, currentStepId?, paused, activationDeferred,
//!   completedStepIds, data, history, definitionHash?}`.
//! Los timestamps del historial usan RFC 3339 con nanosegundos fijos, de
//! modo que el orden textual coincide con el cronológico.

use flow_core::{DataMap, HistoryEntry, Rehydration, WorkflowRegistry, WorkflowState};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PersistenceError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    /// `None` cuando no hay workflow activo.
    pub workflow_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<Uuid>,
    #[serde(default)]
    pub current_step_id: Option<String>,
    #[serde(default)]
    pub paused: bool,
    #[serde(default)]
    pub activation_deferred: bool,
    /// En orden de declaración.
    #[serde(default)]
    pub completed_step_ids: Vec<String>,
    #[serde(default)]
    pub data: DataMap,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    /// Fingerprint de la definición en el momento del guardado.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition_hash: Option<String>,
}

impl PersistedState {
    pub fn is_idle(&self) -> bool {
        self.workflow_id.is_none()
    }
}

/// Captura el estado persistible. Un workflow ya concluido se guarda como
/// `Idle`.
pub fn snapshot(state: &WorkflowState) -> PersistedState {
    let Some(definition) = state.definition().filter(|_| state.is_active()) else {
        return PersistedState::default();
    };
    PersistedState { workflow_id: Some(definition.id.clone()),
                     run_id: state.run_id(),
                     current_step_id: state.current_step_id().map(str::to_string),
                     paused: state.is_paused(),
                     activation_deferred: state.is_activation_deferred(),
                     completed_step_ids: state.completed_step_ids().into_iter().map(str::to_string).collect(),
                     data: state.data().clone(),
                     history: state.history().to_vec(),
                     definition_hash: Some(definition.fingerprint()) }
}

/// Reconstruye un `WorkflowState` resolviendo la definición por id en el
/// registro y reaplicando los steps completados sobre ella.
pub fn restore(record: &PersistedState, registry: &WorkflowRegistry) -> Result<WorkflowState, PersistenceError> {
    let Some(workflow_id) = record.workflow_id.as_deref() else {
        return Ok(WorkflowState::default());
    };
    let definition = registry.get(workflow_id)
                             .ok_or_else(|| PersistenceError::UnknownWorkflow(workflow_id.to_string()))?;
    if let Some(saved) = &record.definition_hash {
        let current = definition.fingerprint();
        if *saved != current {
            log::warn!("workflow '{}' changed since it was persisted (fingerprint {} -> {})",
                       workflow_id,
                       saved,
                       current);
        }
    }
    Ok(WorkflowState::rehydrate(definition,
                                Rehydration { run_id: record.run_id,
                                              current_step_id: record.current_step_id.clone(),
                                              paused: record.paused,
                                              activation_deferred: record.activation_deferred,
                                              completed_step_ids: record.completed_step_ids.clone(),
                                              data: record.data.clone(),
                                              history: record.history.clone() }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flow_core::{Step, WorkflowDefinition};

    #[test]
    fn idle_state_snapshots_to_idle_record() {
        let record = snapshot(&WorkflowState::default());
        assert!(record.is_idle());
        assert_eq!(record, PersistedState::default());
    }

    #[test]
    fn unknown_workflow_is_reported() {
        let record = PersistedState { workflow_id: Some("gone".into()),
                                      ..PersistedState::default() };
        let err = restore(&record, &WorkflowRegistry::new()).unwrap_err();
        assert!(matches!(err, PersistenceError::UnknownWorkflow(id) if id == "gone"));
    }

    #[test]
    fn fingerprint_mismatch_still_restores() {
        let registry = WorkflowRegistry::new();
        registry.register(WorkflowDefinition::builder("w", "W").step(Step::interactive("a", "A")).build())
                .unwrap();
        let record = PersistedState { workflow_id: Some("w".into()),
                                      completed_step_ids: vec!["a".into()],
                                      definition_hash: Some("stale".into()),
                                      ..PersistedState::default() };
        let state = restore(&record, &registry).unwrap();
        assert!(state.is_step_completed("a"));
    }
}
