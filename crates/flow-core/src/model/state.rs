//! Estado canónico (y único mutable) del engine.
//!
//! `WorkflowState` sólo se modifica a través de `dispatcher::reduce`. Lo que
//! devuelve `WorkflowEngine::get_state` es una copia: mutarla no afecta al
//! engine.
use std::sync::Arc;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::DataMap;
use crate::repo::WorkflowDefinition;

/// Registro inmutable de la finalización de un step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub workflow_id: String,
    pub step_id: String,
    #[serde(with = "crate::model::timestamp")]
    pub completed_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<DataMap>,
}

/// Estado observable de la instancia de workflow.
///
/// `Completed` y `Cancelled` sólo se observan de forma transitoria (mientras
/// corren los hooks de cierre); después el engine vuelve a `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkflowStatus {
    Idle,
    Running,
    Paused,
    Completed,
    Cancelled,
}

/// Desenlace terminal de una ejecución.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Default)]
pub struct WorkflowState {
    pub(crate) definition: Option<Arc<WorkflowDefinition>>,
    pub(crate) run_id: Option<Uuid>,
    pub(crate) current_step_id: Option<String>,
    pub(crate) paused: bool,
    pub(crate) activation_deferred: bool,
    pub(crate) outcome: Option<Outcome>,
    /// step_id -> completado, en orden de declaración.
    pub(crate) completion: IndexMap<String, bool>,
    pub(crate) data: DataMap,
    pub(crate) history: Vec<HistoryEntry>,
}

/// Partes persistibles con las que se reconstruye un estado sobre una
/// definición recién obtenida del registro.
#[derive(Debug, Clone, Default)]
pub struct Rehydration {
    pub run_id: Option<Uuid>,
    pub current_step_id: Option<String>,
    pub paused: bool,
    pub activation_deferred: bool,
    pub completed_step_ids: Vec<String>,
    pub data: DataMap,
    pub history: Vec<HistoryEntry>,
}

impl WorkflowState {
    /// Estado recién arrancado: todos los steps pendientes.
    pub(crate) fn started(definition: Arc<WorkflowDefinition>, run_id: Uuid, data: DataMap) -> Self {
        let completion = definition.steps.iter().map(|s| (s.id.clone(), false)).collect();
        Self { definition: Some(definition),
               run_id: Some(run_id),
               current_step_id: None,
               paused: false,
               activation_deferred: false,
               outcome: None,
               completion,
               data,
               history: Vec::new() }
    }

    /// Reaplica un conjunto de steps completados sobre `definition`.
    ///
    /// Los ids que la definición ya no declara se descartan (con warning), y
    /// un `current_step_id` desconocido queda en `None`.
    pub fn rehydrate(definition: Arc<WorkflowDefinition>, parts: Rehydration) -> Self {
        let mut completion: IndexMap<String, bool> =
            definition.steps.iter().map(|s| (s.id.clone(), false)).collect();
        for id in parts.completed_step_ids {
            match completion.get_mut(&id) {
                Some(done) => *done = true,
                None => log::warn!("dropping unknown completed step '{}' for workflow '{}'", id, definition.id),
            }
        }
        let current_step_id = parts.current_step_id.filter(|id| {
                                                        let known = completion.contains_key(id);
                                                        if !known {
                                                            log::warn!("dropping unknown current step '{}' for workflow '{}'",
                                                                       id,
                                                                       definition.id);
                                                        }
                                                        known
                                                    });
        Self { run_id: Some(parts.run_id.unwrap_or_else(Uuid::new_v4)),
               current_step_id,
               paused: parts.paused,
               activation_deferred: parts.activation_deferred,
               outcome: None,
               completion,
               data: parts.data,
               history: parts.history,
               definition: Some(definition) }
    }

    pub fn definition(&self) -> Option<&Arc<WorkflowDefinition>> {
        self.definition.as_ref()
    }

    pub fn workflow_id(&self) -> Option<&str> {
        self.definition.as_deref().map(|d| d.id.as_str())
    }

    pub fn run_id(&self) -> Option<Uuid> {
        self.run_id
    }

    pub fn current_step_id(&self) -> Option<&str> {
        self.current_step_id.as_deref()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// `true` si hay una activación diferida por pausa pendiente de `resume`.
    pub fn is_activation_deferred(&self) -> bool {
        self.activation_deferred
    }

    pub fn data(&self) -> &DataMap {
        &self.data
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    /// Mapa step_id -> completado, en orden de declaración.
    pub fn step_completion(&self) -> &IndexMap<String, bool> {
        &self.completion
    }

    pub fn is_step_completed(&self, step_id: &str) -> bool {
        self.completion.get(step_id).copied().unwrap_or(false)
    }

    /// Ids completados en orden de declaración.
    pub fn completed_step_ids(&self) -> Vec<&str> {
        self.completion.iter().filter(|(_, done)| **done).map(|(id, _)| id.as_str()).collect()
    }

    pub fn status(&self) -> WorkflowStatus {
        match (&self.definition, self.outcome) {
            (None, _) => WorkflowStatus::Idle,
            (Some(_), Some(Outcome::Completed)) => WorkflowStatus::Completed,
            (Some(_), Some(Outcome::Cancelled)) => WorkflowStatus::Cancelled,
            (Some(_), None) if self.paused => WorkflowStatus::Paused,
            (Some(_), None) => WorkflowStatus::Running,
        }
    }

    /// Hay un workflow ocupando `Running`/`Paused`.
    pub fn is_active(&self) -> bool {
        self.definition.is_some() && self.outcome.is_none()
    }

    pub(crate) fn is_run_active(&self, run_id: Uuid) -> bool {
        self.is_active() && self.run_id == Some(run_id)
    }

    /// Todos los steps `required` están completados.
    pub fn required_complete(&self) -> bool {
        match &self.definition {
            Some(def) => def.steps.iter().filter(|s| s.required).all(|s| self.is_step_completed(&s.id)),
            None => false,
        }
    }

    /// Workflow activo sin step actual y con steps requeridos pendientes.
    ///
    /// Es un estado de primera clase: se resuelve con `skip_to_step` o con
    /// un cambio externo que una nueva pasada de elegibilidad detecte.
    pub fn is_stalled(&self) -> bool {
        self.is_active() && self.current_step_id.is_none() && !self.activation_deferred && !self.required_complete()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::Step;

    fn definition() -> Arc<WorkflowDefinition> {
        Arc::new(WorkflowDefinition::builder("w", "W").step(Step::interactive("a", "A"))
                                                      .step(Step::interactive("b", "B").optional())
                                                      .build())
    }

    #[test]
    fn idle_state_has_no_workflow() {
        let s = WorkflowState::default();
        assert_eq!(s.status(), WorkflowStatus::Idle);
        assert!(!s.is_active());
        assert!(!s.is_stalled());
    }

    #[test]
    fn rehydrate_drops_unknown_ids() {
        let parts = Rehydration { completed_step_ids: vec!["a".into(), "ghost".into()],
                                  current_step_id: Some("ghost".into()),
                                  ..Rehydration::default() };
        let s = WorkflowState::rehydrate(definition(), parts);
        assert_eq!(s.completed_step_ids(), vec!["a"]);
        assert_eq!(s.current_step_id(), None);
        assert!(s.required_complete());
    }

    #[test]
    fn started_state_is_running_with_nothing_completed() {
        let s = WorkflowState::started(definition(), Uuid::new_v4(), DataMap::new());
        assert_eq!(s.status(), WorkflowStatus::Running);
        assert!(s.completed_step_ids().is_empty());
        assert!(s.is_stalled());
    }
}
