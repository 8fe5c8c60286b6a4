//! Progreso de un workflow: conteos totales y de steps requeridos.

use serde::{Deserialize, Serialize};

use super::WorkflowState;
use crate::repo::WorkflowDefinition;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
    pub required_completed: usize,
    pub required_total: usize,
    /// `completed / total` redondeado, 0–100.
    pub percentage: u8,
}

impl Progress {
    /// Calcula el progreso de `definition` según `state`. Si `state` no
    /// corresponde a esa definición, ningún step cuenta como completado.
    pub fn compute(definition: &WorkflowDefinition, state: &WorkflowState) -> Self {
        let applies = state.workflow_id() == Some(definition.id.as_str());
        let done = |id: &str| applies && state.is_step_completed(id);

        let total = definition.steps.len();
        let completed = definition.steps.iter().filter(|s| done(&s.id)).count();
        let required_total = definition.steps.iter().filter(|s| s.required).count();
        let required_completed = definition.steps.iter().filter(|s| s.required && done(&s.id)).count();
        let percentage = if total == 0 { 0 } else { ((completed * 100 + total / 2) / total) as u8 };

        Self { completed,
               total,
               required_completed,
               required_total,
               percentage }
    }
}
