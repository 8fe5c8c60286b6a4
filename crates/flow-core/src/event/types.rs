//! Tipos de evento emitidos por el engine.
//!
//! Rol en el flujo:
//! - El engine emite un `WorkflowEvent` por cada hito del ciclo de vida.
//! - La emisión es fire-and-forget: los listeners (UI, analítica) no pueden
//!   alterar ni interrumpir la transición que los originó.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowEventKind {
    WorkflowStarted,
    WorkflowCompleted,
    WorkflowCancelled,
    WorkflowPaused,
    WorkflowResumed,
    StepStarted,
    StepCompleted,
    /// Step condicional pre-completado, o step abandonado por `skip_to_step`.
    StepSkipped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowEvent {
    #[serde(rename = "type")]
    pub kind: WorkflowEventKind,
    pub workflow_id: String,
    pub run_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_id: Option<String>,
    #[serde(with = "crate::model::timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl WorkflowEvent {
    pub fn new(kind: WorkflowEventKind, workflow_id: impl Into<String>, run_id: Uuid) -> Self {
        Self { kind,
               workflow_id: workflow_id.into(),
               run_id,
               step_id: None,
               timestamp: Utc::now(),
               data: None }
    }

    pub fn with_step(mut self, step_id: impl Into<String>) -> Self {
        self.step_id = Some(step_id.into());
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn is_step_event(&self) -> bool {
        matches!(self.kind,
                 WorkflowEventKind::StepStarted | WorkflowEventKind::StepCompleted | WorkflowEventKind::StepSkipped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wire_shape_uses_type_and_camel_case() {
        let ev = WorkflowEvent::new(WorkflowEventKind::StepCompleted, "onboarding", Uuid::nil()).with_step("pin")
                                                                                                .with_data(json!({"ok": true}));
        let v = serde_json::to_value(&ev).unwrap();
        assert_eq!(v["type"], json!("STEP_COMPLETED"));
        assert_eq!(v["workflowId"], json!("onboarding"));
        assert_eq!(v["stepId"], json!("pin"));
        assert!(v["timestamp"].as_str().unwrap().ends_with('Z'));
        assert!(ev.is_step_event());
    }
}
