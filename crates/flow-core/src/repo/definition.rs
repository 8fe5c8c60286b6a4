//! Definición inmutable de un workflow y su builder.
use std::fmt;
use std::sync::Arc;

use serde_json::json;

use crate::constants::ENGINE_VERSION;
use crate::engine::FlowCtx;
use crate::errors::HookError;
use crate::hashing::hash_value;
use crate::step::{Hook, Step};

/// Workflow registrado: conjunto ordenado de steps con hooks de ciclo de
/// vida. Nunca se muta tras el registro (re-registrar el mismo id lo
/// reemplaza).
#[derive(Clone)]
pub struct WorkflowDefinition {
    pub id: String,
    pub name: String,
    pub steps: Vec<Step>,
    pub skippable: bool,
    pub pausable: bool,
    pub on_start: Option<Hook>,
    pub on_complete: Option<Hook>,
    pub on_cancel: Option<Hook>,
}

impl WorkflowDefinition {
    pub fn builder(id: impl Into<String>, name: impl Into<String>) -> WorkflowBuilder {
        WorkflowBuilder { definition: WorkflowDefinition { id: id.into(),
                                                           name: name.into(),
                                                           steps: Vec::new(),
                                                           skippable: false,
                                                           pausable: false,
                                                           on_start: None,
                                                           on_complete: None,
                                                           on_cancel: None } }
    }

    pub fn step(&self, step_id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == step_id)
    }

    pub fn step_index(&self, step_id: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.id == step_id)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn required_steps(&self) -> impl Iterator<Item = &Step> {
        self.steps.iter().filter(|s| s.required)
    }

    /// Fingerprint estable de la forma estructural de la definición (ids,
    /// flags, dependencias, pantallas, plantillas). Los hooks no participan.
    pub fn fingerprint(&self) -> String {
        let steps: Vec<_> = self.steps
                                .iter()
                                .map(|s| {
                                    json!({
                                        "id": s.id,
                                        "screen": s.screen,
                                        "required": s.required,
                                        "headless": s.headless,
                                        "dependencies": s.dependencies.iter().collect::<Vec<_>>(),
                                        "conditional": s.completion_condition.is_some(),
                                        "nav_params": s.nav_params,
                                    })
                                })
                                .collect();
        hash_value(&json!({
                       "engine_version": ENGINE_VERSION,
                       "id": self.id,
                       "skippable": self.skippable,
                       "pausable": self.pausable,
                       "steps": steps,
                   }))
    }
}

impl fmt::Debug for WorkflowDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowDefinition")
         .field("id", &self.id)
         .field("name", &self.name)
         .field("steps", &self.steps)
         .field("skippable", &self.skippable)
         .field("pausable", &self.pausable)
         .field("on_start", &self.on_start.is_some())
         .field("on_complete", &self.on_complete.is_some())
         .field("on_cancel", &self.on_cancel.is_some())
         .finish()
    }
}

/// Builder fluido de `WorkflowDefinition`. No valida: la validación ocurre
/// en `WorkflowRegistry::register`.
#[derive(Debug)]
pub struct WorkflowBuilder {
    definition: WorkflowDefinition,
}

impl WorkflowBuilder {
    pub fn skippable(mut self, skippable: bool) -> Self {
        self.definition.skippable = skippable;
        self
    }

    pub fn pausable(mut self, pausable: bool) -> Self {
        self.definition.pausable = pausable;
        self
    }

    pub fn step(mut self, step: Step) -> Self {
        self.definition.steps.push(step);
        self
    }

    pub fn steps(mut self, steps: impl IntoIterator<Item = Step>) -> Self {
        self.definition.steps.extend(steps);
        self
    }

    pub fn on_start<F>(mut self, hook: F) -> Self
        where F: Fn(&FlowCtx) -> Result<(), HookError> + Send + Sync + 'static
    {
        self.definition.on_start = Some(Arc::new(hook));
        self
    }

    pub fn on_complete<F>(mut self, hook: F) -> Self
        where F: Fn(&FlowCtx) -> Result<(), HookError> + Send + Sync + 'static
    {
        self.definition.on_complete = Some(Arc::new(hook));
        self
    }

    pub fn on_cancel<F>(mut self, hook: F) -> Self
        where F: Fn(&FlowCtx) -> Result<(), HookError> + Send + Sync + 'static
    {
        self.definition.on_cancel = Some(Arc::new(hook));
        self
    }

    pub fn build(self) -> WorkflowDefinition {
        self.definition
    }
}
