//! Contexto entregado a hooks y predicados.
//!
//! Es el único canal por el que un hook puede leer o mutar el estado de
//! orquestación. Cada contexto queda ligado a la ejecución (`run_id`) que lo
//! creó: si el workflow se cancela o reinicia, las acciones de un contexto
//! antiguo pasan a ser no-ops. Un hook con trabajo en segundo plano puede
//! clonar el contexto y consultar `is_active()` antes de actuar.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use crate::engine::WorkflowEngine;
use crate::errors::EngineError;
use crate::model::DataMap;
use crate::repo::WorkflowDefinition;
use crate::step::Step;

#[derive(Clone)]
pub struct FlowCtx {
    engine: WorkflowEngine,
    definition: Arc<WorkflowDefinition>,
    step_id: Option<String>,
    run_id: Uuid,
}

impl FlowCtx {
    pub(crate) fn new(engine: WorkflowEngine,
                      definition: Arc<WorkflowDefinition>,
                      step_id: Option<String>,
                      run_id: Uuid)
                      -> Self {
        Self { engine,
               definition,
               step_id,
               run_id }
    }

    pub fn definition(&self) -> &WorkflowDefinition {
        &self.definition
    }

    pub fn workflow_id(&self) -> &str {
        &self.definition.id
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Step para el que se construyó el contexto (`None` en hooks de
    /// workflow).
    pub fn step(&self) -> Option<&Step> {
        self.step_id.as_deref().and_then(|id| self.definition.step(id))
    }

    pub fn step_id(&self) -> Option<&str> {
        self.step_id.as_deref()
    }

    /// `true` mientras la ejecución de este contexto siga activa.
    pub fn is_active(&self) -> bool {
        self.engine.is_run_active(self.run_id)
    }

    /// Lee un dato de la ejecución. `None` si la clave no existe o la
    /// ejecución ya terminó.
    pub fn data(&self, key: &str) -> Option<Value> {
        self.engine.read_run(self.run_id, |s| s.data().get(key).cloned()).flatten()
    }

    pub fn data_snapshot(&self) -> DataMap {
        self.engine.read_run(self.run_id, |s| s.data().clone()).unwrap_or_default()
    }

    /// Escribe un dato pasando por el dispatcher. Devuelve `false` si la
    /// ejecución ya no está activa.
    pub fn set_data(&self, key: impl Into<String>, value: impl Into<Value>) -> bool {
        self.engine.set_data_in(self.run_id, key.into(), value.into())
    }

    pub fn complete_step(&self, step_id: &str, data: DataMap) -> Result<bool, EngineError> {
        self.engine.complete_step_in(Some(self.run_id), step_id, data)
    }

    /// Completa el step propio del contexto.
    pub fn complete(&self, data: DataMap) -> Result<bool, EngineError> {
        match self.step_id.as_deref() {
            Some(step_id) => self.complete_step(step_id, data),
            None => Ok(false),
        }
    }

    pub fn skip_to_step(&self, step_id: &str) -> Result<bool, EngineError> {
        self.engine.skip_to_step_in(Some(self.run_id), step_id)
    }

    pub fn cancel_workflow(&self) -> Result<bool, EngineError> {
        self.engine.cancel_in(Some(self.run_id), None)
    }

    /// Reinicia el workflow si esta ejecución sigue activa; devuelve el
    /// nuevo `run_id`.
    pub fn restart_workflow(&self) -> Result<Option<Uuid>, EngineError> {
        self.engine.restart_in(Some(self.run_id))
    }
}

impl fmt::Debug for FlowCtx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlowCtx")
         .field("workflow_id", &self.definition.id)
         .field("step_id", &self.step_id)
         .field("run_id", &self.run_id)
         .finish()
    }
}
