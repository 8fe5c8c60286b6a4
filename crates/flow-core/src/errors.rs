//! Errores del core: validación de definiciones, ejecución del engine y
//! fallos de hooks.

use std::fmt;

use thiserror::Error;

/// Violación individual detectada al validar una `WorkflowDefinition`.
///
/// El registro acumula todas las violaciones de una definición antes de
/// rechazarla; nunca se corta en la primera.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum DefinitionViolation {
    #[error("workflow id is empty")]
    EmptyId,
    #[error("workflow name is empty")]
    EmptyName,
    #[error("workflow declares no steps")]
    NoSteps,
    #[error("step at position {0} has an empty id")]
    EmptyStepId(usize),
    #[error("duplicate step id '{0}'")]
    DuplicateStepId(String),
    #[error("step '{step}' depends on unknown step '{dependency}'")]
    DanglingDependency { step: String, dependency: String },
    #[error("dependency cycle: {}", .0.join(" -> "))]
    DependencyCycle(Vec<String>),
    #[error("headless step '{0}' has neither an activation hook nor a completion condition")]
    HeadlessWithoutAction(String),
    #[error("interactive step '{0}' has no screen reference")]
    InteractiveWithoutScreen(String),
    #[error("headless step '{0}' declares a screen reference")]
    ConflictingKind(String),
}

/// Definición rechazada por el registro, con la lista completa de
/// violaciones encontradas.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
#[error("invalid workflow definition '{workflow_id}': {}", render_violations(.violations))]
pub struct DefinitionError {
    pub workflow_id: String,
    pub violations: Vec<DefinitionViolation>,
}

impl DefinitionError {
    /// `true` si alguna violación coincide con el predicado.
    pub fn has(&self, pred: impl Fn(&DefinitionViolation) -> bool) -> bool {
        self.violations.iter().any(pred)
    }
}

fn render_violations(violations: &[DefinitionViolation]) -> String {
    violations.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

/// Error devuelto por un hook de usuario (`on_start`, `on_activate`, ...).
#[derive(Debug, Error, PartialEq, Eq, Clone)]
#[error("{message}")]
pub struct HookError {
    message: String,
}

impl HookError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<&str> for HookError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for HookError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

/// Permite usar `?` sobre las acciones del contexto dentro de un hook.
impl From<EngineError> for HookError {
    fn from(err: EngineError) -> Self {
        Self::new(err.to_string())
    }
}

/// Punto del ciclo de vida en el que se invocó un hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPhase {
    WorkflowStart,
    WorkflowComplete,
    WorkflowCancel,
    StepActivate,
    StepComplete,
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            HookPhase::WorkflowStart => "onStart",
            HookPhase::WorkflowComplete => "onComplete",
            HookPhase::WorkflowCancel => "onCancel",
            HookPhase::StepActivate => "step onActivate",
            HookPhase::StepComplete => "step onComplete",
        };
        f.write_str(label)
    }
}

/// Errores de ejecución del `WorkflowEngine`.
///
/// Las señales obsoletas (`complete_step`/`skip_to_step` sobre un step que
/// no es el actual) no son errores: el engine las absorbe como no-ops.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum EngineError {
    #[error("workflow '{0}' is not registered")]
    NotFound(String),
    #[error("workflow '{active}' is already active (requested '{requested}')")]
    Conflict { active: String, requested: String },
    #[error("no active workflow")]
    NoActiveWorkflow,
    #[error("workflow '{0}' is not pausable")]
    NotPausable(String),
    #[error("workflow '{0}' is not skippable")]
    NotSkippable(String),
    #[error("{phase} hook failed in workflow '{workflow_id}'{}: {source}", step_suffix(.step_id))]
    Hook {
        workflow_id: String,
        step_id: Option<String>,
        phase: HookPhase,
        source: HookError,
    },
}

fn step_suffix(step_id: &Option<String>) -> String {
    step_id.as_ref().map(|s| format!(" (step '{s}')")).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn definition_error_lists_every_violation() {
        let err = DefinitionError { workflow_id: "w".into(),
                                    violations: vec![DefinitionViolation::EmptyName,
                                                     DefinitionViolation::DuplicateStepId("a".into())] };
        let text = err.to_string();
        assert!(text.contains("workflow name is empty"));
        assert!(text.contains("duplicate step id 'a'"));
    }

    #[test]
    fn hook_error_display_includes_phase_and_step() {
        let err = EngineError::Hook { workflow_id: "w".into(),
                                      step_id: Some("pin".into()),
                                      phase: HookPhase::StepComplete,
                                      source: HookError::from("boom") };
        assert_eq!(err.to_string(), "step onComplete hook failed in workflow 'w' (step 'pin'): boom");
    }

    #[test]
    fn cycle_violation_renders_path() {
        let v = DefinitionViolation::DependencyCycle(vec!["a".into(), "b".into(), "a".into()]);
        assert_eq!(v.to_string(), "dependency cycle: a -> b -> a");
    }
}
