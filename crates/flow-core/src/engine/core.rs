//! Core WorkflowEngine implementation
//!
//! Toda llamada pública pasa por un único punto de transición serializado
//! (`gate`). El gate es reentrante: un hook síncrono puede volver a llamar
//! al engine (por ejemplo `ctx.complete()` dentro de `on_activate`) desde el
//! mismo hilo, mientras que otro hilo (una tarea en segundo plano) espera a
//! que termine la transición en curso.
//!
//! El estado vive en un segundo mutex que sólo se toma para leer o aplicar
//! una acción del dispatcher; nunca se mantiene mientras corre código de
//! usuario (hooks, predicados, navegación o listeners).

use std::mem;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::{Mutex, ReentrantMutex};
use serde_json::json;
use uuid::Uuid;

use crate::constants::SKIP_REASON_KEY;
use crate::dispatcher::{reduce, Action};
use crate::engine::eligibility::{self, Scan};
use crate::engine::{EngineBuilder, EngineConfig, FlowCtx};
use crate::errors::{EngineError, HookPhase};
use crate::event::{EventBus, WorkflowEvent, WorkflowEventKind};
use crate::model::{data_to_value, DataMap, Outcome, Progress, WorkflowState};
use crate::navigation::{resolve_params, NavParams, Navigator};
use crate::repo::{WorkflowDefinition, WorkflowRegistry};
use crate::step::Hook;

struct Shared {
    registry: Arc<WorkflowRegistry>,
    navigator: Arc<dyn Navigator>,
    events: Arc<EventBus>,
    config: EngineConfig,
    gate: ReentrantMutex<()>,
    state: Mutex<WorkflowState>,
}

/// Resultado de evaluar el predicado de completitud antes de activar.
enum Precheck {
    /// El step sigue pendiente: hay que activarlo.
    Pending,
    /// Predicado satisfecho: el step quedó pre-completado.
    Skipped,
    /// El predicado movió el engine a otro step o ejecución.
    Superseded,
}

/// Motor de orquestación de workflows.
///
/// Es un handle barato de clonar: todos los clones comparten estado,
/// registro, navegador y bus de eventos. Un único workflow ocupa
/// `Running`/`Paused` a la vez.
#[derive(Clone)]
pub struct WorkflowEngine {
    shared: Arc<Shared>,
}

impl WorkflowEngine {
    /// Crea un builder para configurar el engine.
    #[inline]
    pub fn builder(registry: Arc<WorkflowRegistry>) -> EngineBuilder {
        EngineBuilder::new(registry)
    }

    /// Engine con navegador nulo, bus propio y configuración por defecto.
    pub fn new(registry: Arc<WorkflowRegistry>) -> Self {
        Self::builder(registry).build()
    }

    pub(crate) fn from_parts(registry: Arc<WorkflowRegistry>,
                             navigator: Arc<dyn Navigator>,
                             events: Arc<EventBus>,
                             config: EngineConfig)
                             -> Self {
        Self { shared: Arc::new(Shared { registry,
                                         navigator,
                                         events,
                                         config,
                                         gate: ReentrantMutex::new(()),
                                         state: Mutex::new(WorkflowState::default()) }) }
    }

    pub fn registry(&self) -> &Arc<WorkflowRegistry> {
        &self.shared.registry
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.shared.events
    }

    pub fn config(&self) -> &EngineConfig {
        &self.shared.config
    }

    // ----------------------------------------------------------------------
    // Lectura
    // ----------------------------------------------------------------------

    /// Copia del estado actual; mutarla no afecta al engine.
    pub fn get_state(&self) -> WorkflowState {
        self.shared.state.lock().clone()
    }

    pub fn is_active(&self) -> bool {
        self.shared.state.lock().is_active()
    }

    pub fn active_workflow_id(&self) -> Option<String> {
        let state = self.shared.state.lock();
        state.is_active().then(|| state.workflow_id().map(str::to_string)).flatten()
    }

    /// Progreso de `definition` según el estado actual.
    pub fn progress(&self, definition: &WorkflowDefinition) -> Progress {
        Progress::compute(definition, &self.shared.state.lock())
    }

    /// Progreso del workflow activo, si lo hay.
    pub fn active_progress(&self) -> Option<Progress> {
        let state = self.shared.state.lock();
        let definition = state.definition()?;
        state.is_active().then(|| Progress::compute(definition, &state))
    }

    pub(crate) fn is_run_active(&self, run_id: Uuid) -> bool {
        self.shared.state.lock().is_run_active(run_id)
    }

    /// Aplica `f` al estado si pertenece a `run_id`, incluso mientras corren
    /// los hooks de cierre de esa ejecución.
    pub(crate) fn read_run<T>(&self, run_id: Uuid, f: impl FnOnce(&WorkflowState) -> T) -> Option<T> {
        let state = self.shared.state.lock();
        (state.definition().is_some() && state.run_id() == Some(run_id)).then(|| f(&state))
    }

    // ----------------------------------------------------------------------
    // Ciclo de vida
    // ----------------------------------------------------------------------

    /// Arranca `workflow_id` con `initial_data` y activa el primer step
    /// elegible. Devuelve el id de la nueva ejecución.
    pub fn start(&self, workflow_id: &str, initial_data: DataMap) -> Result<Uuid, EngineError> {
        let _gate = self.shared.gate.lock();
        let definition = self.shared
                             .registry
                             .get(workflow_id)
                             .ok_or_else(|| EngineError::NotFound(workflow_id.to_string()))?;
        if let Some(active) = self.active_workflow_id() {
            return Err(EngineError::Conflict { active,
                                               requested: workflow_id.to_string() });
        }

        let run_id = Uuid::new_v4();
        self.dispatch(Action::Start { definition: Arc::clone(&definition),
                                      run_id,
                                      data: initial_data });
        log::info!("workflow '{}' started (run {})", definition.id, run_id);
        self.emit(WorkflowEvent::new(WorkflowEventKind::WorkflowStarted, &definition.id, run_id));

        let ctx = self.ctx(&definition, None, run_id);
        self.run_hook(definition.on_start.as_ref(), &ctx, HookPhase::WorkflowStart)?;
        self.advance(run_id, false)?;
        // Un on_start que reinicia deja otra ejecución viva: se devuelve esa.
        Ok(self.with_state(|s| s.run_id().filter(|_| s.is_active())).unwrap_or(run_id))
    }

    /// Completa el step actual. Una señal obsoleta (step que no es el actual
    /// o ningún workflow activo) es un no-op que devuelve `Ok(false)`.
    pub fn complete_step(&self, step_id: &str, data: DataMap) -> Result<bool, EngineError> {
        self.complete_step_in(None, step_id, data)
    }

    pub(crate) fn complete_step_in(&self,
                                   guard: Option<Uuid>,
                                   step_id: &str,
                                   data: DataMap)
                                   -> Result<bool, EngineError> {
        let _gate = self.shared.gate.lock();
        let target = self.with_state(|s| {
                             if s.current_step_id() != Some(step_id) {
                                 return None;
                             }
                             active_target(s, guard)
                         });
        let Some((definition, run_id)) = target else {
            log::warn!("ignoring stale completion of step '{}'", step_id);
            return Ok(false);
        };

        let payload = (!data.is_empty()).then(|| data.clone());
        self.dispatch_in(run_id, Action::MergeData(data));
        self.dispatch_in(run_id,
                         Action::CompleteStep { step_id: step_id.to_string(),
                                                completed_at: Utc::now(),
                                                payload: payload.clone() });
        log::debug!("step '{}' completed in workflow '{}'", step_id, definition.id);
        let mut event = WorkflowEvent::new(WorkflowEventKind::StepCompleted, &definition.id, run_id).with_step(step_id);
        if let Some(payload) = &payload {
            event = event.with_data(data_to_value(payload));
        }
        self.emit(event);

        if let Some(step) = definition.step(step_id) {
            let ctx = self.ctx(&definition, Some(step_id), run_id);
            self.run_hook(step.on_complete.as_ref(), &ctx, HookPhase::StepComplete)?;
        }

        if self.is_current(run_id, step_id) {
            self.advance(run_id, true)?;
        }
        Ok(true)
    }

    /// Salta a `step_id` ignorando dependencias. No marca como completados
    /// los steps saltados.
    pub fn skip_to_step(&self, step_id: &str) -> Result<bool, EngineError> {
        self.skip_to_step_in(None, step_id)
    }

    pub(crate) fn skip_to_step_in(&self, guard: Option<Uuid>, step_id: &str) -> Result<bool, EngineError> {
        let _gate = self.shared.gate.lock();
        let target = self.with_state(|s| {
                             let (definition, run_id) = active_target(s, guard)?;
                             let skippable = definition.step(step_id).is_some()
                                             && !s.is_step_completed(step_id)
                                             && s.current_step_id() != Some(step_id);
                             let previous = s.current_step_id()
                                             .filter(|id| !s.is_step_completed(id))
                                             .map(str::to_string);
                             skippable.then_some((definition, run_id, previous, s.is_paused()))
                         });
        let Some((definition, run_id, previous, paused)) = target else {
            log::debug!("skip to step '{}' ignored", step_id);
            return Ok(false);
        };

        if let Some(previous) = previous {
            self.emit(WorkflowEvent::new(WorkflowEventKind::StepSkipped, &definition.id, run_id)
                .with_step(previous)
                .with_data(json!({ SKIP_REASON_KEY: "skip_to", "target": step_id })));
        }
        self.dispatch_in(run_id, Action::SetCurrentStep(Some(step_id.to_string())));
        log::info!("workflow '{}' jumped to step '{}'", definition.id, step_id);
        if paused {
            self.dispatch_in(run_id, Action::DeferActivation(true));
            return Ok(true);
        }
        self.dispatch_in(run_id, Action::DeferActivation(false));
        self.activate(&definition, run_id, step_id)?;
        Ok(true)
    }

    /// Pausa el workflow activo. `Ok(false)` si no hay nada que pausar.
    pub fn pause(&self) -> Result<bool, EngineError> {
        let _gate = self.shared.gate.lock();
        let target = self.with_state(|s| active_target(s, None).map(|t| (t, s.is_paused())));
        let Some(((definition, run_id), paused)) = target else {
            return Ok(false);
        };
        if !definition.pausable {
            return Err(EngineError::NotPausable(definition.id.clone()));
        }
        if paused {
            return Ok(false);
        }
        self.dispatch_in(run_id, Action::Pause);
        log::info!("workflow '{}' paused", definition.id);
        self.emit(WorkflowEvent::new(WorkflowEventKind::WorkflowPaused, &definition.id, run_id));
        Ok(true)
    }

    /// Reanuda el workflow y ejecuta, una sola vez, la activación diferida
    /// durante la pausa.
    pub fn resume(&self) -> Result<bool, EngineError> {
        let _gate = self.shared.gate.lock();
        let target = self.with_state(|s| {
                             active_target(s, None).filter(|_| s.is_paused())
                                                   .map(|t| (t, s.is_activation_deferred()))
                         });
        let Some(((definition, run_id), deferred)) = target else {
            return Ok(false);
        };
        self.dispatch_in(run_id, Action::Resume);
        log::info!("workflow '{}' resumed", definition.id);
        self.emit(WorkflowEvent::new(WorkflowEventKind::WorkflowResumed, &definition.id, run_id));
        if deferred {
            self.dispatch_in(run_id, Action::DeferActivation(false));
            self.enter_current(&definition, run_id)?;
        }
        Ok(true)
    }

    /// Cancela el workflow activo: hook `on_cancel`, `WORKFLOW_CANCELLED` y
    /// vuelta a `Idle`.
    pub fn cancel(&self) -> Result<bool, EngineError> {
        self.cancel_in(None, None)
    }

    /// Alias de `cancel`.
    pub fn stop(&self) -> Result<bool, EngineError> {
        self.cancel()
    }

    /// Descarta un workflow `skippable`.
    pub fn skip_workflow(&self) -> Result<bool, EngineError> {
        let _gate = self.shared.gate.lock();
        let Some((definition, _)) = self.with_state(|s| active_target(s, None)) else {
            return Ok(false);
        };
        if !definition.skippable {
            return Err(EngineError::NotSkippable(definition.id.clone()));
        }
        self.cancel_in(None, Some("skipped"))
    }

    pub(crate) fn cancel_in(&self, guard: Option<Uuid>, reason: Option<&str>) -> Result<bool, EngineError> {
        let _gate = self.shared.gate.lock();
        let Some((definition, run_id)) = self.with_state(|s| active_target(s, guard)) else {
            return Ok(false);
        };
        self.dispatch_in(run_id, Action::Conclude(Outcome::Cancelled));
        log::info!("workflow '{}' cancelled (run {})", definition.id, run_id);

        let ctx = self.ctx(&definition, None, run_id);
        let result = self.run_hook(definition.on_cancel.as_ref(), &ctx, HookPhase::WorkflowCancel);
        let mut event = WorkflowEvent::new(WorkflowEventKind::WorkflowCancelled, &definition.id, run_id);
        if let Some(reason) = reason {
            event = event.with_data(json!({ SKIP_REASON_KEY: reason }));
        }
        self.emit(event);
        self.fold_to_idle(run_id);
        result.map(|_| true)
    }

    /// Cancela y vuelve a arrancar el mismo workflow con datos vacíos.
    pub fn restart(&self) -> Result<Uuid, EngineError> {
        self.restart_in(None)?.ok_or(EngineError::NoActiveWorkflow)
    }

    pub(crate) fn restart_in(&self, guard: Option<Uuid>) -> Result<Option<Uuid>, EngineError> {
        let _gate = self.shared.gate.lock();
        let Some((definition, _)) = self.with_state(|s| active_target(s, guard)) else {
            return Ok(None);
        };
        // Un on_cancel fallido no impide el arranque; el error se reporta después.
        let cancelled = self.cancel_in(guard, Some("restart"));
        let run_id = self.start(&definition.id, DataMap::new())?;
        cancelled?;
        Ok(Some(run_id))
    }

    /// Sustituye el estado (rehidratación). Falla si hay un workflow activo.
    /// No activa nada: llamar a `reactivate` para volver a la pantalla.
    pub fn restore(&self, state: WorkflowState) -> Result<(), EngineError> {
        let _gate = self.shared.gate.lock();
        if let Some(active) = self.active_workflow_id() {
            return Err(EngineError::Conflict { active,
                                               requested: state.workflow_id().unwrap_or_default().to_string() });
        }
        match state.workflow_id() {
            Some(id) => log::info!("restoring workflow '{}' ({} steps completed)", id, state.completed_step_ids().len()),
            None => log::debug!("restoring idle state"),
        }
        let action = if state.definition().is_some() { Action::Restore(state) } else { Action::Reset };
        self.dispatch(action);
        Ok(())
    }

    /// Vuelve a ejecutar la activación del step actual (o una pasada de
    /// elegibilidad si no hay ninguno). En pausa, la activación se difiere.
    pub fn reactivate(&self) -> Result<bool, EngineError> {
        let _gate = self.shared.gate.lock();
        let target = self.with_state(|s| active_target(s, None).map(|t| (t, s.is_paused())));
        let Some(((definition, run_id), paused)) = target else {
            return Ok(false);
        };
        if paused {
            self.dispatch_in(run_id, Action::DeferActivation(true));
            return Ok(true);
        }
        self.enter_current(&definition, run_id)?;
        Ok(true)
    }

    /// Escribe un dato en la ejecución activa.
    pub fn set_data(&self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> bool {
        let _gate = self.shared.gate.lock();
        match self.with_state(|s| s.is_active().then(|| s.run_id()).flatten()) {
            Some(run_id) => self.set_data_in(run_id, key.into(), value.into()),
            None => false,
        }
    }

    pub(crate) fn set_data_in(&self, run_id: Uuid, key: String, value: serde_json::Value) -> bool {
        let _gate = self.shared.gate.lock();
        self.dispatch_in(run_id, Action::SetData { key, value })
    }

    // ----------------------------------------------------------------------
    // Transiciones internas
    // ----------------------------------------------------------------------

    /// Pasada de elegibilidad: activa el siguiente step, pre-completa los
    /// condicionales satisfechos, concluye o deja el workflow bloqueado.
    fn advance(&self, run_id: Uuid, mut check_completion: bool) -> Result<(), EngineError> {
        loop {
            let scanned = self.with_state(|s| {
                                  if !s.is_run_active(run_id) {
                                      return None;
                                  }
                                  let definition = Arc::clone(s.definition()?);
                                  let scan = eligibility::scan(&definition, s.step_completion(), check_completion);
                                  Some((definition, scan))
                              });
            let Some((definition, scan)) = scanned else {
                return Ok(());
            };

            match scan {
                Scan::Finished => return self.conclude_completed(&definition, run_id),
                Scan::Stalled => {
                    self.dispatch_in(run_id, Action::SetCurrentStep(None));
                    if self.shared.config.warn_on_stall {
                        log::warn!("workflow '{}' stalled: no eligible step and required steps pending",
                                   definition.id);
                    } else {
                        log::debug!("workflow '{}' stalled", definition.id);
                    }
                    return Ok(());
                }
                Scan::Step(step_id) => {
                    self.dispatch_in(run_id, Action::SetCurrentStep(Some(step_id.clone())));
                    if self.with_state(WorkflowState::is_paused) {
                        self.dispatch_in(run_id, Action::DeferActivation(true));
                        log::debug!("activation of '{}' deferred while paused", step_id);
                        return Ok(());
                    }
                    match self.precheck(&definition, run_id, &step_id) {
                        Precheck::Pending => return self.activate(&definition, run_id, &step_id),
                        Precheck::Skipped => check_completion = true,
                        Precheck::Superseded => return Ok(()),
                    }
                }
            }
        }
    }

    fn precheck(&self, definition: &Arc<WorkflowDefinition>, run_id: Uuid, step_id: &str) -> Precheck {
        let condition = definition.step(step_id).and_then(|s| s.completion_condition.clone());
        let Some(condition) = condition else {
            return Precheck::Pending;
        };
        let met = condition(&self.ctx(definition, Some(step_id), run_id));
        if !self.is_current(run_id, step_id) {
            return Precheck::Superseded;
        }
        if !met {
            return Precheck::Pending;
        }
        self.dispatch_in(run_id,
                         Action::CompleteStep { step_id: step_id.to_string(),
                                                completed_at: Utc::now(),
                                                payload: None });
        self.dispatch_in(run_id, Action::SetCurrentStep(None));
        log::debug!("step '{}' pre-completed by its condition", step_id);
        self.emit(WorkflowEvent::new(WorkflowEventKind::StepSkipped, &definition.id, run_id)
            .with_step(step_id)
            .with_data(json!({ SKIP_REASON_KEY: "condition_met" })));
        Precheck::Skipped
    }

    /// Protocolo de activación: `STEP_STARTED`, hook `on_activate` y, según
    /// el tipo de step, predicado headless o navegación.
    fn activate(&self, definition: &Arc<WorkflowDefinition>, run_id: Uuid, step_id: &str) -> Result<(), EngineError> {
        let Some(step) = definition.step(step_id) else {
            return Ok(());
        };
        self.emit(WorkflowEvent::new(WorkflowEventKind::StepStarted, &definition.id, run_id).with_step(step_id));
        let ctx = self.ctx(definition, Some(step_id), run_id);
        self.run_hook(step.on_activate.as_ref(), &ctx, HookPhase::StepActivate)?;

        let pending = self.with_state(|s| {
                              s.is_run_active(run_id)
                              && s.current_step_id() == Some(step_id)
                              && !s.is_step_completed(step_id)
                          });
        if !pending {
            return Ok(());
        }

        if step.headless {
            if let Some(condition) = &step.completion_condition {
                if condition(&ctx) {
                    self.complete_step_in(Some(run_id), step_id, DataMap::new())?;
                }
            }
            return Ok(());
        }

        if let Some(screen) = &step.screen {
            let params = match &step.nav_params {
                Some(template) => {
                    let data = self.with_state(|s| s.data().clone());
                    resolve_params(template, &data)
                }
                None => NavParams::new(),
            };
            log::debug!("navigating to '{}' for step '{}'", screen, step_id);
            self.shared.navigator.navigate(screen, &params);
        }
        Ok(())
    }

    /// Entra en el step actual (tras `resume` o `reactivate`).
    fn enter_current(&self, definition: &Arc<WorkflowDefinition>, run_id: Uuid) -> Result<(), EngineError> {
        let current = self.with_state(|s| s.current_step_id().map(str::to_string));
        match current {
            Some(step_id) => match self.precheck(definition, run_id, &step_id) {
                Precheck::Pending => self.activate(definition, run_id, &step_id),
                Precheck::Skipped => self.advance(run_id, true),
                Precheck::Superseded => Ok(()),
            },
            None => self.advance(run_id, true),
        }
    }

    fn conclude_completed(&self, definition: &Arc<WorkflowDefinition>, run_id: Uuid) -> Result<(), EngineError> {
        if !self.dispatch_in(run_id, Action::Conclude(Outcome::Completed)) {
            return Ok(());
        }
        log::info!("workflow '{}' completed (run {})", definition.id, run_id);
        self.emit(WorkflowEvent::new(WorkflowEventKind::WorkflowCompleted, &definition.id, run_id));
        let ctx = self.ctx(definition, None, run_id);
        let result = self.run_hook(definition.on_complete.as_ref(), &ctx, HookPhase::WorkflowComplete);
        self.fold_to_idle(run_id);
        result
    }

    /// `Completed`/`Cancelled` vuelven a `Idle`, salvo que un hook de cierre
    /// ya haya arrancado otra ejecución.
    fn fold_to_idle(&self, run_id: Uuid) {
        let mut state = self.shared.state.lock();
        if state.run_id() == Some(run_id) && !state.is_active() {
            let concluded = mem::take(&mut *state);
            *state = reduce(concluded, Action::Reset);
        }
    }

    // ----------------------------------------------------------------------
    // Utilidades
    // ----------------------------------------------------------------------

    fn with_state<T>(&self, f: impl FnOnce(&WorkflowState) -> T) -> T {
        f(&self.shared.state.lock())
    }

    fn is_current(&self, run_id: Uuid, step_id: &str) -> bool {
        self.with_state(|s| s.is_run_active(run_id) && s.current_step_id() == Some(step_id))
    }

    fn dispatch(&self, action: Action) {
        let mut state = self.shared.state.lock();
        let current = mem::take(&mut *state);
        *state = reduce(current, action);
    }

    /// Aplica `action` sólo si `run_id` sigue activa.
    fn dispatch_in(&self, run_id: Uuid, action: Action) -> bool {
        let mut state = self.shared.state.lock();
        if !state.is_run_active(run_id) {
            log::debug!("dropping {} for inactive run {}", action.label(), run_id);
            return false;
        }
        let current = mem::take(&mut *state);
        *state = reduce(current, action);
        true
    }

    fn emit(&self, event: WorkflowEvent) {
        self.shared.events.emit(&event);
    }

    fn ctx(&self, definition: &Arc<WorkflowDefinition>, step_id: Option<&str>, run_id: Uuid) -> FlowCtx {
        FlowCtx::new(self.clone(), Arc::clone(definition), step_id.map(str::to_string), run_id)
    }

    fn run_hook(&self, hook: Option<&Hook>, ctx: &FlowCtx, phase: HookPhase) -> Result<(), EngineError> {
        let Some(hook) = hook else {
            return Ok(());
        };
        hook(ctx).map_err(|source| {
                     log::warn!("{} hook failed in workflow '{}': {}", phase, ctx.workflow_id(), source);
                     EngineError::Hook { workflow_id: ctx.workflow_id().to_string(),
                                         step_id: ctx.step_id().map(str::to_string),
                                         phase,
                                         source }
                 })
    }
}

/// Definición y run de la ejecución activa, si `guard` (cuando se indica)
/// coincide con ella.
fn active_target(state: &WorkflowState, guard: Option<Uuid>) -> Option<(Arc<WorkflowDefinition>, Uuid)> {
    if !state.is_active() {
        return None;
    }
    let run_id = state.run_id()?;
    if guard.is_some_and(|g| g != run_id) {
        return None;
    }
    Some((Arc::clone(state.definition()?), run_id))
}

impl std::fmt::Debug for WorkflowEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("WorkflowEngine")
         .field("workflow_id", &state.workflow_id())
         .field("status", &state.status())
         .field("current_step_id", &state.current_step_id())
         .field("listeners", &self.shared.events.listener_count())
         .finish()
    }
}
