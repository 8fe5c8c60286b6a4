use std::fmt;
use std::sync::Arc;

use indexmap::IndexSet;
use serde_json::Value;

use crate::engine::FlowCtx;
use crate::errors::HookError;
use crate::model::DataMap;

/// Hook de ciclo de vida. Recibe únicamente el contexto construido por el
/// engine; el trabajo largo debe lanzarse en segundo plano y terminar con
/// `ctx.complete_step(..)`.
pub type Hook = Arc<dyn Fn(&FlowCtx) -> Result<(), HookError> + Send + Sync>;

/// Predicado de completitud evaluado contra el contexto.
pub type CompletionCondition = Arc<dyn Fn(&FlowCtx) -> bool + Send + Sync>;

/// Unidad de trabajo dentro de un workflow.
///
/// Un step es interactivo (lleva `screen`) o headless (`headless = true`,
/// lleva `on_activate` o `completion_condition`). El registro rechaza
/// cualquier otra combinación.
#[derive(Clone)]
pub struct Step {
    /// Identificador único dentro del workflow.
    pub id: String,
    /// Referencia de pantalla para la navegación externa.
    pub screen: Option<String>,
    pub required: bool,
    pub headless: bool,
    /// Ids de steps que deben estar completados antes de ser elegible.
    pub dependencies: IndexSet<String>,
    pub completion_condition: Option<CompletionCondition>,
    pub on_activate: Option<Hook>,
    pub on_complete: Option<Hook>,
    /// Plantilla de parámetros de navegación (`{{clave}}` se resuelve contra
    /// el mapa de datos).
    pub nav_params: Option<DataMap>,
    pub metadata: DataMap,
}

impl Step {
    fn base(id: impl Into<String>) -> Self {
        Self { id: id.into(),
               screen: None,
               required: true,
               headless: false,
               dependencies: IndexSet::new(),
               completion_condition: None,
               on_activate: None,
               on_complete: None,
               nav_params: None,
               metadata: DataMap::new() }
    }

    /// Step interactivo ligado a una pantalla. Requerido por defecto.
    pub fn interactive(id: impl Into<String>, screen: impl Into<String>) -> Self {
        Self { screen: Some(screen.into()),
               ..Self::base(id) }
    }

    /// Step headless (acción en segundo plano). Requerido por defecto.
    pub fn headless(id: impl Into<String>) -> Self {
        Self { headless: true,
               ..Self::base(id) }
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn optional(self) -> Self {
        self.required(false)
    }

    pub fn depends_on<I, S>(mut self, ids: I) -> Self
        where I: IntoIterator<Item = S>,
              S: Into<String>
    {
        self.dependencies.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn after(self, id: impl Into<String>) -> Self {
        self.depends_on([id.into()])
    }

    pub fn completion_condition<F>(mut self, condition: F) -> Self
        where F: Fn(&FlowCtx) -> bool + Send + Sync + 'static
    {
        self.completion_condition = Some(Arc::new(condition));
        self
    }

    /// Step condicional: se da por completado (sin activarse) cuando `guard`
    /// es falso.
    pub fn skip_unless<F>(self, guard: F) -> Self
        where F: Fn(&FlowCtx) -> bool + Send + Sync + 'static
    {
        self.completion_condition(move |ctx| !guard(ctx))
    }

    pub fn on_activate<F>(mut self, hook: F) -> Self
        where F: Fn(&FlowCtx) -> Result<(), HookError> + Send + Sync + 'static
    {
        self.on_activate = Some(Arc::new(hook));
        self
    }

    pub fn on_complete<F>(mut self, hook: F) -> Self
        where F: Fn(&FlowCtx) -> Result<(), HookError> + Send + Sync + 'static
    {
        self.on_complete = Some(Arc::new(hook));
        self
    }

    pub fn nav_params(mut self, template: DataMap) -> Self {
        self.nav_params = Some(template);
        self
    }

    pub fn nav_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.nav_params.get_or_insert_with(DataMap::new).insert(key.into(), value.into());
        self
    }

    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn is_interactive(&self) -> bool {
        !self.headless
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
         .field("id", &self.id)
         .field("screen", &self.screen)
         .field("required", &self.required)
         .field("headless", &self.headless)
         .field("dependencies", &self.dependencies)
         .field("completion_condition", &self.completion_condition.is_some())
         .field("on_activate", &self.on_activate.is_some())
         .field("on_complete", &self.on_complete.is_some())
         .field("nav_params", &self.nav_params)
         .field("metadata", &self.metadata)
         .finish()
    }
}
