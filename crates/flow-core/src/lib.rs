//! flow-core: orquestación de workflows de onboarding basada en steps.
//!
//! Un `WorkflowRegistry` guarda definiciones validadas; el `WorkflowEngine`
//! ejecuta una instancia a la vez, aplicando cada transición a través del
//! dispatcher y notificando por el `EventBus`.
pub mod constants;
pub mod dispatcher;
pub mod engine;
pub mod errors;
pub mod event;
pub mod hashing;
pub mod model;
pub mod navigation;
pub mod repo;
pub mod step;

pub use engine::{EngineBuilder, EngineConfig, FlowCtx, WorkflowEngine};
pub use errors::{DefinitionError, DefinitionViolation, EngineError, HookError, HookPhase};
pub use event::{EventBus, EventListener, InMemoryEventLog, ListenerId, WorkflowEvent, WorkflowEventKind};
pub use model::{data_map, DataMap, HistoryEntry, Progress, Rehydration, WorkflowState, WorkflowStatus};
pub use navigation::{NavParams, Navigator, NoopNavigator};
pub use repo::{WorkflowBuilder, WorkflowDefinition, WorkflowRegistry};
pub use step::{CompletionCondition, Hook, Step};
