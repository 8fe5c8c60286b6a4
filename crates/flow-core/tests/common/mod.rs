#![allow(dead_code)]

use std::sync::Arc;

use flow_core::{InMemoryEventLog, NavParams, Navigator, WorkflowDefinition, WorkflowEngine, WorkflowEventKind,
                WorkflowRegistry};
use parking_lot::Mutex;

/// Navegador que registra cada llamada `(screen, params)`.
#[derive(Debug, Default)]
pub struct NavRecorder {
    calls: Mutex<Vec<(String, NavParams)>>,
}

impl NavRecorder {
    pub fn screens(&self) -> Vec<String> {
        self.calls.lock().iter().map(|(s, _)| s.clone()).collect()
    }

    pub fn last_params(&self) -> Option<NavParams> {
        self.calls.lock().last().map(|(_, p)| p.clone())
    }

    pub fn count(&self) -> usize {
        self.calls.lock().len()
    }
}

impl Navigator for NavRecorder {
    fn navigate(&self, screen: &str, params: &NavParams) {
        self.calls.lock().push((screen.to_string(), params.clone()));
    }
}

pub struct Harness {
    pub registry: Arc<WorkflowRegistry>,
    pub engine: WorkflowEngine,
    pub nav: Arc<NavRecorder>,
    pub log: Arc<InMemoryEventLog>,
}

pub fn harness(definitions: Vec<WorkflowDefinition>) -> Harness {
    let registry = Arc::new(WorkflowRegistry::new());
    for definition in definitions {
        registry.register(definition).expect("valid definition");
    }
    let nav = Arc::new(NavRecorder::default());
    let log = InMemoryEventLog::new();
    let engine = WorkflowEngine::builder(Arc::clone(&registry)).shared_navigator(nav.clone())
                                                               .shared_listener(log.clone())
                                                               .build();
    Harness { registry,
              engine,
              nav,
              log }
}

/// Steps con `STEP_STARTED`, en orden.
pub fn started_steps(log: &InMemoryEventLog) -> Vec<String> {
    log.step_trace()
       .into_iter()
       .filter(|(k, _)| *k == WorkflowEventKind::StepStarted)
       .map(|(_, s)| s)
       .collect()
}
