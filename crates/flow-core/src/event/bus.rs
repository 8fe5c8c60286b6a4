use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use super::{WorkflowEvent, WorkflowEventKind};

/// Receptor de eventos. Cualquier `Fn(&WorkflowEvent)` sirve.
pub trait EventListener: Send + Sync {
    fn on_event(&self, event: &WorkflowEvent);
}

impl<F> EventListener for F where F: Fn(&WorkflowEvent) + Send + Sync
{
    fn on_event(&self, event: &WorkflowEvent) {
        self(event)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Canal fire-and-forget hacia listeners externos.
///
/// `emit` trabaja sobre una copia de la lista de listeners (un listener puede
/// suscribir/desuscribir durante la emisión) y aísla cada llamada: un panic
/// en un listener se registra y se descarta.
#[derive(Default)]
pub struct EventBus {
    listeners: RwLock<Vec<(ListenerId, Arc<dyn EventListener>)>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<L>(&self, listener: L) -> ListenerId
        where L: EventListener + 'static
    {
        self.subscribe_arc(Arc::new(listener))
    }

    pub fn subscribe_arc(&self, listener: Arc<dyn EventListener>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.write().push((id, listener));
        id
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    pub fn emit(&self, event: &WorkflowEvent) {
        let listeners: Vec<Arc<dyn EventListener>> = self.listeners.read().iter().map(|(_, l)| Arc::clone(l)).collect();
        log::debug!("emit {:?} workflow={} step={:?}", event.kind, event.workflow_id, event.step_id);
        for listener in listeners {
            if catch_unwind(AssertUnwindSafe(|| listener.on_event(event))).is_err() {
                log::warn!("event listener panicked on {:?} for workflow '{}'; ignored",
                           event.kind,
                           event.workflow_id);
            }
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus").field("listeners", &self.listener_count()).finish()
    }
}

/// Listener que guarda en memoria, en orden de emisión, cada evento
/// recibido.
#[derive(Debug, Default)]
pub struct InMemoryEventLog {
    inner: Mutex<Vec<WorkflowEvent>>,
}

impl InMemoryEventLog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<WorkflowEvent> {
        self.inner.lock().clone()
    }

    pub fn kinds(&self) -> Vec<WorkflowEventKind> {
        self.inner.lock().iter().map(|e| e.kind).collect()
    }

    pub fn count(&self, kind: WorkflowEventKind) -> usize {
        self.inner.lock().iter().filter(|e| e.kind == kind).count()
    }

    /// `(kind, step_id)` de cada evento de step, en orden.
    pub fn step_trace(&self) -> Vec<(WorkflowEventKind, String)> {
        self.inner
            .lock()
            .iter()
            .filter_map(|e| e.step_id.clone().map(|s| (e.kind, s)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }
}

impl EventListener for InMemoryEventLog {
    fn on_event(&self, event: &WorkflowEvent) {
        self.inner.lock().push(event.clone());
    }
}
