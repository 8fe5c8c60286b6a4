mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use common::{harness, started_steps};
use flow_core::{data_map, DataMap, EngineError, HookPhase, Rehydration, Step, WorkflowDefinition, WorkflowEventKind,
                WorkflowState, WorkflowStatus};
use serde_json::json;

fn linear() -> WorkflowDefinition {
    WorkflowDefinition::builder("w", "W").step(Step::interactive("A", "ScreenA"))
                                         .step(Step::interactive("B", "ScreenB").after("A"))
                                         .step(Step::interactive("C", "ScreenC").after("B"))
                                         .build()
}

#[test]
fn skip_to_step_activates_target_without_completing_intermediate_steps() {
    let h = harness(vec![linear()]);
    h.engine.start("w", DataMap::new()).unwrap();

    assert!(h.engine.skip_to_step("C").unwrap());
    let state = h.engine.get_state();
    assert_eq!(state.current_step_id(), Some("C"));
    assert!(state.completed_step_ids().is_empty());
    assert!(state.history().is_empty());
    assert_eq!(h.nav.screens(), vec!["ScreenA", "ScreenC"]);

    let skipped = h.log
                   .events()
                   .into_iter()
                   .find(|e| e.kind == WorkflowEventKind::StepSkipped)
                   .unwrap();
    assert_eq!(skipped.step_id.as_deref(), Some("A"));
    assert_eq!(skipped.data, Some(json!({"reason": "skip_to", "target": "C"})));

    // C completado: la pasada vuelve al primer step pendiente.
    h.engine.complete_step("C", DataMap::new()).unwrap();
    assert_eq!(h.engine.get_state().current_step_id(), Some("A"));
}

#[test]
fn skip_to_step_ignores_unknown_completed_and_current_targets() {
    let h = harness(vec![linear()]);
    assert!(!h.engine.skip_to_step("A").unwrap());
    h.engine.start("w", DataMap::new()).unwrap();
    h.engine.complete_step("A", DataMap::new()).unwrap();

    assert!(!h.engine.skip_to_step("ghost").unwrap());
    assert!(!h.engine.skip_to_step("A").unwrap());
    assert!(!h.engine.skip_to_step("B").unwrap());
    assert_eq!(h.engine.get_state().current_step_id(), Some("B"));
    assert_eq!(h.log.count(WorkflowEventKind::StepSkipped), 0);
}

#[test]
fn skip_to_step_while_paused_defers_activation() {
    let def = WorkflowDefinition::builder("w", "W").pausable(true)
                                                   .step(Step::interactive("A", "ScreenA"))
                                                   .step(Step::interactive("B", "ScreenB").after("A"))
                                                   .build();
    let h = harness(vec![def]);
    h.engine.start("w", DataMap::new()).unwrap();
    h.engine.pause().unwrap();
    assert!(h.engine.skip_to_step("B").unwrap());
    assert_eq!(h.nav.screens(), vec!["ScreenA"]);

    h.engine.resume().unwrap();
    assert_eq!(h.nav.screens(), vec!["ScreenA", "ScreenB"]);
}

#[test]
fn stale_signals_are_no_ops() {
    let h = harness(vec![linear()]);
    assert!(!h.engine.complete_step("A", DataMap::new()).unwrap());

    h.engine.start("w", DataMap::new()).unwrap();
    let events_before = h.log.len();
    assert!(!h.engine.complete_step("B", data_map([("late", json!(true))])).unwrap());
    assert!(!h.engine.complete_step("ghost", DataMap::new()).unwrap());

    let state = h.engine.get_state();
    assert_eq!(state.current_step_id(), Some("A"));
    assert!(state.data().get("late").is_none());
    assert_eq!(h.log.len(), events_before);
}

#[test]
fn pause_requires_a_pausable_workflow() {
    let h = harness(vec![linear()]);
    assert!(!h.engine.pause().unwrap());
    h.engine.start("w", DataMap::new()).unwrap();
    assert_eq!(h.engine.pause().unwrap_err(), EngineError::NotPausable("w".into()));
    assert!(!h.engine.resume().unwrap());
    assert_eq!(h.log.count(WorkflowEventKind::WorkflowPaused), 0);
}

#[test]
fn pause_and_resume_emit_events_once() {
    let def = WorkflowDefinition::builder("w", "W").pausable(true).step(Step::interactive("A", "ScreenA")).build();
    let h = harness(vec![def]);
    h.engine.start("w", DataMap::new()).unwrap();
    assert!(h.engine.pause().unwrap());
    assert!(!h.engine.pause().unwrap());
    assert_eq!(h.engine.get_state().status(), WorkflowStatus::Paused);
    assert!(h.engine.resume().unwrap());
    assert_eq!(h.log.count(WorkflowEventKind::WorkflowPaused), 1);
    assert_eq!(h.log.count(WorkflowEventKind::WorkflowResumed), 1);
    // Sin activación diferida, resume no vuelve a navegar.
    assert_eq!(h.nav.count(), 1);
}

#[test]
fn cancel_runs_hook_emits_event_and_returns_to_idle() {
    let cancels = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&cancels);
    let def = WorkflowDefinition::builder("w", "W").step(Step::interactive("A", "ScreenA"))
                                                   .on_cancel(move |ctx| {
                                                       assert!(!ctx.is_active());
                                                       counter.fetch_add(1, Ordering::SeqCst);
                                                       Ok(())
                                                   })
                                                   .build();
    let h = harness(vec![def]);
    h.engine.start("w", data_map([("k", json!("v"))])).unwrap();

    assert!(h.engine.cancel().unwrap());
    assert_eq!(cancels.load(Ordering::SeqCst), 1);
    assert_eq!(h.log.kinds().last(), Some(&WorkflowEventKind::WorkflowCancelled));
    let state = h.engine.get_state();
    assert_eq!(state.status(), WorkflowStatus::Idle);
    assert!(state.data().is_empty());

    assert!(!h.engine.stop().unwrap());
    assert_eq!(cancels.load(Ordering::SeqCst), 1);
}

#[test]
fn skip_workflow_requires_skippable_definition() {
    let skippable = WorkflowDefinition::builder("tour", "Tour").skippable(true)
                                                               .step(Step::interactive("t1", "Tour1"))
                                                               .build();
    let h = harness(vec![linear(), skippable]);

    h.engine.start("w", DataMap::new()).unwrap();
    assert_eq!(h.engine.skip_workflow().unwrap_err(), EngineError::NotSkippable("w".into()));
    assert!(h.engine.is_active());
    h.engine.cancel().unwrap();

    h.engine.start("tour", DataMap::new()).unwrap();
    assert!(h.engine.skip_workflow().unwrap());
    let cancelled = h.log
                     .events()
                     .into_iter()
                     .filter(|e| e.kind == WorkflowEventKind::WorkflowCancelled)
                     .last()
                     .unwrap();
    assert_eq!(cancelled.workflow_id, "tour");
    assert_eq!(cancelled.data, Some(json!({"reason": "skipped"})));
    assert!(!h.engine.is_active());
}

#[test]
fn restart_clears_completion_and_mints_a_new_run() {
    let h = harness(vec![linear()]);
    assert_eq!(h.engine.restart().unwrap_err(), EngineError::NoActiveWorkflow);

    let first = h.engine.start("w", data_map([("k", json!(1))])).unwrap();
    h.engine.complete_step("A", DataMap::new()).unwrap();
    let second = h.engine.restart().unwrap();

    assert_ne!(first, second);
    let state = h.engine.get_state();
    assert_eq!(state.run_id(), Some(second));
    assert!(state.completed_step_ids().is_empty());
    assert!(state.data().is_empty());
    assert_eq!(state.current_step_id(), Some("A"));
    assert_eq!(h.log.count(WorkflowEventKind::WorkflowCancelled), 1);
    assert_eq!(h.log.count(WorkflowEventKind::WorkflowStarted), 2);
    assert_eq!(started_steps(&h.log), vec!["A", "B", "A"]);
}

#[test]
fn restored_state_is_reactivated_on_its_current_step() {
    let h = harness(vec![linear()]);
    let definition = h.registry.get("w").unwrap();
    let restored = WorkflowState::rehydrate(definition,
                                            Rehydration { completed_step_ids: vec!["A".into()],
                                                          current_step_id: Some("B".into()),
                                                          data: data_map([("name", json!("Ana"))]),
                                                          ..Rehydration::default() });
    h.engine.restore(restored).unwrap();
    assert!(h.log.is_empty());
    assert_eq!(h.engine.get_state().status(), WorkflowStatus::Running);

    assert!(h.engine.reactivate().unwrap());
    assert_eq!(h.nav.screens(), vec!["ScreenB"]);
    assert_eq!(started_steps(&h.log), vec!["B"]);

    h.engine.complete_step("B", DataMap::new()).unwrap();
    assert_eq!(h.engine.get_state().current_step_id(), Some("C"));
}

#[test]
fn reactivate_without_current_step_runs_a_scan() {
    let h = harness(vec![linear()]);
    assert!(!h.engine.reactivate().unwrap());
    let definition = h.registry.get("w").unwrap();
    let restored = WorkflowState::rehydrate(definition,
                                            Rehydration { completed_step_ids: vec!["A".into(), "B".into()],
                                                          ..Rehydration::default() });
    h.engine.restore(restored).unwrap();
    h.engine.reactivate().unwrap();
    assert_eq!(h.engine.get_state().current_step_id(), Some("C"));
    assert_eq!(h.nav.screens(), vec!["ScreenC"]);
}

#[test]
fn restoring_an_idle_state_resets_the_engine() {
    let h = harness(vec![linear()]);
    h.engine.restore(WorkflowState::default()).unwrap();
    assert_eq!(h.engine.get_state().status(), WorkflowStatus::Idle);
}

#[test]
fn progress_counts_total_and_required_steps() {
    let def = WorkflowDefinition::builder("w", "W").step(Step::interactive("A", "A"))
                                                   .step(Step::interactive("bio", "Bio").optional().after("A"))
                                                   .step(Step::interactive("C", "C").after("A"))
                                                   .build();
    let h = harness(vec![def]);
    let definition = h.registry.get("w").unwrap();
    assert_eq!(h.engine.active_progress(), None);

    h.engine.start("w", DataMap::new()).unwrap();
    h.engine.complete_step("A", DataMap::new()).unwrap();
    let progress = h.engine.progress(&definition);
    assert_eq!(progress.completed, 1);
    assert_eq!(progress.total, 3);
    assert_eq!(progress.required_completed, 1);
    assert_eq!(progress.required_total, 2);
    assert_eq!(progress.percentage, 33);
    assert_eq!(h.engine.active_progress(), Some(progress));

    h.engine.complete_step("bio", DataMap::new()).unwrap();
    assert_eq!(h.engine.progress(&definition).percentage, 67);

    let other = WorkflowDefinition::builder("x", "X").step(Step::interactive("A", "A")).build();
    let progress = h.engine.progress(&other);
    assert_eq!((progress.completed, progress.total, progress.percentage), (0, 1, 0));
}

#[test]
fn restart_still_starts_when_on_cancel_fails() {
    let def = WorkflowDefinition::builder("w", "W").step(Step::interactive("A", "ScreenA"))
                                                   .on_cancel(|_| Err("audit sink offline".into()))
                                                   .build();
    let h = harness(vec![def]);
    let first = h.engine.start("w", data_map([("k", json!(1))])).unwrap();

    let err = h.engine.restart().unwrap_err();
    assert!(matches!(err, EngineError::Hook { phase: HookPhase::WorkflowCancel, .. }));

    let state = h.engine.get_state();
    assert!(state.is_active());
    assert_ne!(state.run_id(), Some(first));
    assert!(state.data().is_empty());
    assert_eq!(state.current_step_id(), Some("A"));
    assert_eq!(h.log.count(WorkflowEventKind::WorkflowCancelled), 1);
    assert_eq!(h.log.count(WorkflowEventKind::WorkflowStarted), 2);
}
