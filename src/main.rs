//! Demo de línea de comandos: ejecuta el onboarding de ejemplo, persiste el
//! estado a mitad de camino y lo termina.
use std::sync::Arc;
use std::time::Duration;

use flow_core::{data_map, DataMap, NavParams, WorkflowEngine, WorkflowEvent, WorkflowEventKind, WorkflowRegistry};
use flow_persistence::{save_engine, InMemoryStateStore};
use serde_json::json;
use stepflow_rust::config::CONFIG;
use stepflow_rust::errors::AppError;
use stepflow_rust::{logging, onboarding};
use tokio::sync::mpsc;
use tokio::time::timeout;

const STATE_KEY: &str = "demo/onboarding";

#[tokio::main]
async fn main() {
    if let Err(e) = logging::init(&CONFIG.log_filter) {
        eprintln!("{e}");
    }
    if let Err(e) = run().await {
        eprintln!("Demo falló: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    let registry = Arc::new(WorkflowRegistry::new());
    onboarding::register(&registry)?;

    let (tx, mut rx) = mpsc::unbounded_channel::<WorkflowEvent>();
    let engine = WorkflowEngine::builder(registry).navigator(|screen: &str, params: &NavParams| {
                                                      println!("[nav] {screen} {}", json!(params));
                                                  })
                                                  .listener(move |event: &WorkflowEvent| {
                                                      let _ = tx.send(event.clone());
                                                  })
                                                  .config(CONFIG.engine.clone())
                                                  .build();

    let run_id = engine.start(onboarding::WORKFLOW_ID,
                              data_map([("name", json!("Ana")),
                                        ("biometry_available", json!(false)),
                                        ("push_supported", json!(true))]))?;
    println!("run {run_id}");
    engine.complete_step("terms", data_map([("accepted_terms", json!(true))]))?;
    engine.complete_step("pin", data_map([("pin_set", json!(true))]))?;

    let store = InMemoryStateStore::with_pretty(CONFIG.pretty_json);
    save_engine(&engine, &store, STATE_KEY).await?;
    if let Some(raw) = store.raw(STATE_KEY) {
        println!("[persisted]\n{raw}");
    }

    if let Some(progress) = engine.active_progress() {
        println!("progress {}/{} ({}%)", progress.completed, progress.total, progress.percentage);
    }

    engine.complete_step("push", DataMap::new())?;

    // wallet se completa en segundo plano; se espera a que home quede activo.
    loop {
        let event = match timeout(Duration::from_secs(5), rx.recv()).await {
            Ok(Some(event)) => event,
            Ok(None) => break,
            Err(_) => return Err(AppError::Config("timed out waiting for wallet provisioning".into())),
        };
        print_event(&event);
        if event.kind == WorkflowEventKind::StepStarted && event.step_id.as_deref() == Some("home") {
            break;
        }
    }

    engine.complete_step("home", DataMap::new())?;
    while let Ok(event) = rx.try_recv() {
        print_event(&event);
    }
    println!("active: {}", engine.is_active());
    Ok(())
}

fn print_event(event: &WorkflowEvent) {
    match serde_json::to_string(event) {
        Ok(line) => println!("[event] {line}"),
        Err(e) => eprintln!("[event] no serializable: {e}"),
    }
}
