//! Workflow de onboarding de ejemplo.
//!
//! Orden efectivo: `terms` -> `pin` -> (`biometry`) -> (`push`) -> `wallet`
//! -> `home`. `biometry` y `push` son condicionales sobre los flags del mapa
//! de datos; `wallet` es headless y se completa desde una tarea en segundo
//! plano cuando hay un runtime tokio disponible.
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use flow_core::{data_map, DefinitionError, FlowCtx, HookError, Step, WorkflowDefinition, WorkflowRegistry};
use serde_json::json;
use uuid::Uuid;

pub const WORKFLOW_ID: &str = "onboarding";

/// Latencia simulada del aprovisionamiento de la wallet.
const WALLET_LATENCY: Duration = Duration::from_millis(50);

pub fn definition() -> WorkflowDefinition {
    WorkflowDefinition::builder(WORKFLOW_ID, "Onboarding")
        .pausable(true)
        .step(Step::interactive("terms", "Terms").metadata("analytics", "onboarding_terms"))
        .step(Step::interactive("pin", "PinCreate").after("terms").nav_param("mode", "create"))
        .step(Step::interactive("biometry", "Biometry").optional()
                                                       .after("pin")
                                                       .skip_unless(|ctx| flag(ctx, "biometry_available")))
        .step(Step::interactive("push", "PushPermission").after("pin")
                                                         .skip_unless(|ctx| flag(ctx, "push_supported")))
        .step(Step::headless("wallet").after("pin").on_activate(provision_wallet))
        .step(Step::interactive("home", "Home").after("wallet")
                                               .nav_param("wallet", "{{wallet_id}}")
                                               .nav_param("title", "Welcome {{name}}"))
        .on_start(|ctx| {
            log::info!("onboarding started (run {})", ctx.run_id());
            Ok(())
        })
        .on_complete(|ctx| {
            log::info!("onboarding finished for wallet {:?}", ctx.data("wallet_id"));
            Ok(())
        })
        .build()
}

/// Registra la definición de onboarding.
pub fn register(registry: &WorkflowRegistry) -> Result<Arc<WorkflowDefinition>, DefinitionError> {
    registry.register(definition())
}

fn flag(ctx: &FlowCtx, key: &str) -> bool {
    ctx.data(key).and_then(|v| v.as_bool()).unwrap_or(false)
}

fn provision_wallet(ctx: &FlowCtx) -> Result<(), HookError> {
    let payload = || {
        data_map([("wallet_id", json!(format!("w-{}", Uuid::new_v4().simple()))),
                  ("wallet_created_at", json!(Utc::now().to_rfc3339()))])
    };
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            let ctx = ctx.clone();
            handle.spawn(async move {
                      tokio::time::sleep(WALLET_LATENCY).await;
                      match ctx.complete(payload()) {
                          Ok(true) => log::debug!("wallet provisioned"),
                          Ok(false) => log::debug!("wallet result dropped: run {} is no longer active", ctx.run_id()),
                          Err(err) => log::warn!("wallet completion failed: {err}"),
                      }
                  });
            Ok(())
        }
        Err(_) => {
            ctx.complete(payload())?;
            Ok(())
        }
    }
}
