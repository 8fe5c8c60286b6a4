//! StepFlow Rust Library
//!
//! Este crate actúa como la capa de aplicación sobre `flow-core` y
//! `flow-persistence`:
//! - Expone `config` con la configuración cargada desde el entorno (.env).
//! - Expone `errors` con el error agregado de la aplicación.
//! - Expone `logging` para instalar el subscriber de trazas.
//! - Expone `onboarding`, un workflow de ejemplo listo para registrar.
//!
//! Puede usarse desde `main.rs` o por otros crates/clientes.

pub mod config;
pub mod errors;
pub mod logging;
pub mod onboarding;

pub use flow_core;
pub use flow_persistence;
