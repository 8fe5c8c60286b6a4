//! Engine de orquestación de workflows.
//!
//! Provee el engine, su builder, el contexto entregado a hooks y la pasada
//! de elegibilidad.

pub mod builder;
pub mod config;
pub mod core;
pub mod eligibility;
pub mod flow_ctx;

pub use builder::EngineBuilder;
pub use config::EngineConfig;
pub use self::core::WorkflowEngine;
pub use eligibility::Scan;
pub use flow_ctx::FlowCtx;
