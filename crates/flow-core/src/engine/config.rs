//! Configuración del engine.

/// Parámetros de comportamiento del `WorkflowEngine`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Nivel de log al detectar un workflow bloqueado: `warn` si es `true`,
    /// `debug` si no.
    pub warn_on_stall: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { warn_on_stall: true }
    }
}
