//! Configuración central de la aplicación.
//! Carga variables de entorno (.env) y expone una estructura inmutable (`CONFIG`).
//!
//! Variables:
//! - `STEPFLOW_LOG`: filtro de logging (por defecto `info`).
//! - `STEPFLOW_WARN_ON_STALL`: `warn` (true) o `debug` (false) al bloquearse
//!   un workflow.
//! - `STEPFLOW_PRETTY_JSON`: estado persistido con indentación.
use std::env;

use flow_core::EngineConfig;
use once_cell::sync::Lazy;

use crate::errors::AppError;

/// Configuración global de la aplicación.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Directiva de `EnvFilter` para el subscriber de logging.
    pub log_filter: String,
    /// Parámetros pasados al `WorkflowEngine`.
    pub engine: EngineConfig,
    pub pretty_json: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self { log_filter: "info".to_string(),
               engine: EngineConfig::default(),
               pretty_json: false }
    }
}

impl AppConfig {
    /// Lee la configuración del entorno del proceso.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Construye la configuración a partir de una función de búsqueda de
    /// variables (el entorno real o un mapa en tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let defaults = Self::default();
        let log_filter = lookup("STEPFLOW_LOG").filter(|v| !v.trim().is_empty())
                                               .unwrap_or(defaults.log_filter);
        let warn_on_stall = match lookup("STEPFLOW_WARN_ON_STALL") {
            Some(raw) => parse_flag("STEPFLOW_WARN_ON_STALL", &raw)?,
            None => defaults.engine.warn_on_stall,
        };
        let pretty_json = match lookup("STEPFLOW_PRETTY_JSON") {
            Some(raw) => parse_flag("STEPFLOW_PRETTY_JSON", &raw)?,
            None => defaults.pretty_json,
        };
        Ok(Self { log_filter,
                  engine: EngineConfig { warn_on_stall },
                  pretty_json })
    }
}

fn parse_flag(key: &str, raw: &str) -> Result<bool, AppError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(AppError::Config(format!("{key} must be a boolean, got '{other}'"))),
    }
}

/// Instancia global perezosa de configuración, evaluada una sola vez.
/// Un valor inválido se registra y se reemplaza por los valores por defecto.
pub static CONFIG: Lazy<AppConfig> = Lazy::new(|| {
    let _ = dotenvy::dotenv(); // ignora error si no existe .env
    AppConfig::from_env().unwrap_or_else(|err| {
                             log::warn!("{err}; using default configuration");
                             AppConfig::default()
                         })
});

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, AppConfig::default());
        assert!(config.engine.warn_on_stall);
    }

    #[test]
    fn reads_every_variable() {
        let config = AppConfig::from_lookup(lookup(&[("STEPFLOW_LOG", "debug,flow_core=trace"),
                                                     ("STEPFLOW_WARN_ON_STALL", "off"),
                                                     ("STEPFLOW_PRETTY_JSON", "1")])).unwrap();
        assert_eq!(config.log_filter, "debug,flow_core=trace");
        assert!(!config.engine.warn_on_stall);
        assert!(config.pretty_json);
    }

    #[test]
    fn invalid_flag_is_a_config_error() {
        let err = AppConfig::from_lookup(lookup(&[("STEPFLOW_PRETTY_JSON", "maybe")])).unwrap_err();
        assert!(matches!(err, AppError::Config(msg) if msg.contains("STEPFLOW_PRETTY_JSON")));
    }
}
