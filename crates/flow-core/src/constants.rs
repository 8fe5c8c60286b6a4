//! Constantes del motor core.
//!
//! `ENGINE_VERSION` participa en el fingerprint de las definiciones: un cambio
//! de versión invalida los fingerprints persistidos aunque la forma de la
//! definición no cambie. Mantener estable mientras no haya cambios
//! incompatibles en la semántica de elegibilidad.

/// Versión lógica del motor de workflows.
pub const ENGINE_VERSION: &str = "W1.0";

/// Clave de dato (`data`) usada en `STEP_SKIPPED` para indicar el motivo.
pub const SKIP_REASON_KEY: &str = "reason";
