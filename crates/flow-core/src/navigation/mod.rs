//! Contrato con el colaborador de navegación externo.
//!
//! El engine llama a `navigate` al activar un step interactivo y no espera
//! ni inspecciona el resultado: mostrar la pantalla es responsabilidad de
//! la capa de UI.

pub mod template;

pub use template::resolve_params;

use crate::model::DataMap;

/// Parámetros de navegación ya resueltos.
pub type NavParams = DataMap;

pub trait Navigator: Send + Sync {
    fn navigate(&self, screen: &str, params: &NavParams);
}

impl<F> Navigator for F where F: Fn(&str, &NavParams) + Send + Sync
{
    fn navigate(&self, screen: &str, params: &NavParams) {
        self(screen, params)
    }
}

/// Navegador nulo: sólo registra la petición.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn navigate(&self, screen: &str, params: &NavParams) {
        log::debug!("navigation to '{}' dropped ({} params)", screen, params.len());
    }
}
