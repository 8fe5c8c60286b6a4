//! Definiciones relacionadas a Steps.
//!
//! Un step es interactivo (el engine llama al navegador externo con su
//! pantalla) o headless (el engine invoca su `on_activate` y/o evalúa su
//! predicado de completitud). Este módulo define:
//! - `Step`: datos + hooks del step, con builder fluido.
//! - `Hook` y `CompletionCondition`: firmas de los callbacks de usuario.

pub mod definition;

pub use definition::{CompletionCondition, Hook, Step};
