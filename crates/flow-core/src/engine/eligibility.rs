//! Pasada de elegibilidad.
//!
//! Un step es elegible si no está completado y todas sus dependencias sí lo
//! están. Se recorre en orden de declaración y gana el primero: es la única
//! regla de desempate.
use indexmap::IndexMap;

use crate::repo::WorkflowDefinition;
use crate::step::Step;

/// Resultado de la pasada.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scan {
    /// Step a activar.
    Step(String),
    /// Todos los steps requeridos están completados.
    Finished,
    /// Ningún step elegible con requeridos pendientes.
    Stalled,
}

fn is_done(completion: &IndexMap<String, bool>, id: &str) -> bool {
    completion.get(id).copied().unwrap_or(false)
}

pub fn is_eligible(step: &Step, completion: &IndexMap<String, bool>) -> bool {
    !is_done(completion, &step.id) && step.dependencies.iter().all(|d| is_done(completion, d))
}

pub fn first_eligible<'a>(definition: &'a WorkflowDefinition, completion: &IndexMap<String, bool>) -> Option<&'a Step> {
    definition.steps.iter().find(|s| is_eligible(s, completion))
}

pub fn required_complete(definition: &WorkflowDefinition, completion: &IndexMap<String, bool>) -> bool {
    definition.required_steps().all(|s| is_done(completion, &s.id))
}

/// `check_completion` decide si la completitud se evalúa antes de buscar
/// step (tras un `complete_step`) o sólo cuando no queda nada elegible (al
/// arrancar).
pub fn scan(definition: &WorkflowDefinition, completion: &IndexMap<String, bool>, check_completion: bool) -> Scan {
    if check_completion && required_complete(definition, completion) {
        return Scan::Finished;
    }
    match first_eligible(definition, completion) {
        Some(step) => Scan::Step(step.id.clone()),
        None if required_complete(definition, completion) => Scan::Finished,
        None => Scan::Stalled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def() -> WorkflowDefinition {
        WorkflowDefinition::builder("w", "W").step(Step::interactive("a", "A"))
                                             .step(Step::interactive("c", "C").optional().after("a"))
                                             .step(Step::interactive("b", "B").after("a"))
                                             .build()
    }

    fn completion(done: &[&str]) -> IndexMap<String, bool> {
        ["a", "c", "b"].iter().map(|id| (id.to_string(), done.contains(id))).collect()
    }

    #[test]
    fn declaration_order_breaks_ties() {
        assert_eq!(scan(&def(), &completion(&[]), false), Scan::Step("a".into()));
        assert_eq!(scan(&def(), &completion(&["a"]), true), Scan::Step("c".into()));
        assert_eq!(scan(&def(), &completion(&["a", "c"]), true), Scan::Step("b".into()));
    }

    #[test]
    fn optional_steps_do_not_block_completion() {
        assert_eq!(scan(&def(), &completion(&["a", "b"]), true), Scan::Finished);
        assert_eq!(scan(&def(), &completion(&["a", "b"]), false), Scan::Step("c".into()));
    }

    #[test]
    fn unmet_dependencies_stall() {
        let def = WorkflowDefinition::builder("w", "W").step(Step::interactive("x", "X").after("y"))
                                                       .step(Step::interactive("y", "Y").optional().after("x"))
                                                       .build();
        let completion: IndexMap<String, bool> = [("x".to_string(), false), ("y".to_string(), false)].into_iter().collect();
        assert_eq!(scan(&def, &completion, true), Scan::Stalled);
    }
}
