//! Registro de definiciones de workflow.
//!
//! El registro se inyecta explícitamente en el engine (`Arc<WorkflowRegistry>`)
//! y vive lo que dure la sesión de la aplicación. Valida de forma ansiosa:
//! una definición inválida nunca se almacena.
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use super::WorkflowDefinition;
use crate::errors::{DefinitionError, DefinitionViolation};

#[derive(Debug, Default)]
pub struct WorkflowRegistry {
    definitions: RwLock<IndexMap<String, Arc<WorkflowDefinition>>>,
}

impl WorkflowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Valida y almacena `definition`, reemplazando cualquier definición
    /// previa con el mismo id.
    pub fn register(&self, definition: WorkflowDefinition) -> Result<Arc<WorkflowDefinition>, DefinitionError> {
        validate(&definition)?;
        let definition = Arc::new(definition);
        let previous = self.definitions
                           .write()
                           .insert(definition.id.clone(), Arc::clone(&definition));
        if previous.is_some() {
            log::info!("workflow '{}' re-registered, previous definition replaced", definition.id);
        } else {
            log::debug!("workflow '{}' registered ({} steps)", definition.id, definition.len());
        }
        Ok(definition)
    }

    pub fn get(&self, workflow_id: &str) -> Option<Arc<WorkflowDefinition>> {
        self.definitions.read().get(workflow_id).cloned()
    }

    pub fn contains(&self, workflow_id: &str) -> bool {
        self.definitions.read().contains_key(workflow_id)
    }

    /// Definiciones en orden de primer registro.
    pub fn list(&self) -> Vec<Arc<WorkflowDefinition>> {
        self.definitions.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.definitions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.read().is_empty()
    }
}

/// Valida una definición acumulando todas las violaciones.
pub fn validate(definition: &WorkflowDefinition) -> Result<(), DefinitionError> {
    let mut violations = Vec::new();

    if definition.id.trim().is_empty() {
        violations.push(DefinitionViolation::EmptyId);
    }
    if definition.name.trim().is_empty() {
        violations.push(DefinitionViolation::EmptyName);
    }
    if definition.steps.is_empty() {
        violations.push(DefinitionViolation::NoSteps);
    }

    let mut seen: HashSet<&str> = HashSet::new();
    for (position, step) in definition.steps.iter().enumerate() {
        if step.id.trim().is_empty() {
            violations.push(DefinitionViolation::EmptyStepId(position));
        } else if !seen.insert(step.id.as_str()) {
            violations.push(DefinitionViolation::DuplicateStepId(step.id.clone()));
        }
    }

    let known: HashSet<&str> = definition.steps.iter().map(|s| s.id.as_str()).collect();
    for step in &definition.steps {
        for dep in &step.dependencies {
            if !known.contains(dep.as_str()) {
                violations.push(DefinitionViolation::DanglingDependency { step: step.id.clone(),
                                                                          dependency: dep.clone() });
            }
        }
        if step.headless {
            if step.screen.is_some() {
                violations.push(DefinitionViolation::ConflictingKind(step.id.clone()));
            }
            if step.on_activate.is_none() && step.completion_condition.is_none() {
                violations.push(DefinitionViolation::HeadlessWithoutAction(step.id.clone()));
            }
        } else if step.screen.as_deref().map_or(true, |s| s.trim().is_empty()) {
            violations.push(DefinitionViolation::InteractiveWithoutScreen(step.id.clone()));
        }
    }

    if let Some(cycle) = find_cycle(definition) {
        violations.push(DefinitionViolation::DependencyCycle(cycle));
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(DefinitionError { workflow_id: definition.id.clone(),
                              violations })
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

/// DFS sobre las dependencias conocidas; devuelve el primer ciclo como
/// camino cerrado (`a -> b -> a`).
fn find_cycle(definition: &WorkflowDefinition) -> Option<Vec<String>> {
    let edges: HashMap<&str, Vec<&str>> = definition.steps
                                                    .iter()
                                                    .map(|s| (s.id.as_str(), s.dependencies.iter().map(String::as_str).collect()))
                                                    .collect();
    let mut marks: HashMap<&str, Mark> = HashMap::new();
    let mut path: Vec<&str> = Vec::new();

    fn visit<'a>(node: &'a str,
                 edges: &HashMap<&'a str, Vec<&'a str>>,
                 marks: &mut HashMap<&'a str, Mark>,
                 path: &mut Vec<&'a str>)
                 -> Option<Vec<String>> {
        match marks.get(node) {
            Some(Mark::Done) => return None,
            Some(Mark::Visiting) => {
                let start = path.iter().position(|n| *n == node).unwrap_or(0);
                let mut cycle: Vec<String> = path[start..].iter().map(|n| n.to_string()).collect();
                cycle.push(node.to_string());
                return Some(cycle);
            }
            None => {}
        }
        marks.insert(node, Mark::Visiting);
        path.push(node);
        for &dep in edges.get(node).into_iter().flatten() {
            if !edges.contains_key(dep) {
                continue;
            }
            if let Some(cycle) = visit(dep, edges, marks, path) {
                return Some(cycle);
            }
        }
        path.pop();
        marks.insert(node, Mark::Done);
        None
    }

    for step in &definition.steps {
        if let Some(cycle) = visit(step.id.as_str(), &edges, &mut marks, &mut path) {
            return Some(cycle);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::Step;

    fn valid() -> WorkflowDefinition {
        WorkflowDefinition::builder("w", "Workflow").step(Step::interactive("a", "ScreenA"))
                                                    .step(Step::headless("b").after("a").on_activate(|_| Ok(())))
                                                    .build()
    }

    #[test]
    fn registers_well_formed_definition() {
        let reg = WorkflowRegistry::new();
        reg.register(valid()).expect("valid definition");
        assert!(reg.contains("w"));
        assert_eq!(reg.list().len(), 1);
    }

    #[test]
    fn rejects_duplicate_step_id() {
        let def = WorkflowDefinition::builder("w", "W").step(Step::interactive("a", "A"))
                                                       .step(Step::interactive("a", "B"))
                                                       .build();
        let err = WorkflowRegistry::new().register(def).unwrap_err();
        assert_eq!(err.violations, vec![DefinitionViolation::DuplicateStepId("a".into())]);
    }

    #[test]
    fn collects_every_violation() {
        let def = WorkflowDefinition::builder("", " ").step(Step::headless("h"))
                                                      .step(Step { screen: None,
                                                                   ..Step::interactive("i", "x") })
                                                      .step(Step::interactive("d", "D").after("ghost"))
                                                      .build();
        let reg = WorkflowRegistry::new();
        let err = reg.register(def).unwrap_err();
        assert!(err.has(|v| *v == DefinitionViolation::EmptyId));
        assert!(err.has(|v| *v == DefinitionViolation::EmptyName));
        assert!(err.has(|v| *v == DefinitionViolation::HeadlessWithoutAction("h".into())));
        assert!(err.has(|v| *v == DefinitionViolation::InteractiveWithoutScreen("i".into())));
        assert!(err.has(|v| matches!(v, DefinitionViolation::DanglingDependency { dependency, .. } if dependency == "ghost")));
        assert_eq!(err.violations.len(), 5);
        assert!(reg.is_empty(), "invalid definitions are never stored");
    }

    #[test]
    fn rejects_empty_workflow() {
        let err = validate(&WorkflowDefinition::builder("w", "W").build()).unwrap_err();
        assert_eq!(err.violations, vec![DefinitionViolation::NoSteps]);
    }

    #[test]
    fn rejects_headless_step_with_screen() {
        let step = Step { screen: Some("S".into()),
                          ..Step::headless("h").on_activate(|_| Ok(())) };
        let err = validate(&WorkflowDefinition::builder("w", "W").step(step).build()).unwrap_err();
        assert_eq!(err.violations, vec![DefinitionViolation::ConflictingKind("h".into())]);
    }

    #[test]
    fn rejects_dependency_cycles() {
        let def = WorkflowDefinition::builder("w", "W").step(Step::interactive("a", "A").after("c"))
                                                       .step(Step::interactive("b", "B").after("a"))
                                                       .step(Step::interactive("c", "C").after("b"))
                                                       .build();
        let err = validate(&def).unwrap_err();
        assert_eq!(err.violations,
                   vec![DefinitionViolation::DependencyCycle(vec!["a".into(), "c".into(), "b".into(), "a".into()])]);
    }

    #[test]
    fn rejects_self_dependency() {
        let def = WorkflowDefinition::builder("w", "W").step(Step::interactive("a", "A").after("a")).build();
        let err = validate(&def).unwrap_err();
        assert_eq!(err.violations, vec![DefinitionViolation::DependencyCycle(vec!["a".into(), "a".into()])]);
    }

    #[test]
    fn dependencies_may_point_forward() {
        let def = WorkflowDefinition::builder("w", "W").step(Step::interactive("a", "A").after("b"))
                                                       .step(Step::interactive("b", "B"))
                                                       .build();
        assert!(validate(&def).is_ok());
    }

    #[test]
    fn re_registration_replaces_definition() {
        let reg = WorkflowRegistry::new();
        reg.register(valid()).unwrap();
        let replacement = WorkflowDefinition::builder("w", "Renamed").step(Step::interactive("z", "Z")).build();
        reg.register(replacement).unwrap();
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.get("w").unwrap().name, "Renamed");
    }
}
