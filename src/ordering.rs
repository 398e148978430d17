use ahash::AHashSet;

use crate::{errors::PersistError, model::EntityType, registry::EntityRegistry};

/// Whether `dependent` references `dependency` through a chain of non-self
/// foreign keys.
pub fn has_foreign_key_dependency(
    registry: &EntityRegistry,
    dependent: &EntityType,
    dependency: &EntityType,
) -> bool {
    let mut visited = AHashSet::new();
    reaches(registry, dependent, &dependency.name, &mut visited)
}

fn reaches<'a>(
    registry: &'a EntityRegistry,
    from: &'a EntityType,
    target: &str,
    visited: &mut AHashSet<&'a str>,
) -> bool {
    if !visited.insert(from.name.as_str()) {
        return false;
    }
    for fk in from.external_references() {
        if fk.references == target {
            return true;
        }
        if let Some(next) = registry.get(&fk.references) {
            if reaches(registry, next, target, visited) {
                return true;
            }
        }
    }
    false
}

/// Dependents first, ties broken by registration order. A cycle is rejected
/// as a whole.
pub fn dependency_order(registry: &EntityRegistry) -> Result<Vec<&EntityType>, PersistError> {
    registry.validate()?;
    let mut remaining: Vec<&EntityType> = registry.entities().iter().collect();
    let mut sorted = Vec::with_capacity(remaining.len());
    while !remaining.is_empty() {
        let leaf = remaining.iter().position(|candidate| {
            !remaining.iter().any(|other| {
                other.name != candidate.name
                    && has_foreign_key_dependency(registry, other, candidate)
            })
        });
        match leaf {
            Some(idx) => sorted.push(remaining.remove(idx)),
            None => {
                let names: Vec<&str> = remaining.iter().map(|e| e.name.as_str()).collect();
                return Err(PersistError::configuration(format!(
                    "cyclic foreign-key dependency among entity types: {}",
                    names.join(", ")
                )));
            }
        }
    }
    Ok(sorted)
}

pub fn import_order(registry: &EntityRegistry) -> Result<Vec<&EntityType>, PersistError> {
    let mut order = dependency_order(registry)?;
    order.reverse();
    Ok(order)
}
