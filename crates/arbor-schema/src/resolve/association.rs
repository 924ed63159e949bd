use crate::{
    error::ErrorTree,
    resolve::{SymbolTable, field_route, reference::entity_route},
    resolved::{AssociationPath, EntityId, PathStep, Target},
    types::{FieldType, Multiplicity},
};

// Walk every association path from the root and record the hops.
pub(crate) fn resolve_paths(
    table: &SymbolTable<'_>,
    root: EntityId,
    targets: &mut [Vec<Target>],
    errs: &mut ErrorTree,
) {
    for (entity_index, (package, entity)) in table.entities().iter().enumerate() {
        for (field_index, field) in entity.fields.iter().enumerate() {
            let Target::Association(declared) = &targets[entity_index][field_index] else {
                continue;
            };
            let declared_target = declared.target;
            let route = field_route(&package.name, &entity.name, &field.name);

            match walk_path(table, targets, root, &field.path) {
                Ok(steps) => {
                    let end = steps.last().map_or(root, |step| step.entity);
                    if end != declared_target {
                        errs.add_at(
                            &route,
                            format!(
                                "association path ends at '{}' but the target is '{}'",
                                entity_route(table, end),
                                entity_route(table, declared_target)
                            ),
                        );
                        continue;
                    }
                    let keyed = steps.iter().any(|step| {
                        let (_, entity) = table.entity(step.entity);
                        entity.key_fields().next().is_some()
                    });
                    if matches!(field.multiplicity(), Multiplicity::List | Multiplicity::Set)
                        && !keyed
                    {
                        errs.add_at(
                            &route,
                            "association list needs at least one keyed entity on its path",
                        );
                        continue;
                    }
                    targets[entity_index][field_index] = Target::Association(AssociationPath {
                        steps,
                        target: declared_target,
                    });
                }
                Err(message) => errs.add_at(&route, message),
            }
        }
    }
}

// Follow composition fields from the root, one hop per path segment.
fn walk_path(
    table: &SymbolTable<'_>,
    targets: &[Vec<Target>],
    root: EntityId,
    path: &[String],
) -> Result<Vec<PathStep>, String> {
    if path.is_empty() {
        return Err("association path is empty".to_string());
    }

    let mut current = root;
    let mut steps = Vec::with_capacity(path.len());
    for segment in path {
        let (_, entity) = table.entity(current);
        let Some(position) = entity.fields.iter().position(|f| &f.name == segment) else {
            return Err(format!(
                "association path segment '{segment}' is not a field of '{}'",
                entity_route(table, current)
            ));
        };
        let field = &entity.fields[position];
        if field.field_type != FieldType::Composition {
            return Err(format!(
                "association path segment '{segment}' is a {} field, expected composition",
                field.field_type
            ));
        }
        // an unresolved composition was already reported by the reference stage
        let Target::Composition(next) = targets[current.0][position] else {
            return Err(format!(
                "association path segment '{segment}' has no resolved target"
            ));
        };
        steps.push(PathStep {
            field: segment.clone(),
            entity: next,
            through_set: field.multiplicity() == Multiplicity::Set,
        });
        current = next;
    }

    Ok(steps)
}
