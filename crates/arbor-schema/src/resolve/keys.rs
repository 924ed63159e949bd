use crate::{
    error::ErrorTree,
    provider::{ProviderRegistry, Providers},
    resolve::{SymbolTable, field_route},
    resolved::Target,
    types::Multiplicity,
};

// Sort each entity's key fields by name and check composition keys.
pub(crate) fn resolve_keys(
    table: &SymbolTable<'_>,
    targets: &[Vec<Target>],
    errs: &mut ErrorTree,
) -> Vec<Vec<usize>> {
    let keys: Vec<Vec<usize>> = table
        .entities()
        .iter()
        .map(|(_, entity)| {
            let mut keys: Vec<usize> = entity
                .fields
                .iter()
                .enumerate()
                .filter(|(_, f)| f.is_key)
                .map(|(i, _)| i)
                .collect();
            keys.sort_by(|a, b| entity.fields[*a].name.cmp(&entity.fields[*b].name));
            keys
        })
        .collect();

    // Set elements are told apart by key only.
    for (entity_index, (package, entity)) in table.entities().iter().enumerate() {
        for (position, field) in entity.fields.iter().enumerate() {
            if field.multiplicity() != Multiplicity::Set {
                continue;
            }
            let Target::Composition(target) = targets[entity_index][position] else {
                continue;
            };
            if keys[target.0].is_empty() {
                let (_, target_entity) = table.entity(target);
                errs.add_at(
                    &field_route(&package.name, &entity.name, &field.name),
                    format!(
                        "set elements of '{}' cannot be told apart, it declares no keys",
                        target_entity.name
                    ),
                );
            }
        }
    }

    // A composition key compares its target by that target's keys, which
    // must be primitive so key comparison never recurses further.
    for (entity_index, (package, entity)) in table.entities().iter().enumerate() {
        for &position in &keys[entity_index] {
            let Target::Composition(target) = targets[entity_index][position] else {
                continue;
            };
            let field = &entity.fields[position];
            let (_, target_entity) = table.entity(target);
            let route = field_route(&package.name, &entity.name, &field.name);

            if target_entity.key_fields().next().is_none() {
                errs.add_at(
                    &route,
                    format!(
                        "composition key targets '{}' which declares no keys",
                        target_entity.name
                    ),
                );
            }
            for key in target_entity.key_fields() {
                if !key.field_type.is_primitive() {
                    errs.add_at(
                        &route,
                        format!(
                            "composition key targets '{}' whose key '{}' is not primitive",
                            target_entity.name, key.name
                        ),
                    );
                }
            }
        }
    }

    keys
}

// Inject registered providers into password fields.
pub(crate) fn resolve_providers(
    table: &SymbolTable<'_>,
    registry: &ProviderRegistry,
    errs: &mut ErrorTree,
) -> Vec<Vec<Providers>> {
    table
        .entities()
        .iter()
        .map(|(package, entity)| {
            entity
                .fields
                .iter()
                .map(|field| {
                    let route = field_route(&package.name, &entity.name, &field.name);
                    let hasher = field.hasher.as_ref().and_then(|name| {
                        let found = registry.hasher(name);
                        if found.is_none() {
                            errs.add_at(&route, format!("hasher '{name}' is not registered"));
                        }
                        found.map(|h| (name.clone(), h))
                    });
                    let cipher = field.cipher.as_ref().and_then(|name| {
                        let found = registry.cipher(name);
                        if found.is_none() {
                            errs.add_at(&route, format!("cipher '{name}' is not registered"));
                        }
                        found.map(|c| (name.clone(), c))
                    });

                    Providers::new(hasher, cipher)
                })
                .collect()
        })
        .collect()
}
