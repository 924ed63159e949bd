use crate::{
    err,
    error::ErrorTree,
    node::{Entity, Enumeration, MetaModel, Package, TypeRef},
    resolve::{field_route, element_route},
    resolved::{ElementId, EntityId, EnumId, QualifiedName, Target},
    types::FieldType,
};
use std::collections::BTreeMap;

///
/// SymbolTable
/// Every declared entity and enumeration in declaration order. The position
/// of an entity here becomes its `EntityId`.
///

pub(crate) struct SymbolTable<'a> {
    entities: Vec<(&'a Package, &'a Entity)>,
    enumerations: Vec<(&'a Package, &'a Enumeration)>,
    names: BTreeMap<QualifiedName, ElementId>,
}

impl<'a> SymbolTable<'a> {
    pub(crate) fn build(model: &'a MetaModel) -> Self {
        let mut table = Self {
            entities: Vec::new(),
            enumerations: Vec::new(),
            names: BTreeMap::new(),
        };

        for package in &model.packages {
            for entity in &package.entities {
                let id = EntityId(table.entities.len());
                table.entities.push((package, entity));
                table
                    .names
                    .entry(QualifiedName::element(&package.name, &entity.name))
                    .or_insert(ElementId::Entity(id));
            }
            for enumeration in &package.enumerations {
                let id = EnumId(table.enumerations.len());
                table.enumerations.push((package, enumeration));
                table
                    .names
                    .entry(QualifiedName::element(&package.name, &enumeration.name))
                    .or_insert(ElementId::Enumeration(id));
            }
        }

        table
    }

    pub(crate) fn entities(&self) -> &[(&'a Package, &'a Entity)] {
        &self.entities
    }

    pub(crate) fn enumerations(&self) -> &[(&'a Package, &'a Enumeration)] {
        &self.enumerations
    }

    pub(crate) const fn names(&self) -> &BTreeMap<QualifiedName, ElementId> {
        &self.names
    }

    pub(crate) fn entity(&self, id: EntityId) -> (&'a Package, &'a Entity) {
        self.entities[id.0]
    }

    pub(crate) fn lookup(&self, declaring: &str, target: &TypeRef) -> Option<ElementId> {
        self.names
            .get(&QualifiedName::element(
                target.package_or(declaring),
                &target.name,
            ))
            .copied()
    }
}

// Resolve the declared root entity; `None` halts the pipeline.
pub(crate) fn resolve_root(
    model: &MetaModel,
    table: &SymbolTable<'_>,
    errs: &mut ErrorTree,
) -> Option<EntityId> {
    let Some(root) = &model.root else {
        err!(errs, "meta-model declares no root entity");
        return None;
    };
    let Some(package) = root.package.as_deref() else {
        err!(errs, "root entity '{}' must name its package", root.name);
        return None;
    };

    match table.lookup(package, root) {
        Some(ElementId::Entity(id)) => Some(id),
        Some(ElementId::Enumeration(_)) => {
            err!(errs, "root '{package}::{}' is an enumeration, not an entity", root.name);
            None
        }
        None => {
            err!(errs, "root entity '{package}::{}' is not declared", root.name);
            None
        }
    }
}

// Resolve enumeration/composition targets. Associations get their target
// checked here and their path filled in by the association stage.
pub(crate) fn resolve_targets(table: &SymbolTable<'_>, errs: &mut ErrorTree) -> Vec<Vec<Target>> {
    table
        .entities()
        .iter()
        .map(|(package, entity)| {
            entity
                .fields
                .iter()
                .map(|field| {
                    if !field.field_type.requires_target() {
                        return Target::None;
                    }
                    let route = field_route(&package.name, &entity.name, &field.name);
                    let Some(target) = &field.target else {
                        errs.add_at(
                            &route,
                            format!("{} field must declare a target", field.field_type),
                        );
                        return Target::None;
                    };
                    let found = table.lookup(&package.name, target);
                    let wanted = target.package_or(&package.name);

                    match (field.field_type, found) {
                        (FieldType::Enumeration, Some(ElementId::Enumeration(id))) => {
                            Target::Enumeration(id)
                        }
                        (FieldType::Composition, Some(ElementId::Entity(id))) => {
                            Target::Composition(id)
                        }
                        // placeholder path; filled by the association stage
                        (FieldType::Association, Some(ElementId::Entity(id))) => {
                            Target::Association(crate::resolved::AssociationPath {
                                steps: Vec::new(),
                                target: id,
                            })
                        }
                        (ty, Some(_)) => {
                            errs.add_at(
                                &route,
                                format!(
                                    "target '{wanted}::{}' is not a valid {ty} target",
                                    target.name
                                ),
                            );
                            Target::None
                        }
                        (ty, None) => {
                            errs.add_at(
                                &route,
                                format!(
                                    "{ty} target '{wanted}::{}' is not declared",
                                    target.name
                                ),
                            );
                            Target::None
                        }
                    }
                })
                .collect()
        })
        .collect()
}

/// Route for an entity in the table, used by later stages.
pub(crate) fn entity_route(table: &SymbolTable<'_>, id: EntityId) -> String {
    let (package, entity) = table.entity(id);
    element_route(&package.name, &entity.name)
}
