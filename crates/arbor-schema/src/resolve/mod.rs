//! Meta-model resolution, run as a staged and deterministic pipeline.
//!
//! 1. structural checks happen while documents are converted into nodes
//!    (see `arbor-core::meta`), so a [`MetaModel`] arriving here is
//!    structurally complete;
//! 2. per-element rules ([`naming`], [`rules`]);
//! 3. cross-reference resolution ([`reference`]), a separate pass over the
//!    whole model so forward references work;
//! 4. association path resolution ([`association`]);
//! 5. key caching and provider injection ([`keys`]).
//!
//! Every stage adds to one [`ErrorTree`]; only a missing root stops the
//! pipeline early.

mod association;
mod keys;
mod naming;
mod reference;
mod rules;

use crate::{
    error::ErrorTree,
    node::MetaModel,
    provider::ProviderRegistry,
    resolved::{
        EntityId, QualifiedName, ResolvedConstraints, ResolvedEntity, ResolvedEnumeration,
        ResolvedField, ResolvedMetaModel, Target,
    },
};
use regex::Regex;
use std::collections::BTreeMap;

pub(crate) use reference::SymbolTable;

/// Resolve a declared model into an immutable snapshot.
pub fn resolve(
    model: MetaModel,
    registry: &ProviderRegistry,
) -> Result<ResolvedMetaModel, ErrorTree> {
    let mut errs = ErrorTree::new();

    // Phase 2: local rules on every element.
    naming::validate_names(&model, &mut errs);
    rules::validate_elements(&model, &mut errs);

    // Phase 3: symbols and references.
    let table = SymbolTable::build(&model);
    let Some(root) = reference::resolve_root(&model, &table, &mut errs) else {
        return Err(errs);
    };
    let mut targets = reference::resolve_targets(&table, &mut errs);

    // Phase 4: association paths, walked from the root.
    association::resolve_paths(&table, root, &mut targets, &mut errs);

    // Phase 5: keys and providers.
    let keys = keys::resolve_keys(&table, &targets, &mut errs);
    let providers = keys::resolve_providers(&table, registry, &mut errs);

    errs.result()?;

    Ok(build_snapshot(&model, &table, root, targets, keys, providers))
}

impl ResolvedMetaModel {
    /// Re-run the resolver over the declared source of this snapshot.
    pub fn revalidate(&self, registry: &ProviderRegistry) -> Result<Self, ErrorTree> {
        resolve(self.source.clone(), registry)
    }
}

// Assemble the snapshot once every stage has passed.
fn build_snapshot(
    model: &MetaModel,
    table: &SymbolTable<'_>,
    root: EntityId,
    targets: Vec<Vec<Target>>,
    keys: Vec<Vec<usize>>,
    providers: Vec<Vec<crate::provider::Providers>>,
) -> ResolvedMetaModel {
    let entities = table
        .entities()
        .iter()
        .zip(targets.into_iter().zip(keys).zip(providers))
        .enumerate()
        .map(|(i, ((package, entity), ((targets, keys), providers)))| {
            let qualified_name = QualifiedName::element(&package.name, &entity.name);
            let fields: Vec<ResolvedField> = entity
                .fields
                .iter()
                .zip(targets.into_iter().zip(providers))
                .enumerate()
                .map(|(index, (field, (target, providers)))| ResolvedField {
                    index,
                    name: field.name.clone(),
                    qualified_name: QualifiedName::field(&qualified_name, &field.name),
                    field_type: field.field_type,
                    multiplicity: field.multiplicity(),
                    is_key: field.is_key,
                    target,
                    constraints: ResolvedConstraints {
                        min_length: field.constraints.min_length,
                        max_length: field.constraints.max_length,
                        pattern: field
                            .constraints
                            .pattern
                            .as_deref()
                            .and_then(|p| Regex::new(p).ok()),
                    },
                    bounds: field.bounds,
                    exists_if: field.exists_if.clone(),
                    providers,
                })
                .collect();
            let index = fields
                .iter()
                .map(|f| (f.name.clone(), f.index))
                .collect::<BTreeMap<_, _>>();

            ResolvedEntity {
                id: EntityId(i),
                name: entity.name.clone(),
                package: package.name.clone(),
                qualified_name,
                fields,
                index,
                keys,
            }
        })
        .collect();

    let enumerations = table
        .enumerations()
        .iter()
        .enumerate()
        .map(|(i, (package, enumeration))| ResolvedEnumeration {
            id: crate::resolved::EnumId(i),
            name: enumeration.name.clone(),
            qualified_name: QualifiedName::element(&package.name, &enumeration.name),
            values: enumeration.values.iter().map(|v| v.name.clone()).collect(),
        })
        .collect();

    ResolvedMetaModel {
        source: model.clone(),
        root,
        entities,
        enumerations,
        names: table.names().clone(),
    }
}

/// Route used to tag errors for one field.
pub(crate) fn field_route(package: &str, entity: &str, field: &str) -> String {
    format!("{package}.{entity}.{field}")
}

/// Route used to tag errors for one entity or enumeration.
pub(crate) fn element_route(package: &str, name: &str) -> String {
    format!("{package}.{name}")
}

#[cfg(test)]
mod tests;
