//! Immutable snapshot produced by the resolver.
//!
//! Everything a codec or validator needs at runtime is precomputed here once:
//! qualified names, resolved targets, sorted key lists, compiled constraints
//! and injected providers. Nothing in this module mutates after
//! construction.

use crate::{
    QUALIFIED_SEPARATOR,
    expr::Expr,
    node::{ElementBounds, MetaModel},
    provider::Providers,
    types::{FieldType, Multiplicity},
};
use derive_more::{Deref, Display};
use regex::Regex;
use std::collections::BTreeMap;

///
/// EntityId
/// Index of a resolved entity inside its snapshot.
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[display("entity#{_0}")]
pub struct EntityId(pub(crate) usize);

impl EntityId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

///
/// EnumId
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[display("enumeration#{_0}")]
pub struct EnumId(pub(crate) usize);

impl EnumId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

///
/// ElementId
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ElementId {
    Entity(EntityId),
    Enumeration(EnumId),
}

///
/// QualifiedName
/// `package::name`, or `package::entity.field` for fields.
///

#[derive(Clone, Debug, Deref, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct QualifiedName(String);

impl QualifiedName {
    #[must_use]
    pub fn element(package: &str, name: &str) -> Self {
        Self(format!("{package}{QUALIFIED_SEPARATOR}{name}"))
    }

    #[must_use]
    pub fn field(entity: &Self, field: &str) -> Self {
        Self(format!("{}.{field}", entity.0))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

///
/// PathStep
/// One composition hop of an association path.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PathStep {
    pub field: String,
    pub entity: EntityId,
    /// Whether the hop goes through a set field; only set hops need keys
    /// to pick an element.
    pub through_set: bool,
}

///
/// AssociationPath
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AssociationPath {
    pub steps: Vec<PathStep>,
    pub target: EntityId,
}

///
/// Target
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Target {
    None,
    Enumeration(EnumId),
    Composition(EntityId),
    Association(AssociationPath),
}

///
/// ResolvedConstraints
///

#[derive(Clone, Debug, Default)]
pub struct ResolvedConstraints {
    pub min_length: Option<u32>,
    pub max_length: Option<u32>,
    pub pattern: Option<Regex>,
}

impl ResolvedConstraints {
    /// Every constraint the text violates.
    #[must_use]
    pub fn violations(&self, text: &str) -> Vec<String> {
        let mut out = Vec::new();
        let len = text.chars().count();

        if let Some(min) = self.min_length
            && len < min as usize
        {
            out.push(format!("length {len} is below minimum {min}"));
        }
        if let Some(max) = self.max_length
            && len > max as usize
        {
            out.push(format!("length {len} exceeds maximum {max}"));
        }
        if let Some(pattern) = &self.pattern
            && !pattern.is_match(text)
        {
            out.push(format!("value does not match pattern '{}'", pattern.as_str()));
        }

        out
    }
}

impl PartialEq for ResolvedConstraints {
    fn eq(&self, other: &Self) -> bool {
        self.min_length == other.min_length
            && self.max_length == other.max_length
            && self.pattern.as_ref().map(Regex::as_str) == other.pattern.as_ref().map(Regex::as_str)
    }
}

impl Eq for ResolvedConstraints {}

///
/// ResolvedField
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResolvedField {
    pub index: usize,
    pub name: String,
    pub qualified_name: QualifiedName,
    pub field_type: FieldType,
    pub multiplicity: Multiplicity,
    pub is_key: bool,
    pub target: Target,
    pub constraints: ResolvedConstraints,
    pub bounds: ElementBounds,
    pub exists_if: Option<Expr>,
    pub providers: Providers,
}

impl ResolvedField {
    #[must_use]
    pub const fn composition_target(&self) -> Option<EntityId> {
        match self.target {
            Target::Composition(id) => Some(id),
            _ => None,
        }
    }

    #[must_use]
    pub const fn enumeration_target(&self) -> Option<EnumId> {
        match self.target {
            Target::Enumeration(id) => Some(id),
            _ => None,
        }
    }

    #[must_use]
    pub const fn association_path(&self) -> Option<&AssociationPath> {
        match &self.target {
            Target::Association(path) => Some(path),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_collection(&self) -> bool {
        self.multiplicity.is_collection()
    }
}

///
/// ResolvedEntity
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResolvedEntity {
    pub(crate) id: EntityId,
    pub(crate) name: String,
    pub(crate) package: String,
    pub(crate) qualified_name: QualifiedName,
    pub(crate) fields: Vec<ResolvedField>,
    pub(crate) index: BTreeMap<String, usize>,
    /// Field positions of the key fields, sorted by field name.
    pub(crate) keys: Vec<usize>,
}

impl ResolvedEntity {
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn package(&self) -> &str {
        &self.package
    }

    #[must_use]
    pub const fn qualified_name(&self) -> &QualifiedName {
        &self.qualified_name
    }

    #[must_use]
    pub fn fields(&self) -> &[ResolvedField] {
        &self.fields
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&ResolvedField> {
        self.position(name).map(|i| &self.fields[i])
    }

    /// Field metadata by position. Positions come from this entity, so an
    /// out-of-range position is a bug.
    #[must_use]
    pub fn field_at(&self, position: usize) -> &ResolvedField {
        &self.fields[position]
    }

    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Key fields in sorted (by name) order.
    pub fn keys(&self) -> impl Iterator<Item = &ResolvedField> {
        self.keys.iter().map(|i| &self.fields[*i])
    }

    #[must_use]
    pub fn key_positions(&self) -> &[usize] {
        &self.keys
    }

    #[must_use]
    pub const fn has_keys(&self) -> bool {
        !self.keys.is_empty()
    }
}

///
/// ResolvedEnumeration
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResolvedEnumeration {
    pub(crate) id: EnumId,
    pub(crate) name: String,
    pub(crate) qualified_name: QualifiedName,
    pub(crate) values: Vec<String>,
}

impl ResolvedEnumeration {
    #[must_use]
    pub const fn id(&self) -> EnumId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn qualified_name(&self) -> &QualifiedName {
        &self.qualified_name
    }

    #[must_use]
    pub fn values(&self) -> &[String] {
        &self.values
    }

    #[must_use]
    pub fn contains(&self, value: &str) -> bool {
        self.values.iter().any(|v| v == value)
    }
}

///
/// ResolvedMetaModel
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResolvedMetaModel {
    pub(crate) source: MetaModel,
    pub(crate) root: EntityId,
    pub(crate) entities: Vec<ResolvedEntity>,
    pub(crate) enumerations: Vec<ResolvedEnumeration>,
    pub(crate) names: BTreeMap<QualifiedName, ElementId>,
}

impl ResolvedMetaModel {
    /// The declared model this snapshot was resolved from.
    #[must_use]
    pub const fn source(&self) -> &MetaModel {
        &self.source
    }

    #[must_use]
    pub const fn root(&self) -> EntityId {
        self.root
    }

    #[must_use]
    pub fn root_entity(&self) -> &ResolvedEntity {
        self.entity(self.root)
    }

    /// Look up an entity by id.
    ///
    /// Ids are only minted by the snapshot that owns them, so an unknown id
    /// is an internal invariant violation.
    #[must_use]
    pub fn entity(&self, id: EntityId) -> &ResolvedEntity {
        &self.entities[id.0]
    }

    #[must_use]
    pub fn enumeration(&self, id: EnumId) -> &ResolvedEnumeration {
        &self.enumerations[id.0]
    }

    #[must_use]
    pub fn entities(&self) -> &[ResolvedEntity] {
        &self.entities
    }

    #[must_use]
    pub fn enumerations(&self) -> &[ResolvedEnumeration] {
        &self.enumerations
    }

    #[must_use]
    pub fn find_entity(&self, package: &str, name: &str) -> Option<EntityId> {
        match self.names.get(&QualifiedName::element(package, name)) {
            Some(ElementId::Entity(id)) => Some(*id),
            _ => None,
        }
    }

    #[must_use]
    pub fn find_enumeration(&self, package: &str, name: &str) -> Option<EnumId> {
        match self.names.get(&QualifiedName::element(package, name)) {
            Some(ElementId::Enumeration(id)) => Some(*id),
            _ => None,
        }
    }

    /// Field metadata for a field position on an entity.
    #[must_use]
    pub fn field(&self, entity: EntityId, position: usize) -> &ResolvedField {
        &self.entity(entity).fields[position]
    }
}
