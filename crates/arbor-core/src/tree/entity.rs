use crate::tree::{Field, TreeError, Value, field::merge_element};
use arbor_schema::{
    expr::ExprContext,
    provider::ProviderError,
    resolved::{EntityId, ResolvedEntity, ResolvedField, ResolvedMetaModel},
    types::{FieldType, Multiplicity},
};
use serde_json::Value as JsonValue;
use std::{collections::BTreeMap, fmt, sync::Arc};

/// Side-channel entries of one field, keyed by aux name.
pub type AuxEntries = BTreeMap<String, JsonValue>;

///
/// Entity
///
/// A bag of fields bound to one resolved entity. Field slots are addressed
/// by the field's position in the resolved entity; an empty slot is an
/// absent field.
///

#[derive(Clone)]
pub struct Entity {
    meta: Arc<ResolvedMetaModel>,
    id: EntityId,
    fields: Vec<Option<Field>>,
    aux: BTreeMap<usize, AuxEntries>,
}

impl Entity {
    #[must_use]
    pub fn new(meta: &Arc<ResolvedMetaModel>, id: EntityId) -> Self {
        let len = meta.entity(id).fields().len();

        Self {
            meta: Arc::clone(meta),
            id,
            fields: vec![None; len],
            aux: BTreeMap::new(),
        }
    }

    /// An empty instance of the schema's root entity.
    #[must_use]
    pub fn root(meta: &Arc<ResolvedMetaModel>) -> Self {
        Self::new(meta, meta.root())
    }

    #[must_use]
    pub const fn meta(&self) -> &Arc<ResolvedMetaModel> {
        &self.meta
    }

    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    #[must_use]
    pub fn resolved(&self) -> &ResolvedEntity {
        self.meta.entity(self.id)
    }

    /// Position of a field by name.
    pub fn position(&self, name: &str) -> Result<usize, TreeError> {
        self.resolved()
            .position(name)
            .ok_or_else(|| TreeError::UnknownField {
                entity: self.resolved().qualified_name().to_string(),
                field: name.to_string(),
            })
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Field> {
        self.resolved()
            .position(name)
            .and_then(|pos| self.field_at(pos))
    }

    #[must_use]
    pub fn field_at(&self, position: usize) -> Option<&Field> {
        self.fields.get(position).and_then(Option::as_ref)
    }

    /// Present fields with their metadata, in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&ResolvedField, &Field)> {
        self.resolved()
            .fields()
            .iter()
            .zip(&self.fields)
            .filter_map(|(meta, slot)| slot.as_ref().map(|field| (meta, field)))
    }

    #[must_use]
    pub fn is_present(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    #[must_use]
    pub fn is_null(&self, name: &str) -> bool {
        self.get(name).is_some_and(Field::is_null)
    }

    #[must_use]
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.get(name).and_then(Field::value)
    }

    /// String primitive or enumeration value of a single field.
    #[must_use]
    pub fn text(&self, name: &str) -> Option<&str> {
        match self.value(name)? {
            Value::Primitive(p) => p.as_str(),
            Value::Enumeration(name) => Some(name),
            _ => None,
        }
    }

    #[must_use]
    pub fn child(&self, name: &str) -> Option<&Self> {
        self.value(name).and_then(Value::as_entity)
    }

    #[must_use]
    pub fn values(&self, name: &str) -> &[Value] {
        self.get(name).map_or(&[], Field::values)
    }

    #[must_use]
    pub fn elements(&self, name: &str) -> &[Self] {
        self.get(name).map_or(&[], Field::elements)
    }

    #[must_use]
    pub fn aux(&self, name: &str) -> Option<&AuxEntries> {
        self.resolved()
            .position(name)
            .and_then(|pos| self.aux.get(&pos))
    }

    pub(crate) const fn aux_entries(&self) -> &BTreeMap<usize, AuxEntries> {
        &self.aux
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Get a field, creating it empty when absent. A created single field
    /// is an explicit null.
    pub fn field_mut(&mut self, name: &str) -> Result<&mut Field, TreeError> {
        let pos = self.position(name)?;
        let multiplicity = self.resolved().fields()[pos].multiplicity;

        Ok(self.fields[pos].get_or_insert_with(|| empty_field(multiplicity)))
    }

    /// Set a single field's value.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<(), TreeError> {
        let value = value.into();
        let pos = self.position(name)?;
        let meta = Arc::clone(&self.meta);
        let field = meta.field(self.id, pos);

        expect_shape(field, Shape::Single, "set a single value")?;
        check_value(&meta, field, &value)?;
        self.fields[pos] = Some(Field::Single(Some(value)));

        Ok(())
    }

    /// Mark a single field present with an explicit null.
    pub fn set_null(&mut self, name: &str) -> Result<(), TreeError> {
        let pos = self.position(name)?;
        expect_shape(self.resolved().field_at(pos), Shape::Single, "be null")?;
        self.fields[pos] = Some(Field::Single(None));

        Ok(())
    }

    /// Make a field absent, returning what it held.
    pub fn remove(&mut self, name: &str) -> Result<Option<Field>, TreeError> {
        let pos = self.position(name)?;
        self.aux.remove(&pos);

        Ok(self.fields[pos].take())
    }

    /// Append to a list field.
    pub fn push(&mut self, name: &str, value: impl Into<Value>) -> Result<(), TreeError> {
        let value = value.into();
        let pos = self.position(name)?;
        let meta = Arc::clone(&self.meta);
        let field = meta.field(self.id, pos);

        expect_shape(field, Shape::List, "append a value")?;
        check_value(&meta, field, &value)?;
        match self.fields[pos].get_or_insert_with(|| Field::List(Vec::new())) {
            Field::List(values) => values.push(value),
            other => *other = Field::List(vec![value]),
        }

        Ok(())
    }

    /// Insert into a set field under the merge policy; returns the index of
    /// the element that now holds the data.
    pub fn insert(&mut self, name: &str, element: Self) -> Result<usize, TreeError> {
        let pos = self.position(name)?;
        let meta = Arc::clone(&self.meta);
        let field = meta.field(self.id, pos);

        expect_shape(field, Shape::Set, "insert an element")?;
        if field.composition_target() != Some(element.id) {
            return Err(wrong_value(
                &meta,
                field,
                element.resolved().qualified_name().as_str(),
            ));
        }
        if !element.has_keys() {
            return Err(TreeError::MissingKeys {
                field: field.qualified_name.to_string(),
                missing: element.missing_keys().into_iter().map(str::to_string).collect(),
            });
        }
        let slot = self.fields[pos].get_or_insert_with(|| Field::Set(Vec::new()));
        if !matches!(slot, Field::Set(_)) {
            *slot = Field::Set(Vec::new());
        }
        let Field::Set(set) = slot else {
            unreachable!("slot was just replaced with a set");
        };

        Ok(merge_element(set, element))
    }

    /// Get the composition child of a single field, creating an empty one
    /// when the field is absent or null.
    pub fn child_mut(&mut self, name: &str) -> Result<&mut Self, TreeError> {
        let pos = self.position(name)?;
        let meta = Arc::clone(&self.meta);
        let field = meta.field(self.id, pos);

        expect_shape(field, Shape::Single, "hold a child entity")?;
        let Some(target) = field.composition_target() else {
            return Err(wrong_value(&meta, field, "composition"));
        };

        let slot = &mut self.fields[pos];
        if !matches!(slot, Some(Field::Single(Some(Value::Composition(_))))) {
            *slot = Some(Field::Single(Some(Value::Composition(Box::new(Self::new(
                &meta, target,
            ))))));
        }
        let Some(Field::Single(Some(Value::Composition(child)))) = slot else {
            unreachable!("composition slot was just filled");
        };

        Ok(child)
    }

    /// A detached, empty element for a set field.
    pub fn new_element(&self, name: &str) -> Result<Self, TreeError> {
        let pos = self.position(name)?;
        let field = self.resolved().field_at(pos);

        expect_shape(field, Shape::Set, "create an element")?;
        field
            .composition_target()
            .map(|target| Self::new(&self.meta, target))
            .ok_or_else(|| wrong_value(&self.meta, field, "composition"))
    }

    /// Attach side-channel data to a field.
    pub fn set_aux(&mut self, name: &str, aux: &str, value: JsonValue) -> Result<(), TreeError> {
        let pos = self.position(name)?;
        self.aux
            .entry(pos)
            .or_default()
            .insert(aux.to_string(), value);

        Ok(())
    }

    pub(crate) fn take_at(&mut self, position: usize) -> Option<Field> {
        self.fields[position].take()
    }

    pub(crate) fn put_at(&mut self, position: usize, field: Field) {
        self.fields[position] = Some(field);
    }

    pub(crate) fn put_aux_at(&mut self, position: usize, aux: String, value: JsonValue) {
        self.aux.entry(position).or_default().insert(aux, value);
    }

    // ------------------------------------------------------------------
    // Keys, shapes and merging
    // ------------------------------------------------------------------

    /// Key-only comparison: same entity and equal key fields. Composition
    /// keys compare by their own keys.
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        self.id == other.id
            && self
                .resolved()
                .key_positions()
                .iter()
                .all(|&pos| key_eq(self.field_at(pos), other.field_at(pos)))
    }

    /// True when every key field holds a value.
    #[must_use]
    pub fn has_keys(&self) -> bool {
        self.resolved()
            .key_positions()
            .iter()
            .all(|&pos| self.field_at(pos).and_then(Field::value).is_some())
    }

    /// Names of key fields without a value.
    #[must_use]
    pub fn missing_keys(&self) -> Vec<&str> {
        self.resolved()
            .keys()
            .filter(|key| self.field_at(key.index).and_then(Field::value).is_none())
            .map(|key| key.name.as_str())
            .collect()
    }

    /// Copy of the key fields only.
    #[must_use]
    pub fn key_stub(&self) -> Self {
        let mut stub = Self::new(&self.meta, self.id);
        for &pos in self.resolved().key_positions() {
            stub.fields[pos].clone_from(&self.fields[pos]);
        }

        stub
    }

    /// Recreate the nested structure without values: key fields are kept so
    /// set elements stay identifiable, compositions and sets recurse,
    /// everything else is dropped.
    #[must_use]
    pub fn clone_shape(&self) -> Self {
        let mut shape = Self::new(&self.meta, self.id);
        for (pos, (meta, slot)) in self.resolved().fields().iter().zip(&self.fields).enumerate() {
            let Some(field) = slot else {
                continue;
            };
            shape.fields[pos] = if meta.is_key {
                Some(field.clone())
            } else {
                match field {
                    Field::Single(Some(Value::Composition(child))) => Some(Field::Single(Some(
                        Value::Composition(Box::new(child.clone_shape())),
                    ))),
                    Field::Set(elements) => {
                        Some(Field::Set(elements.iter().map(Self::clone_shape).collect()))
                    }
                    _ => None,
                }
            };
        }

        shape
    }

    /// Merge `other` into this entity: present incoming fields overwrite
    /// (explicit nulls included), absent ones leave this entity alone,
    /// sets merge element-wise by key and single compositions recurse.
    pub fn merge(&mut self, other: Self) {
        if self.id != other.id {
            *self = other;
            return;
        }
        for (pos, incoming) in other.fields.into_iter().enumerate() {
            let Some(incoming) = incoming else {
                continue;
            };
            match &mut self.fields[pos] {
                Some(existing) => existing.merge(incoming),
                None => self.fields[pos] = Some(incoming),
            }
        }
        for (pos, entries) in other.aux {
            self.aux.entry(pos).or_default().extend(entries);
        }
    }

    /// Hash or encrypt every password in the tree that has a provider, then
    /// drop its plaintext.
    pub fn seal_passwords(&mut self) -> Result<(), ProviderError> {
        let meta = Arc::clone(&self.meta);
        let resolved = meta.entity(self.id);

        for (field_meta, slot) in resolved.fields().iter().zip(&mut self.fields) {
            let providers = &field_meta.providers;
            match slot {
                Some(Field::Single(Some(Value::Password1way(password)))) => {
                    if let Some(hasher) = providers.hasher() {
                        password.seal(hasher)?;
                    }
                }
                Some(Field::Single(Some(Value::Password2way(password)))) => {
                    if let Some(cipher) = providers.cipher() {
                        password.seal(cipher)?;
                    }
                }
                Some(Field::Single(Some(Value::Composition(child)))) => child.seal_passwords()?,
                Some(Field::Set(elements)) => {
                    for element in elements {
                        element.seal_passwords()?;
                    }
                }
                _ => {}
            }
        }

        Ok(())
    }
}

fn key_eq(a: Option<&Field>, b: Option<&Field>) -> bool {
    match (a.and_then(Field::value), b.and_then(Field::value)) {
        (Some(Value::Composition(x)), Some(Value::Composition(y))) => x.matches(y),
        (x, y) => x == y,
    }
}

const fn empty_field(multiplicity: Multiplicity) -> Field {
    match multiplicity {
        Multiplicity::Required | Multiplicity::Optional => Field::Single(None),
        Multiplicity::List => Field::List(Vec::new()),
        Multiplicity::Set => Field::Set(Vec::new()),
    }
}

#[derive(Clone, Copy, Eq, PartialEq)]
enum Shape {
    Single,
    List,
    Set,
}

fn expect_shape(
    field: &ResolvedField,
    want: Shape,
    operation: &'static str,
) -> Result<(), TreeError> {
    let have = match field.multiplicity {
        Multiplicity::Required | Multiplicity::Optional => Shape::Single,
        Multiplicity::List => Shape::List,
        Multiplicity::Set => Shape::Set,
    };
    if have == want {
        Ok(())
    } else {
        Err(TreeError::WrongShape {
            field: field.qualified_name.to_string(),
            multiplicity: field.multiplicity.as_str(),
            operation,
        })
    }
}

fn wrong_value(meta: &ResolvedMetaModel, field: &ResolvedField, found: &str) -> TreeError {
    let expected = match (field.composition_target(), field.association_path()) {
        (Some(target), _) => meta.entity(target).qualified_name().to_string(),
        (_, Some(path)) => format!(
            "association to {}",
            meta.entity(path.target).qualified_name()
        ),
        _ => field.field_type.to_string(),
    };

    TreeError::WrongValue {
        field: field.qualified_name.to_string(),
        expected,
        found: found.to_string(),
    }
}

// Type check a value against the field it is written to.
fn check_value(
    meta: &ResolvedMetaModel,
    field: &ResolvedField,
    value: &Value,
) -> Result<(), TreeError> {
    let ok = match (field.field_type, value) {
        (ty, Value::Primitive(p)) => ty == p.field_type(),
        (FieldType::Enumeration, Value::Enumeration(name)) => {
            let Some(id) = field.enumeration_target() else {
                return Err(wrong_value(meta, field, "enumeration"));
            };
            let enumeration = meta.enumeration(id);
            if !enumeration.contains(name) {
                return Err(TreeError::UnknownEnumValue {
                    field: field.qualified_name.to_string(),
                    enumeration: enumeration.qualified_name().to_string(),
                    value: name.clone(),
                });
            }
            true
        }
        (FieldType::Composition, Value::Composition(child)) => {
            if field.composition_target() != Some(child.id) {
                return Err(wrong_value(
                    meta,
                    field,
                    child.resolved().qualified_name().as_str(),
                ));
            }
            true
        }
        (FieldType::Association, Value::Association(association)) => {
            field.association_path().is_some_and(|path| {
                association.is_empty()
                    || (association.path_keys.len() == path.steps.len()
                        && association
                            .path_keys
                            .iter()
                            .zip(&path.steps)
                            .all(|(stub, step)| stub.id == step.entity))
            })
        }
        (FieldType::Password1way, Value::Password1way(_))
        | (FieldType::Password2way, Value::Password2way(_)) => true,
        _ => false,
    };

    if ok {
        Ok(())
    } else {
        Err(wrong_value(meta, field, value.kind()))
    }
}

impl ExprContext for Entity {
    fn is_present(&self, field: &str) -> bool {
        self.value(field).is_some()
    }

    fn text(&self, field: &str) -> Option<String> {
        self.value(field).and_then(Value::text)
    }
}

// Equality ignores the resolved snapshot: same entity, same contents.
impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.fields == other.fields && self.aux == other.aux
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("Entity");
        out.field("type", &self.resolved().qualified_name().as_str());
        for (meta, field) in self.fields() {
            out.field(&meta.name, field);
        }
        if !self.aux.is_empty() {
            out.field("aux", &self.aux);
        }

        out.finish()
    }
}
