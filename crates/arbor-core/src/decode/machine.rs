//! The decoder's machines.
//!
//! Each machine consumes tokens for one syntactic construct and answers
//! every token with a [`Transition`]. A completed machine hands its
//! [`Output`] to the machine below it on the stack, which may complete in
//! turn (an implicit list closes after its single element).

use super::{
    DataError,
    aux::{AuxRegistry, aux_key, split_aux_key},
    scalar,
};
use crate::{
    obs::sink::{self, MetricsEvent},
    token::{Scalar, Token},
    traverse::{PathSegment, render_path},
    tree::{Association, Entity, Field, Password1way, Password2way, Value, merge_element},
};
use arbor_schema::{
    resolved::{EntityId, ResolvedField, ResolvedMetaModel},
    types::{FieldType, Multiplicity},
};
use serde_json::{Map, Number, Value as JsonValue};
use std::{mem, sync::Arc};

///
/// Cx
/// Decode-wide state a machine may read or report into.
///

pub(super) struct Cx<'a> {
    pub meta: &'a Arc<ResolvedMetaModel>,
    pub path: &'a [PathSegment],
    pub errors: &'a mut Vec<DataError>,
    pub skipped: &'a mut Vec<String>,
    pub aux: &'a AuxRegistry,
    pub wildcard_merge: bool,
}

impl Cx<'_> {
    fn error(&mut self, message: impl Into<String>) {
        self.errors.push(DataError {
            path: render_path(self.path, None),
            message: message.into(),
        });
    }

    fn error_at(&mut self, seg: PathSegment, message: impl Into<String>) {
        self.errors.push(DataError {
            path: render_path(self.path, Some(&seg)),
            message: message.into(),
        });
    }

    fn skip(&mut self, entity: &Entity, key: &str) {
        sink::record(MetricsEvent::UnknownFieldSkipped {
            entity: entity.resolved().qualified_name().as_str(),
            key,
        });
        self.skipped
            .push(render_path(self.path, Some(&PathSegment::Field(key.to_string()))));
    }
}

///
/// Unexpected
/// A token that cannot occur at this point of a well-formed stream.
///

#[derive(Debug)]
pub(super) struct Unexpected {
    pub expected: &'static str,
    pub found: &'static str,
}

const fn unexpected(expected: &'static str, token: &Token) -> Unexpected {
    Unexpected {
        expected,
        found: token.kind(),
    }
}

///
/// Output
///

#[derive(Debug)]
pub(super) enum Output {
    Entity(Entity),
    Value(Option<Value>),
    List(Vec<Value>),
    Set(Vec<Entity>),
    Aux { name: String, value: JsonValue },
    Nothing,
}

///
/// Transition
///

pub(super) enum Transition {
    Stay,
    /// Push a machine; `replay` feeds the current token to it again.
    Push {
        machine: Machine,
        segment: Option<PathSegment>,
        replay: Option<Token>,
    },
    Complete(Output),
}

impl Transition {
    const fn skip(replay: Option<Token>) -> Self {
        Self::Push {
            machine: Machine::Skip(SkipMachine { depth: 0 }),
            segment: None,
            replay,
        }
    }
}

///
/// Machine
///

pub(super) enum Machine {
    Document(DocumentMachine),
    Entity(EntityMachine),
    List(ListMachine),
    Association(AssociationMachine),
    Scalar(ScalarMachine),
    Password(PasswordMachine),
    Aux(AuxMachine),
    Skip(SkipMachine),
}

impl Machine {
    pub(super) fn on_token(
        &mut self,
        token: Token,
        cx: &mut Cx<'_>,
    ) -> Result<Transition, Unexpected> {
        match self {
            Self::Document(m) => m.on_token(token),
            Self::Entity(m) => m.on_token(token, cx),
            Self::List(m) => m.on_token(token, cx),
            Self::Association(m) => m.on_token(token, cx),
            Self::Scalar(m) => m.on_token(token, cx),
            Self::Password(m) => m.on_token(token, cx),
            Self::Aux(m) => m.on_token(token),
            Self::Skip(m) => Ok(m.on_token(&token)),
        }
    }

    /// Accept a completed child's output; `Some` completes this machine too.
    pub(super) fn on_child(&mut self, output: Output, cx: &mut Cx<'_>) -> Option<Output> {
        match self {
            Self::Document(m) => m.on_child(output),
            Self::Entity(m) => m.on_child(output, cx),
            Self::List(m) => m.on_child(output, cx),
            Self::Association(m) => m.on_child(output),
            Self::Password(_) | Self::Scalar(_) | Self::Aux(_) | Self::Skip(_) => None,
        }
    }
}

// ----------------------------------------------------------------------
// Document
// ----------------------------------------------------------------------

pub(super) struct DocumentMachine {
    root: Option<Entity>,
}

impl DocumentMachine {
    pub(super) const fn new(root: Entity) -> Self {
        Self { root: Some(root) }
    }

    fn on_token(&mut self, token: Token) -> Result<Transition, Unexpected> {
        match (token, self.root.take()) {
            (Token::ObjectStart, Some(root)) => Ok(Transition::Push {
                machine: Machine::Entity(EntityMachine::new(root, false)),
                segment: None,
                replay: None,
            }),
            (token, _) => Err(unexpected("object", &token)),
        }
    }

    fn on_child(&mut self, output: Output) -> Option<Output> {
        Some(output)
    }
}

// ----------------------------------------------------------------------
// Entity
// ----------------------------------------------------------------------

pub(super) struct EntityMachine {
    entity: Entity,
    key_only: bool,
    // field whose value token is expected next
    pending: Option<usize>,
    // field the pushed child machine is decoding
    active: Option<usize>,
}

impl EntityMachine {
    pub(super) const fn new(entity: Entity, key_only: bool) -> Self {
        Self {
            entity,
            key_only,
            pending: None,
            active: None,
        }
    }

    fn on_token(&mut self, token: Token, cx: &mut Cx<'_>) -> Result<Transition, Unexpected> {
        match (self.pending.take(), token) {
            (None, Token::Key(key)) => Ok(self.on_key(key, cx)),
            (None, Token::ObjectEnd) => {
                let empty = Entity::new(self.entity.meta(), self.entity.id());
                Ok(Transition::Complete(Output::Entity(mem::replace(
                    &mut self.entity,
                    empty,
                ))))
            }
            (None, token) => Err(unexpected("key or end of object", &token)),
            (Some(pos), token) => self.on_value(pos, token, cx),
        }
    }

    fn on_key(&mut self, key: String, cx: &mut Cx<'_>) -> Transition {
        let resolved = self.entity.resolved();

        if let Some((field, aux)) = split_aux_key(&key) {
            return match resolved.position(field) {
                Some(pos) if cx.aux.contains(aux) => {
                    let name = aux.to_string();
                    self.active = Some(pos);
                    Transition::Push {
                        machine: Machine::Aux(AuxMachine::new(name)),
                        segment: Some(PathSegment::Field(key)),
                        replay: None,
                    }
                }
                _ => {
                    cx.skip(&self.entity, &key);
                    Transition::skip(None)
                }
            };
        }

        match resolved.position(&key) {
            Some(pos) if self.key_only && !resolved.field_at(pos).is_key => {
                cx.error_at(
                    PathSegment::Field(key),
                    "association path keys may only hold key fields",
                );
                Transition::skip(None)
            }
            Some(pos) => {
                self.pending = Some(pos);
                Transition::Stay
            }
            None => {
                cx.skip(&self.entity, &key);
                Transition::skip(None)
            }
        }
    }

    fn on_value(
        &mut self,
        pos: usize,
        token: Token,
        cx: &mut Cx<'_>,
    ) -> Result<Transition, Unexpected> {
        if matches!(token, Token::ObjectEnd | Token::ListEnd | Token::Key(_)) {
            return Err(unexpected("field value", &token));
        }

        let model = Arc::clone(self.entity.meta());
        let field = model.field(self.entity.id(), pos);
        let segment = Some(PathSegment::Field(field.name.clone()));
        let is_null = matches!(token, Token::Scalar(Scalar::Null));
        self.active = Some(pos);

        if field.is_collection() {
            if is_null {
                // null clears a list; a set only ever grows by merging
                if field.multiplicity == Multiplicity::List {
                    self.entity.put_at(pos, Field::List(Vec::new()));
                }
                return Ok(Transition::Stay);
            }
            let list = if field.multiplicity == Multiplicity::Set {
                let existing = match self.entity.take_at(pos) {
                    Some(Field::Set(elements)) => elements,
                    _ => Vec::new(),
                };
                ListMachine::new(self.entity.id(), pos, Items::Set(existing))
            } else {
                ListMachine::new(self.entity.id(), pos, Items::Values(Vec::new()))
            };

            return Ok(Transition::Push {
                machine: Machine::List(list),
                segment,
                replay: Some(token),
            });
        }

        if is_null {
            self.entity.put_at(pos, Field::Single(None));
            return Ok(Transition::Stay);
        }

        let transition = match (field.field_type, token) {
            (FieldType::Composition, Token::ObjectStart) => {
                let child = match self.entity.take_at(pos) {
                    Some(Field::Single(Some(Value::Composition(child)))) => *child,
                    _ => Entity::new(&model, composition_target(field)),
                };
                Transition::Push {
                    machine: Machine::Entity(Self::new(child, self.key_only)),
                    segment,
                    replay: None,
                }
            }
            (FieldType::Association, token) => Transition::Push {
                machine: Machine::Association(AssociationMachine::new(field)),
                segment,
                replay: Some(token),
            },
            (ty @ (FieldType::Password1way | FieldType::Password2way), Token::ObjectStart) => {
                Transition::Push {
                    machine: Machine::Password(PasswordMachine::new(ty)),
                    segment,
                    replay: None,
                }
            }
            (ty, token @ Token::Scalar(_)) if ty.is_primitive() || ty == FieldType::Enumeration => {
                Transition::Push {
                    machine: Machine::Scalar(ScalarMachine {
                        owner: self.entity.id(),
                        position: pos,
                    }),
                    segment,
                    replay: Some(token),
                }
            }
            (_, token) => {
                cx.error_at(
                    PathSegment::Field(field.name.clone()),
                    format!("expected {}, found {}", expected_value(field), token.kind()),
                );
                Transition::skip(Some(token))
            }
        };

        Ok(transition)
    }

    fn on_child(&mut self, output: Output, cx: &mut Cx<'_>) -> Option<Output> {
        let pos = self.active.take()?;

        match output {
            Output::Entity(child) => self
                .entity
                .put_at(pos, Field::Single(Some(Value::Composition(Box::new(child))))),
            Output::Value(value) => self.entity.put_at(pos, Field::Single(value)),
            Output::List(values) => self.entity.put_at(pos, Field::List(values)),
            Output::Set(elements) => self.entity.put_at(pos, Field::Set(elements)),
            Output::Aux { name, value } => match cx.aux.check(&name, &value) {
                Some(Ok(())) => self.entity.put_aux_at(pos, name, value),
                Some(Err(message)) => {
                    let key = aux_key(&self.entity.resolved().field_at(pos).name, &name);
                    cx.error_at(PathSegment::Field(key), message);
                }
                None => {}
            },
            Output::Nothing => {}
        }

        None
    }
}

fn composition_target(field: &ResolvedField) -> EntityId {
    let Some(target) = field.composition_target() else {
        unreachable!("composition field '{}' resolved without a target", field.qualified_name);
    };

    target
}

fn expected_value(field: &ResolvedField) -> String {
    match field.field_type {
        FieldType::Composition => "an object".to_string(),
        FieldType::Password1way | FieldType::Password2way => "a password object".to_string(),
        ty => ty.to_string(),
    }
}

// ----------------------------------------------------------------------
// List
// ----------------------------------------------------------------------

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum ListState {
    Start,
    /// Closed by an explicit `ListEnd`.
    Open,
    /// A bare element stood in for the list; closes after that element.
    Implicit,
}

pub(super) enum Items {
    Values(Vec<Value>),
    Set(Vec<Entity>),
}

pub(super) struct ListMachine {
    owner: EntityId,
    position: usize,
    state: ListState,
    items: Items,
    next: usize,
}

impl ListMachine {
    pub(super) const fn new(owner: EntityId, position: usize, items: Items) -> Self {
        Self {
            owner,
            position,
            state: ListState::Start,
            items,
            next: 0,
        }
    }

    fn on_token(&mut self, token: Token, cx: &mut Cx<'_>) -> Result<Transition, Unexpected> {
        match (self.state, token) {
            (ListState::Start, Token::ListStart) => {
                self.state = ListState::Open;
                Ok(Transition::Stay)
            }
            (ListState::Start, token) => {
                self.state = ListState::Implicit;
                match self.element(token, cx)? {
                    // nothing was pushed, so nothing will close the list later
                    Transition::Stay => Ok(Transition::Complete(self.finish())),
                    other => Ok(other),
                }
            }
            (ListState::Open, Token::ListEnd) => Ok(Transition::Complete(self.finish())),
            (ListState::Open, token) => self.element(token, cx),
            (ListState::Implicit, token) => Err(unexpected("end of implicit list", &token)),
        }
    }

    fn element(&mut self, token: Token, cx: &mut Cx<'_>) -> Result<Transition, Unexpected> {
        if matches!(token, Token::ObjectEnd | Token::ListEnd | Token::Key(_)) {
            return Err(unexpected("list element", &token));
        }

        let model = cx.meta;
        let field = model.field(self.owner, self.position);
        let index = self.next;
        self.next += 1;
        let segment = Some(PathSegment::Index(index));

        let transition = match (&self.items, token) {
            (_, Token::Scalar(Scalar::Null)) => {
                cx.error_at(PathSegment::Index(index), "list elements cannot be null");
                Transition::Stay
            }
            (Items::Set(_), Token::ObjectStart) => Transition::Push {
                machine: Machine::Entity(EntityMachine::new(
                    Entity::new(model, composition_target(field)),
                    false,
                )),
                segment,
                replay: None,
            },
            (Items::Values(_), token @ Token::ObjectStart)
                if field.field_type == FieldType::Association =>
            {
                Transition::Push {
                    machine: Machine::Association(AssociationMachine::new(field)),
                    segment,
                    replay: Some(token),
                }
            }
            (Items::Values(_), token @ Token::Scalar(_))
                if field.field_type.is_primitive() || field.field_type == FieldType::Enumeration =>
            {
                Transition::Push {
                    machine: Machine::Scalar(ScalarMachine {
                        owner: self.owner,
                        position: self.position,
                    }),
                    segment,
                    replay: Some(token),
                }
            }
            (_, token) => {
                cx.error_at(
                    PathSegment::Index(index),
                    format!(
                        "expected {} element, found {}",
                        expected_value(field),
                        token.kind()
                    ),
                );
                Transition::skip(Some(token))
            }
        };

        Ok(transition)
    }

    fn on_child(&mut self, output: Output, cx: &mut Cx<'_>) -> Option<Output> {
        let index = self.next.saturating_sub(1);

        match (&mut self.items, output) {
            (Items::Values(values), Output::Value(Some(value))) => values.push(value),
            (Items::Set(elements), Output::Entity(element)) => {
                if cx.wildcard_merge {
                    match elements.first_mut() {
                        Some(first) => first.merge(element),
                        None => elements.push(element),
                    }
                } else if element.has_keys() {
                    merge_element(elements, element);
                } else {
                    cx.error_at(
                        PathSegment::Index(index),
                        format!(
                            "set element is missing key fields: {}",
                            element.missing_keys().join(", ")
                        ),
                    );
                }
            }
            _ => {}
        }

        (self.state == ListState::Implicit).then(|| self.finish())
    }

    fn finish(&mut self) -> Output {
        match &mut self.items {
            Items::Values(values) => Output::List(mem::take(values)),
            Items::Set(elements) => Output::Set(mem::take(elements)),
        }
    }
}

// ----------------------------------------------------------------------
// Association
// ----------------------------------------------------------------------

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum AssociationState {
    Start,
    Key,
    PathKeys,
    Stubs,
}

pub(super) struct AssociationMachine {
    steps: Vec<EntityId>,
    state: AssociationState,
    stubs: Vec<Entity>,
    // stubs that could not be decoded, still counted against the path
    rejected: usize,
}

impl AssociationMachine {
    fn new(field: &ResolvedField) -> Self {
        let steps = field
            .association_path()
            .map(|path| path.steps.iter().map(|step| step.entity).collect())
            .unwrap_or_default();

        Self {
            steps,
            state: AssociationState::Start,
            stubs: Vec::new(),
            rejected: 0,
        }
    }

    fn on_token(&mut self, token: Token, cx: &mut Cx<'_>) -> Result<Transition, Unexpected> {
        let transition = match (self.state, token) {
            (AssociationState::Start, Token::ObjectStart) => {
                self.state = AssociationState::Key;
                Transition::Stay
            }
            (AssociationState::Start, Token::Scalar(Scalar::Null)) => {
                Transition::Complete(Output::Value(None))
            }
            (AssociationState::Start, token) => {
                cx.error(format!(
                    "expected an association object, found {}",
                    token.kind()
                ));
                Transition::skip(Some(token))
            }

            (AssociationState::Key, Token::Key(key)) if key == "path_keys" => {
                self.state = AssociationState::PathKeys;
                Transition::Stay
            }
            (AssociationState::Key, Token::Key(key)) => {
                cx.error(format!("unknown association key '{key}'"));
                Transition::skip(None)
            }
            (AssociationState::Key, Token::ObjectEnd) => Transition::Complete(self.finish(cx)),

            (AssociationState::PathKeys, Token::ListStart) => {
                self.state = AssociationState::Stubs;
                Transition::Stay
            }
            (AssociationState::PathKeys, Token::Scalar(Scalar::Null)) => {
                self.state = AssociationState::Key;
                Transition::Stay
            }
            (AssociationState::PathKeys, token) => {
                cx.error("path_keys must be a list");
                self.state = AssociationState::Key;
                Transition::skip(Some(token))
            }

            (AssociationState::Stubs, Token::ListEnd) => {
                self.state = AssociationState::Key;
                Transition::Stay
            }
            (AssociationState::Stubs, Token::ObjectStart) => {
                let index = self.stubs.len() + self.rejected;
                match self.steps.get(index) {
                    Some(&id) => Transition::Push {
                        machine: Machine::Entity(EntityMachine::new(
                            Entity::new(cx.meta, id),
                            true,
                        )),
                        segment: Some(PathSegment::Index(index)),
                        replay: None,
                    },
                    None => {
                        self.rejected += 1;
                        Transition::skip(Some(Token::ObjectStart))
                    }
                }
            }
            (AssociationState::Stubs, token @ (Token::Scalar(_) | Token::ListStart)) => {
                let index = self.stubs.len() + self.rejected;
                cx.error_at(PathSegment::Index(index), "path keys must be objects");
                self.rejected += 1;
                Transition::skip(Some(token))
            }

            (_, token) => return Err(unexpected("association", &token)),
        };

        Ok(transition)
    }

    fn on_child(&mut self, output: Output) -> Option<Output> {
        if self.state == AssociationState::Start {
            // a skipped non-object value
            return Some(Output::Nothing);
        }
        if let Output::Entity(stub) = output {
            self.stubs.push(stub);
        }

        None
    }

    fn finish(&mut self, cx: &mut Cx<'_>) -> Output {
        let found = self.stubs.len() + self.rejected;

        if found == 0 {
            // an association without path keys is a null reference
            Output::Value(None)
        } else if found != self.steps.len() {
            cx.error(format!(
                "association path expects {} path keys, found {found}",
                self.steps.len()
            ));
            Output::Nothing
        } else if self.rejected > 0 {
            Output::Nothing
        } else {
            Output::Value(Some(Value::Association(Association::new(mem::take(
                &mut self.stubs,
            )))))
        }
    }
}

// ----------------------------------------------------------------------
// Scalar
// ----------------------------------------------------------------------

pub(super) struct ScalarMachine {
    owner: EntityId,
    position: usize,
}

impl ScalarMachine {
    fn on_token(&self, token: Token, cx: &mut Cx<'_>) -> Result<Transition, Unexpected> {
        let Token::Scalar(scalar) = token else {
            return Err(unexpected("scalar", &token));
        };
        if scalar == Scalar::Null {
            return Ok(Transition::Complete(Output::Value(None)));
        }

        let field = cx.meta.field(self.owner, self.position);
        let output = match scalar::parse_value(cx.meta, field, scalar) {
            Ok(value) => Output::Value(Some(value)),
            Err(message) => {
                cx.error(message);
                Output::Nothing
            }
        };

        Ok(Transition::Complete(output))
    }
}

// ----------------------------------------------------------------------
// Password
// ----------------------------------------------------------------------

enum PasswordValue {
    OneWay(Password1way),
    TwoWay(Password2way),
}

pub(super) struct PasswordMachine {
    value: PasswordValue,
    pending: Option<String>,
}

impl PasswordMachine {
    const fn new(ty: FieldType) -> Self {
        let value = match ty {
            FieldType::Password1way => PasswordValue::OneWay(Password1way {
                unhashed: None,
                hashed: None,
                hash_version: None,
            }),
            _ => PasswordValue::TwoWay(Password2way {
                unencrypted: None,
                encrypted: None,
                cipher_version: None,
            }),
        };

        Self {
            value,
            pending: None,
        }
    }

    fn on_token(&mut self, token: Token, cx: &mut Cx<'_>) -> Result<Transition, Unexpected> {
        match (self.pending.take(), token) {
            (None, Token::Key(key)) => {
                self.pending = Some(key);
                Ok(Transition::Stay)
            }
            (None, Token::ObjectEnd) => {
                let value = match &mut self.value {
                    PasswordValue::OneWay(p) => Value::Password1way(mem::take(p)),
                    PasswordValue::TwoWay(p) => Value::Password2way(mem::take(p)),
                };
                Ok(Transition::Complete(Output::Value(Some(value))))
            }
            (None, token) => Err(unexpected("key or end of object", &token)),
            (Some(key), Token::Scalar(scalar)) => {
                if let Err(message) = self.assign(&key, scalar) {
                    cx.error_at(PathSegment::Field(key), message);
                }
                Ok(Transition::Stay)
            }
            (Some(key), token @ (Token::ObjectStart | Token::ListStart)) => {
                cx.error_at(
                    PathSegment::Field(key),
                    format!("expected a scalar, found {}", token.kind()),
                );
                Ok(Transition::skip(Some(token)))
            }
            (Some(_), token) => Err(unexpected("password value", &token)),
        }
    }

    fn assign(&mut self, key: &str, scalar: Scalar) -> Result<(), String> {
        match (&mut self.value, key) {
            (PasswordValue::OneWay(p), "unhashed") => p.unhashed = text(scalar)?,
            (PasswordValue::OneWay(p), "hashed") => p.hashed = text(scalar)?,
            (PasswordValue::OneWay(p), "hash_version") => p.hash_version = version(scalar)?,
            (PasswordValue::TwoWay(p), "unencrypted") => p.unencrypted = text(scalar)?,
            (PasswordValue::TwoWay(p), "encrypted") => p.encrypted = text(scalar)?,
            (PasswordValue::TwoWay(p), "cipher_version") => p.cipher_version = version(scalar)?,
            _ => return Err(format!("unknown password key '{key}'")),
        }

        Ok(())
    }
}

fn text(scalar: Scalar) -> Result<Option<String>, String> {
    match scalar {
        Scalar::Null => Ok(None),
        Scalar::String(s) => Ok(Some(s)),
        other => Err(format!("expected string, found {}", other.kind())),
    }
}

fn version(scalar: Scalar) -> Result<Option<u32>, String> {
    match scalar {
        Scalar::Null => Ok(None),
        Scalar::Uint(v) => u32::try_from(v)
            .map(Some)
            .map_err(|_| format!("version {v} is out of range")),
        other => Err(format!("expected a version number, found {}", other.kind())),
    }
}

// ----------------------------------------------------------------------
// Aux
// ----------------------------------------------------------------------

pub(super) struct AuxMachine {
    name: String,
    // open containers with the key awaiting a value, if any
    stack: Vec<(JsonValue, Option<String>)>,
}

impl AuxMachine {
    const fn new(name: String) -> Self {
        Self {
            name,
            stack: Vec::new(),
        }
    }

    fn on_token(&mut self, token: Token) -> Result<Transition, Unexpected> {
        match token {
            Token::ObjectStart => {
                self.stack.push((JsonValue::Object(Map::new()), None));
                Ok(Transition::Stay)
            }
            Token::ListStart => {
                self.stack.push((JsonValue::Array(Vec::new()), None));
                Ok(Transition::Stay)
            }
            Token::Key(key) => match self.stack.last_mut() {
                Some((JsonValue::Object(_), pending)) => {
                    *pending = Some(key);
                    Ok(Transition::Stay)
                }
                _ => Err(unexpected("aux value", &Token::Key(key))),
            },
            Token::ObjectEnd | Token::ListEnd => match self.stack.pop() {
                Some((container, _)) => Ok(self.add(container)),
                None => Err(unexpected("aux value", &token)),
            },
            Token::Scalar(scalar) => Ok(self.add(json_scalar(scalar))),
        }
    }

    fn add(&mut self, value: JsonValue) -> Transition {
        match self.stack.last_mut() {
            None => Transition::Complete(Output::Aux {
                name: mem::take(&mut self.name),
                value,
            }),
            Some((JsonValue::Array(items), _)) => {
                items.push(value);
                Transition::Stay
            }
            Some((JsonValue::Object(map), pending)) => {
                map.insert(pending.take().unwrap_or_default(), value);
                Transition::Stay
            }
            Some(_) => unreachable!("only arrays and objects are pushed as containers"),
        }
    }
}

fn json_scalar(scalar: Scalar) -> JsonValue {
    match scalar {
        Scalar::Null => JsonValue::Null,
        Scalar::Bool(v) => JsonValue::Bool(v),
        Scalar::Int(v) => JsonValue::Number(Number::from(v)),
        Scalar::Uint(v) => JsonValue::Number(Number::from(v)),
        Scalar::Float(v) => Number::from_f64(v).map_or(JsonValue::Null, JsonValue::Number),
        Scalar::String(v) => JsonValue::String(v),
    }
}

// ----------------------------------------------------------------------
// Skip
// ----------------------------------------------------------------------

pub(super) struct SkipMachine {
    depth: usize,
}

impl SkipMachine {
    const fn on_token(&mut self, token: &Token) -> Transition {
        match token {
            Token::ObjectStart | Token::ListStart => self.depth += 1,
            Token::ObjectEnd | Token::ListEnd => self.depth = self.depth.saturating_sub(1),
            Token::Key(_) | Token::Scalar(_) => {}
        }

        if self.depth == 0 {
            Transition::Complete(Output::Nothing)
        } else {
            Transition::Stay
        }
    }
}
