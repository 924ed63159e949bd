//! Encoder: a traversal visitor that turns a tree into wire tokens.
//!
//! Decoding the emitted tokens rebuilds an equal tree, except for password
//! parts the policy redacts.

mod scalar;

#[cfg(test)]
mod tests;

use crate::{
    decode::aux_key,
    json::JsonWriter,
    obs::sink::{self, MetricsEvent},
    token::{Scalar, Token, TokenSink},
    traverse::{Flow, Node, Visitor, VisitorContext, walk},
    tree::{AuxEntries, Entity, Field, Password1way, Password2way, Value},
};
use arbor_schema::{provider::ProviderError, resolved::ResolvedField};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::{
    convert::Infallible,
    io::{self, Write},
};
use thiserror::Error as ThisError;

///
/// EncodeError
///

#[derive(Debug, ThisError)]
pub enum EncodeError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl From<Infallible> for EncodeError {
    fn from(never: Infallible) -> Self {
        match never {}
    }
}

///
/// PasswordPolicy
/// Which password parts reach the wire.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PasswordPolicy {
    /// No password parts at all.
    None,
    /// Hashes and ciphertexts only; plaintext is hashed or encrypted on the
    /// way out when the field has a provider.
    #[default]
    HashedAndEncrypted,
    /// Every part that is present, plaintext included.
    All,
}

///
/// EncodeOptions
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct EncodeOptions {
    pub password_policy: PasswordPolicy,
    pub pretty: bool,
}

///
/// Encoder
///

#[derive(Clone, Copy, Debug, Default)]
pub struct Encoder {
    options: EncodeOptions,
}

impl Encoder {
    #[must_use]
    pub const fn new(options: EncodeOptions) -> Self {
        Self { options }
    }

    #[must_use]
    pub const fn options(&self) -> &EncodeOptions {
        &self.options
    }

    /// Emit `entity` into any token sink.
    pub fn encode<S>(&self, entity: &Entity, out: &mut S) -> Result<(), EncodeError>
    where
        S: TokenSink,
        EncodeError: From<S::Error>,
    {
        let mut visitor = EncodeVisitor {
            sink: out,
            policy: self.options.password_policy,
            closers: Vec::new(),
            tokens: 0,
        };
        walk(&mut visitor, entity, &[])?;

        sink::record(MetricsEvent::Encode {
            entity: entity.resolved().qualified_name().as_str(),
            tokens: visitor.tokens,
        });

        Ok(())
    }

    pub fn encode_tokens(&self, entity: &Entity) -> Result<Vec<Token>, EncodeError> {
        let mut tokens = Vec::new();
        self.encode(entity, &mut tokens)?;

        Ok(tokens)
    }

    pub fn encode_string(&self, entity: &Entity) -> Result<String, EncodeError> {
        let bytes = self.encode_to_writer(entity, Vec::new())?;

        String::from_utf8(bytes)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err).into())
    }

    /// Write JSON text, compact or pretty per the options; returns the writer.
    pub fn encode_to_writer<W: Write>(&self, entity: &Entity, out: W) -> Result<W, EncodeError> {
        if self.options.pretty {
            let mut writer = JsonWriter::pretty(out);
            self.encode(entity, &mut writer)?;
            Ok(writer.into_inner())
        } else {
            let mut writer = JsonWriter::compact(out);
            self.encode(entity, &mut writer)?;
            Ok(writer.into_inner())
        }
    }
}

///
/// EncodeVisitor
///
/// Every `enter` pushes the tokens that close the node; `exit` pops and
/// emits them, so the two stay paired even for skipped children.
///

struct EncodeVisitor<'s, S> {
    sink: &'s mut S,
    policy: PasswordPolicy,
    closers: Vec<Vec<Token>>,
    tokens: u64,
}

impl<S> EncodeVisitor<'_, S>
where
    S: TokenSink,
    EncodeError: From<S::Error>,
{
    fn emit(&mut self, token: Token) -> Result<(), EncodeError> {
        self.tokens += 1;
        self.sink.accept(token)?;

        Ok(())
    }

    fn emit_all(&mut self, tokens: Vec<Token>) -> Result<(), EncodeError> {
        tokens.into_iter().try_for_each(|token| self.emit(token))
    }

    fn enter_entity(&mut self, entity: &Entity) -> Result<Flow, EncodeError> {
        self.emit(Token::ObjectStart)?;

        // side channels of absent fields go last
        let mut closers = Vec::new();
        for (&pos, entries) in entity.aux_entries() {
            if entity.field_at(pos).is_none() {
                let name = &entity.resolved().field_at(pos).name;
                aux_tokens(name, entries, &mut closers);
            }
        }
        closers.push(Token::ObjectEnd);
        self.closers.push(closers);

        Ok(Flow::Continue)
    }

    fn enter_field(
        &mut self,
        entity: &Entity,
        meta: &ResolvedField,
        field: &Field,
    ) -> Result<Flow, EncodeError> {
        let mut closers = Vec::new();
        if let Some(entries) = entity.aux_entries().get(&meta.index) {
            aux_tokens(&meta.name, entries, &mut closers);
        }

        let flow = match field {
            Field::Single(Some(value @ (Value::Password1way(_) | Value::Password2way(_)))) => {
                let body = password_tokens(meta, value, self.policy)?;
                if !body.is_empty() {
                    self.emit(Token::key(&meta.name))?;
                    self.emit_all(body)?;
                }
                Flow::SkipChildren
            }
            Field::Single(None) => {
                self.emit(Token::key(&meta.name))?;
                self.emit(Token::null())?;
                Flow::SkipChildren
            }
            Field::Single(Some(_)) => {
                self.emit(Token::key(&meta.name))?;
                Flow::Continue
            }
            Field::List(_) | Field::Set(_) => {
                self.emit(Token::key(&meta.name))?;
                self.emit(Token::ListStart)?;
                closers.insert(0, Token::ListEnd);
                Flow::Continue
            }
        };
        self.closers.push(closers);

        Ok(flow)
    }

    fn enter_value(&mut self, meta: &ResolvedField, value: &Value) -> Result<Flow, EncodeError> {
        let mut closers = Vec::new();

        let flow = match value {
            Value::Primitive(primitive) => {
                self.emit(Token::Scalar(scalar::primitive_scalar(primitive)))?;
                Flow::SkipChildren
            }
            Value::Enumeration(name) => {
                self.emit(Token::string(name))?;
                Flow::SkipChildren
            }
            Value::Association(association) if association.is_empty() => {
                // lists hold no nulls, so an empty reference there is dropped
                if !meta.is_collection() {
                    self.emit(Token::null())?;
                }
                Flow::SkipChildren
            }
            Value::Association(_) => {
                self.emit_all(vec![Token::ObjectStart, Token::key("path_keys"), Token::ListStart])?;
                closers = vec![Token::ListEnd, Token::ObjectEnd];
                Flow::Continue
            }
            Value::Password1way(_) | Value::Password2way(_) => {
                let mut body = password_tokens(meta, value, self.policy)?;
                if body.is_empty() {
                    body = vec![Token::ObjectStart, Token::ObjectEnd];
                }
                self.emit_all(body)?;
                Flow::SkipChildren
            }
            // the child entity opens its own object
            Value::Composition(_) => Flow::Continue,
        };
        self.closers.push(closers);

        Ok(flow)
    }
}

impl<S> Visitor for EncodeVisitor<'_, S>
where
    S: TokenSink,
    EncodeError: From<S::Error>,
{
    type Error = EncodeError;

    fn enter(
        &mut self,
        node: Node<'_>,
        _followers: &[Option<Node<'_>>],
        _cx: &mut dyn VisitorContext,
    ) -> Result<Flow, Self::Error> {
        match node {
            Node::Entity(entity) => self.enter_entity(entity),
            Node::Field {
                entity,
                meta,
                field,
            } => self.enter_field(entity, meta, field),
            Node::Value { meta, value } => self.enter_value(meta, value),
        }
    }

    fn exit(
        &mut self,
        _node: Node<'_>,
        _followers: &[Option<Node<'_>>],
        _cx: &mut dyn VisitorContext,
    ) -> Result<(), Self::Error> {
        let closers = self.closers.pop().unwrap_or_default();

        self.emit_all(closers)
    }
}

// Password object tokens under a policy; empty when nothing is written.
fn password_tokens(
    meta: &ResolvedField,
    value: &Value,
    policy: PasswordPolicy,
) -> Result<Vec<Token>, ProviderError> {
    let mut parts: Vec<(&str, Scalar)> = Vec::new();

    match (value, policy) {
        (_, PasswordPolicy::None) => {}

        (Value::Password1way(password), PasswordPolicy::All) => {
            push_text(&mut parts, "unhashed", password.unhashed.as_deref());
            push_text(&mut parts, "hashed", password.hashed.as_deref());
            push_version(&mut parts, "hash_version", password.hash_version);
        }
        (Value::Password1way(password), PasswordPolicy::HashedAndEncrypted) => {
            let sealed = sealed_1way(meta, password)?;
            push_text(&mut parts, "hashed", sealed.hashed.as_deref());
            push_version(&mut parts, "hash_version", sealed.hash_version);
        }

        (Value::Password2way(password), PasswordPolicy::All) => {
            push_text(&mut parts, "unencrypted", password.unencrypted.as_deref());
            push_text(&mut parts, "encrypted", password.encrypted.as_deref());
            push_version(&mut parts, "cipher_version", password.cipher_version);
        }
        (Value::Password2way(password), PasswordPolicy::HashedAndEncrypted) => {
            let sealed = sealed_2way(meta, password)?;
            push_text(&mut parts, "encrypted", sealed.encrypted.as_deref());
            push_version(&mut parts, "cipher_version", sealed.cipher_version);
        }

        _ => {}
    }

    if parts.is_empty() {
        return Ok(Vec::new());
    }

    let mut tokens = vec![Token::ObjectStart];
    for (key, scalar) in parts {
        tokens.push(Token::key(key));
        tokens.push(Token::Scalar(scalar));
    }
    tokens.push(Token::ObjectEnd);

    Ok(tokens)
}

fn sealed_1way(
    meta: &ResolvedField,
    password: &Password1way,
) -> Result<Password1way, ProviderError> {
    let mut sealed = password.clone();
    if sealed.hashed.is_none()
        && let Some(hasher) = meta.providers.hasher()
    {
        sealed.hash_with(hasher)?;
    }

    Ok(sealed)
}

fn sealed_2way(
    meta: &ResolvedField,
    password: &Password2way,
) -> Result<Password2way, ProviderError> {
    let mut sealed = password.clone();
    if sealed.encrypted.is_none()
        && let Some(cipher) = meta.providers.cipher()
    {
        sealed.encrypt_with(cipher)?;
    }

    Ok(sealed)
}

fn push_text<'k>(parts: &mut Vec<(&'k str, Scalar)>, key: &'k str, text: Option<&str>) {
    if let Some(text) = text {
        parts.push((key, Scalar::String(text.to_string())));
    }
}

fn push_version<'k>(parts: &mut Vec<(&'k str, Scalar)>, key: &'k str, version: Option<u32>) {
    if let Some(version) = version {
        parts.push((key, Scalar::Uint(u64::from(version))));
    }
}

fn aux_tokens(field: &str, entries: &AuxEntries, out: &mut Vec<Token>) {
    for (aux, value) in entries {
        out.push(Token::Key(aux_key(field, aux)));
        json_tokens(value, out);
    }
}

fn json_tokens(value: &JsonValue, out: &mut Vec<Token>) {
    match value {
        JsonValue::Null => out.push(Token::null()),
        JsonValue::Bool(v) => out.push(Token::Scalar(Scalar::Bool(*v))),
        JsonValue::Number(n) => out.push(Token::Scalar(if let Some(v) = n.as_u64() {
            Scalar::Uint(v)
        } else if let Some(v) = n.as_i64() {
            Scalar::Int(v)
        } else {
            Scalar::Float(n.as_f64().unwrap_or(f64::NAN))
        })),
        JsonValue::String(s) => out.push(Token::string(s)),
        JsonValue::Array(items) => {
            out.push(Token::ListStart);
            for item in items {
                json_tokens(item, out);
            }
            out.push(Token::ListEnd);
        }
        JsonValue::Object(map) => {
            out.push(Token::ObjectStart);
            for (key, item) in map {
                out.push(Token::key(key));
                json_tokens(item, out);
            }
            out.push(Token::ObjectEnd);
        }
    }
}
