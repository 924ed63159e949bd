//! Streaming decoder.
//!
//! Tokens are consumed one at a time by a stack of machines. Data problems
//! (wrong value kinds, unknown enumeration values, bad association paths) are
//! collected into a [`DecodeReport`] while decoding continues; malformed token
//! sequences and depth overflows abort with a [`DecodeError`].

mod aux;
mod machine;
mod scalar;


pub use aux::{AUX_ERRORS, AUX_META, AuxKind, AuxRegistry, aux_key, split_aux_key};

use crate::{
    json::{ReadError, read_str},
    obs::sink::{self, MetricsEvent},
    token::{Token, TokenSink},
    traverse::PathSegment,
    tree::Entity,
};
use arbor_schema::resolved::ResolvedMetaModel;
use machine::{Cx, DocumentMachine, Machine, Output, Transition};
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};
use thiserror::Error as ThisError;

/// Default bound on the machine stack.
pub const DEFAULT_MAX_DEPTH: usize = 64;

///
/// DecodeError
/// Fatal decode failures; the target tree is left untouched.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum DecodeError {
    #[error("syntax error at line {line} column {column} (offset {offset}): {message}")]
    Syntax {
        message: String,
        line: usize,
        column: usize,
        offset: usize,
    },

    #[error("unexpected end of input at offset {offset}")]
    UnexpectedEnd { offset: usize },

    #[error("trailing input at offset {offset}")]
    TrailingInput { offset: usize },

    #[error("unexpected {found} at token {index}, expected {expected}")]
    UnexpectedToken {
        expected: &'static str,
        found: &'static str,
        index: usize,
    },

    #[error("nesting exceeds the maximum depth of {max}")]
    DepthExceeded { max: usize },
}

impl DecodeError {
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Syntax { .. } => "syntax",
            Self::UnexpectedEnd { .. } => "unexpected_end",
            Self::TrailingInput { .. } => "trailing_input",
            Self::UnexpectedToken { .. } => "unexpected_token",
            Self::DepthExceeded { .. } => "depth_exceeded",
        }
    }
}

impl From<ReadError<Self>> for DecodeError {
    fn from(err: ReadError<Self>) -> Self {
        match err {
            ReadError::Syntax {
                message,
                line,
                column,
                offset,
            } => Self::Syntax {
                message,
                line,
                column,
                offset,
            },
            ReadError::UnexpectedEnd { offset } => Self::UnexpectedEnd { offset },
            ReadError::TrailingInput { offset } => Self::TrailingInput { offset },
            ReadError::Sink(err) => err,
        }
    }
}

///
/// DataError
/// A schema mismatch found while decoding, tagged with its path.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct DataError {
    pub path: String,
    pub message: String,
}

impl fmt::Display for DataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

///
/// DecodeReport
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct DecodeReport {
    pub errors: Vec<DataError>,

    /// Paths of unknown fields and side channels that were skipped.
    pub skipped: Vec<String>,
}

impl DecodeReport {
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }
}

///
/// DecodeOptions
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct DecodeOptions {
    /// Merge every set element into the first existing element instead of
    /// matching by key.
    pub wildcard_merge: bool,
    pub max_depth: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            wildcard_merge: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

///
/// Decoder
///

#[derive(Clone, Debug, Default)]
pub struct Decoder {
    options: DecodeOptions,
    aux: AuxRegistry,
}

impl Decoder {
    #[must_use]
    pub fn new(options: DecodeOptions) -> Self {
        Self {
            options,
            aux: AuxRegistry::default(),
        }
    }

    #[must_use]
    pub fn with_aux(mut self, aux: AuxRegistry) -> Self {
        self.aux = aux;
        self
    }

    #[must_use]
    pub const fn options(&self) -> &DecodeOptions {
        &self.options
    }

    /// Start a session that decodes into `target`.
    #[must_use]
    pub fn session(&self, target: Entity) -> DecodeSession<'_> {
        DecodeSession::new(self, target)
    }

    /// Decode a document into a fresh root entity.
    pub fn decode_str(
        &self,
        meta: &Arc<ResolvedMetaModel>,
        text: &str,
    ) -> Result<(Entity, DecodeReport), DecodeError> {
        self.run(Entity::root(meta), |session| {
            read_str(text, session).map_err(DecodeError::from)
        })
    }

    /// Decode a document on top of an existing tree. Present fields
    /// overwrite, set elements merge by key. On a fatal error `target` is
    /// left as it was.
    pub fn decode_into(
        &self,
        target: &mut Entity,
        text: &str,
    ) -> Result<DecodeReport, DecodeError> {
        let (entity, report) = self.run(target.clone(), |session| {
            read_str(text, session).map_err(DecodeError::from)
        })?;
        *target = entity;

        Ok(report)
    }

    /// Decode an in-memory token stream on top of an existing tree.
    pub fn decode_tokens(
        &self,
        target: &mut Entity,
        tokens: impl IntoIterator<Item = Token>,
    ) -> Result<DecodeReport, DecodeError> {
        let (entity, report) = self.run(target.clone(), |session| {
            tokens.into_iter().try_for_each(|token| session.accept(token))
        })?;
        *target = entity;

        Ok(report)
    }

    fn run(
        &self,
        target: Entity,
        feed: impl FnOnce(&mut DecodeSession<'_>) -> Result<(), DecodeError>,
    ) -> Result<(Entity, DecodeReport), DecodeError> {
        let mut session = self.session(target);

        match feed(&mut session) {
            Ok(()) => session.finish(),
            Err(err) => {
                session.record(true);
                Err(err)
            }
        }
    }
}

///
/// DecodeSession
/// One decode in progress; feed it tokens, then call [`Self::finish`].
///

pub struct DecodeSession<'d> {
    decoder: &'d Decoder,
    meta: Arc<ResolvedMetaModel>,
    entity_name: String,
    stack: Vec<Frame>,
    path: Vec<PathSegment>,
    errors: Vec<DataError>,
    skipped: Vec<String>,
    result: Option<Entity>,
    tokens: usize,
}

struct Frame {
    machine: Machine,
    has_segment: bool,
}

impl<'d> DecodeSession<'d> {
    fn new(decoder: &'d Decoder, target: Entity) -> Self {
        let meta = Arc::clone(target.meta());
        let entity_name = target.resolved().qualified_name().to_string();

        Self {
            decoder,
            meta,
            entity_name,
            stack: vec![Frame {
                machine: Machine::Document(DocumentMachine::new(target)),
                has_segment: false,
            }],
            path: Vec::new(),
            errors: Vec::new(),
            skipped: Vec::new(),
            result: None,
            tokens: 0,
        }
    }

    /// Data errors collected so far.
    #[must_use]
    pub fn errors(&self) -> &[DataError] {
        &self.errors
    }

    /// Current nesting depth of the machine stack.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Complete the decode. Fails if the document was never closed.
    pub fn finish(mut self) -> Result<(Entity, DecodeReport), DecodeError> {
        let Some(entity) = self.result.take() else {
            self.record(true);
            return Err(DecodeError::UnexpectedEnd {
                offset: self.tokens,
            });
        };
        self.record(false);

        let report = DecodeReport {
            errors: self.errors,
            skipped: self.skipped,
        };

        Ok((entity, report))
    }

    fn record(&self, failed: bool) {
        sink::record(MetricsEvent::Decode {
            entity: &self.entity_name,
            tokens: self.tokens as u64,
            data_errors: self.errors.len() as u64,
            failed,
        });
    }

    fn feed(&mut self, token: Token) -> Result<(), DecodeError> {
        let index = self.tokens;
        self.tokens += 1;

        let mut next = Some(token);
        while let Some(token) = next.take() {
            let Some(frame) = self.stack.last_mut() else {
                return Err(DecodeError::UnexpectedToken {
                    expected: "end of input",
                    found: token.kind(),
                    index,
                });
            };

            let mut cx = Cx {
                meta: &self.meta,
                path: &self.path,
                errors: &mut self.errors,
                skipped: &mut self.skipped,
                aux: &self.decoder.aux,
                wildcard_merge: self.decoder.options.wildcard_merge,
            };
            let transition = frame.machine.on_token(token, &mut cx).map_err(|u| {
                DecodeError::UnexpectedToken {
                    expected: u.expected,
                    found: u.found,
                    index,
                }
            })?;

            match transition {
                Transition::Stay => {}
                Transition::Push {
                    machine,
                    segment,
                    replay,
                } => {
                    let max = self.decoder.options.max_depth;
                    if self.stack.len() >= max {
                        return Err(DecodeError::DepthExceeded { max });
                    }
                    let has_segment = segment.is_some();
                    self.path.extend(segment);
                    self.stack.push(Frame {
                        machine,
                        has_segment,
                    });
                    next = replay;
                }
                Transition::Complete(output) => self.complete(output),
            }
        }

        Ok(())
    }

    // Pop the completed machine and hand its output down the stack.
    fn complete(&mut self, mut output: Output) {
        loop {
            let Some(frame) = self.stack.pop() else {
                unreachable!("a machine completed on an empty stack");
            };
            if frame.has_segment {
                self.path.pop();
            }

            let Some(parent) = self.stack.last_mut() else {
                if let Output::Entity(entity) = output {
                    self.result = Some(entity);
                }
                return;
            };

            let mut cx = Cx {
                meta: &self.meta,
                path: &self.path,
                errors: &mut self.errors,
                skipped: &mut self.skipped,
                aux: &self.decoder.aux,
                wildcard_merge: self.decoder.options.wildcard_merge,
            };
            match parent.machine.on_child(output, &mut cx) {
                Some(next) => output = next,
                None => return,
            }
        }
    }
}

impl TokenSink for DecodeSession<'_> {
    type Error = DecodeError;

    fn accept(&mut self, token: Token) -> Result<(), Self::Error> {
        self.feed(token)
    }
}
