//! Wire tokens shared by the reader, the decoder and the encoder.

use std::convert::Infallible;

///
/// Token
///

#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    ObjectStart,
    ObjectEnd,
    ListStart,
    ListEnd,
    Key(String),
    Scalar(Scalar),
}

impl Token {
    #[must_use]
    pub fn key(name: &str) -> Self {
        Self::Key(name.to_string())
    }

    #[must_use]
    pub fn string(text: &str) -> Self {
        Self::Scalar(Scalar::String(text.to_string()))
    }

    #[must_use]
    pub const fn null() -> Self {
        Self::Scalar(Scalar::Null)
    }

    /// Kind label for diagnostics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ObjectStart => "object",
            Self::ObjectEnd => "end of object",
            Self::ListStart => "list",
            Self::ListEnd => "end of list",
            Self::Key(_) => "key",
            Self::Scalar(scalar) => scalar.kind(),
        }
    }
}

///
/// Scalar
///
/// Non-negative integers arrive as `Uint`, negative ones as `Int`.
///

#[derive(Clone, Debug, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    String(String),
}

impl Scalar {
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) | Self::Uint(_) | Self::Float(_) => "number",
            Self::String(_) => "string",
        }
    }
}

///
/// TokenSink
/// Anything that consumes a token stream one token at a time.
///

pub trait TokenSink {
    type Error;

    fn accept(&mut self, token: Token) -> Result<(), Self::Error>;
}

/// In-memory token buffer.
impl TokenSink for Vec<Token> {
    type Error = Infallible;

    fn accept(&mut self, token: Token) -> Result<(), Self::Error> {
        self.push(token);

        Ok(())
    }
}
