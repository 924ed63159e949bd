use crate::config::ConfigError;
use arbor_core::{
    decode::DecodeError,
    encode::EncodeError,
    meta::{ExportError, LoadError},
    tree::TreeError,
};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

///
/// Error
/// Public error type: a stable kind plus the layer's message.
///

#[derive(Debug, Deserialize, Serialize, ThisError)]
#[error("{message}")]
pub struct Error {
    pub kind: ErrorKind,
    pub message: String,
}

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

///
/// ErrorKind
/// Which layer refused the call.
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
#[remain::sorted]
pub enum ErrorKind {
    /// The configuration could not be read or parsed.
    Config,

    /// Input text is not a well-formed document.
    Decode,

    /// Output could not be produced.
    Encode,

    /// The meta-model failed to load or resolve.
    Schema,

    /// The tree API was used against the schema.
    Tree,
}

macro_rules! impl_from_error {
    ( $( $err:ty => $kind:ident ),* $(,)? ) => {
        $(
            impl From<$err> for Error {
                fn from(err: $err) -> Self {
                    Self::new(ErrorKind::$kind, err.to_string())
                }
            }
        )*
    };
}

impl_from_error!(
    ConfigError => Config,
    DecodeError => Decode,
    EncodeError => Encode,
    ExportError => Encode,
    LoadError => Schema,
    TreeError => Tree,
    arbor_schema::Error => Schema,
);
