//! ## Crate layout
//! - `core`: generic tree, traversal, JSON codec, validation, comparison and
//!   the meta-model loader.
//! - `schema`: meta-model nodes, the resolver and the resolved snapshot.
//! - `config`: TOML configuration for a [`Platform`].
//!
//! [`Platform`] ties a loaded schema to a decoder and an encoder; most
//! callers need nothing else.

pub use arbor_core as core;
pub use arbor_schema as schema;

pub mod config;
mod error;
mod platform;

pub use error::{Error, ErrorKind};
pub use platform::Platform;

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

///
/// Prelude
///

pub mod prelude {
    pub use crate::{
        Platform,
        config::ArborConfig,
        core::prelude::*,
        schema::prelude::{Cipher, Hasher, ProviderError, ProviderRegistry, ResolvedMetaModel},
    };
}
