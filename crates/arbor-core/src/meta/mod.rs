//! Meta-model documents.
//!
//! A schema is written as one or more JSON documents, each an instance of the
//! bootstrap meta-meta-model. Loading decodes every document onto one tree,
//! so documents naming the same package merge by key, then converts that
//! tree into meta nodes and resolves them.

mod convert;
mod export;

#[cfg(test)]
mod tests;

pub use convert::to_meta_model;
pub use export::{ExportError, export, export_string};

use crate::{
    decode::{DecodeError, Decoder},
    obs::sink::{self, MetricsEvent},
    tree::Entity,
    validate::validate,
};
use arbor_schema::{
    bootstrap::meta_meta_model, provider::ProviderRegistry, resolve::resolve,
    resolved::ResolvedMetaModel,
};
use std::{
    borrow::Cow,
    fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};
use thiserror::Error as ThisError;

///
/// LoadError
///

#[derive(Debug, ThisError)]
pub enum LoadError {
    #[error("schema source '{name}' is malformed: {source}")]
    Decode {
        name: String,
        #[source]
        source: DecodeError,
    },

    #[error("meta-model is invalid:\n{}", .0.join("\n"))]
    Invalid(Vec<String>),

    #[error("cannot read schema source '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl LoadError {
    /// Every message carried by the error, one per line of the report.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        match self {
            Self::Invalid(errors) => errors.clone(),
            other => vec![other.to_string()],
        }
    }
}

///
/// Source
/// One meta-model document.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Source {
    File(PathBuf),
    Text { name: String, text: String },
}

impl Source {
    #[must_use]
    pub fn text(name: &str, text: &str) -> Self {
        Self::Text {
            name: name.to_string(),
            text: text.to_string(),
        }
    }

    #[must_use]
    pub fn file(path: impl AsRef<Path>) -> Self {
        Self::File(path.as_ref().to_path_buf())
    }

    /// Name used to tag errors from this source.
    #[must_use]
    pub fn name(&self) -> Cow<'_, str> {
        match self {
            Self::File(path) => path.to_string_lossy(),
            Self::Text { name, .. } => Cow::Borrowed(name),
        }
    }

    fn read(&self) -> Result<Cow<'_, str>, LoadError> {
        match self {
            Self::File(path) => fs::read_to_string(path)
                .map(Cow::Owned)
                .map_err(|source| LoadError::Io {
                    path: path.clone(),
                    source,
                }),
            Self::Text { text, .. } => Ok(Cow::Borrowed(text)),
        }
    }
}

/// Load and resolve a meta-model from its documents.
pub fn load(
    sources: &[Source],
    registry: &ProviderRegistry,
) -> Result<Arc<ResolvedMetaModel>, LoadError> {
    let result = load_sources(sources, registry);

    sink::record(MetricsEvent::SchemaLoad {
        sources: sources.len() as u64,
        failed: result.is_err(),
    });

    result
}

fn load_sources(
    sources: &[Source],
    registry: &ProviderRegistry,
) -> Result<Arc<ResolvedMetaModel>, LoadError> {
    let document = decode_sources(sources)?;
    let model = to_meta_model(&document).map_err(|errs| LoadError::Invalid(errs.flatten()))?;
    let resolved = resolve(model, registry).map_err(|errs| LoadError::Invalid(errs.flatten()))?;

    Ok(Arc::new(resolved))
}

// Union of every source as one instance of the meta-meta-model. Unknown
// attributes are errors here: a typo in a schema must not vanish.
fn decode_sources(sources: &[Source]) -> Result<Entity, LoadError> {
    let decoder = Decoder::default();
    let mut document = Entity::root(meta_meta_model());
    let mut errors = Vec::new();

    for source in sources {
        let name = source.name();
        let text = source.read()?;
        let report = decoder
            .decode_into(&mut document, &text)
            .map_err(|source| LoadError::Decode {
                name: name.to_string(),
                source,
            })?;

        errors.extend(report.errors.iter().map(|err| format!("{name}: {err}")));
        errors.extend(
            report
                .skipped
                .iter()
                .map(|path| format!("{name}: {path}: unknown meta-model attribute")),
        );
    }

    for (route, messages) in validate(&document) {
        errors.extend(messages.into_iter().map(|message| format!("{route}: {message}")));
    }

    if errors.is_empty() {
        Ok(document)
    } else {
        Err(LoadError::Invalid(errors))
    }
}
