use crate::{Error, config::ArborConfig};
use arbor_core::{
    compare,
    decode::{DecodeOptions, DecodeReport, Decoder},
    encode::{EncodeOptions, Encoder},
    meta::{self, Source},
    traverse::Issues,
    tree::Entity,
    validate,
};
use arbor_schema::{provider::ProviderRegistry, resolved::ResolvedMetaModel};
use std::{io::Write, path::Path, sync::Arc};

///
/// Platform
///
/// A loaded schema with the codec settings to use against it. Cheap to
/// clone; the resolved schema is shared.
///

#[derive(Clone, Debug)]
pub struct Platform {
    meta: Arc<ResolvedMetaModel>,
    decoder: Decoder,
    encoder: Encoder,
}

impl Platform {
    #[must_use]
    pub fn new(meta: Arc<ResolvedMetaModel>, decode: DecodeOptions, encode: EncodeOptions) -> Self {
        Self {
            meta,
            decoder: Decoder::new(decode),
            encoder: Encoder::new(encode),
        }
    }

    /// Load the schema a config names.
    pub fn from_config(config: &ArborConfig, registry: &ProviderRegistry) -> Result<Self, Error> {
        let meta = meta::load(&config.schema_sources(), registry)?;

        Ok(Self::new(meta, config.decode, config.encode))
    }

    pub fn from_config_file(
        path: impl AsRef<Path>,
        registry: &ProviderRegistry,
    ) -> Result<Self, Error> {
        let config = ArborConfig::from_file(path)?;

        Self::from_config(&config, registry)
    }

    /// Load schema documents with default codec settings.
    pub fn from_sources(sources: &[Source], registry: &ProviderRegistry) -> Result<Self, Error> {
        let meta = meta::load(sources, registry)?;

        Ok(Self::new(meta, DecodeOptions::default(), EncodeOptions::default()))
    }

    /// Replace the decoder, e.g. to register side channels.
    #[must_use]
    pub fn with_decoder(mut self, decoder: Decoder) -> Self {
        self.decoder = decoder;
        self
    }

    #[must_use]
    pub const fn meta(&self) -> &Arc<ResolvedMetaModel> {
        &self.meta
    }

    #[must_use]
    pub const fn decoder(&self) -> &Decoder {
        &self.decoder
    }

    #[must_use]
    pub const fn encoder(&self) -> &Encoder {
        &self.encoder
    }

    /// An empty root entity.
    #[must_use]
    pub fn new_root(&self) -> Entity {
        Entity::root(&self.meta)
    }

    pub fn decode_str(&self, text: &str) -> Result<(Entity, DecodeReport), Error> {
        Ok(self.decoder.decode_str(&self.meta, text)?)
    }

    /// Decode on top of an existing tree.
    pub fn decode_into(&self, target: &mut Entity, text: &str) -> Result<DecodeReport, Error> {
        Ok(self.decoder.decode_into(target, text)?)
    }

    pub fn encode_string(&self, entity: &Entity) -> Result<String, Error> {
        Ok(self.encoder.encode_string(entity)?)
    }

    pub fn encode_to_writer<W: Write>(&self, entity: &Entity, out: W) -> Result<W, Error> {
        Ok(self.encoder.encode_to_writer(entity, out)?)
    }

    #[must_use]
    pub fn validate(&self, entity: &Entity) -> Issues {
        validate::validate(entity)
    }

    #[must_use]
    pub fn diff(&self, leader: &Entity, follower: &Entity) -> Issues {
        compare::diff(leader, follower)
    }
}
