//! Runtime for Arbor: the generic tree, traversal, the streaming JSON codec,
//! validation and comparison of instances, and the meta-model loader.
#![warn(unreachable_pub)]

// public exports are one module level down
pub mod compare;
pub mod decode;
pub mod encode;
pub mod json;
pub mod meta;
pub mod obs;
pub mod token;
pub mod traverse;
pub mod tree;
pub mod validate;

// test
#[cfg(test)]
pub(crate) mod test_support;

///
/// Prelude
///
/// Prelude contains only domain vocabulary.
/// No errors, sessions or sinks are re-exported here.
///

pub mod prelude {
    pub use crate::{
        decode::{DecodeOptions, DecodeReport, Decoder},
        encode::{EncodeOptions, Encoder, PasswordPolicy},
        meta::Source,
        traverse::{Flow, Issues, Node, PathSegment, Visitor, VisitorContext},
        tree::{Association, Entity, Field, Password1way, Password2way, Primitive, Value},
    };
}
