//! JSON wire format: a streaming tokenizer and a formatter-driven writer.

mod reader;
mod writer;

pub use reader::{ReadError, read_str};
pub use writer::JsonWriter;
