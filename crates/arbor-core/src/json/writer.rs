use crate::token::{Scalar, Token, TokenSink};
use serde_json::ser::{CompactFormatter, Formatter, PrettyFormatter};
use std::io::{self, Write};

///
/// JsonWriter
///
/// Token sink that writes JSON text through a `serde_json` formatter, so
/// compact and pretty output share one code path.
///

pub struct JsonWriter<W, F = CompactFormatter> {
    out: W,
    formatter: F,
    frames: Vec<Frame>,
}

#[derive(Clone, Copy)]
enum Frame {
    Object { first: bool },
    List { first: bool },
}

impl<W: Write> JsonWriter<W> {
    pub const fn compact(out: W) -> Self {
        Self {
            out,
            formatter: CompactFormatter,
            frames: Vec::new(),
        }
    }
}

impl<W: Write> JsonWriter<W, PrettyFormatter<'static>> {
    pub fn pretty(out: W) -> Self {
        Self {
            out,
            formatter: PrettyFormatter::with_indent(b"  "),
            frames: Vec::new(),
        }
    }
}

impl<W: Write, F: Formatter> JsonWriter<W, F> {
    pub fn into_inner(self) -> W {
        self.out
    }

    fn before_value(&mut self) -> io::Result<()> {
        match self.frames.last_mut() {
            Some(Frame::List { first }) => {
                let was_first = *first;
                *first = false;
                self.formatter.begin_array_value(&mut self.out, was_first)
            }
            Some(Frame::Object { .. }) => self.formatter.begin_object_value(&mut self.out),
            None => Ok(()),
        }
    }

    fn after_value(&mut self) -> io::Result<()> {
        match self.frames.last() {
            Some(Frame::List { .. }) => self.formatter.end_array_value(&mut self.out),
            Some(Frame::Object { .. }) => self.formatter.end_object_value(&mut self.out),
            None => Ok(()),
        }
    }

    fn write_token(&mut self, token: Token) -> io::Result<()> {
        match token {
            Token::ObjectStart => {
                self.before_value()?;
                self.formatter.begin_object(&mut self.out)?;
                self.frames.push(Frame::Object { first: true });
            }
            Token::ListStart => {
                self.before_value()?;
                self.formatter.begin_array(&mut self.out)?;
                self.frames.push(Frame::List { first: true });
            }
            Token::ObjectEnd => {
                self.frames.pop();
                self.formatter.end_object(&mut self.out)?;
                self.after_value()?;
            }
            Token::ListEnd => {
                self.frames.pop();
                self.formatter.end_array(&mut self.out)?;
                self.after_value()?;
            }
            Token::Key(key) => {
                let first = match self.frames.last_mut() {
                    Some(Frame::Object { first }) => std::mem::replace(first, false),
                    _ => return Err(io::Error::other("key written outside an object")),
                };
                self.formatter.begin_object_key(&mut self.out, first)?;
                serde_json::to_writer(&mut self.out, &key)?;
                self.formatter.end_object_key(&mut self.out)?;
            }
            Token::Scalar(scalar) => {
                self.before_value()?;
                self.write_scalar(&scalar)?;
                self.after_value()?;
            }
        }

        Ok(())
    }

    fn write_scalar(&mut self, scalar: &Scalar) -> io::Result<()> {
        match scalar {
            Scalar::Null => self.formatter.write_null(&mut self.out),
            Scalar::Bool(v) => self.formatter.write_bool(&mut self.out, *v),
            Scalar::Int(v) => self.formatter.write_i64(&mut self.out, *v),
            Scalar::Uint(v) => self.formatter.write_u64(&mut self.out, *v),
            Scalar::Float(v) if v.is_finite() => self.formatter.write_f64(&mut self.out, *v),
            Scalar::Float(_) => self.formatter.write_null(&mut self.out),
            Scalar::String(v) => serde_json::to_writer(&mut self.out, v).map_err(io::Error::from),
        }
    }
}

impl<W: Write, F: Formatter> TokenSink for JsonWriter<W, F> {
    type Error = io::Error;

    fn accept(&mut self, token: Token) -> Result<(), Self::Error> {
        self.write_token(token)
    }
}
