use crate::token::{Scalar, Token, TokenSink};
use serde::de::{self, DeserializeSeed, Deserializer, MapAccess, SeqAccess, Visitor};
use serde_json::error::Category;
use std::fmt;
use thiserror::Error as ThisError;

///
/// ReadError
/// Syntax failures carry the tokenizer's position; `Sink` carries the
/// consumer's own error.
///

#[derive(Debug, ThisError)]
pub enum ReadError<E> {
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

    #[error(transparent)]
    Sink(E),
}

/// Tokenize one JSON document into a sink. The sink sees every token as it
/// is parsed; a sink error stops the read immediately.
pub fn read_str<S: TokenSink>(text: &str, sink: &mut S) -> Result<(), ReadError<S::Error>> {
    let mut failure = None;
    let mut de = serde_json::Deserializer::from_str(text);

    let parsed = Stream {
        sink,
        failure: &mut failure,
    }
    .deserialize(&mut de)
    .and_then(|()| de.end());

    // a sink error surfaces from serde as a custom error; report the original
    if let Some(err) = failure {
        return Err(ReadError::Sink(err));
    }

    parsed.map_err(|err| position_error(text, &err))
}

fn position_error<E>(text: &str, err: &serde_json::Error) -> ReadError<E> {
    let offset = byte_offset(text, err.line(), err.column());

    match err.classify() {
        Category::Eof => ReadError::UnexpectedEnd { offset },
        _ if err.to_string().starts_with("trailing characters") => {
            ReadError::TrailingInput { offset }
        }
        _ => ReadError::Syntax {
            message: strip_position(&err.to_string()),
            line: err.line(),
            column: err.column(),
            offset,
        },
    }
}

// serde_json reports 1-based lines and columns.
fn byte_offset(text: &str, line: usize, column: usize) -> usize {
    let line_start: usize = text
        .split_inclusive('\n')
        .take(line.saturating_sub(1))
        .map(str::len)
        .sum();

    (line_start + column.saturating_sub(1)).min(text.len())
}

fn strip_position(message: &str) -> String {
    message
        .rsplit_once(" at line ")
        .map_or(message, |(head, _)| head)
        .to_string()
}

///
/// Stream
/// Seed that forwards every parsed event into the sink instead of building
/// a value.
///

struct Stream<'a, S: TokenSink> {
    sink: &'a mut S,
    failure: &'a mut Option<S::Error>,
}

impl<S: TokenSink> Stream<'_, S> {
    fn emit<E: de::Error>(&mut self, token: Token) -> Result<(), E> {
        self.sink.accept(token).map_err(|err| {
            *self.failure = Some(err);
            E::custom("token sink failed")
        })
    }

    fn nested(&mut self) -> Stream<'_, S> {
        Stream {
            sink: self.sink,
            failure: self.failure,
        }
    }
}

impl<'de, S: TokenSink> DeserializeSeed<'de> for Stream<'_, S> {
    type Value = ();

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<(), D::Error> {
        deserializer.deserialize_any(self)
    }
}

impl<'de, S: TokenSink> Visitor<'de> for Stream<'_, S> {
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON value")
    }

    fn visit_bool<E: de::Error>(mut self, v: bool) -> Result<(), E> {
        self.emit(Token::Scalar(Scalar::Bool(v)))
    }

    fn visit_i64<E: de::Error>(mut self, v: i64) -> Result<(), E> {
        self.emit(Token::Scalar(Scalar::Int(v)))
    }

    fn visit_u64<E: de::Error>(mut self, v: u64) -> Result<(), E> {
        self.emit(Token::Scalar(Scalar::Uint(v)))
    }

    fn visit_f64<E: de::Error>(mut self, v: f64) -> Result<(), E> {
        self.emit(Token::Scalar(Scalar::Float(v)))
    }

    fn visit_str<E: de::Error>(mut self, v: &str) -> Result<(), E> {
        self.emit(Token::Scalar(Scalar::String(v.to_string())))
    }

    fn visit_string<E: de::Error>(mut self, v: String) -> Result<(), E> {
        self.emit(Token::Scalar(Scalar::String(v)))
    }

    fn visit_unit<E: de::Error>(mut self) -> Result<(), E> {
        self.emit(Token::Scalar(Scalar::Null))
    }

    fn visit_seq<A: SeqAccess<'de>>(mut self, mut seq: A) -> Result<(), A::Error> {
        self.emit(Token::ListStart)?;
        while seq.next_element_seed(self.nested())?.is_some() {}

        self.emit(Token::ListEnd)
    }

    fn visit_map<A: MapAccess<'de>>(mut self, mut map: A) -> Result<(), A::Error> {
        self.emit(Token::ObjectStart)?;
        while let Some(key) = map.next_key::<String>()? {
            self.emit(Token::Key(key))?;
            map.next_value_seed(self.nested())?;
        }

        self.emit(Token::ObjectEnd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(text: &str) -> Result<Vec<Token>, ReadError<std::convert::Infallible>> {
        let mut out = Vec::new();
        read_str(text, &mut out)?;

        Ok(out)
    }

    #[test]
    fn streams_nested_values() {
        let out = tokens(r#"{"a": [1, -2, 1.5, "x", null, true], "b": {}}"#).unwrap();

        assert_eq!(
            out,
            vec![
                Token::ObjectStart,
                Token::key("a"),
                Token::ListStart,
                Token::Scalar(Scalar::Uint(1)),
                Token::Scalar(Scalar::Int(-2)),
                Token::Scalar(Scalar::Float(1.5)),
                Token::string("x"),
                Token::null(),
                Token::Scalar(Scalar::Bool(true)),
                Token::ListEnd,
                Token::key("b"),
                Token::ObjectStart,
                Token::ObjectEnd,
                Token::ObjectEnd,
            ]
        );
    }

    #[test]
    fn syntax_errors_carry_positions() {
        let err = tokens("{\n  \"a\": x}").unwrap_err();

        let ReadError::Syntax {
            line,
            column,
            offset,
            ..
        } = err
        else {
            panic!("expected a syntax error, got {err:?}");
        };
        assert_eq!(line, 2);
        assert!((7..=8).contains(&column), "column {column}");
        assert_eq!(offset, 2 + column - 1);
    }

    #[test]
    fn floats_read_back_exactly() {
        let value = -132_890_224_903.488_05_f64;
        let out = tokens(&serde_json::to_string(&value).unwrap()).unwrap();

        assert_eq!(out, vec![Token::Scalar(Scalar::Float(value))]);
    }

    #[test]
    fn truncated_input_is_unexpected_end() {
        assert!(matches!(
            tokens(r#"{"a": [1, 2"#),
            Err(ReadError::UnexpectedEnd { .. })
        ));
    }

    #[test]
    fn trailing_input_is_reported() {
        assert!(matches!(
            tokens("{} {}"),
            Err(ReadError::TrailingInput { offset: 3 })
        ));
    }

    #[test]
    fn sink_errors_stop_the_read() {
        struct Limit(usize);

        impl TokenSink for Limit {
            type Error = &'static str;

            fn accept(&mut self, _: Token) -> Result<(), Self::Error> {
                if self.0 == 0 {
                    return Err("full");
                }
                self.0 -= 1;
                Ok(())
            }
        }

        let err = read_str("[1, 2, 3]", &mut Limit(2)).unwrap_err();
        assert!(matches!(err, ReadError::Sink("full")));
    }
}
