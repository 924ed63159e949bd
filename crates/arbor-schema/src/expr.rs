//! `exists_if` expressions.
//!
//! Documents carry the expression as text; the resolver stores the parsed
//! tree. Grammar, lowest precedence first:
//!
//! ```text
//! or      := and ('||' and)*
//! and     := unary ('&&' unary)*
//! unary   := '!' unary | primary
//! primary := '(' or ')' | 'present' '(' ident ')' | ident ('==' | '!=') string
//! ```

use std::fmt;
use thiserror::Error as ThisError;

///
/// ExprError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum ExprError {
    #[error("unexpected character '{ch}' at offset {offset}")]
    UnexpectedChar { ch: char, offset: usize },

    #[error("unterminated string starting at offset {offset}")]
    UnterminatedString { offset: usize },

    #[error("expected {expected} at offset {offset}")]
    Expected {
        expected: &'static str,
        offset: usize,
    },

    #[error("trailing input at offset {offset}")]
    Trailing { offset: usize },
}

///
/// ExprContext
///
/// What an expression can observe about the entity it is evaluated on.
///

pub trait ExprContext {
    /// True when the sibling field is present with a non-null value.
    fn is_present(&self, field: &str) -> bool;

    /// Text form of a sibling scalar or enumeration value.
    fn text(&self, field: &str) -> Option<String>;
}

///
/// Expr
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Expr {
    Present(String),
    Equals { field: String, value: String },
    NotEquals { field: String, value: String },
    Not(Box<Self>),
    And(Box<Self>, Box<Self>),
    Or(Box<Self>, Box<Self>),
}

impl Expr {
    pub fn parse(source: &str) -> Result<Self, ExprError> {
        let tokens = lex(source)?;
        let mut parser = Parser {
            tokens,
            pos: 0,
            end: source.len(),
        };
        let expr = parser.parse_or()?;
        if let Some((_, offset)) = parser.tokens.get(parser.pos) {
            return Err(ExprError::Trailing { offset: *offset });
        }

        Ok(expr)
    }

    #[must_use]
    pub fn present(field: &str) -> Self {
        Self::Present(field.to_string())
    }

    #[must_use]
    pub fn equals(field: &str, value: &str) -> Self {
        Self::Equals {
            field: field.to_string(),
            value: value.to_string(),
        }
    }

    /// Sibling field names referenced anywhere in the expression.
    #[must_use]
    pub fn fields(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_fields(&mut out);

        out
    }

    #[must_use]
    pub fn evaluate(&self, cx: &dyn ExprContext) -> bool {
        match self {
            Self::Present(field) => cx.is_present(field),
            Self::Equals { field, value } => cx.text(field).is_some_and(|v| &v == value),
            Self::NotEquals { field, value } => cx.text(field).is_none_or(|v| &v != value),
            Self::Not(inner) => !inner.evaluate(cx),
            Self::And(lhs, rhs) => lhs.evaluate(cx) && rhs.evaluate(cx),
            Self::Or(lhs, rhs) => lhs.evaluate(cx) || rhs.evaluate(cx),
        }
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Present(field)
            | Self::Equals { field, .. }
            | Self::NotEquals { field, .. } => out.push(field),
            Self::Not(inner) => inner.collect_fields(out),
            Self::And(lhs, rhs) | Self::Or(lhs, rhs) => {
                lhs.collect_fields(out);
                rhs.collect_fields(out);
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Present(field) => write!(f, "present({field})"),
            Self::Equals { field, value } => write!(f, "{field} == {}", quote(value)),
            Self::NotEquals { field, value } => write!(f, "{field} != {}", quote(value)),
            Self::Not(inner) => write!(f, "!{inner}"),
            Self::And(lhs, rhs) => write!(f, "({lhs} && {rhs})"),
            Self::Or(lhs, rhs) => write!(f, "({lhs} || {rhs})"),
        }
    }
}

fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        if matches!(ch, '"' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('"');

    out
}

///
/// Tok
///

#[derive(Clone, Debug, Eq, PartialEq)]
enum Tok {
    Ident(String),
    Str(String),
    LParen,
    RParen,
    Bang,
    AndAnd,
    OrOr,
    EqEq,
    NotEq,
}

fn lex(source: &str) -> Result<Vec<(Tok, usize)>, ExprError> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();

    while let Some((offset, ch)) = chars.next() {
        let tok = match ch {
            c if c.is_whitespace() => continue,
            '(' => Tok::LParen,
            ')' => Tok::RParen,
            '!' if chars.next_if(|(_, c)| *c == '=').is_some() => Tok::NotEq,
            '!' => Tok::Bang,
            '&' if chars.next_if(|(_, c)| *c == '&').is_some() => Tok::AndAnd,
            '|' if chars.next_if(|(_, c)| *c == '|').is_some() => Tok::OrOr,
            '=' if chars.next_if(|(_, c)| *c == '=').is_some() => Tok::EqEq,
            '"' => {
                let mut text = String::new();
                let mut closed = false;
                while let Some((_, c)) = chars.next() {
                    match c {
                        '"' => {
                            closed = true;
                            break;
                        }
                        '\\' => match chars.next() {
                            Some((_, escaped)) => text.push(escaped),
                            None => break,
                        },
                        other => text.push(other),
                    }
                }
                if !closed {
                    return Err(ExprError::UnterminatedString { offset });
                }
                Tok::Str(text)
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut ident = String::from(c);
                while let Some((_, c)) =
                    chars.next_if(|(_, c)| c.is_ascii_alphanumeric() || *c == '_')
                {
                    ident.push(c);
                }
                Tok::Ident(ident)
            }
            other => return Err(ExprError::UnexpectedChar { ch: other, offset }),
        };
        tokens.push((tok, offset));
    }

    Ok(tokens)
}

///
/// Parser
///

struct Parser {
    tokens: Vec<(Tok, usize)>,
    pos: usize,
    end: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.pos).map(|(tok, _)| tok)
    }

    fn offset(&self) -> usize {
        self.tokens.get(self.pos).map_or(self.end, |(_, offset)| *offset)
    }

    fn next(&mut self) -> Option<Tok> {
        let tok = self.tokens.get(self.pos).map(|(tok, _)| tok.clone());
        self.pos += 1;

        tok
    }

    fn expect(&mut self, want: &Tok, expected: &'static str) -> Result<(), ExprError> {
        let offset = self.offset();
        match self.next() {
            Some(tok) if &tok == want => Ok(()),
            _ => Err(ExprError::Expected { expected, offset }),
        }
    }

    fn parse_or(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.parse_and()?;
        while self.peek() == Some(&Tok::OrOr) {
            self.pos += 1;
            let rhs = self.parse_and()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }

        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.parse_unary()?;
        while self.peek() == Some(&Tok::AndAnd) {
            self.pos += 1;
            let rhs = self.parse_unary()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }

        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, ExprError> {
        if self.peek() == Some(&Tok::Bang) {
            self.pos += 1;
            return Ok(Expr::Not(Box::new(self.parse_unary()?)));
        }

        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, ExprError> {
        let offset = self.offset();
        match self.next() {
            Some(Tok::LParen) => {
                let inner = self.parse_or()?;
                self.expect(&Tok::RParen, "')'")?;
                Ok(inner)
            }
            Some(Tok::Ident(name)) if name == "present" && self.peek() == Some(&Tok::LParen) => {
                self.pos += 1;
                let field = self.ident()?;
                self.expect(&Tok::RParen, "')'")?;
                Ok(Expr::Present(field))
            }
            Some(Tok::Ident(field)) => {
                let offset = self.offset();
                let negated = match self.next() {
                    Some(Tok::EqEq) => false,
                    Some(Tok::NotEq) => true,
                    _ => {
                        return Err(ExprError::Expected {
                            expected: "'==' or '!='",
                            offset,
                        });
                    }
                };
                let offset = self.offset();
                let Some(Tok::Str(value)) = self.next() else {
                    return Err(ExprError::Expected {
                        expected: "string literal",
                        offset,
                    });
                };
                Ok(if negated {
                    Expr::NotEquals { field, value }
                } else {
                    Expr::Equals { field, value }
                })
            }
            _ => Err(ExprError::Expected {
                expected: "expression",
                offset,
            }),
        }
    }

    fn ident(&mut self) -> Result<String, ExprError> {
        let offset = self.offset();
        match self.next() {
            Some(Tok::Ident(name)) => Ok(name),
            _ => Err(ExprError::Expected {
                expected: "field name",
                offset,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    struct Fields(BTreeMap<&'static str, &'static str>);

    impl ExprContext for Fields {
        fn is_present(&self, field: &str) -> bool {
            self.0.contains_key(field)
        }

        fn text(&self, field: &str) -> Option<String> {
            self.0.get(field).map(ToString::to_string)
        }
    }

    #[test]
    fn parses_precedence_and_over_or() {
        let expr = Expr::parse(r#"present(a) || kind == "x" && !present(b)"#).unwrap();

        assert_eq!(
            expr,
            Expr::Or(
                Box::new(Expr::present("a")),
                Box::new(Expr::And(
                    Box::new(Expr::equals("kind", "x")),
                    Box::new(Expr::Not(Box::new(Expr::present("b")))),
                )),
            )
        );
        assert_eq!(expr.fields(), vec!["a", "kind", "b"]);
    }

    #[test]
    fn display_reparses_to_same_tree() {
        let source = r#"!(status != "gone \"now\"") && present(owner)"#;
        let expr = Expr::parse(source).unwrap();

        assert_eq!(Expr::parse(&expr.to_string()).unwrap(), expr);
    }

    #[test]
    fn evaluates_against_context() {
        let cx = Fields(BTreeMap::from([("kind", "company")]));

        assert!(Expr::parse(r#"kind == "company""#).unwrap().evaluate(&cx));
        assert!(!Expr::parse("present(vat)").unwrap().evaluate(&cx));
        assert!(Expr::parse(r#"vat != "x""#).unwrap().evaluate(&cx));
    }

    #[test]
    fn reports_offsets_for_bad_input() {
        assert_eq!(
            Expr::parse("present(a) &&"),
            Err(ExprError::Expected {
                expected: "expression",
                offset: 13
            })
        );
        assert_eq!(
            Expr::parse("kind = 1"),
            Err(ExprError::UnexpectedChar { ch: '=', offset: 5 })
        );
        assert!(matches!(
            Expr::parse(r#"kind == "open"#),
            Err(ExprError::UnterminatedString { offset: 8 })
        ));
    }

    fn arb_expr() -> impl Strategy<Value = Expr> {
        let field = "[a-z][a-z0-9_]{0,6}";
        let leaf = prop_oneof![
            field.prop_map(|f| Expr::present(&f)),
            (field, ".{0,6}").prop_map(|(f, v)| Expr::equals(&f, &v)),
            (field, ".{0,6}").prop_map(|(field, value)| Expr::NotEquals { field, value }),
        ];

        leaf.prop_recursive(4, 16, 2, |inner| {
            prop_oneof![
                inner.clone().prop_map(|e| Expr::Not(Box::new(e))),
                (inner.clone(), inner.clone())
                    .prop_map(|(l, r)| Expr::And(Box::new(l), Box::new(r))),
                (inner.clone(), inner).prop_map(|(l, r)| Expr::Or(Box::new(l), Box::new(r))),
            ]
        })
    }

    proptest! {
        #[test]
        fn display_always_reparses(expr in arb_expr()) {
            prop_assert_eq!(Expr::parse(&expr.to_string()), Ok(expr));
        }
    }
}
