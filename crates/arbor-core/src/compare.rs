//! Tree comparison.
//!
//! One leader is walked with any number of followers; each follower gets its
//! own issue map describing how it differs from the leader.

use crate::{
    traverse::{Flow, Issues, Node, PathSegment, Visitor, VisitorContext, walk},
    tree::{Entity, Field, Value},
};
use std::convert::Infallible;

/// Differences of each follower from the leader, in follower order.
#[must_use]
pub fn differences(leader: &Entity, followers: &[&Entity]) -> Vec<Issues> {
    let mut visitor = CompareVisitor {
        found: vec![Issues::new(); followers.len()],
    };

    for (i, follower) in followers.iter().enumerate() {
        if follower.id() != leader.id() {
            visitor.found[i].entry(String::new()).or_default().push(format!(
                "expected entity '{}', found '{}'",
                leader.resolved().qualified_name(),
                follower.resolved().qualified_name()
            ));
        }
    }
    let Ok(_) = walk(&mut visitor, leader, followers);

    visitor.found
}

/// Differences between two trees.
#[must_use]
pub fn diff(leader: &Entity, follower: &Entity) -> Issues {
    differences(leader, &[follower]).pop().unwrap_or_default()
}

///
/// CompareVisitor
///

struct CompareVisitor {
    found: Vec<Issues>,
}

impl CompareVisitor {
    fn report(&mut self, follower: usize, route: String, message: String) {
        self.found[follower].entry(route).or_default().push(message);
    }
}

fn join(route: &str, seg: &PathSegment) -> String {
    match seg {
        PathSegment::Field(name) if route.is_empty() => name.clone(),
        PathSegment::Field(name) => format!("{route}.{name}"),
        PathSegment::Index(i) => format!("{route}[{i}]"),
    }
}

impl Visitor for CompareVisitor {
    type Error = Infallible;

    fn enter(
        &mut self,
        node: Node<'_>,
        followers: &[Option<Node<'_>>],
        cx: &mut dyn VisitorContext,
    ) -> Result<Flow, Self::Error> {
        let route = cx.route();
        let mut flow = Flow::Continue;

        for (i, follower) in followers.iter().enumerate() {
            let Some(follower) = follower else {
                continue;
            };

            match (node, *follower) {
                (Node::Entity(mine), Node::Entity(theirs)) => {
                    for (meta, _) in mine.fields() {
                        if theirs.field_at(meta.index).is_none() {
                            let at = join(&route, &PathSegment::Field(meta.name.clone()));
                            self.report(i, at, "field is missing".to_string());
                        }
                    }
                    for (meta, _) in theirs.fields() {
                        if mine.field_at(meta.index).is_none() {
                            let at = join(&route, &PathSegment::Field(meta.name.clone()));
                            self.report(i, at, "unexpected field".to_string());
                        }
                    }
                }

                (Node::Field { field: mine, .. }, Node::Field { field: theirs, .. }) => {
                    self.compare_fields(i, &route, mine, theirs);
                }

                (Node::Value { value: mine, .. }, Node::Value { value: theirs, .. }) => {
                    match (mine, theirs) {
                        (Value::Composition(_), Value::Composition(_)) => {}
                        (Value::Association(a), Value::Association(b)) => {
                            if a != b {
                                self.report(i, route.clone(), "association differs".to_string());
                            }
                            flow = Flow::SkipChildren;
                        }
                        (a, b) if a != b => {
                            let message =
                                format!("expected {}, found {}", describe(a), describe(b));
                            self.report(i, route.clone(), message);
                        }
                        _ => {}
                    }
                }

                _ => {}
            }
        }

        Ok(flow)
    }
}

impl CompareVisitor {
    fn compare_fields(&mut self, i: usize, route: &str, mine: &Field, theirs: &Field) {
        match (mine, theirs) {
            (Field::Single(None), Field::Single(Some(_))) => {
                self.report(i, route.to_string(), "expected null, found a value".to_string());
            }
            (Field::Single(Some(_)), Field::Single(None)) => {
                self.report(i, route.to_string(), "expected a value, found null".to_string());
            }
            (Field::List(a), Field::List(b)) if a.len() != b.len() => {
                self.report(
                    i,
                    route.to_string(),
                    format!("expected {} elements, found {}", a.len(), b.len()),
                );
            }
            (Field::Set(a), Field::Set(b)) => {
                for (index, element) in a.iter().enumerate() {
                    if !b.iter().any(|other| other.matches(element)) {
                        let at = join(route, &PathSegment::Index(index));
                        self.report(i, at, "set element is missing".to_string());
                    }
                }
                for element in b.iter().filter(|e| !a.iter().any(|mine| mine.matches(e))) {
                    self.report(
                        i,
                        route.to_string(),
                        format!("unexpected set element {}", key_text(element)),
                    );
                }
            }
            _ => {}
        }
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Primitive(p) => format!("{p:?}"),
        Value::Enumeration(name) => format!("'{name}'"),
        other => other.kind().to_string(),
    }
}

// `{id: p1}` style rendering of an element's keys.
fn key_text(element: &Entity) -> String {
    let keys: Vec<String> = element
        .resolved()
        .keys()
        .map(|key| {
            let value = element
                .value(&key.name)
                .and_then(Value::text)
                .unwrap_or_else(|| "?".to_string());
            format!("{}: {value}", key.name)
        })
        .collect();

    format!("{{{}}}", keys.join(", "))
}
