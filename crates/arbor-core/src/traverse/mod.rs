//! Synchronized multi-tree traversal.
//!
//! A walk visits one leader tree and any number of follower trees in
//! lockstep. Followers are matched to the leader node by node: fields by
//! position, list elements by index, set elements by key. A follower with no
//! counterpart at some node is `None` for that node and everything below it.

use crate::tree::{Entity, Field, Value};
use arbor_schema::resolved::ResolvedField;
use std::{collections::BTreeMap, fmt};


/// Path-tagged issues, keyed by rendered path.
pub type Issues = BTreeMap<String, Vec<String>>;

///
/// PathSegment
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PathSegment {
    Field(String),
    Index(usize),
}

impl From<&str> for PathSegment {
    fn from(s: &str) -> Self {
        Self::Field(s.to_string())
    }
}

impl From<usize> for PathSegment {
    fn from(i: usize) -> Self {
        Self::Index(i)
    }
}

/// Render a path as `people[0].name`.
#[must_use]
pub fn render_path(path: &[PathSegment], extra: Option<&PathSegment>) -> String {
    use std::fmt::Write;

    let mut out = String::new();
    for seg in path.iter().chain(extra) {
        match seg {
            PathSegment::Field(name) => {
                if !out.is_empty() {
                    out.push('.');
                }
                out.push_str(name);
            }
            PathSegment::Index(i) => {
                let _ = write!(out, "[{i}]");
            }
        }
    }

    out
}

///
/// Node
/// What a visitor sees at each step of a walk.
///

#[derive(Clone, Copy)]
pub enum Node<'a> {
    Entity(&'a Entity),
    Field {
        entity: &'a Entity,
        meta: &'a ResolvedField,
        field: &'a Field,
    },
    Value {
        meta: &'a ResolvedField,
        value: &'a Value,
    },
}

impl<'a> Node<'a> {
    #[must_use]
    pub const fn as_entity(self) -> Option<&'a Entity> {
        match self {
            Self::Entity(entity) => Some(entity),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_field(self) -> Option<&'a Field> {
        match self {
            Self::Field { field, .. } => Some(field),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_value(self) -> Option<&'a Value> {
        match self {
            Self::Value { value, .. } => Some(value),
            _ => None,
        }
    }
}

impl fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entity(entity) => write!(f, "Entity({})", entity.resolved().qualified_name()),
            Self::Field { meta, .. } => write!(f, "Field({})", meta.qualified_name),
            Self::Value { value, .. } => write!(f, "Value({})", value.kind()),
        }
    }
}

///
/// Flow
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Flow {
    Continue,
    SkipChildren,
}

///
/// VisitorContext
/// Narrow interface exposed to visitors for reporting non-fatal issues.
///

pub trait VisitorContext {
    /// Rendered path of the node being visited.
    fn route(&self) -> String;

    fn add_issue(&mut self, message: String);

    fn add_issue_at(&mut self, seg: PathSegment, message: String);
}

///
/// Visitor
///
/// `enter` runs before a node's children, `exit` after them; `exit` also
/// runs when `enter` asked to skip the children. A returned error stops the
/// walk.
///

pub trait Visitor {
    type Error;

    fn enter(
        &mut self,
        node: Node<'_>,
        followers: &[Option<Node<'_>>],
        cx: &mut dyn VisitorContext,
    ) -> Result<Flow, Self::Error>;

    fn exit(
        &mut self,
        _node: Node<'_>,
        _followers: &[Option<Node<'_>>],
        _cx: &mut dyn VisitorContext,
    ) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Walk a leader tree with followers in lockstep, returning the issues the
/// visitor reported. Followers bound to a different entity than the leader
/// never match.
pub fn walk<V: Visitor>(
    visitor: &mut V,
    leader: &Entity,
    followers: &[&Entity],
) -> Result<Issues, V::Error> {
    let followers: Vec<_> = followers
        .iter()
        .map(|&f| (f.id() == leader.id()).then_some(Node::Entity(f)))
        .collect();

    let mut walker = Walker {
        visitor,
        path: Vec::new(),
        issues: Issues::new(),
    };
    walker.visit(Node::Entity(leader), &followers)?;

    Ok(walker.issues)
}

// Context handed to the visitor for one call.
struct AdapterContext<'a> {
    path: &'a [PathSegment],
    issues: &'a mut Issues,
}

impl VisitorContext for AdapterContext<'_> {
    fn route(&self) -> String {
        render_path(self.path, None)
    }

    fn add_issue(&mut self, message: String) {
        let key = render_path(self.path, None);
        self.issues.entry(key).or_default().push(message);
    }

    fn add_issue_at(&mut self, seg: PathSegment, message: String) {
        let key = render_path(self.path, Some(&seg));
        self.issues.entry(key).or_default().push(message);
    }
}

struct Walker<'v, V> {
    visitor: &'v mut V,
    path: Vec<PathSegment>,
    issues: Issues,
}

impl<V: Visitor> Walker<'_, V> {
    fn visit<'a>(
        &mut self,
        node: Node<'a>,
        followers: &[Option<Node<'a>>],
    ) -> Result<(), V::Error> {
        let flow = self.visitor.enter(
            node,
            followers,
            &mut AdapterContext {
                path: &self.path,
                issues: &mut self.issues,
            },
        )?;

        if flow == Flow::Continue {
            self.children(node, followers)?;
        }

        self.visitor.exit(
            node,
            followers,
            &mut AdapterContext {
                path: &self.path,
                issues: &mut self.issues,
            },
        )
    }

    fn visit_at<'a>(
        &mut self,
        seg: PathSegment,
        node: Node<'a>,
        followers: &[Option<Node<'a>>],
    ) -> Result<(), V::Error> {
        self.path.push(seg);
        let result = self.visit(node, followers);
        self.path.pop();

        result
    }

    fn children<'a>(
        &mut self,
        node: Node<'a>,
        followers: &[Option<Node<'a>>],
    ) -> Result<(), V::Error> {
        match node {
            Node::Entity(entity) => {
                for (meta, field) in entity.fields() {
                    let matched = map_followers(followers, |f| match f {
                        Node::Entity(other) if other.id() == entity.id() => {
                            other.field_at(meta.index).map(|field| Node::Field {
                                entity: other,
                                meta,
                                field,
                            })
                        }
                        _ => None,
                    });
                    self.visit_at(
                        PathSegment::Field(meta.name.clone()),
                        Node::Field {
                            entity,
                            meta,
                            field,
                        },
                        &matched,
                    )?;
                }
            }

            Node::Field { meta, field, .. } => match field {
                Field::Single(None) => {}
                Field::Single(Some(value)) => {
                    let matched = map_followers(followers, |f| match f {
                        Node::Field {
                            field: Field::Single(Some(value)),
                            ..
                        } => Some(Node::Value { meta, value }),
                        _ => None,
                    });
                    self.visit(Node::Value { meta, value }, &matched)?;
                }
                Field::List(values) => {
                    for (i, value) in values.iter().enumerate() {
                        let matched = map_followers(followers, |f| match f {
                            Node::Field {
                                field: Field::List(others),
                                ..
                            } => others.get(i).map(|value| Node::Value { meta, value }),
                            _ => None,
                        });
                        self.visit_at(
                            PathSegment::Index(i),
                            Node::Value { meta, value },
                            &matched,
                        )?;
                    }
                }
                Field::Set(elements) => {
                    for (i, element) in elements.iter().enumerate() {
                        let matched = map_followers(followers, |f| match f {
                            Node::Field {
                                field: Field::Set(others),
                                ..
                            } => others.iter().find(|o| o.matches(element)).map(Node::Entity),
                            _ => None,
                        });
                        self.visit_at(PathSegment::Index(i), Node::Entity(element), &matched)?;
                    }
                }
            },

            Node::Value { value, .. } => match value {
                Value::Composition(child) => {
                    let matched = map_followers(followers, |f| match f {
                        Node::Value {
                            value: Value::Composition(other),
                            ..
                        } => Some(Node::Entity(other)),
                        _ => None,
                    });
                    self.visit(Node::Entity(child), &matched)?;
                }
                Value::Association(association) => {
                    for (i, stub) in association.path_keys.iter().enumerate() {
                        let matched = map_followers(followers, |f| match f {
                            Node::Value {
                                value: Value::Association(other),
                                ..
                            } => other.path_keys.get(i).map(Node::Entity),
                            _ => None,
                        });
                        self.visit_at(PathSegment::Index(i), Node::Entity(stub), &matched)?;
                    }
                }
                _ => {}
            },
        }

        Ok(())
    }
}

fn map_followers<'a>(
    followers: &[Option<Node<'a>>],
    f: impl Fn(Node<'a>) -> Option<Node<'a>>,
) -> Vec<Option<Node<'a>>> {
    followers.iter().map(|node| node.and_then(&f)).collect()
}
