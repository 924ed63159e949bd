use crate::tree::{Entity, Value};

///
/// Field
///
/// A present field. Absence is modelled by the owning entity holding no
/// field at all, so `Single(None)` is an explicit null.
///

#[derive(Clone, Debug)]
pub enum Field {
    Single(Option<Value>),
    List(Vec<Value>),
    Set(Vec<Entity>),
}

impl Field {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Single(None))
    }

    #[must_use]
    pub const fn value(&self) -> Option<&Value> {
        match self {
            Self::Single(Some(v)) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn values(&self) -> &[Value] {
        match self {
            Self::List(values) => values,
            _ => &[],
        }
    }

    #[must_use]
    pub fn elements(&self) -> &[Entity] {
        match self {
            Self::Set(elements) => elements,
            _ => &[],
        }
    }

    /// Element count for collections; 0 or 1 for single fields.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Single(v) => usize::from(v.is_some()),
            Self::List(values) => values.len(),
            Self::Set(elements) => elements.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub const fn shape(&self) -> &'static str {
        match self {
            Self::Single(_) => "single",
            Self::List(_) => "list",
            Self::Set(_) => "set",
        }
    }

    // Apply an incoming field on top of this one.
    pub(crate) fn merge(&mut self, incoming: Self) {
        match (self, incoming) {
            (Self::Set(mine), Self::Set(theirs)) => {
                for element in theirs {
                    merge_element(mine, element);
                }
            }
            (
                Self::Single(Some(Value::Composition(mine))),
                Self::Single(Some(Value::Composition(theirs))),
            ) if mine.id() == theirs.id() =>
            {
                mine.merge(*theirs);
            }
            (slot, incoming) => *slot = incoming,
        }
    }
}

/// Insert into a set under the merge policy: an element whose keys match an
/// existing element is merged into it, anything else is appended. Returns
/// the element's index.
pub(crate) fn merge_element(set: &mut Vec<Entity>, element: Entity) -> usize {
    if let Some(index) = set.iter().position(|e| e.matches(&element)) {
        set[index].merge(element);
        index
    } else {
        set.push(element);
        set.len() - 1
    }
}

// Sets compare as collections keyed by their elements' keys, so element
// order never matters.
impl PartialEq for Field {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Single(a), Self::Single(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Set(a), Self::Set(b)) => {
                a.len() == b.len()
                    && a
                        .iter()
                        .all(|x| b.iter().find(|y| y.matches(x)).is_some_and(|y| x == y))
            }
            _ => false,
        }
    }
}
