use crate::tree::Entity;

///
/// Association
///
/// Non-owning reference into the tree: one key-only stub per hop of the
/// field's resolved path, in path order. An empty association is encoded
/// as null.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Association {
    pub path_keys: Vec<Entity>,
}

impl Association {
    #[must_use]
    pub const fn new(path_keys: Vec<Entity>) -> Self {
        Self { path_keys }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.path_keys.is_empty()
    }

    /// The stub identifying the final target.
    #[must_use]
    pub fn target(&self) -> Option<&Entity> {
        self.path_keys.last()
    }
}
