use std::{collections::BTreeMap, fmt};

///
/// ErrorTree
///
/// Route-aware accumulation of human-readable errors. Validation never stops
/// at the first problem; every stage adds what it finds and the caller gets
/// the whole set, flattened as `route: message`.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ErrorTree {
    messages: Vec<String>,
    children: BTreeMap<String, Self>,
}

impl ErrorTree {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            messages: Vec::new(),
            children: BTreeMap::new(),
        }
    }

    /// Add an error at this level.
    pub fn add(&mut self, error: impl ToString) {
        self.messages.push(error.to_string());
    }

    /// Add an error under a dotted route (`package.entity.field`).
    pub fn add_at(&mut self, route: &str, error: impl ToString) {
        self.node_mut(route).add(error);
    }

    /// Merge another tree underneath a route.
    pub fn merge_at(&mut self, route: &str, other: Self) {
        if other.is_empty() {
            return;
        }
        self.node_mut(route).merge(other);
    }

    /// Merge another tree into this level.
    pub fn merge(&mut self, other: Self) {
        self.messages.extend(other.messages);
        for (route, child) in other.children {
            self.children.entry(route).or_default().merge(child);
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty() && self.children.values().all(Self::is_empty)
    }

    /// Total number of messages across all routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len() + self.children.values().map(Self::len).sum::<usize>()
    }

    /// Flatten into `route: message` strings, routes in sorted order.
    #[must_use]
    pub fn flatten(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(self.len());
        self.flatten_into("", &mut out);

        out
    }

    /// Ok when no error has been recorded.
    pub fn result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }

    fn flatten_into(&self, prefix: &str, out: &mut Vec<String>) {
        for message in &self.messages {
            if prefix.is_empty() {
                out.push(message.clone());
            } else {
                out.push(format!("{prefix}: {message}"));
            }
        }
        for (route, child) in &self.children {
            let route = if prefix.is_empty() {
                route.clone()
            } else {
                format!("{prefix}.{route}")
            };
            child.flatten_into(&route, out);
        }
    }

    fn node_mut(&mut self, route: &str) -> &mut Self {
        route
            .split('.')
            .filter(|segment| !segment.is_empty())
            .fold(self, |node, segment| {
                node.children.entry(segment.to_string()).or_default()
            })
    }
}

impl fmt::Display for ErrorTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.flatten().join("\n"))
    }
}

impl std::error::Error for ErrorTree {}

/// Format and append an error to an [`ErrorTree`].
#[macro_export]
macro_rules! err {
    ($errs:expr, $($arg:tt)*) => {
        $errs.add(format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flatten_prefixes_routes_in_sorted_order() {
        let mut errs = ErrorTree::new();
        errs.add_at("app.person.name", "too long");
        errs.add_at("app.org", "no fields");
        errs.add("root is missing");

        assert_eq!(
            errs.flatten(),
            vec![
                "root is missing".to_string(),
                "app.org: no fields".to_string(),
                "app.person.name: too long".to_string(),
            ]
        );
        assert_eq!(errs.len(), 3);
    }

    #[test]
    fn merge_at_nests_routes() {
        let mut inner = ErrorTree::new();
        inner.add_at("id", "must be required");

        let mut outer = ErrorTree::new();
        outer.merge_at("app.person", inner);

        assert_eq!(outer.flatten(), vec!["app.person.id: must be required"]);
    }

    #[test]
    fn empty_tree_is_ok() {
        let mut errs = ErrorTree::new();
        errs.merge_at("app", ErrorTree::new());

        assert!(errs.is_empty());
        assert!(errs.result().is_ok());
    }
}
