use crate::node::Package;

///
/// TypeRef
/// Reference to a declared entity or enumeration. A missing package means
/// "the package the reference is declared in".
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TypeRef {
    pub name: String,
    pub package: Option<String>,
}

impl TypeRef {
    #[must_use]
    pub fn local(name: &str) -> Self {
        Self {
            name: name.to_string(),
            package: None,
        }
    }

    #[must_use]
    pub fn qualified(package: &str, name: &str) -> Self {
        Self {
            name: name.to_string(),
            package: Some(package.to_string()),
        }
    }

    /// Package this reference points into, given the declaring package.
    #[must_use]
    pub fn package_or<'a>(&'a self, declaring: &'a str) -> &'a str {
        self.package.as_deref().unwrap_or(declaring)
    }
}

///
/// MetaModel
/// The union of every loaded schema document.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct MetaModel {
    pub root: Option<TypeRef>,
    pub packages: Vec<Package>,
}

impl MetaModel {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            root: None,
            packages: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_root(mut self, package: &str, entity: &str) -> Self {
        self.root = Some(TypeRef::qualified(package, entity));
        self
    }

    #[must_use]
    pub fn package(mut self, package: Package) -> Self {
        self.add_package(package);
        self
    }

    /// Add a package, unioning it with an existing package of the same name.
    pub fn add_package(&mut self, package: Package) {
        match self.packages.iter_mut().find(|p| p.name == package.name) {
            Some(existing) => existing.union(package),
            None => self.packages.push(package),
        }
    }

    /// Union another model into this one. A root declared by `other` wins
    /// only when this model has none.
    pub fn union(&mut self, other: Self) {
        if self.root.is_none() {
            self.root = other.root;
        }
        for package in other.packages {
            self.add_package(package);
        }
    }

    #[must_use]
    pub fn get_package(&self, name: &str) -> Option<&Package> {
        self.packages.iter().find(|p| p.name == name)
    }
}
