use crate::{
    expr::Expr,
    node::TypeRef,
    types::{FieldType, Multiplicity},
};

/// `max_elements` sentinel meaning "no upper bound".
pub const UNBOUNDED: i64 = -1;

///
/// StringConstraints
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct StringConstraints {
    pub min_length: Option<u32>,
    pub max_length: Option<u32>,
    pub pattern: Option<String>,
}

impl StringConstraints {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.min_length.is_none() && self.max_length.is_none() && self.pattern.is_none()
    }
}

///
/// ElementBounds
/// Element count bounds on a list or set field.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ElementBounds {
    pub min: Option<u32>,
    pub max: Option<i64>,
}

impl ElementBounds {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    /// Check an element count against the bounds.
    #[must_use]
    pub fn admits(&self, count: usize) -> bool {
        let count = i64::try_from(count).unwrap_or(i64::MAX);
        let above_min = self.min.is_none_or(|min| count >= i64::from(min));
        let below_max = match self.max {
            None | Some(UNBOUNDED) => true,
            Some(max) => count <= max,
        };

        above_min && below_max
    }
}

///
/// Field
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Field {
    pub name: String,
    pub field_type: FieldType,
    /// Declared multiplicity; `None` means required for keys, optional
    /// otherwise.
    pub multiplicity: Option<Multiplicity>,
    pub is_key: bool,
    pub target: Option<TypeRef>,
    /// Association path: composition field names walked from the root.
    pub path: Vec<String>,
    pub constraints: StringConstraints,
    pub bounds: ElementBounds,
    pub exists_if: Option<Expr>,
    pub hasher: Option<String>,
    pub cipher: Option<String>,
    pub description: Option<String>,
}

impl Field {
    #[must_use]
    pub fn new(name: &str, field_type: FieldType) -> Self {
        Self {
            name: name.to_string(),
            field_type,
            multiplicity: None,
            is_key: false,
            target: None,
            path: Vec::new(),
            constraints: StringConstraints::default(),
            bounds: ElementBounds::default(),
            exists_if: None,
            hasher: None,
            cipher: None,
            description: None,
        }
    }

    #[must_use]
    pub fn string(name: &str) -> Self {
        Self::new(name, FieldType::String)
    }

    #[must_use]
    pub fn composition(name: &str, target: &str) -> Self {
        Self::new(name, FieldType::Composition).target(target)
    }

    #[must_use]
    pub fn enumeration(name: &str, target: &str) -> Self {
        Self::new(name, FieldType::Enumeration).target(target)
    }

    #[must_use]
    pub fn association(name: &str, target: &str, path: &[&str]) -> Self {
        let mut field = Self::new(name, FieldType::Association).target(target);
        field.path = path.iter().map(ToString::to_string).collect();
        field
    }

    /// Effective multiplicity after defaults.
    #[must_use]
    pub fn multiplicity(&self) -> Multiplicity {
        self.multiplicity.unwrap_or(if self.is_key {
            Multiplicity::Required
        } else {
            Multiplicity::Optional
        })
    }

    #[must_use]
    pub const fn key(mut self) -> Self {
        self.is_key = true;
        self
    }

    #[must_use]
    pub const fn with_multiplicity(mut self, multiplicity: Multiplicity) -> Self {
        self.multiplicity = Some(multiplicity);
        self
    }

    #[must_use]
    pub const fn required(self) -> Self {
        self.with_multiplicity(Multiplicity::Required)
    }

    #[must_use]
    pub const fn optional(self) -> Self {
        self.with_multiplicity(Multiplicity::Optional)
    }

    #[must_use]
    pub const fn list(self) -> Self {
        self.with_multiplicity(Multiplicity::List)
    }

    #[must_use]
    pub const fn set(self) -> Self {
        self.with_multiplicity(Multiplicity::Set)
    }

    #[must_use]
    pub fn target(mut self, name: &str) -> Self {
        self.target = Some(TypeRef::local(name));
        self
    }

    #[must_use]
    pub fn target_in(mut self, package: &str, name: &str) -> Self {
        self.target = Some(TypeRef::qualified(package, name));
        self
    }

    #[must_use]
    pub const fn length(mut self, min: Option<u32>, max: Option<u32>) -> Self {
        self.constraints.min_length = min;
        self.constraints.max_length = max;
        self
    }

    #[must_use]
    pub fn pattern(mut self, pattern: &str) -> Self {
        self.constraints.pattern = Some(pattern.to_string());
        self
    }

    #[must_use]
    pub const fn elements(mut self, min: Option<u32>, max: Option<i64>) -> Self {
        self.bounds = ElementBounds { min, max };
        self
    }

    #[must_use]
    pub fn exists_if(mut self, expr: Expr) -> Self {
        self.exists_if = Some(expr);
        self
    }

    #[must_use]
    pub fn hasher(mut self, name: &str) -> Self {
        self.hasher = Some(name.to_string());
        self
    }

    #[must_use]
    pub fn cipher(mut self, name: &str) -> Self {
        self.cipher = Some(name.to_string());
        self
    }

    #[must_use]
    pub fn describe(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_fields_default_to_required() {
        assert_eq!(Field::string("id").key().multiplicity(), Multiplicity::Required);
        assert_eq!(Field::string("name").multiplicity(), Multiplicity::Optional);
        assert_eq!(
            Field::string("tags").list().multiplicity(),
            Multiplicity::List
        );
    }

    #[test]
    fn bounds_admit_counts() {
        let bounds = ElementBounds {
            min: Some(1),
            max: Some(UNBOUNDED),
        };
        assert!(!bounds.admits(0));
        assert!(bounds.admits(10_000));

        let bounds = ElementBounds {
            min: None,
            max: Some(2),
        };
        assert!(bounds.admits(2));
        assert!(!bounds.admits(3));
    }
}
