///
/// Enumeration
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Enumeration {
    pub name: String,
    pub description: Option<String>,
    pub values: Vec<EnumValue>,
}

impl Enumeration {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn value(mut self, name: &str) -> Self {
        self.values.push(EnumValue {
            name: name.to_string(),
            description: None,
        });
        self
    }

    #[must_use]
    pub fn values(self, names: &[&str]) -> Self {
        names.iter().fold(self, |e, name| e.value(name))
    }

    pub(crate) fn union(&mut self, other: Self) {
        if self.description.is_none() {
            self.description = other.description;
        }
        for value in other.values {
            if !self.values.iter().any(|v| v.name == value.name) {
                self.values.push(value);
            }
        }
    }
}

///
/// EnumValue
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct EnumValue {
    pub name: String,
    pub description: Option<String>,
}
