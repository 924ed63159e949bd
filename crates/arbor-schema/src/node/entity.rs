use crate::node::Field;

///
/// Entity
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Entity {
    pub name: String,
    pub description: Option<String>,
    pub fields: Vec<Field>,
}

impl Entity {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    #[must_use]
    pub fn describe(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    #[must_use]
    pub fn get_field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Declared key fields, in declaration order.
    pub fn key_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| f.is_key)
    }

    pub(crate) fn union(&mut self, other: Self) {
        if self.description.is_none() {
            self.description = other.description;
        }
        for field in other.fields {
            if let Some(existing) = self.fields.iter_mut().find(|f| f.name == field.name) {
                *existing = field;
            } else {
                self.fields.push(field);
            }
        }
    }
}
