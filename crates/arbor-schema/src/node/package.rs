use crate::node::{Entity, Enumeration};

///
/// Package
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Package {
    pub name: String,
    pub description: Option<String>,
    pub entities: Vec<Entity>,
    pub enumerations: Vec<Enumeration>,
}

impl Package {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn entity(mut self, entity: Entity) -> Self {
        self.entities.push(entity);
        self
    }

    #[must_use]
    pub fn enumeration(mut self, enumeration: Enumeration) -> Self {
        self.enumerations.push(enumeration);
        self
    }

    #[must_use]
    pub fn get_entity(&self, name: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.name == name)
    }

    #[must_use]
    pub fn get_enumeration(&self, name: &str) -> Option<&Enumeration> {
        self.enumerations.iter().find(|e| e.name == name)
    }

    // Entities and enumerations with the same name are unioned; a later
    // declaration fills in whatever the earlier one left unset.
    pub(crate) fn union(&mut self, other: Self) {
        if self.description.is_none() {
            self.description = other.description;
        }
        for entity in other.entities {
            match self.entities.iter_mut().find(|e| e.name == entity.name) {
                Some(existing) => existing.union(entity),
                None => self.entities.push(entity),
            }
        }
        for enumeration in other.enumerations {
            match self
                .enumerations
                .iter_mut()
                .find(|e| e.name == enumeration.name)
            {
                Some(existing) => existing.union(enumeration),
                None => self.enumerations.push(enumeration),
            }
        }
    }
}
