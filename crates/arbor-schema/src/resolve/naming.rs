use crate::{
    MAX_NAME_LEN,
    error::ErrorTree,
    node::MetaModel,
    resolve::{element_route, field_route},
};
use std::collections::BTreeSet;

// Identifier and uniqueness checks for every declared name.
pub(crate) fn validate_names(model: &MetaModel, errs: &mut ErrorTree) {
    let mut packages = BTreeSet::new();

    for package in &model.packages {
        if let Err(msg) = validate_ident(&package.name) {
            errs.add_at(&package.name, format!("package name {msg}"));
        }
        if !packages.insert(package.name.as_str()) {
            errs.add_at(&package.name, "package is declared twice");
        }

        // entities and enumerations share one namespace per package
        let mut elements = BTreeSet::new();
        for entity in &package.entities {
            let route = element_route(&package.name, &entity.name);
            if let Err(msg) = validate_ident(&entity.name) {
                errs.add_at(&route, format!("entity name {msg}"));
            }
            if !elements.insert(entity.name.as_str()) {
                errs.add_at(&route, "name is declared twice in this package");
            }

            let mut fields = BTreeSet::new();
            for field in &entity.fields {
                let route = field_route(&package.name, &entity.name, &field.name);
                if let Err(msg) = validate_ident(&field.name) {
                    errs.add_at(&route, format!("field name {msg}"));
                }
                if !fields.insert(field.name.as_str()) {
                    errs.add_at(&route, "field is declared twice in this entity");
                }
            }
        }

        for enumeration in &package.enumerations {
            let route = element_route(&package.name, &enumeration.name);
            if let Err(msg) = validate_ident(&enumeration.name) {
                errs.add_at(&route, format!("enumeration name {msg}"));
            }
            if !elements.insert(enumeration.name.as_str()) {
                errs.add_at(&route, "name is declared twice in this package");
            }
            if enumeration.values.is_empty() {
                errs.add_at(&route, "enumeration declares no values");
            }

            let mut values = BTreeSet::new();
            for value in &enumeration.values {
                if value.name.is_empty() {
                    errs.add_at(&route, "enumeration value is empty");
                }
                if !values.insert(value.name.as_str()) {
                    errs.add_at(
                        &route,
                        format!("enumeration value '{}' is declared twice", value.name),
                    );
                }
            }
        }
    }
}

/// Lowercase identifier: `[a-z][a-z0-9_]*`, no `__`, at most
/// [`MAX_NAME_LEN`] characters. `__` is reserved for side-channel keys.
pub(crate) fn validate_ident(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("is empty".to_string());
    }
    if name.len() > MAX_NAME_LEN {
        return Err(format!(
            "'{name}' exceeds the maximum length of {MAX_NAME_LEN}"
        ));
    }

    let mut chars = name.chars();
    if !chars.next().is_some_and(|c| c.is_ascii_lowercase()) {
        return Err(format!("'{name}' must start with a lowercase letter"));
    }
    if !chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_') {
        return Err(format!(
            "'{name}' may only contain lowercase letters, digits and '_'"
        ));
    }
    if name.contains("__") {
        return Err(format!("'{name}' must not contain '__'"));
    }

    Ok(())
}
