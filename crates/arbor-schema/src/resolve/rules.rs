use crate::{
    error::ErrorTree,
    node::{Entity, Field, MetaModel, UNBOUNDED},
    resolve::field_route,
    types::{FieldType, Multiplicity},
};
use regex::Regex;

// Per-element rules that need no cross-reference.
pub(crate) fn validate_elements(model: &MetaModel, errs: &mut ErrorTree) {
    for package in &model.packages {
        for entity in &package.entities {
            for field in &entity.fields {
                let route = field_route(&package.name, &entity.name, &field.name);
                let mut field_errs = ErrorTree::new();

                validate_multiplicity(field, &mut field_errs);
                validate_key(field, &mut field_errs);
                validate_bounds(field, &mut field_errs);
                validate_constraints(field, &mut field_errs);
                validate_providers(field, &mut field_errs);
                validate_target(field, &mut field_errs);
                validate_exists_if(entity, field, &mut field_errs);

                errs.merge_at(&route, field_errs);
            }
        }
    }
}

fn validate_multiplicity(field: &Field, errs: &mut ErrorTree) {
    match (field.field_type, field.multiplicity()) {
        (FieldType::Composition, Multiplicity::List) => {
            errs.add("composition fields cannot be lists, use a set");
        }
        (ty, Multiplicity::Set) if ty != FieldType::Composition => {
            errs.add(format!("{ty} fields cannot be sets, only compositions"));
        }
        (ty, Multiplicity::List) if ty.is_password() => {
            errs.add(format!("{ty} fields cannot be lists"));
        }
        _ => {}
    }
}

fn validate_key(field: &Field, errs: &mut ErrorTree) {
    if !field.is_key {
        return;
    }
    if field.multiplicity() != Multiplicity::Required {
        errs.add(format!(
            "key fields must be required, found {}",
            field.multiplicity()
        ));
    }
    match field.field_type {
        FieldType::Association => errs.add("association fields cannot be keys"),
        ty if ty.is_password() => errs.add("password fields cannot be keys"),
        ty if !ty.is_keyable() => errs.add(format!("{ty} fields cannot be keys")),
        _ => {}
    }
}

fn validate_bounds(field: &Field, errs: &mut ErrorTree) {
    let bounds = field.bounds;
    if bounds.is_empty() {
        return;
    }
    if !field.multiplicity().is_collection() {
        errs.add("element bounds are only allowed on list and set fields");
    }
    if let Some(max) = bounds.max {
        if max < UNBOUNDED {
            errs.add(format!("max_elements {max} is invalid, use -1 for unbounded"));
        } else if max != UNBOUNDED
            && let Some(min) = bounds.min
            && i64::from(min) > max
        {
            errs.add(format!("min_elements {min} exceeds max_elements {max}"));
        }
    }
}

fn validate_constraints(field: &Field, errs: &mut ErrorTree) {
    let constraints = &field.constraints;
    if constraints.is_empty() {
        return;
    }
    if field.field_type != FieldType::String {
        errs.add(format!(
            "string constraints are not allowed on {} fields",
            field.field_type
        ));
    }
    if let (Some(min), Some(max)) = (constraints.min_length, constraints.max_length)
        && min > max
    {
        errs.add(format!("min_length {min} exceeds max_length {max}"));
    }
    if let Some(pattern) = &constraints.pattern
        && let Err(e) = Regex::new(pattern)
    {
        errs.add(format!("pattern '{pattern}' does not compile: {e}"));
    }
}

fn validate_providers(field: &Field, errs: &mut ErrorTree) {
    if field.hasher.is_some() && field.field_type != FieldType::Password1way {
        errs.add("hasher is only allowed on password_1way fields");
    }
    if field.cipher.is_some() && field.field_type != FieldType::Password2way {
        errs.add("cipher is only allowed on password_2way fields");
    }
}

fn validate_target(field: &Field, errs: &mut ErrorTree) {
    if !field.field_type.requires_target() && field.target.is_some() {
        errs.add(format!("{} fields cannot declare a target", field.field_type));
    }
    if field.field_type != FieldType::Association && !field.path.is_empty() {
        errs.add("only association fields can declare a path");
    }
}

fn validate_exists_if(entity: &Entity, field: &Field, errs: &mut ErrorTree) {
    let Some(expr) = &field.exists_if else {
        return;
    };
    if field.is_key {
        errs.add("key fields cannot be conditional");
    }
    for name in expr.fields() {
        if name == field.name {
            errs.add("exists_if cannot refer to the field itself");
        } else if entity.get_field(name).is_none() {
            errs.add(format!("exists_if refers to unknown field '{name}'"));
        }
    }
}
