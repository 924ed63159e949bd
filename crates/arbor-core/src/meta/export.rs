use crate::{
    encode::{EncodeError, EncodeOptions, Encoder},
    tree::{Entity as Node, TreeError, Value},
};
use arbor_schema::{
    bootstrap::meta_meta_model,
    node::{Entity, Enumeration, Field, MetaModel, Package, TypeRef},
};
use thiserror::Error as ThisError;

///
/// ExportError
///

#[derive(Debug, ThisError)]
pub enum ExportError {
    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Tree(#[from] TreeError),
}

/// A meta-model as an instance of the meta-meta-model.
pub fn export(model: &MetaModel) -> Result<Node, TreeError> {
    let mut document = Node::root(meta_meta_model());
    let meta_model = document.child_mut("meta_model")?;

    if let Some(root) = &model.root {
        write_type_ref(meta_model.child_mut("root")?, root)?;
    }
    for package in &model.packages {
        let node = package_node(meta_model, package)?;
        meta_model.insert("packages", node)?;
    }

    Ok(document)
}

/// A meta-model as a JSON document that [`super::load`] accepts.
pub fn export_string(model: &MetaModel, pretty: bool) -> Result<String, ExportError> {
    let document = export(model)?;
    let encoder = Encoder::new(EncodeOptions {
        pretty,
        ..EncodeOptions::default()
    });

    Ok(encoder.encode_string(&document)?)
}

fn package_node(parent: &Node, package: &Package) -> Result<Node, TreeError> {
    let mut node = parent.new_element("packages")?;
    node.set("name", package.name.as_str())?;
    set_text(&mut node, "description", package.description.as_deref())?;

    for entity in &package.entities {
        let element = entity_node(&node, entity)?;
        node.insert("entities", element)?;
    }
    for enumeration in &package.enumerations {
        let element = enumeration_node(&node, enumeration)?;
        node.insert("enumerations", element)?;
    }

    Ok(node)
}

fn entity_node(parent: &Node, entity: &Entity) -> Result<Node, TreeError> {
    let mut node = parent.new_element("entities")?;
    node.set("name", entity.name.as_str())?;
    set_text(&mut node, "description", entity.description.as_deref())?;

    for field in &entity.fields {
        let element = field_node(&node, field)?;
        node.insert("fields", element)?;
    }

    Ok(node)
}

fn field_node(parent: &Node, field: &Field) -> Result<Node, TreeError> {
    let mut node = parent.new_element("fields")?;
    node.set("name", field.name.as_str())?;
    node.set("type", Value::enumeration(field.field_type.as_str()))?;

    if let Some(multiplicity) = field.multiplicity {
        node.set("multiplicity", Value::enumeration(multiplicity.as_str()))?;
    }
    if field.is_key {
        node.set("is_key", true)?;
    }
    if let Some(target) = &field.target {
        write_type_ref(node.child_mut("target")?, target)?;
    }
    for step in &field.path {
        node.push("path", step.as_str())?;
    }

    if let Some(min) = field.constraints.min_length {
        node.set("min_length", min)?;
    }
    if let Some(max) = field.constraints.max_length {
        node.set("max_length", max)?;
    }
    set_text(&mut node, "pattern", field.constraints.pattern.as_deref())?;
    if let Some(min) = field.bounds.min {
        node.set("min_elements", min)?;
    }
    if let Some(max) = field.bounds.max {
        node.set("max_elements", max)?;
    }

    if let Some(expr) = &field.exists_if {
        node.set("exists_if", expr.to_string())?;
    }
    set_text(&mut node, "hasher", field.hasher.as_deref())?;
    set_text(&mut node, "cipher", field.cipher.as_deref())?;
    set_text(&mut node, "description", field.description.as_deref())?;

    Ok(node)
}

fn enumeration_node(parent: &Node, enumeration: &Enumeration) -> Result<Node, TreeError> {
    let mut node = parent.new_element("enumerations")?;
    node.set("name", enumeration.name.as_str())?;
    set_text(&mut node, "description", enumeration.description.as_deref())?;

    for value in &enumeration.values {
        let mut element = node.new_element("values")?;
        element.set("name", value.name.as_str())?;
        set_text(&mut element, "description", value.description.as_deref())?;
        node.insert("values", element)?;
    }

    Ok(node)
}

fn write_type_ref(node: &mut Node, type_ref: &TypeRef) -> Result<(), TreeError> {
    node.set("name", type_ref.name.as_str())?;
    set_text(node, "package", type_ref.package.as_deref())
}

fn set_text(node: &mut Node, name: &str, text: Option<&str>) -> Result<(), TreeError> {
    match text {
        Some(text) => node.set(name, text),
        None => Ok(()),
    }
}
