use crate::tree::{Entity as Node, Primitive, Value};
use arbor_schema::{
    err,
    error::ErrorTree,
    expr::Expr,
    node::{Entity, EnumValue, Enumeration, Field, MetaModel, Package, TypeRef},
    types::{FieldType, Multiplicity},
};

/// Convert a decoded meta-model document into declared meta nodes.
///
/// Presence and key checks belong to instance validation of the document;
/// this only reports what the tree cannot express, such as `exists_if`
/// expressions that do not parse.
pub fn to_meta_model(document: &Node) -> Result<MetaModel, ErrorTree> {
    let mut errs = ErrorTree::new();
    let mut model = MetaModel::new();

    let Some(meta_model) = document.child("meta_model") else {
        return Ok(model);
    };
    model.root = meta_model.child("root").map(type_ref);

    for package in meta_model.elements("packages") {
        let name = text(package, "name").unwrap_or_default();
        let mut node = Package::new(&name);
        node.description = text(package, "description");

        for entity in package.elements("entities") {
            node.entities.push(convert_entity(&name, entity, &mut errs));
        }
        for enumeration in package.elements("enumerations") {
            node.enumerations.push(convert_enumeration(enumeration));
        }
        model.packages.push(node);
    }

    errs.result()?;

    Ok(model)
}

fn convert_entity(package: &str, node: &Node, errs: &mut ErrorTree) -> Entity {
    let mut entity = Entity::new(node.text("name").unwrap_or_default());
    entity.description = text(node, "description");

    for field in node.elements("fields") {
        let route = format!("{package}.{}.{}", entity.name, field.text("name").unwrap_or_default());
        let mut field_errs = ErrorTree::new();

        if let Some(field) = convert_field(field, &mut field_errs) {
            entity.fields.push(field);
        }
        errs.merge_at(&route, field_errs);
    }

    entity
}

fn convert_field(node: &Node, errs: &mut ErrorTree) -> Option<Field> {
    let name = node.text("name")?;
    let field_type = node.text("type")?.parse::<FieldType>().ok()?;
    let mut field = Field::new(name, field_type);

    field.multiplicity = node
        .text("multiplicity")
        .and_then(|m| m.parse::<Multiplicity>().ok());
    field.is_key = matches!(node.value("is_key"), Some(Value::Primitive(Primitive::Bool(true))));
    field.target = node.child("target").map(type_ref);
    field.path = node.values("path").iter().filter_map(Value::text).collect();

    field.constraints.min_length = uint32(node, "min_length");
    field.constraints.max_length = uint32(node, "max_length");
    field.constraints.pattern = text(node, "pattern");
    field.bounds.min = uint32(node, "min_elements");
    field.bounds.max = match node.value("max_elements") {
        Some(Value::Primitive(Primitive::Int64(v))) => Some(*v),
        _ => None,
    };

    if let Some(source) = node.text("exists_if") {
        match Expr::parse(source) {
            Ok(expr) => field.exists_if = Some(expr),
            Err(e) => err!(errs, "exists_if '{source}' does not parse: {e}"),
        }
    }

    field.hasher = text(node, "hasher");
    field.cipher = text(node, "cipher");
    field.description = text(node, "description");

    Some(field)
}

fn convert_enumeration(node: &Node) -> Enumeration {
    let mut enumeration = Enumeration::new(node.text("name").unwrap_or_default());
    enumeration.description = text(node, "description");
    enumeration.values = node
        .elements("values")
        .iter()
        .map(|value| EnumValue {
            name: value.text("name").unwrap_or_default().to_string(),
            description: text(value, "description"),
        })
        .collect();

    enumeration
}

fn type_ref(node: &Node) -> TypeRef {
    TypeRef {
        name: node.text("name").unwrap_or_default().to_string(),
        package: text(node, "package"),
    }
}

fn text(node: &Node, name: &str) -> Option<String> {
    node.text(name).map(ToString::to_string)
}

fn uint32(node: &Node, name: &str) -> Option<u32> {
    match node.value(name)? {
        Value::Primitive(Primitive::Uint32(v)) => Some(*v),
        _ => None,
    }
}
