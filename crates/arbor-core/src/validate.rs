//! Instance validation.
//!
//! The decoder only checks what it must to build a tree; everything a schema
//! constrains beyond value kinds is checked here, after the fact, and
//! reported as path-tagged issues.

use crate::{
    obs::sink::{self, MetricsEvent},
    traverse::{Flow, Issues, Node, PathSegment, Visitor, VisitorContext, walk},
    tree::{Entity, Field, Primitive, Value},
};
use arbor_schema::{
    node::UNBOUNDED,
    resolved::{ResolvedField, ResolvedMetaModel},
    types::{FieldType, Multiplicity},
};
use std::convert::Infallible;

/// Validate a tree against its schema.
#[must_use]
pub fn validate(entity: &Entity) -> Issues {
    let mut visitor = ValidateVisitor {
        meta: entity.meta(),
    };
    let Ok(issues) = walk(&mut visitor, entity, &[]);

    let count = issues.values().map(Vec::len).sum::<usize>();
    sink::record(MetricsEvent::Validate {
        entity: entity.resolved().qualified_name().as_str(),
        issues: count as u64,
    });

    issues
}

///
/// ValidateVisitor
///

struct ValidateVisitor<'m> {
    meta: &'m ResolvedMetaModel,
}

impl Visitor for ValidateVisitor<'_> {
    type Error = Infallible;

    fn enter(
        &mut self,
        node: Node<'_>,
        _followers: &[Option<Node<'_>>],
        cx: &mut dyn VisitorContext,
    ) -> Result<Flow, Self::Error> {
        match node {
            Node::Entity(entity) => check_entity(entity, cx),
            Node::Field { meta, field, .. } => check_field(meta, field, cx),
            Node::Value { meta, value } => {
                self.check_value(meta, value, cx);

                // path keys are key-only stubs, checked above
                if matches!(value, Value::Association(_)) {
                    return Ok(Flow::SkipChildren);
                }
            }
        }

        Ok(Flow::Continue)
    }
}

// Presence rules: required fields and exists_if conditions.
fn check_entity(entity: &Entity, cx: &mut dyn VisitorContext) {
    for field in entity.resolved().fields() {
        let slot = entity.field_at(field.index);
        let present = slot.is_some_and(|f| !f.is_null());
        let seg = || PathSegment::Field(field.name.clone());

        if field.multiplicity == Multiplicity::Required && !present {
            let message = if slot.is_some() {
                "required field is null"
            } else {
                "required field is missing"
            };
            cx.add_issue_at(seg(), message.to_string());
        }

        if let Some(expr) = &field.exists_if {
            let holds = expr.evaluate(entity);
            if holds && !present {
                cx.add_issue_at(seg(), format!("field is required when '{expr}' holds"));
            } else if !holds && present {
                cx.add_issue_at(seg(), format!("field must be absent unless '{expr}' holds"));
            }
        }
    }
}

fn check_field(meta: &ResolvedField, field: &Field, cx: &mut dyn VisitorContext) {
    if meta.is_collection() && !meta.bounds.admits(field.len()) {
        let min = meta.bounds.min.unwrap_or(0);
        let max = match meta.bounds.max {
            None | Some(UNBOUNDED) => "unbounded".to_string(),
            Some(max) => max.to_string(),
        };
        cx.add_issue(format!(
            "{} elements is outside the allowed range {min}..{max}",
            field.len()
        ));
    }

    if let Field::Set(elements) = field {
        for (i, element) in elements.iter().enumerate() {
            let missing = element.missing_keys();
            if !missing.is_empty() {
                cx.add_issue_at(
                    PathSegment::Index(i),
                    format!("set element is missing key fields: {}", missing.join(", ")),
                );
            } else if let Some(first) = elements[..i].iter().position(|e| e.matches(element)) {
                cx.add_issue_at(
                    PathSegment::Index(i),
                    format!("set element repeats the key of element {first}"),
                );
            }
        }
    }
}

impl ValidateVisitor<'_> {
    fn check_value(&self, meta: &ResolvedField, value: &Value, cx: &mut dyn VisitorContext) {
        match value {
            Value::Primitive(Primitive::String(text)) if meta.field_type == FieldType::String => {
                for violation in meta.constraints.violations(text) {
                    cx.add_issue(violation);
                }
            }
            Value::Enumeration(name) => {
                if let Some(id) = meta.enumeration_target() {
                    let enumeration = self.meta.enumeration(id);
                    if !enumeration.contains(name) {
                        cx.add_issue(format!(
                            "'{name}' is not a value of enumeration '{}'",
                            enumeration.qualified_name()
                        ));
                    }
                }
            }
            Value::Association(association) if !association.is_empty() => {
                let Some(path) = meta.association_path() else {
                    return;
                };
                if association.path_keys.len() != path.steps.len() {
                    cx.add_issue(format!(
                        "association path expects {} path keys, found {}",
                        path.steps.len(),
                        association.path_keys.len()
                    ));
                    return;
                }
                for (i, (stub, step)) in association.path_keys.iter().zip(&path.steps).enumerate() {
                    if stub.id() != step.entity {
                        cx.add_issue_at(
                            PathSegment::Index(i),
                            format!(
                                "path key should identify '{}', found '{}'",
                                self.meta.entity(step.entity).qualified_name(),
                                stub.resolved().qualified_name()
                            ),
                        );
                    } else if step.through_set && !stub.has_keys() {
                        cx.add_issue_at(
                            PathSegment::Index(i),
                            format!(
                                "path key is missing key fields: {}",
                                stub.missing_keys().join(", ")
                            ),
                        );
                    }
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        decode::Decoder,
        obs::{metrics_report, metrics_reset_all},
        test_support::{app, person},
        tree::Association,
    };
    use arbor_schema::{
        node::{Entity as MetaEntity, Field as MetaField, MetaModel, Package},
        provider::ProviderRegistry,
        resolve::resolve,
    };
    use std::sync::Arc;

    fn issues(text: &str) -> Issues {
        let (root, report) = Decoder::default().decode_str(&app(), text).unwrap();
        assert!(report.is_clean(), "{:?}", report.messages());

        validate(&root)
    }

    #[test]
    fn clean_tree_has_no_issues() {
        let found = issues(
            r#"{"people":[{"id":"p1","name":"Ann","status":"active","code":"ABC"}],"owner":{"path_keys":[{"id":"p1"}]}}"#,
        );

        assert!(found.is_empty(), "{found:?}");
    }

    #[test]
    fn required_fields_are_reported() {
        let found = issues(
            r#"{"people":[{"id":"p1","address":{"street":"Main"}},{"id":"p2","address":{"city":null}}]}"#,
        );

        assert_eq!(found["people[0].address.city"], vec!["required field is missing"]);
        assert_eq!(found["people[1].address.city"], vec!["required field is null"]);
    }

    #[test]
    fn string_constraints_are_reported() {
        let found = issues(r#"{"people":[{"id":"p1","name":"","code":"abcd"}]}"#);

        assert_eq!(found["people[0].name"], vec!["length 0 is below minimum 1"]);
        assert_eq!(
            found["people[0].code"],
            vec!["value does not match pattern '^[A-Z]{3}$'"]
        );
    }

    #[test]
    fn element_bounds_are_reported() {
        let found = issues(r#"{"people":[{"id":"p1","nicknames":["a","b","c","d"]}]}"#);

        assert_eq!(
            found["people[0].nicknames"],
            vec!["4 elements is outside the allowed range 0..3"]
        );
    }

    #[test]
    fn exists_if_governs_presence() {
        let found = issues(
            r#"{"people":[{"id":"p1","kind":"business"},{"id":"p2","kind":"person","company":"Acme"},{"id":"p3","kind":"business","company":"Acme"}]}"#,
        );

        assert_eq!(
            found["people[0].company"],
            vec![r#"field is required when 'kind == "business"' holds"#]
        );
        assert_eq!(
            found["people[1].company"],
            vec![r#"field must be absent unless 'kind == "business"' holds"#]
        );
        assert!(!found.contains_key("people[2].company"));
    }

    #[test]
    fn raw_sets_are_checked_for_keys() {
        let meta = app();
        let mut root = Entity::root(&meta);
        let elements = vec![
            root.new_element("people").unwrap(),
            person(&root, "p1"),
            person(&root, "p1"),
        ];
        *root.field_mut("people").unwrap() = Field::Set(elements);

        let found = validate(&root);
        assert_eq!(found["people[0]"], vec!["set element is missing key fields: id"]);
        assert_eq!(found["people[2]"], vec!["set element repeats the key of element 1"]);
    }

    #[test]
    fn association_stubs_are_checked() {
        let meta = app();
        let mut root = Entity::root(&meta);
        let org = root.new_element("orgs").unwrap();
        let mut stub = person(&root, "p1");
        stub.remove("id").unwrap();

        *root.field_mut("member_ref").unwrap() =
            Field::Single(Some(Value::Association(Association::new(vec![org.clone()]))));
        *root.field_mut("owner").unwrap() =
            Field::Single(Some(Value::Association(Association::new(vec![org]))));
        *root.field_mut("favorites").unwrap() =
            Field::List(vec![Value::Association(Association::new(vec![stub]))]);

        let found = validate(&root);
        assert_eq!(
            found["member_ref"],
            vec!["association path expects 2 path keys, found 1"]
        );
        assert_eq!(
            found["owner[0]"],
            vec!["path key should identify 'app::person', found 'app::org'"]
        );
        assert_eq!(
            found["favorites[0][0]"],
            vec!["path key is missing key fields: id"]
        );
    }

    #[test]
    fn association_stubs_hold_only_keys() {
        let model = MetaModel::new().with_root("app", "root").package(
            Package::new("app")
                .entity(
                    MetaEntity::new("root")
                        .field(MetaField::composition("people", "person").set())
                        .field(MetaField::association("owner", "person", &["people"])),
                )
                .entity(
                    MetaEntity::new("person")
                        .field(MetaField::string("id").key())
                        .field(MetaField::string("name").required()),
                ),
        );
        let meta = Arc::new(resolve(model, &ProviderRegistry::new()).unwrap());

        let (root, report) = Decoder::default()
            .decode_str(
                &meta,
                r#"{"people":[{"id":"p1","name":"Ann"}],"owner":{"path_keys":[{"id":"p1"}]}}"#,
            )
            .unwrap();
        assert!(report.is_clean());

        let found = validate(&root);
        assert!(found.is_empty(), "{found:?}");
    }

    #[test]
    fn validation_is_counted() {
        metrics_reset_all();
        issues(r#"{"people":[{"id":"p1","name":""}]}"#);

        let counters = metrics_report(None).counters.unwrap();
        assert_eq!(counters.ops.validate_calls, 1);
        assert_eq!(counters.ops.validation_issues, 1);
    }
}
