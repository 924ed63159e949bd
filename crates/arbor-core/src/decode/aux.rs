use serde_json::Value as JsonValue;
use std::{collections::BTreeMap, fmt, sync::Arc};

/// Built-in aux carrying a list of error strings.
pub const AUX_ERRORS: &str = "errors";

/// Built-in aux carrying arbitrary JSON.
pub const AUX_META: &str = "meta";

///
/// AuxKind
/// Checks the JSON payload of one named side channel.
///

pub trait AuxKind: Send + Sync {
    fn check(&self, value: &JsonValue) -> Result<(), String>;
}

impl<F> AuxKind for F
where
    F: Fn(&JsonValue) -> Result<(), String> + Send + Sync,
{
    fn check(&self, value: &JsonValue) -> Result<(), String> {
        self(value)
    }
}

fn check_errors(value: &JsonValue) -> Result<(), String> {
    match value {
        JsonValue::Array(items) if items.iter().all(JsonValue::is_string) => Ok(()),
        _ => Err("errors aux must be a list of strings".to_string()),
    }
}

#[allow(clippy::unnecessary_wraps)]
fn check_any(_: &JsonValue) -> Result<(), String> {
    Ok(())
}

///
/// AuxRegistry
/// Side channels the decoder accepts, by name.
///

#[derive(Clone)]
pub struct AuxRegistry {
    kinds: BTreeMap<String, Arc<dyn AuxKind>>,
}

impl AuxRegistry {
    /// A registry with no side channels at all.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            kinds: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with(mut self, name: &str, kind: impl AuxKind + 'static) -> Self {
        self.register(name, Arc::new(kind));
        self
    }

    pub fn register(&mut self, name: &str, kind: Arc<dyn AuxKind>) {
        self.kinds.insert(name.to_string(), kind);
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.kinds.contains_key(name)
    }

    /// Check a payload; `None` when the name is not registered.
    #[must_use]
    pub fn check(&self, name: &str, value: &JsonValue) -> Option<Result<(), String>> {
        self.kinds.get(name).map(|kind| kind.check(value))
    }
}

impl Default for AuxRegistry {
    fn default() -> Self {
        Self::empty()
            .with(AUX_ERRORS, check_errors)
            .with(AUX_META, check_any)
    }
}

impl fmt::Debug for AuxRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.kinds.keys()).finish()
    }
}

/// Wire key for a field's side channel: `field__aux_`.
#[must_use]
pub fn aux_key(field: &str, aux: &str) -> String {
    format!("{field}__{aux}_")
}

/// Split `field__aux_` into its field and aux names. Field names never
/// contain `__`, so the first occurrence separates the two.
#[must_use]
pub fn split_aux_key(key: &str) -> Option<(&str, &str)> {
    let (field, rest) = key.split_once("__")?;
    let aux = rest.strip_suffix('_')?;

    (!field.is_empty() && !aux.is_empty()).then_some((field, aux))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn aux_keys_split_at_the_first_separator() {
        assert_eq!(split_aux_key("name__errors_"), Some(("name", "errors")));
        assert_eq!(split_aux_key("name__my_aux_"), Some(("name", "my_aux")));
        assert_eq!(split_aux_key("name__errors"), None);
        assert_eq!(split_aux_key("name"), None);
        assert_eq!(split_aux_key("__x_"), None);
        assert_eq!(aux_key("name", "errors"), "name__errors_");
    }

    #[test]
    fn builtins_check_their_payloads() {
        let registry = AuxRegistry::default();

        assert_eq!(registry.check(AUX_ERRORS, &json!(["a", "b"])), Some(Ok(())));
        assert!(matches!(
            registry.check(AUX_ERRORS, &json!([1])),
            Some(Err(_))
        ));
        assert_eq!(registry.check(AUX_META, &json!({"x": [1, null]})), Some(Ok(())));
        assert_eq!(registry.check("other", &json!(null)), None);
    }

    #[test]
    fn closures_register_as_kinds() {
        let registry = AuxRegistry::empty().with("flag", |v: &JsonValue| {
            if v.is_boolean() {
                Ok(())
            } else {
                Err("flag must be a bool".to_string())
            }
        });

        assert!(registry.contains("flag"));
        assert!(!registry.contains(AUX_ERRORS));
        assert_eq!(registry.check("flag", &json!(true)), Some(Ok(())));
    }
}
