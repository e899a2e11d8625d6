//! Cache key derivation.
//!
//! A final key is the non-empty components joined with [`KEY_SEPARATOR`] in
//! the fixed order namespace, prefix, base key, params:
//!
//! ```text
//! myapp:items:get_item:id=42:lang="en"
//! ```
//!
//! Parameters are kept in a sorted map, so two calls that pass the same
//! parameters in a different order derive the same key. Values are written
//! as compact JSON and names have `\`, `:` and `=` escaped, so distinct
//! parameter sets never share a segment.

use crate::{CacheError, CacheResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Separator placed between key components.
pub const KEY_SEPARATOR: &str = ":";

/// Call parameters that take part in key derivation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyParams(BTreeMap<String, Value>);

impl KeyParams {
    /// Creates an empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a parameter, returning the updated set.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Adds or replaces a parameter.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    /// Derives parameters from any serializable call arguments.
    ///
    /// Structs and maps contribute one parameter per field, tuples and
    /// sequences one per position (`0`, `1`, ...), a scalar becomes
    /// parameter `0`, and `()` / `None` contribute nothing.
    pub fn from_serializable<T: Serialize + ?Sized>(args: &T) -> CacheResult<Self> {
        let params = match serde_json::to_value(args)? {
            Value::Null => BTreeMap::new(),
            Value::Object(fields) => fields.into_iter().collect(),
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(index, value)| (index.to_string(), value))
                .collect(),
            scalar => BTreeMap::from([("0".to_string(), scalar)]),
        };
        Ok(Self(params))
    }

    /// Returns true when no parameters are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates parameters in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Serializes the parameters as a single key segment.
    ///
    /// Each entry is `name=value` with the value as compact JSON, so the
    /// string `"1"` and the number `1` stay distinct.
    #[must_use]
    pub fn to_segment(&self) -> String {
        self.0
            .iter()
            .map(|(name, value)| format!("{}={}", escape_name(name), value))
            .collect::<Vec<_>>()
            .join(KEY_SEPARATOR)
    }
}

fn escape_name(name: &str) -> String {
    let mut escaped = String::with_capacity(name.len());
    for c in name.chars() {
        if matches!(c, '\\' | ':' | '=') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for KeyParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Builds a key from its components using the default layout.
///
/// Empty components are skipped. Pass `None` for `params` to leave them out.
#[must_use]
pub fn build_key(
    namespace: &str,
    prefix: Option<&str>,
    key: &str,
    params: Option<&KeyParams>,
) -> String {
    let mut segments: Vec<String> = [namespace, prefix.unwrap_or_default(), key]
        .into_iter()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    if let Some(params) = params.filter(|p| !p.is_empty()) {
        segments.push(params.to_segment());
    }

    segments.join(KEY_SEPARATOR)
}

/// Inputs handed to a [`KeyBuilder`].
///
/// `params` is already `None` when parameters are disabled for the call.
#[derive(Debug, Clone, Copy)]
pub struct KeyParts<'a> {
    pub namespace: &'a str,
    pub prefix: Option<&'a str>,
    pub key: &'a str,
    pub params: Option<&'a KeyParams>,
}

/// Turns key components into the final backend key.
///
/// Implemented for closures, so a custom builder can be passed inline. The
/// returned string is used verbatim.
pub trait KeyBuilder: Send + Sync {
    /// Builds the final key.
    fn build(&self, parts: &KeyParts<'_>) -> CacheResult<String>;
}

impl<F> KeyBuilder for F
where
    F: Fn(&KeyParts<'_>) -> CacheResult<String> + Send + Sync,
{
    fn build(&self, parts: &KeyParts<'_>) -> CacheResult<String> {
        self(parts)
    }
}

/// The default layout described at the top of this module.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultKeyBuilder;

impl KeyBuilder for DefaultKeyBuilder {
    fn build(&self, parts: &KeyParts<'_>) -> CacheResult<String> {
        if parts.key.is_empty() {
            return Err(CacheError::key_builder("base key must not be empty"));
        }
        Ok(build_key(parts.namespace, parts.prefix, parts.key, parts.params))
    }
}

/// Wraps a closure as a shareable key builder.
pub fn key_builder_fn<F>(f: F) -> Arc<dyn KeyBuilder>
where
    F: Fn(&KeyParts<'_>) -> CacheResult<String> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Unbuilt key identifiers accepted by the facade.
#[derive(Clone, Default)]
pub struct KeyArgs {
    pub key: String,
    pub prefix: Option<String>,
    pub params: Option<KeyParams>,
    pub key_builder: Option<Arc<dyn KeyBuilder>>,
}

impl KeyArgs {
    /// Creates identifiers for a base key.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    /// Sets the grouping prefix.
    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Sets the parameters.
    #[must_use]
    pub fn params(mut self, params: KeyParams) -> Self {
        self.params = Some(params);
        self
    }

    /// Replaces default derivation with a custom builder.
    #[must_use]
    pub fn key_builder(mut self, builder: Arc<dyn KeyBuilder>) -> Self {
        self.key_builder = Some(builder);
        self
    }

    /// Builds the final key under `namespace`.
    pub fn build(&self, namespace: &str) -> CacheResult<String> {
        let parts = KeyParts {
            namespace,
            prefix: self.prefix.as_deref(),
            key: &self.key,
            params: self.params.as_ref(),
        };
        match &self.key_builder {
            Some(builder) => builder.build(&parts),
            None => DefaultKeyBuilder.build(&parts),
        }
    }
}

impl fmt::Debug for KeyArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyArgs")
            .field("key", &self.key)
            .field("prefix", &self.prefix)
            .field("params", &self.params)
            .field("custom_key_builder", &self.key_builder.is_some())
            .finish()
    }
}

impl From<&str> for KeyArgs {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for KeyArgs {
    fn from(key: String) -> Self {
        Self::new(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(pairs: &[(&str, Value)]) -> KeyParams {
        pairs.iter().map(|(k, v)| (*k, v.clone())).collect()
    }

    #[test]
    fn test_build_key_full_layout() {
        let p = params(&[("id", json!(42)), ("lang", json!("en"))]);
        assert_eq!(
            build_key("myapp", Some("items"), "get_item", Some(&p)),
            r#"myapp:items:get_item:id=42:lang="en""#
        );
    }

    #[test]
    fn test_build_key_is_deterministic() {
        let p = params(&[("a", json!(1))]);
        let first = build_key("root", Some("router"), "handler", Some(&p));
        let second = build_key("root", Some("router"), "handler", Some(&p));
        assert_eq!(first, second);
    }

    #[test]
    fn test_build_key_differs_by_param_value() {
        let one = params(&[("a", json!(1))]);
        let two = params(&[("a", json!(2))]);
        assert_ne!(
            build_key("root", Some("router"), "handler", Some(&one)),
            build_key("root", Some("router"), "handler", Some(&two))
        );
    }

    #[test]
    fn test_build_key_differs_by_param_name() {
        let a = params(&[("a", json!(1))]);
        let b = params(&[("b", json!(1))]);
        assert_ne!(
            build_key("ns", None, "k", Some(&a)),
            build_key("ns", None, "k", Some(&b))
        );
    }

    #[test]
    fn test_build_key_param_order_independent() {
        let mut forward = KeyParams::new();
        forward.insert("a", 1);
        forward.insert("b", 2);
        let mut backward = KeyParams::new();
        backward.insert("b", 2);
        backward.insert("a", 1);
        assert_eq!(
            build_key("ns", Some("px"), "k", Some(&forward)),
            build_key("ns", Some("px"), "k", Some(&backward))
        );
    }

    #[test]
    fn test_build_key_skips_empty_components() {
        assert_eq!(build_key("", None, "k", None), "k");
        assert_eq!(build_key("ns", Some(""), "k", None), "ns:k");
        assert_eq!(build_key("ns", None, "k", Some(&KeyParams::new())), "ns:k");
    }

    #[test]
    fn test_without_params_ignores_content() {
        let with = KeyArgs::new("k").prefix("px").params(params(&[("a", json!(1))]));
        let without = KeyArgs::new("k").prefix("px");
        let mut disabled = with.clone();
        disabled.params = None;
        assert_eq!(disabled.build("ns").unwrap(), without.build("ns").unwrap());
        assert_ne!(with.build("ns").unwrap(), without.build("ns").unwrap());
    }

    #[test]
    fn test_params_from_struct() {
        #[derive(Serialize)]
        struct Query {
            page: u32,
            q: String,
        }
        let p = KeyParams::from_serializable(&Query { page: 2, q: "rust".into() }).unwrap();
        assert_eq!(p.to_segment(), r#"page=2:q="rust""#);
    }

    #[test]
    fn test_params_from_tuple_scalar_and_unit() {
        let tuple = KeyParams::from_serializable(&(7, "x")).unwrap();
        assert_eq!(tuple.to_segment(), r#"0=7:1="x""#);

        let scalar = KeyParams::from_serializable(&5u64).unwrap();
        assert_eq!(scalar.to_segment(), "0=5");

        assert!(KeyParams::from_serializable(&()).unwrap().is_empty());
        assert!(KeyParams::from_serializable(&None::<u32>).unwrap().is_empty());
    }

    #[test]
    fn test_separator_in_value_does_not_mimic_params() {
        let smuggled = params(&[("a", json!("1:b=2"))]);
        let split = params(&[("a", json!("1")), ("b", json!("2"))]);
        assert_ne!(
            build_key("ns", None, "k", Some(&smuggled)),
            build_key("ns", None, "k", Some(&split))
        );
    }

    #[test]
    fn test_separator_in_name_is_escaped() {
        let odd = params(&[("a=1:b", json!(2))]);
        let plain = params(&[("a", json!(1)), ("b", json!(2))]);
        assert_eq!(odd.to_segment(), r"a\=1\:b=2");
        assert_ne!(odd.to_segment(), plain.to_segment());
    }

    #[test]
    fn test_string_and_number_params_differ() {
        let text = params(&[("id", json!("1"))]);
        let number = params(&[("id", json!(1))]);
        assert_ne!(
            build_key("ns", None, "k", Some(&text)),
            build_key("ns", None, "k", Some(&number))
        );
    }

    #[test]
    fn test_nested_values_serialize_as_json() {
        let p = params(&[("filter", json!({"tags": ["a", "b"]}))]);
        assert_eq!(p.to_segment(), r#"filter={"tags":["a","b"]}"#);
    }

    #[test]
    fn test_default_builder_rejects_empty_key() {
        let err = KeyArgs::new("").build("ns").unwrap_err();
        assert!(matches!(err, CacheError::KeyBuilder(_)));
    }

    #[test]
    fn test_custom_builder_output_is_verbatim() {
        let args = KeyArgs::new("k")
            .prefix("px")
            .key_builder(key_builder_fn(|_| Ok("fixed".to_string())));
        assert_eq!(args.build("ns").unwrap(), "fixed");
    }

    #[test]
    fn test_custom_builder_sees_same_inputs() {
        let args = KeyArgs::new("k")
            .prefix("px")
            .params(params(&[("id", json!(1))]))
            .key_builder(key_builder_fn(|parts| {
                Ok(format!(
                    "{}|{}|{}|{}",
                    parts.namespace,
                    parts.prefix.unwrap_or("-"),
                    parts.key,
                    parts.params.map_or(0, KeyParams::len)
                ))
            }));
        assert_eq!(args.build("ns").unwrap(), "ns|px|k|1");
    }

    #[test]
    fn test_custom_builder_error_propagates() {
        let args = KeyArgs::new("k")
            .key_builder(key_builder_fn(|_| Err(CacheError::key_builder("no tenant"))));
        let err = args.build("ns").unwrap_err();
        assert!(err.to_string().contains("no tenant"));
    }

    #[test]
    fn test_key_args_debug_hides_builder() {
        let args = KeyArgs::from("k").key_builder(key_builder_fn(|_| Ok("x".into())));
        let debug = format!("{:?}", args);
        assert!(debug.contains("custom_key_builder: true"));
    }
}
