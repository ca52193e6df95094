//! Parameter specifications.
//!
//! A [`ParamSpec`] expands one declared test into one case per mapping. There
//! is no implicit cross product: a list of N mappings yields exactly N cases.
//! The builders below ([`ParamSpec::options`], [`ParamSpec::combine`],
//! [`ParamSpec::filter`]) produce explicit lists.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{FrameworkError, FrameworkResult};

/// One parameter binding: key to JSON value.
pub type ParamMap = Map<String, Value>;

/// Describes how one test name expands into cases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamSpec {
    /// Exactly one case.
    Single(ParamMap),
    /// One case per element, in order.
    List(Vec<ParamMap>),
}

impl ParamSpec {
    pub fn single(params: ParamMap) -> Self {
        ParamSpec::Single(params)
    }

    pub fn list(params: Vec<ParamMap>) -> Self {
        ParamSpec::List(params)
    }

    /// `[{key: v0}, {key: v1}, ...]`
    pub fn options<V, I>(key: &str, values: I) -> Self
    where
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        ParamSpec::List(
            values
                .into_iter()
                .map(|v| {
                    let mut map = ParamMap::new();
                    map.insert(key.to_string(), v.into());
                    map
                })
                .collect(),
        )
    }

    /// Explicit cross product of two specs. Keys from `other` win on collision.
    pub fn combine(self, other: ParamSpec) -> Self {
        let right = other.cases();
        let mut out = Vec::new();
        for left in self.cases() {
            for r in &right {
                let mut merged = left.clone();
                for (k, v) in r {
                    merged.insert(k.clone(), v.clone());
                }
                out.push(merged);
            }
        }
        ParamSpec::List(out)
    }

    /// Keep only the mappings accepted by `pred`.
    pub fn filter<P>(self, pred: P) -> Self
    where
        P: Fn(&ParamMap) -> bool,
    {
        ParamSpec::List(self.cases().into_iter().filter(|p| pred(p)).collect())
    }

    /// Accepts a JSON object (single) or an array of objects (list).
    pub fn from_json(value: Value) -> FrameworkResult<Self> {
        match value {
            Value::Object(map) => Ok(ParamSpec::Single(map)),
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, item)| match item {
                    Value::Object(map) => Ok(map),
                    other => Err(FrameworkError::InvalidParams(format!(
                        "element {} is not an object: {}",
                        i, other
                    ))),
                })
                .collect::<FrameworkResult<Vec<_>>>()
                .map(ParamSpec::List),
            other => Err(FrameworkError::InvalidParams(format!(
                "expected an object or an array of objects, got {}",
                other
            ))),
        }
    }

    /// The mappings this spec expands to, in declaration order.
    pub fn cases(&self) -> Vec<ParamMap> {
        match self {
            ParamSpec::Single(map) => vec![map.clone()],
            ParamSpec::List(maps) => maps.clone(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ParamSpec::Single(_) => 1,
            ParamSpec::List(maps) => maps.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<ParamMap> for ParamSpec {
    fn from(map: ParamMap) -> Self {
        ParamSpec::Single(map)
    }
}

impl From<Vec<ParamMap>> for ParamSpec {
    fn from(maps: Vec<ParamMap>) -> Self {
        ParamSpec::List(maps)
    }
}

/// Rebuilds `value` with every object's keys in sorted order.
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut out = Map::new();
            for k in keys {
                out.insert(k.clone(), canonicalize(&map[k]));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// Compact JSON with sorted keys. Used as case identity.
pub fn canonical_json(params: &ParamMap) -> String {
    canonicalize(&Value::Object(params.clone())).to_string()
}

/// `name` alone, or `name/{canonical params}`.
pub fn decorate(name: &str, params: Option<&ParamMap>) -> String {
    match params {
        Some(p) => format!("{}/{}", name, canonical_json(p)),
        None => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn map(value: Value) -> ParamMap {
        match value {
            Value::Object(m) => m,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_single_yields_one_case() {
        let spec = ParamSpec::single(map(json!({"x": 1})));
        assert_eq!(spec.len(), 1);
        assert_eq!(spec.cases(), vec![map(json!({"x": 1}))]);
    }

    #[test]
    fn test_list_is_not_cross_multiplied() {
        let spec = ParamSpec::from_json(json!([{"x": 1, "y": 1}, {"x": 2, "y": 2}])).unwrap();
        assert_eq!(spec.len(), 2);
    }

    #[test]
    fn test_options() {
        let spec = ParamSpec::options("size", [4, 8, 16]);
        let names: Vec<String> = spec.cases().iter().map(canonical_json).collect();
        assert_eq!(names, vec![r#"{"size":4}"#, r#"{"size":8}"#, r#"{"size":16}"#]);
    }

    #[test]
    fn test_combine_and_filter() {
        let spec = ParamSpec::options("a", [1, 2])
            .combine(ParamSpec::options("b", ["x", "y"]))
            .filter(|p| !(p["a"] == json!(2) && p["b"] == json!("y")));
        let names: Vec<String> = spec.cases().iter().map(canonical_json).collect();
        assert_eq!(
            names,
            vec![r#"{"a":1,"b":"x"}"#, r#"{"a":1,"b":"y"}"#, r#"{"a":2,"b":"x"}"#]
        );
    }

    #[test]
    fn test_from_json_rejects_scalars() {
        assert!(ParamSpec::from_json(json!(3)).is_err());
        assert!(ParamSpec::from_json(json!([{"x": 1}, 2])).is_err());
    }

    #[test]
    fn test_canonical_json_sorts_nested_keys() {
        let p = map(json!({"z": {"b": 1, "a": 2}, "a": [ {"d": 0, "c": 1} ]}));
        assert_eq!(canonical_json(&p), r#"{"a":[{"c":1,"d":0}],"z":{"a":2,"b":1}}"#);
    }

    #[test]
    fn test_decorate() {
        assert_eq!(decorate("a", None), "a");
        assert_eq!(decorate("b", Some(&map(json!({"x": 1})))), r#"b/{"x":1}"#);
    }

    proptest! {
        #[test]
        fn prop_options_preserves_count(values in prop::collection::vec(any::<i64>(), 0..20)) {
            let spec = ParamSpec::options("v", values.clone());
            prop_assert_eq!(spec.len(), values.len());
            prop_assert_eq!(spec.cases().len(), values.len());
        }
    }
}
