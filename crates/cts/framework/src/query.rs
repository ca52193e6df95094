//! Test addressing.
//!
//! A [`Query`] names a suite, a spec path inside it, and optionally one case.
//! Its string form is `suite:path:` or `suite:path:name:` or
//! `suite:path:name:{params}`, with an optional `?q=` prefix for hosts that
//! address tests through a URL query.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{FrameworkError, FrameworkResult};
use crate::params::{canonical_json, decorate, ParamMap};

/// Separator between query components. Forbidden in case names and paths.
pub const QUERY_SEPARATOR: char = ':';

const QUERY_PREFIX: &str = "?q=";

/// A spec module inside a suite.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpecId {
    pub suite: String,
    /// `/`-separated path relative to the suite root. Empty = whole suite.
    pub path: String,
}

impl SpecId {
    pub fn new(suite: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            suite: suite.into(),
            path: path.into(),
        }
    }

    /// Whether `self.path` lies at or below `prefix` on `/` boundaries.
    pub fn is_under(&self, prefix: &str) -> bool {
        prefix.is_empty()
            || self.path == prefix
            || (self.path.starts_with(prefix) && self.path[prefix.len()..].starts_with('/'))
    }
}

impl fmt::Display for SpecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.suite, self.path)
    }
}

/// A case within a spec: base name plus optional params.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseId {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<ParamMap>,
}

impl CaseId {
    pub fn new(name: impl Into<String>, params: Option<ParamMap>) -> Self {
        Self {
            name: name.into(),
            params,
        }
    }

    /// Decorated identity: `name` or `name/{canonical params}`.
    pub fn identity(&self) -> String {
        decorate(&self.name, self.params.as_ref())
    }

    /// A selector without params admits every parameterization of its name.
    pub fn selects(&self, case: &CaseId) -> bool {
        self.name == case.name
            && match &self.params {
                None => true,
                Some(p) => case.params.as_ref() == Some(p),
            }
    }
}

impl fmt::Display for CaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identity())
    }
}

/// Addressable selection of specs or of a single case.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub spec: SpecId,
    pub case: Option<CaseId>,
}

impl Query {
    /// Every spec under `spec.path`.
    pub fn specs(spec: SpecId) -> Self {
        Self { spec, case: None }
    }

    pub fn case(spec: SpecId, case: CaseId) -> Self {
        Self {
            spec,
            case: Some(case),
        }
    }

    /// `?q=` form for hosts.
    pub fn to_query_string(&self) -> String {
        format!("{}{}", QUERY_PREFIX, self)
    }

    pub fn parse(s: &str) -> FrameworkResult<Self> {
        let body = s.strip_prefix(QUERY_PREFIX).unwrap_or(s);
        let invalid = |reason: &str| FrameworkError::InvalidQuery {
            query: s.to_string(),
            reason: reason.to_string(),
        };

        let mut parts = body.splitn(4, QUERY_SEPARATOR);
        let suite = parts.next().unwrap_or_default();
        let path = parts
            .next()
            .ok_or_else(|| invalid("expected suite:path"))?;
        if suite.is_empty() {
            return Err(invalid("empty suite"));
        }
        let spec = SpecId::new(suite, path);

        let name = parts.next().unwrap_or_default();
        if name.is_empty() {
            if parts.next().is_some_and(|rest| !rest.is_empty()) {
                return Err(invalid("params without a case name"));
            }
            return Ok(Query::specs(spec));
        }

        let params = match parts.next().unwrap_or_default() {
            "" => None,
            raw => match serde_json::from_str::<Value>(raw) {
                Ok(Value::Object(map)) => Some(map),
                Ok(_) => return Err(invalid("params must be a JSON object")),
                Err(e) => return Err(invalid(&format!("bad params JSON: {}", e))),
            },
        };
        Ok(Query::case(spec, CaseId::new(name, params)))
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.spec, QUERY_SEPARATOR)?;
        if let Some(case) = &self.case {
            write!(f, "{}{}", case.name, QUERY_SEPARATOR)?;
            if let Some(params) = &case.params {
                f.write_str(&canonical_json(params))?;
            }
        }
        Ok(())
    }
}

impl FromStr for Query {
    type Err = FrameworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Query::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn params(value: Value) -> ParamMap {
        match value {
            Value::Object(m) => m,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_display_forms() {
        let spec = SpecId::new("cts", "buffers/create");
        assert_eq!(Query::specs(spec.clone()).to_string(), "cts:buffers/create:");
        assert_eq!(
            Query::case(spec.clone(), CaseId::new("a", None)).to_string(),
            "cts:buffers/create:a:"
        );
        assert_eq!(
            Query::case(spec, CaseId::new("b", Some(params(json!({"x": 1}))))).to_query_string(),
            r#"?q=cts:buffers/create:b:{"x":1}"#
        );
    }

    #[test]
    fn test_parse_params_with_separator_inside() {
        let q: Query = r#"?q=cts:examples:b:{"url":"a:b"}"#.parse().unwrap();
        let case = q.case.unwrap();
        assert_eq!(case.name, "b");
        assert_eq!(case.params.unwrap()["url"], json!("a:b"));
    }

    #[test]
    fn test_parse_suite_only() {
        let q = Query::parse("cts:").unwrap();
        assert_eq!(q.spec, SpecId::new("cts", ""));
        assert!(q.case.is_none());
    }

    #[test]
    fn test_parse_errors() {
        assert!(Query::parse("cts").is_err());
        assert!(Query::parse(":path:").is_err());
        assert!(Query::parse("cts:path::{}").is_err());
        assert!(Query::parse("cts:path:a:[1]").is_err());
        assert!(Query::parse("cts:path:a:{oops").is_err());
    }

    #[test]
    fn test_is_under() {
        let spec = SpecId::new("cts", "buffers/create");
        assert!(spec.is_under(""));
        assert!(spec.is_under("buffers"));
        assert!(spec.is_under("buffers/create"));
        assert!(!spec.is_under("buf"));
        assert!(!spec.is_under("buffers/create/more"));
    }

    #[test]
    fn test_selects() {
        let case = CaseId::new("b", Some(params(json!({"x": 1}))));
        assert!(CaseId::new("b", None).selects(&case));
        assert!(CaseId::new("b", Some(params(json!({"x": 1})))).selects(&case));
        assert!(!CaseId::new("b", Some(params(json!({"x": 2})))).selects(&case));
        assert!(!CaseId::new("a", None).selects(&case));
    }

    proptest! {
        #[test]
        fn prop_query_round_trip(
            suite in "[a-z]{1,8}",
            path in "[a-z]{1,6}(/[a-z_]{1,6}){0,3}",
            name in prop::option::of("[a-zA-Z_ ,]{1,12}"),
            x in prop::option::of(any::<i32>()),
            label in "[a-z:/ ]{0,8}",
        ) {
            let spec = SpecId::new(suite, path);
            let query = match name {
                None => Query::specs(spec),
                Some(name) => {
                    let p = x.map(|x| params(json!({"x": x, "label": label})));
                    Query::case(spec, CaseId::new(name, p))
                }
            };
            let reparsed = Query::parse(&query.to_query_string()).unwrap();
            prop_assert_eq!(reparsed, query);
        }
    }
}
