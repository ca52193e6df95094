//! Test registration.
//!
//! A [`TestGroup`] collects declarations (`test`, `testp`, `testf`, `testpf`)
//! and expands them into a flat list of cases in registration order.
//! [`TestGroup::iterate`] binds those cases to a [`GroupRecorder`] and yields
//! [`RunnableCase`]s; every call binds fresh entries, so a group can be
//! iterated any number of times.
//!
//! Case bodies receive their fixture by value and return a future whose
//! output is `()` or `Result<(), E>`. A body with nothing to await is simply
//! an `async` block without await points.

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};

use crate::error::{FrameworkError, FrameworkResult};
use crate::fixture::{DefaultFixture, Fixture};
use crate::logger::{CaseRecorder, CaseResult, GroupRecorder};
use crate::params::{ParamMap, ParamSpec};
use crate::query::{CaseId, QUERY_SEPARATOR};

/// What a case body may evaluate to.
pub trait CaseOutcome {
    /// `Err` carries the message recorded as the failure.
    fn into_outcome(self) -> Result<(), String>;
}

impl CaseOutcome for () {
    fn into_outcome(self) -> Result<(), String> {
        Ok(())
    }
}

impl<E: fmt::Display> CaseOutcome for Result<(), E> {
    fn into_outcome(self) -> Result<(), String> {
        self.map_err(|e| e.to_string())
    }
}

type CaseFn = Arc<dyn Fn(CaseRecorder, ParamMap) -> BoxFuture<'static, Result<(), String>> + Send + Sync>;

#[derive(Clone)]
struct Case {
    id: CaseId,
    run: CaseFn,
}

/// Registry of the cases declared by one spec module.
#[derive(Clone, Default)]
pub struct TestGroup {
    tests: Vec<Case>,
}

impl TestGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// One unparameterized case with the default fixture.
    pub fn test<B, Fut>(&mut self, name: &str, body: B)
    where
        B: Fn(DefaultFixture) -> Fut + Send + Sync + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: CaseOutcome,
    {
        self.test_impl::<DefaultFixture, B, Fut>(name, None, body);
    }

    /// One case per element of `params`, with the default fixture.
    pub fn testp<B, Fut>(&mut self, name: &str, params: impl Into<ParamSpec>, body: B)
    where
        B: Fn(DefaultFixture) -> Fut + Send + Sync + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: CaseOutcome,
    {
        self.test_impl::<DefaultFixture, B, Fut>(name, Some(params.into()), body);
    }

    /// One unparameterized case with fixture `F`.
    pub fn testf<F, B, Fut>(&mut self, name: &str, body: B)
    where
        F: Fixture,
        B: Fn(F) -> Fut + Send + Sync + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: CaseOutcome,
    {
        self.test_impl::<F, B, Fut>(name, None, body);
    }

    /// One case per element of `params`, with fixture `F`.
    pub fn testpf<F, B, Fut>(&mut self, name: &str, params: impl Into<ParamSpec>, body: B)
    where
        F: Fixture,
        B: Fn(F) -> Fut + Send + Sync + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: CaseOutcome,
    {
        self.test_impl::<F, B, Fut>(name, Some(params.into()), body);
    }

    fn test_impl<F, B, Fut>(&mut self, name: &str, params: Option<ParamSpec>, body: B)
    where
        F: Fixture,
        B: Fn(F) -> Fut + Send + Sync + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: CaseOutcome,
    {
        let run: CaseFn = Arc::new(move |rec: CaseRecorder, params: ParamMap| {
            let fut = body(F::create(rec, params));
            async move { fut.await.into_outcome() }.boxed()
        });

        match params {
            None => self.tests.push(Case {
                id: CaseId::new(name, None),
                run,
            }),
            Some(spec) => {
                for p in spec.cases() {
                    self.tests.push(Case {
                        id: CaseId::new(name, Some(p)),
                        run: run.clone(),
                    });
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }

    /// Case identities in registration order.
    pub fn case_ids(&self) -> Vec<CaseId> {
        self.tests.iter().map(|c| c.id.clone()).collect()
    }

    /// Bind every case to `rec`, lazily, in registration order.
    pub fn iterate<'a>(&'a self, rec: &'a GroupRecorder) -> impl Iterator<Item = RunnableCase> + 'a {
        self.iterate_filtered(rec, |_| true)
    }

    /// Like [`iterate`](Self::iterate), recording entries only for admitted cases.
    pub fn iterate_filtered<'a, P>(
        &'a self,
        rec: &'a GroupRecorder,
        admit: P,
    ) -> impl Iterator<Item = RunnableCase> + 'a
    where
        P: Fn(&CaseId) -> bool + 'a,
    {
        self.tests
            .iter()
            .filter(move |c| admit(&c.id))
            .map(move |c| {
                let (_, case_rec) = rec.record(&c.id.name, c.id.params.clone());
                RunnableCase {
                    id: c.id.clone(),
                    rec: case_rec,
                    run: c.run.clone(),
                }
            })
    }

    /// Structural checks without running any body: names must be non-empty,
    /// free of the query separator, and identities unique. A name is either
    /// always parameterized or never, so a query naming it without params
    /// selects exactly the cases registered under it.
    pub fn validate(&self) -> FrameworkResult<()> {
        let mut seen = HashSet::new();
        let mut parameterized: HashMap<&str, bool> = HashMap::new();
        for case in &self.tests {
            if case.id.name.is_empty() {
                return Err(FrameworkError::InvalidCaseName {
                    name: case.id.name.clone(),
                    reason: "empty name".into(),
                });
            }
            if case.id.name.contains(QUERY_SEPARATOR) {
                return Err(FrameworkError::InvalidCaseName {
                    name: case.id.name.clone(),
                    reason: format!("contains {:?}", QUERY_SEPARATOR),
                });
            }
            let has_params = case.id.params.is_some();
            if *parameterized.entry(case.id.name.as_str()).or_insert(has_params) != has_params {
                return Err(FrameworkError::InvalidCaseName {
                    name: case.id.name.clone(),
                    reason: "registered both with and without params".into(),
                });
            }
            let identity = case.id.identity();
            if !seen.insert(identity.clone()) {
                return Err(FrameworkError::DuplicateCase(identity));
            }
        }
        Ok(())
    }
}

/// A case bound to its recorder entry. Running consumes it.
pub struct RunnableCase {
    id: CaseId,
    rec: CaseRecorder,
    run: CaseFn,
}

impl RunnableCase {
    pub fn id(&self) -> &CaseId {
        &self.id
    }

    /// Decorated identity.
    pub fn name(&self) -> String {
        self.id.identity()
    }

    pub fn params(&self) -> Option<&ParamMap> {
        self.id.params.as_ref()
    }

    /// Bracket the body between `start` and `finish` and return the frozen
    /// result. Errors and panics escaping the body are recorded as failures.
    pub async fn run(self) -> FrameworkResult<CaseResult> {
        self.rec.start()?;
        let params = self.id.params.clone().unwrap_or_default();
        let body = (self.run)(self.rec.clone(), params);
        match AssertUnwindSafe(body).catch_unwind().await {
            Ok(Ok(())) => {}
            Ok(Err(msg)) => self.rec.threw(msg),
            Err(panic) => self.rec.threw(panic_message(panic.as_ref())),
        }
        self.rec.finish()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::{Logger, Status};
    use proptest::prelude::*;
    use serde_json::json;

    fn spec(value: serde_json::Value) -> ParamSpec {
        ParamSpec::from_json(value).unwrap()
    }

    async fn run_all(g: &TestGroup) -> Vec<CaseResult> {
        let logger = Logger::new();
        let (_, rec) = logger.record("cts:test");
        let mut out = Vec::new();
        for case in g.iterate(&rec) {
            out.push(case.run().await.unwrap());
        }
        out
    }

    #[tokio::test]
    async fn test_fail_scenario() {
        let mut g = TestGroup::new();
        g.test("a", |t| async move {
            t.fail("boom");
        });
        let results = run_all(&g).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "a");
        assert_eq!(results[0].status, Status::Fail);
        assert_eq!(results[0].logs, vec!["boom"]);
    }

    #[tokio::test]
    async fn test_parameterized_scenario() {
        let mut g = TestGroup::new();
        g.testp("b", spec(json!([{"x": 1}, {"x": 2}])), |t| async move {
            t.ok();
        });
        let results = run_all(&g).await;
        let names: Vec<&str> = results.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec![r#"b/{"x":1}"#, r#"b/{"x":2}"#]);
        for r in &results {
            assert_eq!(r.status, Status::Pass);
            assert_eq!(r.logs, vec!["OK"]);
        }
    }

    #[tokio::test]
    async fn test_fixture_sees_params() {
        let mut g = TestGroup::new();
        g.testp("p", spec(json!({"x": 5})), |t| async move {
            t.expect(t.param("x") == Some(&json!(5)), "x is 5");
        });
        let results = run_all(&g).await;
        assert_eq!(results[0].status, Status::Pass);
        assert_eq!(results[0].logs, vec!["OK: x is 5"]);
    }

    #[tokio::test]
    async fn test_error_and_panic_become_failures() {
        let mut g = TestGroup::new();
        g.test("err", |t| async move {
            t.log("before");
            Err::<(), _>(anyhow::anyhow!("device lost"))
        });
        g.test("panic", |_t| async move {
            let explode = true;
            if explode {
                panic!("exploded");
            }
        });
        g.test("after", |t| async move {
            t.ok();
        });
        let results = run_all(&g).await;
        assert_eq!(results[0].status, Status::Fail);
        assert_eq!(results[0].logs, vec!["before", "EXCEPTION: device lost"]);
        assert_eq!(results[1].status, Status::Fail);
        assert_eq!(results[1].logs, vec!["EXCEPTION: exploded"]);
        assert_eq!(results[2].status, Status::Pass);
    }

    #[tokio::test]
    async fn test_async_body_awaits() {
        let mut g = TestGroup::new();
        g.test("async", |t| async move {
            tokio::task::yield_now().await;
            t.warn("slow");
        });
        let results = run_all(&g).await;
        assert_eq!(results[0].status, Status::Warn);
    }

    struct CountingFixture {
        rec: CaseRecorder,
        params: ParamMap,
    }

    impl Fixture for CountingFixture {
        fn create(rec: CaseRecorder, params: ParamMap) -> Self {
            Self { rec, params }
        }
        fn recorder(&self) -> &CaseRecorder {
            &self.rec
        }
        fn params(&self) -> &ParamMap {
            &self.params
        }
    }

    impl CountingFixture {
        fn count(&self) -> usize {
            self.params.len()
        }
    }

    #[tokio::test]
    async fn test_custom_fixture() {
        let mut g = TestGroup::new();
        g.testf("plain", |t: CountingFixture| async move {
            t.log(format!("count={}", t.count()));
        });
        g.testpf("with", spec(json!({"a": 1, "b": 2})), |t: CountingFixture| async move {
            t.log(format!("count={}", t.count()));
        });
        let results = run_all(&g).await;
        assert_eq!(results[0].logs, vec!["count=0"]);
        assert_eq!(results[1].logs, vec!["count=2"]);
    }

    #[test]
    fn test_iterate_is_restartable() {
        let mut g = TestGroup::new();
        g.test("a", |_t| async {});
        g.test("b", |_t| async {});
        let logger = Logger::new();
        let (_, rec) = logger.record("cts:test");
        let first: Vec<String> = g.iterate(&rec).map(|c| c.name()).collect();
        let second: Vec<String> = g.iterate(&rec).map(|c| c.name()).collect();
        assert_eq!(first, vec!["a", "b"]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_iterate_filtered_records_only_admitted() {
        let mut g = TestGroup::new();
        g.test("a", |_t| async {});
        g.test("b", |_t| async {});
        let logger = Logger::new();
        let (_, rec) = logger.record("cts:test");
        let names: Vec<String> = g
            .iterate_filtered(&rec, |id| id.name == "b")
            .map(|c| c.name())
            .collect();
        assert_eq!(names, vec!["b"]);
    }

    #[test]
    fn test_validate_rejects_duplicates() {
        let mut g = TestGroup::new();
        g.testp("b", spec(json!([{"x": 1}, {"x": 1}])), |_t| async {});
        assert!(matches!(g.validate(), Err(FrameworkError::DuplicateCase(_))));

        let mut g = TestGroup::new();
        g.test("a", |_t| async {});
        g.test("a", |_t| async {});
        assert!(g.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_names() {
        let mut g = TestGroup::new();
        g.test("", |_t| async {});
        assert!(matches!(g.validate(), Err(FrameworkError::InvalidCaseName { .. })));

        let mut g = TestGroup::new();
        g.test("a:b", |_t| async {});
        assert!(matches!(g.validate(), Err(FrameworkError::InvalidCaseName { .. })));
    }

    #[test]
    fn test_validate_accepts_distinct_params() {
        let mut g = TestGroup::new();
        g.testp("b", ParamSpec::options("x", [1, 2]), |_t| async {});
        g.testp("b", ParamSpec::options("x", [3]), |_t| async {});
        assert!(g.validate().is_ok());
        assert_eq!(g.len(), 3);
    }

    #[test]
    fn test_validate_rejects_bare_and_parameterized_name() {
        let mut g = TestGroup::new();
        g.test("b", |_t| async {});
        g.testp("b", ParamSpec::options("x", [1]), |_t| async {});
        assert!(matches!(
            g.validate(),
            Err(FrameworkError::InvalidCaseName { name, .. }) if name == "b"
        ));

        let mut g = TestGroup::new();
        g.testp("b", ParamSpec::options("x", [1]), |_t| async {});
        g.test("b", |_t| async {});
        assert!(g.validate().is_err());
    }

    proptest! {
        #[test]
        fn prop_testp_registers_one_case_per_element(values in prop::collection::btree_set(any::<i32>(), 0..24)) {
            let mut g = TestGroup::new();
            g.testp("v", ParamSpec::options("v", values.iter().copied()), |_t| async {});
            prop_assert_eq!(g.len(), values.len());
            prop_assert!(g.validate().is_ok());
            let logger = Logger::new();
            let (_, rec) = logger.record("cts:prop");
            let names: HashSet<String> = g.iterate(&rec).map(|c| c.name()).collect();
            prop_assert_eq!(names.len(), values.len());
        }

        #[test]
        fn prop_iterate_follows_registration_order(names in prop::collection::vec("[a-z]{1,6}", 0..16)) {
            let mut g = TestGroup::new();
            for n in &names {
                g.test(n, |_t| async {});
            }
            let logger = Logger::new();
            let (_, rec) = logger.record("cts:prop");
            let first: Vec<String> = g.iterate(&rec).map(|c| c.name()).collect();
            let second: Vec<String> = g.iterate(&rec).map(|c| c.name()).collect();
            prop_assert_eq!(&first, &names);
            prop_assert_eq!(first, second);
        }
    }
}
