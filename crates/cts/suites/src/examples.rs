//! Worked examples of the registration API.

use std::time::Duration;

use cts_framework::{Fixture, ParamMap, ParamSpec, SpecModule, TestGroup};

pub const DESCRIPTION: &str = "
Examples of writing CTS tests with various features.
";

pub fn spec() -> SpecModule {
    let mut g = TestGroup::new();

    g.test("basic", |t| async move {
        t.log("hello");
        t.ok();
    });

    g.test("basic/async", |t| async move {
        tokio::time::sleep(Duration::from_millis(1)).await;
        t.ok_with("slept");
    });

    g.test("basic/expect", |t| async move {
        t.expect(2 + 2 == 4, "arithmetic");
    });

    g.test("basic/warn", |t| async move {
        t.warn("non-fatal: optional feature unavailable");
        t.ok();
    });

    g.testp(
        "basic/params",
        ParamSpec::options("x", [1, 2, 3]),
        |t| async move {
            let x = t.param("x").and_then(|v| v.as_i64()).unwrap_or_default();
            t.expect(x > 0, format!("x = {}", x));
        },
    );

    let mut single = ParamMap::new();
    single.insert("a".into(), 1.into());
    single.insert("b".into(), "two".into());
    g.testp("basic/params/single", single, |t| async move {
        t.expect(t.param("b").and_then(|v| v.as_str()) == Some("two"), "b bound");
    });

    SpecModule {
        description: DESCRIPTION.to_string(),
        group: g,
    }
}
