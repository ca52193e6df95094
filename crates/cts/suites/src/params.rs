//! Self-tests of parameter expansion.

use cts_framework::{Fixture, ParamSpec, SpecModule, TestGroup};
use serde_json::json;

pub const DESCRIPTION: &str = "
Parameterized cases built from options, explicit combinations and filters.
";

fn formats() -> ParamSpec {
    ParamSpec::options("format", ["r8unorm", "rgba8unorm", "rgba32float"])
}

fn dimensions() -> ParamSpec {
    ParamSpec::options("dimension", ["1d", "2d", "3d"])
}

pub fn spec() -> SpecModule {
    let mut g = TestGroup::new();

    g.testp("options", formats(), |t| async move {
        let format = t.param("format").and_then(|v| v.as_str()).unwrap_or_default();
        t.expect(!format.is_empty(), format!("format {}", format));
    });

    g.testp("combine", formats().combine(dimensions()), |t| async move {
        t.expect(t.params().len() == 2, "both keys bound");
    });

    // Float formats have no 1d variant on the device.
    let supported = formats()
        .combine(dimensions())
        .filter(|p| {
            !(p.get("format") == Some(&json!("rgba32float")) && p.get("dimension") == Some(&json!("1d")))
        });
    g.testp("combine/filter", supported, |t| async move {
        let float_1d = t.param("format") == Some(&json!("rgba32float"))
            && t.param("dimension") == Some(&json!("1d"));
        t.expect(!float_1d, "filtered combination never runs");
    });

    g.testp(
        "override",
        ParamSpec::options("x", [1]).combine(ParamSpec::options("x", [9])),
        |t| async move {
            t.expect(t.param("x") == Some(&json!(9)), "right-hand keys win");
        },
    );

    SpecModule {
        description: DESCRIPTION.to_string(),
        group: g,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cts_framework::{Logger, Status};

    #[test]
    fn test_expansion_counts() {
        let module = spec();
        let names: Vec<String> = module.group.case_ids().iter().map(|id| id.name.clone()).collect();
        let count = |n: &str| names.iter().filter(|x| x.as_str() == n).count();
        assert_eq!(count("options"), 3);
        assert_eq!(count("combine"), 9);
        assert_eq!(count("combine/filter"), 8);
    }

    #[tokio::test]
    async fn test_all_cases_pass() {
        let module = spec();
        module.group.validate().unwrap();
        let logger = Logger::new();
        let (_, rec) = logger.record("cts:framework/params");
        for case in module.group.iterate(&rec) {
            let result = case.run().await.unwrap();
            assert_eq!(result.status, Status::Pass, "{}", result.name);
        }
        assert_eq!(logger.results()[0].cases.len(), 21);
    }
}
