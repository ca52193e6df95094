//! Spec module registry and query-driven loading.

use std::collections::BTreeMap;

use tracing::info;

use crate::error::{FrameworkError, FrameworkResult};
use crate::listing::{spec_sort_key, Listing};
use crate::logger::GroupRecorder;
use crate::query::{CaseId, Query, SpecId};
use crate::test_group::{RunnableCase, TestGroup};

/// What a spec module exports.
pub struct SpecModule {
    pub description: String,
    pub group: TestGroup,
}

/// Builds a spec module on demand.
pub type SpecFactory = fn() -> SpecModule;

/// The spec modules and directory READMEs of one suite.
pub struct SuiteRegistry {
    suite: String,
    specs: BTreeMap<String, SpecFactory>,
    readmes: BTreeMap<String, String>,
}

impl SuiteRegistry {
    pub fn new(suite: impl Into<String>) -> Self {
        Self {
            suite: suite.into(),
            specs: BTreeMap::new(),
            readmes: BTreeMap::new(),
        }
    }

    pub fn suite(&self) -> &str {
        &self.suite
    }

    /// Register the module at `path` (`/`-separated, no suffix).
    pub fn register(&mut self, path: impl Into<String>, factory: SpecFactory) -> &mut Self {
        self.specs.insert(path.into(), factory);
        self
    }

    /// Attach a README to a directory. `""` is the suite root.
    pub fn readme(&mut self, dir: impl Into<String>, text: impl Into<String>) -> &mut Self {
        self.readmes.insert(dir.into(), text.into());
        self
    }

    pub fn spec_paths(&self) -> impl Iterator<Item = &str> {
        self.specs.keys().map(String::as_str)
    }

    pub fn readmes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.readmes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Load the module at `path`.
    pub fn load(&self, path: &str) -> FrameworkResult<SpecModule> {
        let factory = self
            .specs
            .get(path)
            .ok_or_else(|| FrameworkError::UnknownSpec(SpecId::new(&self.suite, path).to_string()))?;
        Ok(factory())
    }
}

/// A loaded spec module, narrowed by the query that selected it.
pub struct LoadedSpec {
    pub id: SpecId,
    pub description: String,
    pub group: TestGroup,
    pub filter: Option<CaseId>,
}

impl LoadedSpec {
    /// Runnable cases admitted by the filter, in registration order.
    pub fn iterate<'a>(&'a self, rec: &'a GroupRecorder) -> impl Iterator<Item = RunnableCase> + 'a {
        self.group.iterate_filtered(rec, move |id| match &self.filter {
            Some(filter) => filter.selects(id),
            None => true,
        })
    }

    pub fn case_ids(&self) -> Vec<CaseId> {
        self.group
            .case_ids()
            .into_iter()
            .filter(|id| self.filter.as_ref().map_or(true, |f| f.selects(id)))
            .collect()
    }
}

/// Resolves queries against a suite registry.
pub struct TestLoader {
    registry: SuiteRegistry,
}

impl TestLoader {
    pub fn new(registry: SuiteRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &SuiteRegistry {
        &self.registry
    }

    pub fn listing(&self) -> FrameworkResult<Listing> {
        Listing::crawl(&self.registry)
    }

    pub fn load_str(&self, query: &str) -> FrameworkResult<Vec<LoadedSpec>> {
        self.load(&Query::parse(query)?)
    }

    /// Load every spec the query selects, in listing order. Each module's
    /// group is validated; the first invalid module aborts the load.
    pub fn load(&self, query: &Query) -> FrameworkResult<Vec<LoadedSpec>> {
        if query.spec.suite != self.registry.suite {
            return Err(FrameworkError::UnknownSpec(query.spec.to_string()));
        }

        let mut paths: Vec<&str> = match &query.case {
            Some(_) => vec![query.spec.path.as_str()],
            None => self
                .registry
                .spec_paths()
                .filter(|p| SpecId::new(&self.registry.suite, *p).is_under(&query.spec.path))
                .collect(),
        };
        paths.sort_by_key(|p| spec_sort_key(p));

        if paths.is_empty() {
            return Err(FrameworkError::UnknownSpec(query.spec.to_string()));
        }

        let mut loaded = Vec::with_capacity(paths.len());
        for path in paths {
            let id = SpecId::new(&self.registry.suite, path);
            let module = self.registry.load(path)?;
            module
                .group
                .validate()
                .map_err(|e| FrameworkError::InvalidSpec {
                    spec: id.to_string(),
                    source: Box::new(e),
                })?;

            let spec = LoadedSpec {
                id,
                description: module.description.trim().to_string(),
                group: module.group,
                filter: query.case.clone(),
            };
            if let Some(filter) = &spec.filter {
                if spec.case_ids().is_empty() {
                    return Err(FrameworkError::UnknownCase {
                        spec: spec.id.to_string(),
                        case: filter.identity(),
                    });
                }
            }
            loaded.push(spec);
        }

        info!(query = %query, specs = loaded.len(), "loaded specs");
        Ok(loaded)
    }
}
