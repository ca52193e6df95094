//! Runtime adapter.
//!
//! Bridges loaded spec modules to a [`TestHost`]. Registration is one
//! synchronous pass: every selected case gets its recorder entry and its host
//! task before any body runs. Each task takes its place on the shared
//! [`AsyncMutex`] when the host first polls it, so bodies run one at a time
//! in the order the host starts them, whatever order the host picks.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use cts_framework::{AsyncMutex, GroupResult, Logger, Query, RunnableCase, Status, TestLoader};
use futures::channel::oneshot;
use futures::future::FutureExt;
use tracing::{error, info};

use crate::error::{RuntimeError, RuntimeResult};
use crate::host::{HostTask, TestHost};
use crate::summary::RunSummary;

/// Drives queries through a host.
pub struct HostAdapter {
    loader: TestLoader,
    serializer: Arc<AsyncMutex>,
    indent: usize,
}

impl HostAdapter {
    pub fn new(loader: TestLoader) -> Self {
        Self {
            loader,
            serializer: Arc::new(AsyncMutex::new()),
            indent: 2,
        }
    }

    /// JSON indentation of the report; 0 is compact.
    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    pub fn loader(&self) -> &TestLoader {
        &self.loader
    }

    /// Register every case `query` selects with `host`.
    ///
    /// Nothing runs here. The returned [`PendingRun`] resolves once the host
    /// has driven every registered task to completion.
    pub fn register<H: TestHost>(&self, query: &Query, host: &mut H) -> RuntimeResult<PendingRun> {
        let specs = self.loader.load(query)?;
        let started_at = Utc::now();
        let logger = Logger::new();
        let mut completions = Vec::new();

        for spec in &specs {
            let (_, rec) = logger.record(spec.id.to_string());
            for case in spec.iterate(&rec) {
                let name = Query::case(spec.id.clone(), case.id().clone()).to_string();
                let (done, completion) = oneshot::channel();
                host.async_test(name.clone(), self.task(case, done));
                completions.push((name, completion));
            }
        }

        info!(query = %query, cases = completions.len(), "registered cases");
        Ok(PendingRun {
            logger,
            completions,
            indent: self.indent,
            started_at,
        })
    }

    /// Register, then wait for the host to finish every case.
    ///
    /// The host must drive its tasks independently of this future, as
    /// [`TokioHost`](crate::host::TokioHost) does.
    pub async fn run<H: TestHost>(&self, query: &Query, host: &mut H) -> RuntimeResult<RunReport> {
        self.register(query, host)?.finish().await
    }

    pub async fn run_str<H: TestHost>(&self, query: &str, host: &mut H) -> RuntimeResult<RunReport> {
        let query = Query::parse(query)?;
        self.run(&query, host).await
    }

    fn task(&self, case: RunnableCase, done: oneshot::Sender<()>) -> HostTask {
        let serializer = self.serializer.clone();
        async move {
            let name = case.name();
            let outcome = match serializer.with(move || case.run()).await {
                Ok(result) if result.status == Status::Fail => Err(result.logs.join("\n")),
                Ok(_) => Ok(()),
                Err(e) => {
                    error!(case = %name, error = %e, "case could not run");
                    Err(e.to_string())
                }
            };
            let _ = done.send(());
            outcome
        }
        .boxed()
    }
}

/// Cases registered with a host but not yet awaited.
pub struct PendingRun {
    logger: Logger,
    completions: Vec<(String, oneshot::Receiver<()>)>,
    indent: usize,
    started_at: DateTime<Utc>,
}

impl PendingRun {
    pub fn len(&self) -> usize {
        self.completions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.completions.is_empty()
    }

    /// Live view of the results recorded so far.
    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Wait for every registered case and build the report.
    pub async fn finish(self) -> RuntimeResult<RunReport> {
        for (name, completion) in self.completions {
            if completion.await.is_err() {
                error!(test = %name, "host dropped test before completion");
                return Err(RuntimeError::Host(name));
            }
        }

        let results = self.logger.results();
        let json = self.logger.as_json(self.indent)?;
        let summary = RunSummary::from_results(&results, self.started_at);
        info!(total = summary.total, failed = summary.failed, "run finished");
        Ok(RunReport {
            results,
            json,
            summary,
        })
    }
}

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub results: Vec<GroupResult>,
    /// The serialized result tree.
    pub json: String,
    pub summary: RunSummary,
}

impl RunReport {
    pub fn all_passed(&self) -> bool {
        self.summary.all_passed()
    }

    /// Spec ids in report order.
    pub fn specs(&self) -> Vec<&str> {
        self.results.iter().map(|g| g.spec.as_str()).collect()
    }
}
