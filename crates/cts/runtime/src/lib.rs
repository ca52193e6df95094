//! CTS Runtime
//!
//! Connects the framework to whatever executes tests:
//! - [`TestHost`]: the host protocol, with [`TokioHost`] as the built-in host
//! - [`HostAdapter`]: registers the cases a query selects and serializes
//!   their bodies through one [`AsyncMutex`](cts_framework::AsyncMutex)
//! - [`RunSummary`]: aggregate counts for a finished run
//! - [`RunnerConfig`]: layered configuration for the `cts` binary

pub mod adapter;
pub mod config;
pub mod error;
pub mod host;
pub mod summary;

pub use adapter::{HostAdapter, PendingRun, RunReport};
pub use config::{LoggingConfig, ReportConfig, RunnerConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use host::{HostOutcome, HostTask, TestHost, TokioHost};
pub use summary::RunSummary;

use cts_framework::TestLoader;

/// Adapter over the built-in suites.
pub fn builtin_adapter() -> HostAdapter {
    HostAdapter::new(TestLoader::new(cts_suites::registry()))
}
