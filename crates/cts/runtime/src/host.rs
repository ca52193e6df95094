//! Host protocol.
//!
//! A host accepts named units of asynchronous work and schedules them however
//! it likes: eagerly, lazily, concurrently or out of order. The adapter never
//! assumes anything about that schedule beyond every task eventually being
//! polled to completion.

use futures::future::BoxFuture;
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// One registered unit of work. `Err` carries the failure detail.
pub type HostTask = BoxFuture<'static, Result<(), String>>;

/// Something that runs registered tests.
pub trait TestHost {
    /// Register `task` under `name`. Must not block.
    fn async_test(&mut self, name: String, task: HostTask);
}

/// What a host observed for one registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostOutcome {
    pub name: String,
    /// `None` on pass.
    pub failure: Option<String>,
}

impl HostOutcome {
    pub fn passed(&self) -> bool {
        self.failure.is_none()
    }
}

/// Spawns every task onto the current tokio runtime as it is registered.
#[derive(Default)]
pub struct TokioHost {
    tasks: Vec<(String, JoinHandle<Result<(), String>>)>,
}

impl TokioHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Wait for every task, in registration order.
    pub async fn join(self) -> Vec<HostOutcome> {
        let mut outcomes = Vec::with_capacity(self.tasks.len());
        for (name, handle) in self.tasks {
            let failure = match handle.await {
                Ok(Ok(())) => None,
                Ok(Err(detail)) => Some(detail),
                Err(e) => {
                    error!(test = %name, error = %e, "host task aborted");
                    Some(e.to_string())
                }
            };
            outcomes.push(HostOutcome { name, failure });
        }
        outcomes
    }
}

impl TestHost for TokioHost {
    fn async_test(&mut self, name: String, task: HostTask) {
        debug!(test = %name, "spawning test");
        let handle = tokio::spawn(task);
        self.tasks.push((name, handle));
    }
}
