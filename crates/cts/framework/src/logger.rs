//! Result recording.
//!
//! The result tree has three levels: a [`Logger`] root, one [`GroupRecorder`]
//! per spec module run, and one [`CaseRecorder`] per case. Case entries are
//! allocated eagerly (when a case is bound for running) but only become part
//! of the reported tree once they have been started and finished.
//!
//! Status is the maximum severity seen between `start` and `finish`:
//! `pass < warn < fail`. Log lines accumulate in call order.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{FrameworkError, FrameworkResult};
use crate::params::{decorate, ParamMap};

/// Outcome severity of a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pass,
    Warn,
    Fail,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Pass => write!(f, "pass"),
            Status::Warn => write!(f, "warn"),
            Status::Fail => write!(f, "fail"),
        }
    }
}

/// Frozen result of one case run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseResult {
    /// Decorated case identity.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<ParamMap>,
    pub status: Status,
    pub logs: Vec<String>,
    /// Wall-clock time between `start` and `finish`, in milliseconds.
    pub timems: f64,
}

/// Finished cases of one spec module, in recording order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupResult {
    pub spec: String,
    pub cases: Vec<CaseResult>,
}

enum CaseState {
    Pending,
    Running {
        status: Status,
        logs: Vec<String>,
        started: Instant,
    },
    Finished(CaseResult),
}

struct CaseEntry {
    name: String,
    params: Option<ParamMap>,
    state: CaseState,
}

type SharedCase = Arc<Mutex<CaseEntry>>;

struct GroupEntry {
    spec: String,
    cases: Mutex<Vec<SharedCase>>,
}

impl GroupEntry {
    fn snapshot(&self) -> GroupResult {
        let cases = self
            .cases
            .lock()
            .iter()
            .filter_map(|c| match &c.lock().state {
                CaseState::Finished(result) => Some(result.clone()),
                _ => None,
            })
            .collect();
        GroupResult {
            spec: self.spec.clone(),
            cases,
        }
    }
}

/// Root of the result tree.
#[derive(Clone, Default)]
pub struct Logger {
    groups: Arc<Mutex<Vec<Arc<GroupEntry>>>>,
}

impl Logger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a group entry for one spec module run.
    pub fn record(&self, spec: impl Into<String>) -> (GroupResultHandle, GroupRecorder) {
        let entry = Arc::new(GroupEntry {
            spec: spec.into(),
            cases: Mutex::new(Vec::new()),
        });
        self.groups.lock().push(entry.clone());
        (
            GroupResultHandle {
                entry: entry.clone(),
            },
            GroupRecorder { entry },
        )
    }

    /// Snapshot of every group, finished cases only.
    pub fn results(&self) -> Vec<GroupResult> {
        self.groups.lock().iter().map(|g| g.snapshot()).collect()
    }

    /// Serialize the tree. `indent == 0` produces compact output.
    pub fn as_json(&self, indent: usize) -> FrameworkResult<String> {
        to_json(&self.results(), indent)
    }
}

pub(crate) fn to_json<T: Serialize>(value: &T, indent: usize) -> FrameworkResult<String> {
    if indent == 0 {
        return Ok(serde_json::to_string(value)?);
    }
    let pad = " ".repeat(indent);
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(pad.as_bytes());
    let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut ser)?;
    // serde_json only ever writes valid UTF-8.
    Ok(String::from_utf8_lossy(&out).into_owned())
}

/// Read-only view of one group's results.
#[derive(Clone)]
pub struct GroupResultHandle {
    entry: Arc<GroupEntry>,
}

impl GroupResultHandle {
    pub fn get(&self) -> GroupResult {
        self.entry.snapshot()
    }
}

/// Records the cases of one spec module run.
#[derive(Clone)]
pub struct GroupRecorder {
    entry: Arc<GroupEntry>,
}

impl GroupRecorder {
    pub fn spec(&self) -> &str {
        &self.entry.spec
    }

    /// Allocate a case entry. The entry is reported once it has finished.
    pub fn record(&self, name: &str, params: Option<ParamMap>) -> (ResultHandle, CaseRecorder) {
        let entry = Arc::new(Mutex::new(CaseEntry {
            name: decorate(name, params.as_ref()),
            params,
            state: CaseState::Pending,
        }));
        self.entry.cases.lock().push(entry.clone());
        (
            ResultHandle {
                entry: entry.clone(),
            },
            CaseRecorder { entry },
        )
    }

    pub fn result(&self) -> GroupResult {
        self.entry.snapshot()
    }
}

/// Placeholder filled in by [`CaseRecorder::finish`].
#[derive(Clone)]
pub struct ResultHandle {
    entry: SharedCase,
}

impl ResultHandle {
    /// `None` until the case has finished.
    pub fn get(&self) -> Option<CaseResult> {
        match &self.entry.lock().state {
            CaseState::Finished(result) => Some(result.clone()),
            _ => None,
        }
    }
}

/// Per-case handle passed to fixtures.
///
/// Messages given as empty strings count as absent: `warn("")` and
/// `fail("")` raise severity without adding a log line.
#[derive(Clone)]
pub struct CaseRecorder {
    entry: SharedCase,
}

impl CaseRecorder {
    pub fn name(&self) -> String {
        self.entry.lock().name.clone()
    }

    pub fn start(&self) -> FrameworkResult<()> {
        let mut entry = self.entry.lock();
        let refused = match entry.state {
            CaseState::Pending => None,
            CaseState::Running { .. } => Some("started twice"),
            CaseState::Finished(_) => Some("started after finish"),
        };
        if let Some(reason) = refused {
            return Err(lifecycle(&entry.name, reason));
        }
        entry.state = CaseState::Running {
            status: Status::Pass,
            logs: Vec::new(),
            started: Instant::now(),
        };
        debug!(case = %entry.name, "case started");
        Ok(())
    }

    pub fn log(&self, msg: impl Into<String>) {
        self.update(None, Some(msg.into()));
    }

    pub fn warn(&self, msg: impl Into<String>) {
        self.update(Some(Status::Warn), non_empty(msg.into()));
    }

    pub fn fail(&self, msg: impl Into<String>) {
        self.update(Some(Status::Fail), non_empty(msg.into()));
    }

    /// Records an error escaping the case body.
    pub fn threw(&self, msg: impl std::fmt::Display) {
        self.update(Some(Status::Fail), Some(format!("EXCEPTION: {}", msg)));
    }

    /// Freeze the entry. Finishing twice is an error.
    pub fn finish(&self) -> FrameworkResult<CaseResult> {
        let mut entry = self.entry.lock();
        let state = std::mem::replace(&mut entry.state, CaseState::Pending);
        match state {
            CaseState::Running {
                status,
                logs,
                started,
            } => {
                let result = CaseResult {
                    name: entry.name.clone(),
                    params: entry.params.clone(),
                    status,
                    logs,
                    timems: started.elapsed().as_secs_f64() * 1000.0,
                };
                debug!(case = %entry.name, status = %status, "case finished");
                entry.state = CaseState::Finished(result.clone());
                Ok(result)
            }
            CaseState::Pending => Err(lifecycle(&entry.name, "finished before start")),
            finished @ CaseState::Finished(_) => {
                entry.state = finished;
                Err(lifecycle(&entry.name, "finished twice"))
            }
        }
    }

    fn update(&self, severity: Option<Status>, line: Option<String>) {
        let mut entry = self.entry.lock();
        let name = entry.name.clone();
        match &mut entry.state {
            CaseState::Running { status, logs, .. } => {
                if let Some(s) = severity {
                    *status = (*status).max(s);
                }
                if let Some(line) = line {
                    logs.push(line);
                }
            }
            _ => warn!(case = %name, "dropping record on a case that is not running"),
        }
    }
}

fn non_empty(msg: String) -> Option<String> {
    if msg.is_empty() {
        None
    } else {
        Some(msg)
    }
}

fn lifecycle(name: &str, reason: &'static str) -> FrameworkError {
    FrameworkError::CaseLifecycle {
        case: name.to_string(),
        reason,
    }
}
