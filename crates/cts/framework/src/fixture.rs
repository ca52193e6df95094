//! Per-case fixtures.
//!
//! A fresh fixture is built for every case run from the case's recorder and
//! params, handed to the case body by value, and dropped when the body
//! completes. Registration is generic over [`Fixture`], so a spec module can
//! supply its own type with a richer assertion surface.

use serde_json::Value;

use crate::logger::CaseRecorder;
use crate::params::ParamMap;

/// Context object owned by one case run.
pub trait Fixture: Send + 'static {
    /// Build the fixture for one case. Unparameterized cases get an empty map.
    fn create(rec: CaseRecorder, params: ParamMap) -> Self;

    fn recorder(&self) -> &CaseRecorder;

    fn params(&self) -> &ParamMap;

    fn log(&self, msg: impl Into<String>) {
        self.recorder().log(msg);
    }
}

/// The fixture used by `test` and `testp`.
pub struct DefaultFixture {
    rec: CaseRecorder,
    params: ParamMap,
}

impl Fixture for DefaultFixture {
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

impl DefaultFixture {
    /// Parameter lookup by key.
    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    pub fn warn(&self, msg: impl Into<String>) {
        self.rec.warn(msg);
    }

    pub fn fail(&self, msg: impl Into<String>) {
        self.rec.fail(msg);
    }

    /// Logs `OK`.
    pub fn ok(&self) {
        self.log("OK");
    }

    /// Logs `OK: <msg>`, or plain `OK` for an empty message.
    pub fn ok_with(&self, msg: impl Into<String>) {
        let msg = msg.into();
        if msg.is_empty() {
            self.ok();
        } else {
            self.log(format!("OK: {}", msg));
        }
    }

    /// `ok_with(msg)` when `cond` holds, `fail(msg)` otherwise.
    pub fn expect(&self, cond: bool, msg: impl Into<String>) {
        if cond {
            self.ok_with(msg);
        } else {
            self.fail(msg);
        }
    }
}
