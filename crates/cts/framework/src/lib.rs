//! CTS Framework
//!
//! Registration and execution core of the conformance test suite.
//!
//! - [`TestGroup`] collects test declarations and expands parameterized ones
//!   into a flat, registration-ordered list of cases.
//! - [`Logger`], [`GroupRecorder`] and [`CaseRecorder`] capture per-case
//!   log lines and `pass`/`warn`/`fail` status into a serializable tree.
//! - [`Fixture`] is the per-case context handed to test bodies;
//!   [`DefaultFixture`] adds `warn`/`fail`/`ok`/`expect`.
//! - [`AsyncMutex`] serializes case bodies that a host schedules as
//!   independent asynchronous tasks.
//! - [`Query`], [`Listing`] and [`TestLoader`] address, index and load the
//!   spec modules of a suite.
//!
//! # Example
//!
//! ```rust,ignore
//! use cts_framework::{Logger, ParamSpec, TestGroup};
//!
//! let mut g = TestGroup::new();
//! g.test("basic", |t| async move { t.ok() });
//! g.testp("sizes", ParamSpec::options("size", [4, 8]), |t| async move {
//!     t.expect(t.param("size").is_some(), "size is bound");
//! });
//!
//! let logger = Logger::new();
//! let (_, rec) = logger.record("cts:examples");
//! for case in g.iterate(&rec) {
//!     case.run().await?;
//! }
//! println!("{}", logger.as_json(2)?);
//! ```

#![deny(unsafe_code)]

pub mod async_mutex;
pub mod error;
pub mod fixture;
pub mod listing;
pub mod loader;
pub mod logger;
pub mod params;
pub mod query;
pub mod test_group;

pub use async_mutex::AsyncMutex;
pub use error::{FrameworkError, FrameworkResult};
pub use fixture::{DefaultFixture, Fixture};
pub use listing::{Listing, ListingEntry};
pub use loader::{LoadedSpec, SpecFactory, SpecModule, SuiteRegistry, TestLoader};
pub use logger::{
    CaseRecorder, CaseResult, GroupRecorder, GroupResult, GroupResultHandle, Logger, ResultHandle,
    Status,
};
pub use params::{canonical_json, ParamMap, ParamSpec};
pub use query::{CaseId, Query, SpecId};
pub use test_group::{CaseOutcome, RunnableCase, TestGroup};
