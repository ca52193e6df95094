//! Queue tests against the shared device.
//!
//! The device is shared by every case on the runtime's thread and tolerates
//! a single user at a time, so these cases only pass when the runtime
//! serializes case bodies.

use std::cell::Cell;
use std::future::Future;
use std::ops::Deref;
use std::time::Duration;

use cts_framework::{
    CaseRecorder, DefaultFixture, Fixture, ParamMap, ParamSpec, SpecModule, TestGroup,
};
use thiserror::Error;
use tracing::debug;

pub const DESCRIPTION: &str = "Queue submission and buffer creation on the shared device.";

/// Largest buffer the device accepts, in bytes.
pub const MAX_BUFFER_SIZE: u64 = 1 << 16;

thread_local! {
    // One device per thread; the runtime drives every case on one thread.
    static DEVICE_IN_USE: Cell<bool> = const { Cell::new(false) };
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeviceError {
    #[error("device is already in use by another case")]
    Busy,

    #[error("buffer size {size} exceeds device limit {limit}")]
    BufferTooLarge { size: u64, limit: u64 },
}

/// Handle to a created buffer.
#[derive(Debug)]
pub struct Buffer {
    pub size: u64,
}

struct DeviceGuard;

impl Drop for DeviceGuard {
    fn drop(&mut self) {
        DEVICE_IN_USE.with(|busy| busy.set(false));
    }
}

/// Default fixture plus exclusive access to the device.
pub struct DeviceFixture {
    base: DefaultFixture,
}

impl Fixture for DeviceFixture {
    fn create(rec: CaseRecorder, params: ParamMap) -> Self {
        Self {
            base: DefaultFixture::create(rec, params),
        }
    }

    fn recorder(&self) -> &CaseRecorder {
        self.base.recorder()
    }

    fn params(&self) -> &ParamMap {
        self.base.params()
    }
}

impl Deref for DeviceFixture {
    type Target = DefaultFixture;

    fn deref(&self) -> &DefaultFixture {
        &self.base
    }
}

impl DeviceFixture {
    /// Run `work` while holding the device.
    pub async fn with_device<T>(&self, work: impl Future<Output = T>) -> Result<T, DeviceError> {
        if DEVICE_IN_USE.with(|busy| busy.replace(true)) {
            return Err(DeviceError::Busy);
        }
        let _guard = DeviceGuard;
        debug!("device acquired");
        Ok(work.await)
    }

    pub fn create_buffer(&self, size: u64) -> Result<Buffer, DeviceError> {
        if size > MAX_BUFFER_SIZE {
            return Err(DeviceError::BufferTooLarge {
                size,
                limit: MAX_BUFFER_SIZE,
            });
        }
        Ok(Buffer { size })
    }

    fn size_param(&self) -> u64 {
        self.param("size").and_then(|v| v.as_u64()).unwrap_or_default()
    }
}

pub fn spec() -> SpecModule {
    let mut g = TestGroup::new();

    g.testf("submit", |t: DeviceFixture| async move {
        t.with_device(async {
            tokio::time::sleep(Duration::from_millis(2)).await;
            t.log("submitted");
        })
        .await?;
        t.ok();
        Ok::<(), DeviceError>(())
    });

    g.testpf(
        "buffer/create",
        ParamSpec::options("size", [4u64, 256, MAX_BUFFER_SIZE]),
        |t: DeviceFixture| async move {
            let size = t.size_param();
            let buffer = t
                .with_device(async {
                    tokio::task::yield_now().await;
                    t.create_buffer(size)
                })
                .await??;
            t.expect(buffer.size == size, format!("created {} bytes", size));
            Ok::<(), DeviceError>(())
        },
    );

    g.testpf(
        "buffer/oversized",
        ParamSpec::options("size", [MAX_BUFFER_SIZE + 1, u32::MAX as u64]),
        |t: DeviceFixture| async move {
            let size = t.size_param();
            let created = t.with_device(async { t.create_buffer(size) }).await?;
            t.expect(
                matches!(created, Err(DeviceError::BufferTooLarge { .. })),
                "oversized buffer rejected",
            );
            Ok::<(), DeviceError>(())
        },
    );

    SpecModule {
        description: DESCRIPTION.to_string(),
        group: g,
    }
}
