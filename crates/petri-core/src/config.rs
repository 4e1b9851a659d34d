//! Engine configuration.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Simulated work performed after each firing, before the worker tries
    /// again. Locks are never held during it.
    pub work_duration: Duration,

    /// Upper bound of a uniformly random pause added to `work_duration`.
    pub work_jitter: Duration,

    /// Capacity of the firing-event channel created by `NetBuilder::build_with_events`.
    pub event_buffer: usize,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self {
            work_duration: Duration::ZERO,
            work_jitter: Duration::ZERO,
            event_buffer: 1024,
        }
    }

    pub fn with_work_duration(mut self, work_duration: Duration) -> Self {
        self.work_duration = work_duration;
        self
    }

    pub fn with_work_jitter(mut self, work_jitter: Duration) -> Self {
        self.work_jitter = work_jitter;
        self
    }

    pub fn with_event_buffer(mut self, event_buffer: usize) -> Self {
        self.event_buffer = event_buffer;
        self
    }

    /// Pause to take after one firing.
    ///
    /// Sync on purpose: `ThreadRng` is not `Send` and must not live across an
    /// `.await` in the worker.
    pub(crate) fn next_pause(&self) -> Duration {
        if self.work_jitter.is_zero() {
            return self.work_duration;
        }
        let jitter_ns = self.work_jitter.as_nanos().min(u64::MAX as u128) as u64;
        let extra = rand::thread_rng().gen_range(0..=jitter_ns);
        self.work_duration + Duration::from_nanos(extra)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}
