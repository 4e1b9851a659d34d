//! LogSink / NoopSink

use async_trait::async_trait;

use crate::domain::{FiringEvent, PlaceAmount};
use crate::ports::FiringSink;

/// Logs every firing at `info` level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

#[async_trait]
impl FiringSink for LogSink {
    async fn emit(&self, event: FiringEvent) {
        tracing::info!(
            transition = %event.transition,
            firing = %event.id,
            debited = %describe(&event.inputs_debited),
            credited = %describe(&event.outputs_credited),
            "fired"
        );
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

#[async_trait]
impl FiringSink for NoopSink {
    async fn emit(&self, _event: FiringEvent) {}
}

fn describe(amounts: &[PlaceAmount]) -> String {
    amounts
        .iter()
        .map(|a| format!("{}:{}", a.place, a.amount))
        .collect::<Vec<_>>()
        .join(",")
}
