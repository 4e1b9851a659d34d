//! ChannelSink - 発火イベントを bounded mpsc に流す
//!
//! # 学習ポイント
//! - bounded channel による背圧（受信側が遅いとワーカーの次の試行が遅れる）
//! - 受信側が drop されても Net は止めない

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::domain::FiringEvent;
use crate::ports::FiringSink;

pub struct ChannelSink {
    tx: mpsc::Sender<FiringEvent>,
}

impl ChannelSink {
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<FiringEvent>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Self { tx }, rx)
    }
}

#[async_trait]
impl FiringSink for ChannelSink {
    async fn emit(&self, event: FiringEvent) {
        if let Err(e) = self.tx.send(event).await {
            tracing::debug!(transition = %e.0.transition, "firing event dropped, receiver closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FiringId, PlaceAmount, RunId};
    use chrono::Utc;
    use ulid::Ulid;

    fn event(transition: &str) -> FiringEvent {
        FiringEvent {
            id: FiringId::from_ulid(Ulid::new()),
            run_id: RunId::from_ulid(Ulid::new()),
            transition: transition.to_string(),
            inputs_debited: vec![PlaceAmount {
                place: "p0".to_string(),
                amount: 2,
            }],
            outputs_credited: vec![],
            fired_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn events_arrive_in_emit_order() {
        let (sink, mut rx) = ChannelSink::new(4);
        sink.emit(event("t0")).await;
        sink.emit(event("t1")).await;

        assert_eq!(rx.recv().await.unwrap().transition, "t0");
        assert_eq!(rx.recv().await.unwrap().transition, "t1");
    }

    #[tokio::test]
    async fn emit_after_receiver_dropped_is_silent() {
        let (sink, rx) = ChannelSink::new(1);
        drop(rx);
        sink.emit(event("t0")).await;
    }
}
