//! FiringSink port - 発火イベントの配送先
//!
//! ワーカーは全ロックを解放してから `emit` を呼ぶ。
//! sink の遅延は発火の原子性に影響しないが、そのワーカーの次の試行は遅れる。

use async_trait::async_trait;

use crate::domain::FiringEvent;

#[async_trait]
pub trait FiringSink: Send + Sync {
    async fn emit(&self, event: FiringEvent);
}
