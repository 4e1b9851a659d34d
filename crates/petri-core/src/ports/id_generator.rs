//! IdGenerator port - ID 生成の抽象化
//!
//! # 実装
//! - **UlidGenerator**: Clock のタイムスタンプ + ランダム部の ULID

use crate::domain::ids::{FiringId, RunId};
use crate::ports::Clock;
use ulid::Ulid;

/// ワーカーから並行に呼ばれるので `Send + Sync` を要求する。
pub trait IdGenerator: Send + Sync {
    fn generate_run_id(&self) -> RunId;

    fn generate_firing_id(&self) -> FiringId;
}

pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    fn next_ulid(&self) -> Ulid {
        let timestamp_ms = self.clock.now().timestamp_millis() as u64;
        Ulid::from_parts(timestamp_ms, rand::random())
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_run_id(&self) -> RunId {
        RunId::from(self.next_ulid())
    }

    fn generate_firing_id(&self) -> FiringId {
        FiringId::from(self.next_ulid())
    }
}
