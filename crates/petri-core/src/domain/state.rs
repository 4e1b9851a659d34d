//! WorkerState - トランジションワーカーの状態
//!
//! # 状態遷移
//! - idle → checking → firing → idle（無限ループ）
//! - checking で未発火なら idle に戻って入力 place の変化を待つ
//! - cancelled: 次の安全点で到達（終端）
//! - failed: InvariantViolation で停止（終端）

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Idle,
    Checking,
    Firing,
    Cancelled,
    Failed,
}

impl WorkerState {
    pub fn is_terminal(self) -> bool {
        matches!(self, WorkerState::Cancelled | WorkerState::Failed)
    }
}
