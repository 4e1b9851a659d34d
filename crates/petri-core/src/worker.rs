use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::domain::{FiringEvent, RunId, WorkerState};
use crate::error::NetError;
use crate::net::{Net, NetCore};
use crate::observability::TerminationReport;

/// Worker group handle.
/// - トランジション 1 つにつき 1 ワーカー（tokio task）
/// - `cancel()` で全ワーカーに停止を要求する（発火中のものは最後まで走る）
/// - `await_termination()` で全ワーカーが終端状態になるのを待つ
///
/// Dropping the group does not stop the workers; call `cancel` first.
pub struct WorkerGroup {
    net: Net,
    run_id: RunId,
    shutdown_tx: Arc<watch::Sender<bool>>,
    workers: Vec<WorkerHandle>,
}

struct WorkerHandle {
    transition: String,
    state_rx: watch::Receiver<WorkerState>,
    join: JoinHandle<Result<u64, NetError>>,
}

impl WorkerGroup {
    pub(crate) fn spawn(net: Net, run_id: RunId) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let shutdown_tx = Arc::new(shutdown_tx);

        let mut workers = Vec::with_capacity(net.core.transitions.len());
        for (index, transition) in net.core.transitions.iter().enumerate() {
            let core = Arc::clone(&net.core);
            let tx = Arc::clone(&shutdown_tx);
            let mut rx = shutdown_rx.clone();

            let join = tokio::spawn(async move {
                worker_loop(core, index, run_id, tx, &mut rx).await
            });
            workers.push(WorkerHandle {
                transition: transition.name().to_string(),
                state_rx: transition.subscribe_state(),
                join,
            });
        }

        Self {
            net,
            run_id,
            shutdown_tx,
            workers,
        }
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn net(&self) -> &Net {
        &self.net
    }

    /// Request cancellation. Idle workers wake immediately; a firing in
    /// progress completes and releases its locks first.
    pub fn cancel(&self) {
        self.shutdown_tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.shutdown_tx.borrow()
    }

    /// Wait until every worker has reached a terminal state.
    ///
    /// Workers only stop on cancellation (or on an invariant violation, which
    /// cancels the whole net), so call `cancel` first. Returns the first
    /// worker error, if any.
    pub async fn await_termination(self) -> Result<TerminationReport, NetError> {
        let mut fired = BTreeMap::new();
        let mut first_error = None;

        for worker in self.workers {
            let WorkerHandle {
                transition,
                mut state_rx,
                mut join,
            } = worker;

            // panic したワーカーは終端状態にならないので join とも競争させる
            let terminal = async {
                let _ = state_rx.wait_for(|s| s.is_terminal()).await;
            };
            let joined = tokio::select! {
                joined = &mut join => joined,
                _ = terminal => (&mut join).await,
            };

            let outcome = match joined {
                Ok(result) => result,
                Err(e) => Err(NetError::WorkerPanicked {
                    transition: transition.clone(),
                    message: e.to_string(),
                }),
            };
            match outcome {
                Ok(count) => {
                    fired.insert(transition, count);
                }
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }

        if let Some(e) = first_error {
            return Err(e);
        }
        Ok(TerminationReport {
            run_id: self.run_id,
            fired,
            marking: self.net.marking().await,
        })
    }

    /// Cancel and wait.
    pub async fn shutdown_and_join(self) -> Result<TerminationReport, NetError> {
        self.cancel();
        self.await_termination().await
    }
}

async fn worker_loop(
    core: Arc<NetCore>,
    index: usize,
    run_id: RunId,
    shutdown_tx: Arc<watch::Sender<bool>>,
    shutdown_rx: &mut watch::Receiver<bool>,
) -> Result<u64, NetError> {
    let transition = &core.transitions[index];
    tracing::debug!(transition = %transition.name(), "worker started");

    let result = run(&core, index, run_id, shutdown_rx).await;
    match &result {
        Ok(fired) => {
            transition.set_state(WorkerState::Cancelled);
            tracing::debug!(transition = %transition.name(), fired, "worker cancelled");
        }
        Err(e) => {
            transition.set_state(WorkerState::Failed);
            tracing::error!(transition = %transition.name(), error = %e, "worker aborted, cancelling net");
            // 共有カウンタを壊し続けないよう Net 全体を止める
            shutdown_tx.send_replace(true);
        }
    }
    result
}

async fn run(
    core: &NetCore,
    index: usize,
    run_id: RunId,
    shutdown_rx: &mut watch::Receiver<bool>,
) -> Result<u64, NetError> {
    let transition = &core.transitions[index];
    let mut fired = 0u64;

    loop {
        // shutdown が来ていたら抜ける（ロックは何も持っていない）
        if *shutdown_rx.borrow() {
            return Ok(fired);
        }

        transition.set_state(WorkerState::Checking);
        let firing = transition
            .try_fire(&core.places)
            .await
            .map_err(|source| NetError::Invariant {
                transition: transition.name().to_string(),
                source,
            })?;

        let Some(firing) = firing else {
            transition.set_state(WorkerState::Idle);
            // 入力 place が増えるまで待つ（permit が残るので解放後の通知も取りこぼさない）
            tokio::select! {
                _ = shutdown_rx.changed() => {}
                _ = transition.inbox().notified() => {}
            }
            continue;
        };

        fired += 1;
        transition.record_firing();
        let event = FiringEvent {
            id: core.ids.generate_firing_id(),
            run_id,
            transition: transition.name().to_string(),
            inputs_debited: firing.debited,
            outputs_credited: firing.credited,
            fired_at: core.clock.now(),
        };
        // 発火自体はコミット済み。受信側が詰まっていても cancel は待たせない
        tokio::select! {
            biased;
            _ = core.sink.emit(event) => {}
            _ = shutdown_rx.changed() => {
                tracing::debug!(transition = %transition.name(), "firing event dropped on cancel");
            }
        }

        if *shutdown_rx.borrow() {
            return Ok(fired);
        }

        // simulated work: ロックは保持しない
        let pause = core.config.next_pause();
        if pause.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::select! {
                _ = shutdown_rx.changed() => {}
                _ = tokio::time::sleep(pause) => {}
            }
        }
        transition.set_state(WorkerState::Idle);
    }
}
