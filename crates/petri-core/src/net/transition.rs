//! Transition - 発火プロトコル
//!
//! 1 回の試行:
//! 1. 触る place（入力 + 出力）のロックをグローバル順序で全部取る
//! 2. 全入力が weight 以上か確認。足りなければロックを解放して `None`
//! 3. 入力を debit、出力を credit（各出力はちょうど宣言された weight を受け取る）
//! 4. ロック解放後に出力 place の消費者を起こす
//!
//! 待機（suspend）と cancel の扱いは `worker.rs` 側。

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{Notify, watch};

use super::arc::NetArc;
use super::place::{LockSet, Place};
use crate::domain::{PlaceAmount, WorkerState};
use crate::error::InvariantViolation;

/// An arc (or several parallel arcs, merged) bound to a live place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Binding {
    /// Index into the net's place list.
    pub(crate) place: usize,
    /// Position of that place in this transition's lock plan.
    pub(crate) slot: usize,
    pub(crate) weight: u64,
}

/// Amounts moved by one committed firing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Firing {
    pub(crate) debited: Vec<PlaceAmount>,
    pub(crate) credited: Vec<PlaceAmount>,
}

pub struct Transition {
    name: String,
    arcs: Vec<NetArc>,
    inputs: Vec<Binding>,
    outputs: Vec<Binding>,
    /// Strictly ascending place indices: every place this transition touches.
    lock_plan: Vec<usize>,
    inbox: Arc<Notify>,
    state: watch::Sender<WorkerState>,
    fired: AtomicU64,
}

impl Transition {
    pub(crate) fn new(
        name: String,
        arcs: Vec<NetArc>,
        inputs: Vec<Binding>,
        outputs: Vec<Binding>,
        lock_plan: Vec<usize>,
        inbox: Arc<Notify>,
    ) -> Self {
        let (state, _) = watch::channel(WorkerState::Idle);
        Self {
            name,
            arcs,
            inputs,
            outputs,
            lock_plan,
            inbox,
            state,
            fired: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Arcs as declared in the model, in model order.
    pub fn arcs(&self) -> &[NetArc] {
        &self.arcs
    }

    pub fn state(&self) -> WorkerState {
        *self.state.borrow()
    }

    pub fn fired(&self) -> u64 {
        self.fired.load(Ordering::Relaxed)
    }

    pub(crate) fn lock_plan(&self) -> &[usize] {
        &self.lock_plan
    }

    pub(crate) fn inbox(&self) -> &Notify {
        &self.inbox
    }

    pub(crate) fn subscribe_state(&self) -> watch::Receiver<WorkerState> {
        self.state.subscribe()
    }

    pub(crate) fn set_state(&self, state: WorkerState) {
        self.state.send_replace(state);
    }

    pub(crate) fn record_firing(&self) {
        self.fired.fetch_add(1, Ordering::Relaxed);
    }

    /// One firing attempt. `Ok(None)` means "not enabled"; that is normal
    /// flow, not an error.
    pub(crate) async fn try_fire(
        &self,
        places: &[Place],
    ) -> Result<Option<Firing>, InvariantViolation> {
        let mut locks = LockSet::acquire(places, &self.lock_plan).await?;

        let enabled = self
            .inputs
            .iter()
            .all(|b| locks.slot(b.slot).count() >= b.weight);
        if !enabled {
            return Ok(None);
        }

        self.set_state(WorkerState::Firing);

        // 全 debit/credit をロック下で検算してから書き込む。途中で違反しても marking は変わらない
        let mut staged: Vec<u64> = locks.iter().map(|g| g.count()).collect();
        let mut debited = Vec::with_capacity(self.inputs.len());
        for b in &self.inputs {
            let guard = locks.slot(b.slot);
            staged[b.slot] = guard.checked_debit(staged[b.slot], b.weight)?;
            debited.push(PlaceAmount {
                place: guard.name().to_string(),
                amount: b.weight,
            });
        }
        let mut credited = Vec::with_capacity(self.outputs.len());
        for b in &self.outputs {
            let guard = locks.slot(b.slot);
            staged[b.slot] = guard.checked_credit(staged[b.slot], b.weight)?;
            credited.push(PlaceAmount {
                place: guard.name().to_string(),
                amount: b.weight,
            });
        }
        for (slot, count) in staged.into_iter().enumerate() {
            locks.slot_mut(slot).set_count(count);
        }
        drop(locks);

        for b in &self.outputs {
            places[b.place].notify_consumers();
        }
        Ok(Some(Firing { debited, credited }))
    }
}

impl std::fmt::Debug for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transition")
            .field("name", &self.name)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("lock_plan", &self.lock_plan)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn places(counts: &[(&str, u64)], consumers: &[Arc<Notify>]) -> Vec<Place> {
        counts
            .iter()
            .enumerate()
            .map(|(i, (name, count))| {
                Place::new(name.to_string(), i, *count, consumers.to_vec())
            })
            .collect()
    }

    fn binding(place: usize, slot: usize, weight: u64) -> Binding {
        Binding {
            place,
            slot,
            weight,
        }
    }

    fn transition(inputs: Vec<Binding>, outputs: Vec<Binding>, lock_plan: Vec<usize>) -> Transition {
        Transition::new(
            "t0".to_string(),
            Vec::new(),
            inputs,
            outputs,
            lock_plan,
            Arc::new(Notify::new()),
        )
    }

    #[tokio::test]
    async fn enabled_transition_moves_declared_weights() {
        let places = places(&[("p0", 2), ("p1", 0)], &[]);
        let t = transition(vec![binding(0, 0, 2)], vec![binding(1, 1, 1)], vec![0, 1]);

        let firing = t.try_fire(&places).await.unwrap().expect("enabled");

        assert_eq!(places[0].snapshot_count().await, 0);
        assert_eq!(places[1].snapshot_count().await, 1);
        assert_eq!(
            firing.debited,
            vec![PlaceAmount {
                place: "p0".to_string(),
                amount: 2
            }]
        );
        assert_eq!(firing.credited[0].amount, 1);
        assert_eq!(t.state(), WorkerState::Firing);
    }

    #[tokio::test]
    async fn disabled_transition_changes_nothing() {
        let places = places(&[("p0", 1), ("p1", 0)], &[]);
        let t = transition(vec![binding(0, 0, 2)], vec![binding(1, 1, 1)], vec![0, 1]);

        assert!(t.try_fire(&places).await.unwrap().is_none());
        assert_eq!(places[0].snapshot_count().await, 1);
        assert_eq!(places[1].snapshot_count().await, 0);
    }

    #[tokio::test]
    async fn output_receives_exactly_its_weight() {
        let places = places(&[("p0", 10), ("p1", 0)], &[]);
        let t = transition(vec![binding(0, 0, 1)], vec![binding(1, 1, 3)], vec![0, 1]);

        t.try_fire(&places).await.unwrap().expect("enabled");

        assert_eq!(places[0].snapshot_count().await, 9);
        assert_eq!(places[1].snapshot_count().await, 3);
    }

    #[tokio::test]
    async fn no_inputs_is_always_enabled() {
        let places = places(&[("p0", 0)], &[]);
        let t = transition(vec![], vec![binding(0, 0, 1)], vec![0]);

        for _ in 0..3 {
            t.try_fire(&places).await.unwrap().expect("enabled");
        }
        assert_eq!(places[0].snapshot_count().await, 3);
    }

    #[tokio::test]
    async fn self_loop_shares_one_slot() {
        let places = places(&[("p0", 1)], &[]);
        let t = transition(vec![binding(0, 0, 1)], vec![binding(0, 0, 2)], vec![0]);

        t.try_fire(&places).await.unwrap().expect("enabled");
        assert_eq!(places[0].snapshot_count().await, 2);
    }

    #[tokio::test]
    async fn firing_wakes_output_consumers() {
        let consumer = Arc::new(Notify::new());
        let places = places(&[("p0", 1), ("p1", 0)], &[consumer.clone()]);
        let t = transition(vec![binding(0, 0, 1)], vec![binding(1, 1, 1)], vec![0, 1]);

        t.try_fire(&places).await.unwrap().expect("enabled");

        tokio::time::timeout(std::time::Duration::from_millis(100), consumer.notified())
            .await
            .expect("consumer woken");
    }

    #[tokio::test]
    async fn bad_lock_plan_surfaces_as_violation() {
        let places = places(&[("p0", 1), ("p1", 0)], &[]);
        let t = transition(vec![binding(0, 1, 1)], vec![binding(1, 0, 1)], vec![1, 0]);

        let err = t.try_fire(&places).await.unwrap_err();
        assert!(matches!(err, InvariantViolation::LockOrder { held: 1, next: 0 }));
        assert_eq!(places[0].snapshot_count().await, 1);
    }

    #[tokio::test]
    async fn overflowing_credit_leaves_marking_untouched() {
        let places = places(&[("full", u64::MAX), ("in", 1)], &[]);
        let t = transition(vec![binding(1, 1, 1)], vec![binding(0, 0, 1)], vec![0, 1]);

        let err = t.try_fire(&places).await.unwrap_err();

        assert_eq!(
            err,
            InvariantViolation::CountOverflow {
                place: "full".to_string(),
                count: u64::MAX,
                amount: 1,
            }
        );
        assert_eq!(places[0].snapshot_count().await, u64::MAX);
        assert_eq!(places[1].snapshot_count().await, 1);
    }

    #[tokio::test]
    async fn self_loop_credit_is_checked_after_its_debit() {
        // debit 1 then credit 1 on a place at the ceiling nets to zero
        let places = places(&[("p0", u64::MAX)], &[]);
        let t = transition(vec![binding(0, 0, 1)], vec![binding(0, 0, 1)], vec![0]);

        t.try_fire(&places).await.unwrap().expect("enabled");
        assert_eq!(places[0].snapshot_count().await, u64::MAX);
    }
}
