//! Place - リソースカウンタとロック
//!
//! # 学習ポイント
//! - place ごとに tokio の `Mutex<u64>`（FIFO なので待ち手が飢えない）
//! - 複数 place のロックは必ずグローバル順序（名前の辞書順 = index 順）で取る
//! - 増加を `Notify` で消費側トランジションに知らせる（permit が残るので取りこぼさない）

use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard, Notify};

use crate::error::InvariantViolation;

pub struct Place {
    name: String,
    /// Rank in the net's global lock order.
    index: usize,
    count: Mutex<u64>,
    /// Inboxes of the transitions that consume from this place.
    consumers: Vec<Arc<Notify>>,
}

impl Place {
    pub(crate) fn new(
        name: String,
        index: usize,
        initial_count: u64,
        consumers: Vec<Arc<Notify>>,
    ) -> Self {
        Self {
            name,
            index,
            count: Mutex::new(initial_count),
            consumers,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lock_rank(&self) -> usize {
        self.index
    }

    /// Debit `amount` if available. All-or-nothing.
    pub async fn try_consume(&self, amount: u64) -> bool {
        self.lock().await.try_consume(amount)
    }

    /// Credit `amount` and wake the consumers of this place.
    pub async fn produce(&self, amount: u64) -> Result<(), InvariantViolation> {
        self.lock().await.credit(amount)?;
        self.notify_consumers();
        Ok(())
    }

    /// Current count. Only licenses an attempt: it may be stale as soon as
    /// it is returned.
    pub async fn snapshot_count(&self) -> u64 {
        self.lock().await.count()
    }

    pub(crate) async fn lock(&self) -> PlaceGuard<'_> {
        PlaceGuard {
            place: self,
            count: self.count.lock().await,
        }
    }

    pub(crate) fn notify_consumers(&self) {
        for inbox in &self.consumers {
            inbox.notify_one();
        }
    }
}

impl std::fmt::Debug for Place {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Place")
            .field("name", &self.name)
            .field("index", &self.index)
            .field("consumers", &self.consumers.len())
            .finish_non_exhaustive()
    }
}

/// Exclusive access to one place's count.
pub(crate) struct PlaceGuard<'a> {
    place: &'a Place,
    count: MutexGuard<'a, u64>,
}

impl PlaceGuard<'_> {
    pub(crate) fn name(&self) -> &str {
        &self.place.name
    }

    pub(crate) fn count(&self) -> u64 {
        *self.count
    }

    pub(crate) fn try_consume(&mut self, amount: u64) -> bool {
        match self.count.checked_sub(amount) {
            Some(rest) => {
                *self.count = rest;
                true
            }
            None => false,
        }
    }

    /// `count - amount`, or the violation naming this place. Does not write.
    pub(crate) fn checked_debit(
        &self,
        count: u64,
        amount: u64,
    ) -> Result<u64, InvariantViolation> {
        count
            .checked_sub(amount)
            .ok_or_else(|| InvariantViolation::NegativeCount {
                place: self.place.name.clone(),
                count,
                amount,
            })
    }

    /// `count + amount`, or the violation naming this place. Does not write.
    pub(crate) fn checked_credit(
        &self,
        count: u64,
        amount: u64,
    ) -> Result<u64, InvariantViolation> {
        count
            .checked_add(amount)
            .ok_or_else(|| InvariantViolation::CountOverflow {
                place: self.place.name.clone(),
                count,
                amount,
            })
    }

    pub(crate) fn set_count(&mut self, count: u64) {
        *self.count = count;
    }

    pub(crate) fn credit(&mut self, amount: u64) -> Result<(), InvariantViolation> {
        let count = self.checked_credit(*self.count, amount)?;
        self.set_count(count);
        Ok(())
    }
}

/// Guards over a set of places, taken in ascending lock rank.
pub(crate) struct LockSet<'a> {
    guards: Vec<PlaceGuard<'a>>,
}

impl<'a> LockSet<'a> {
    /// Lock `places[i]` for each `i` in `plan`. `plan` must be strictly
    /// ascending; anything else could deadlock against another worker.
    pub(crate) async fn acquire(
        places: &'a [Place],
        plan: &[usize],
    ) -> Result<Self, InvariantViolation> {
        let mut guards = Vec::with_capacity(plan.len());
        let mut held: Option<usize> = None;
        for &next in plan {
            if let Some(held) = held
                && next <= held
            {
                return Err(InvariantViolation::LockOrder { held, next });
            }
            guards.push(places[next].lock().await);
            held = Some(next);
        }
        Ok(Self { guards })
    }

    /// Lock every place. `places` is stored in lock order.
    pub(crate) async fn all(places: &'a [Place]) -> Self {
        let mut guards = Vec::with_capacity(places.len());
        for place in places {
            guards.push(place.lock().await);
        }
        Self { guards }
    }

    pub(crate) fn slot(&self, slot: usize) -> &PlaceGuard<'a> {
        &self.guards[slot]
    }

    pub(crate) fn slot_mut(&mut self, slot: usize) -> &mut PlaceGuard<'a> {
        &mut self.guards[slot]
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &PlaceGuard<'a>> {
        self.guards.iter()
    }
}
