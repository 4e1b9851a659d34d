//! Firing events: the only externally observable effect of a firing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{FiringId, RunId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceAmount {
    pub place: String,
    pub amount: u64,
}

/// Emitted once per successful firing, after every lock has been released.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiringEvent {
    pub id: FiringId,
    pub run_id: RunId,
    pub transition: String,
    pub inputs_debited: Vec<PlaceAmount>,
    pub outputs_credited: Vec<PlaceAmount>,
    pub fired_at: DateTime<Utc>,
}

impl FiringEvent {
    pub fn debited(&self, place: &str) -> u64 {
        sum_for(&self.inputs_debited, place)
    }

    pub fn credited(&self, place: &str) -> u64 {
        sum_for(&self.outputs_credited, place)
    }
}

fn sum_for(amounts: &[PlaceAmount], place: &str) -> u64 {
    amounts
        .iter()
        .filter(|a| a.place == place)
        .map(|a| a.amount)
        .sum()
}
