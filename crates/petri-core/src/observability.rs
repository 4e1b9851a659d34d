use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{RunId, WorkerState};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionStatus {
    pub name: String,
    pub state: WorkerState,
    pub fired: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetStatus {
    pub net: String,
    pub transitions: Vec<TransitionStatus>,
    pub marking: BTreeMap<String, u64>,
}

/// What a run left behind once every worker has stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminationReport {
    pub run_id: RunId,
    /// Firings per transition during this run.
    pub fired: BTreeMap<String, u64>,
    pub marking: BTreeMap<String, u64>,
}

impl TerminationReport {
    pub fn total_firings(&self) -> u64 {
        self.fired.values().sum()
    }
}
