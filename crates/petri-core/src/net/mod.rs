//! Net - 実行エンジン本体
//!
//! - **place**: リソースカウンタとロック（LockSet）
//! - **arc**: 検証済みの arc（値オブジェクト）
//! - **transition**: 発火プロトコル
//! - **builder**: NetModel → Net の解決
//!
//! `Net` は `Arc` で共有される不変の構造 + place ごとの Mutex だけを持つ。
//! ワーカーの起動と停止は `worker::WorkerGroup` が担う。

pub mod arc;
pub mod builder;
pub mod place;
pub mod transition;

pub use self::arc::{Endpoint, NetArc};
pub use self::builder::NetBuilder;
pub use self::place::Place;
pub use self::transition::Transition;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::EngineConfig;
use crate::domain::NetModel;
use crate::error::{ConfigError, NetError};
use crate::observability::{NetStatus, TransitionStatus};
use crate::ports::{Clock, FiringSink, IdGenerator};
use crate::worker::WorkerGroup;
use self::place::LockSet;

/// Build a net with default settings (see `NetBuilder::new`).
pub fn build(model: &NetModel) -> Result<Net, ConfigError> {
    NetBuilder::new(model.clone()).build()
}

pub(crate) struct NetCore {
    pub(crate) name: String,
    /// Sorted by name: index order is the global lock order.
    pub(crate) places: Vec<Place>,
    pub(crate) place_index: HashMap<String, usize>,
    pub(crate) transitions: Vec<Transition>,
    pub(crate) config: EngineConfig,
    pub(crate) sink: Arc<dyn FiringSink>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) ids: Arc<dyn IdGenerator>,
    pub(crate) started: AtomicBool,
}

/// A built net. Cheap to clone; clones share the same places.
#[derive(Clone)]
pub struct Net {
    pub(crate) core: Arc<NetCore>,
}

impl Net {
    pub fn name(&self) -> &str {
        &self.core.name
    }

    /// Place names in global lock order.
    pub fn place_names(&self) -> Vec<&str> {
        self.core.places.iter().map(|p| p.name()).collect()
    }

    /// Transition names in model order.
    pub fn transition_names(&self) -> Vec<&str> {
        self.core.transitions.iter().map(|t| t.name()).collect()
    }

    pub fn place(&self, name: &str) -> Option<&Place> {
        self.core
            .place_index
            .get(name)
            .map(|&i| &self.core.places[i])
    }

    pub fn transition(&self, name: &str) -> Option<&Transition> {
        self.core.transitions.iter().find(|t| t.name() == name)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.core.config
    }

    /// Launch one worker per transition.
    ///
    /// A net runs at most once; a second call fails with `AlreadyStarted`.
    pub fn start(&self) -> Result<WorkerGroup, NetError> {
        if self.core.started.swap(true, Ordering::AcqRel) {
            return Err(NetError::AlreadyStarted(self.core.name.clone()));
        }
        let run_id = self.core.ids.generate_run_id();
        tracing::info!(
            net = %self.core.name,
            run = %run_id,
            workers = self.core.transitions.len(),
            "starting net"
        );
        Ok(WorkerGroup::spawn(self.clone(), run_id))
    }

    /// Credit `amount` units to `place` from outside the net and wake its
    /// consumers.
    pub async fn produce(&self, place: &str, amount: u64) -> Result<(), NetError> {
        let target = self
            .place(place)
            .ok_or_else(|| NetError::UnknownPlace(place.to_string()))?;
        target.produce(amount).await?;
        Ok(())
    }

    pub async fn count(&self, place: &str) -> Result<u64, NetError> {
        let target = self
            .place(place)
            .ok_or_else(|| NetError::UnknownPlace(place.to_string()))?;
        Ok(target.snapshot_count().await)
    }

    /// Consistent snapshot of every count, taken with all place locks held.
    pub async fn marking(&self) -> BTreeMap<String, u64> {
        let locks = LockSet::all(&self.core.places).await;
        locks
            .iter()
            .map(|g| (g.name().to_string(), g.count()))
            .collect()
    }

    /// Total units across all places, from one consistent snapshot.
    pub async fn total_units(&self) -> u64 {
        self.marking().await.values().sum()
    }

    pub async fn status(&self) -> NetStatus {
        let transitions = self
            .core
            .transitions
            .iter()
            .map(|t| TransitionStatus {
                name: t.name().to_string(),
                state: t.state(),
                fired: t.fired(),
            })
            .collect();
        NetStatus {
            net: self.core.name.clone(),
            transitions,
            marking: self.marking().await,
        }
    }
}

impl std::fmt::Debug for Net {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Net")
            .field("name", &self.core.name)
            .field("places", &self.core.places)
            .field("transitions", &self.core.transitions)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::WorkerState;
    use crate::impls::NoopSink;

    fn handoff(p0: i64) -> Net {
        NetBuilder::new(
            NetModel::new("handoff")
                .place("p0", p0)
                .place("p1", 0)
                .transition("t0")
                .weighted_arc("p0", "t0", 2)
                .arc("t0", "p1"),
        )
        .with_sink(Arc::new(NoopSink))
        .build()
        .unwrap()
    }

    #[tokio::test]
    async fn marking_reports_initial_counts() {
        let net = handoff(2);
        let marking = net.marking().await;
        assert_eq!(marking["p0"], 2);
        assert_eq!(marking["p1"], 0);
        assert_eq!(net.total_units().await, 2);
    }

    #[tokio::test]
    async fn produce_credits_named_place() {
        let net = handoff(1);
        net.produce("p0", 4).await.unwrap();
        assert_eq!(net.count("p0").await.unwrap(), 5);
    }

    #[tokio::test]
    async fn unknown_place_is_reported() {
        let net = handoff(1);
        let err = net.produce("nope", 1).await.unwrap_err();
        assert!(matches!(err, NetError::UnknownPlace(name) if name == "nope"));
        assert!(net.count("nope").await.is_err());
    }

    #[tokio::test]
    async fn status_before_start_is_idle() {
        let net = handoff(2);
        let status = net.status().await;
        assert_eq!(status.net, "handoff");
        assert_eq!(status.transitions.len(), 1);
        assert_eq!(status.transitions[0].state, WorkerState::Idle);
        assert_eq!(status.transitions[0].fired, 0);
    }

    #[tokio::test]
    async fn place_lookup_exposes_counter_contract() {
        let net = handoff(2);
        let p0 = net.place("p0").unwrap();
        assert!(!p0.try_consume(3).await);
        assert!(p0.try_consume(2).await);
        assert_eq!(p0.snapshot_count().await, 0);
    }

    #[test]
    fn default_build_uses_model_as_is() {
        let model = NetModel::new("n").place("p0", 1);
        let net = build(&model).unwrap();
        assert_eq!(net.place_names(), vec!["p0"]);
    }
}
