//! NetBuilder - モデルの名前参照を解決して Net を組み立てる
//!
//! # Fail-fast 設計
//! - 名前の重複・未知の名前・同種ノード間の arc・weight ≤ 0 は build 時に ConfigError
//! - グローバルなロック順序（place 名の辞書順）はここで一度だけ決める
//! - 発火のホットパスに名前検索は残さない（すべて index に解決済み）

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use tokio::sync::{Notify, mpsc};

use super::arc::{Endpoint, NetArc};
use super::place::Place;
use super::transition::{Binding, Transition};
use super::{Net, NetCore};
use crate::config::EngineConfig;
use crate::domain::{ArcRole, FiringEvent, NetModel, NodeKind};
use crate::error::ConfigError;
use crate::impls::{ChannelSink, LogSink};
use crate::ports::{Clock, FiringSink, IdGenerator, SystemClock, UlidGenerator};

pub struct NetBuilder {
    model: NetModel,
    config: EngineConfig,
    sink: Arc<dyn FiringSink>,
    clock: Arc<dyn Clock>,
    ids: Option<Arc<dyn IdGenerator>>,
}

impl NetBuilder {
    /// Defaults: `EngineConfig::default()`, `LogSink`, `SystemClock`, ULID ids.
    pub fn new(model: NetModel) -> Self {
        Self {
            model,
            config: EngineConfig::default(),
            sink: Arc::new(LogSink),
            clock: Arc::new(SystemClock),
            ids: None,
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn FiringSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    /// Build with a `ChannelSink` of `config.event_buffer` capacity and hand
    /// back its receiving end.
    pub fn build_with_events(
        self,
    ) -> Result<(Net, mpsc::Receiver<FiringEvent>), ConfigError> {
        let (sink, rx) = ChannelSink::new(self.config.event_buffer);
        let net = self.with_sink(Arc::new(sink)).build()?;
        Ok((net, rx))
    }

    pub fn build(self) -> Result<Net, ConfigError> {
        let resolved = resolve(&self.model)?;
        let ids: Arc<dyn IdGenerator> = match self.ids {
            Some(ids) => ids,
            None => Arc::new(UlidGenerator::new(Arc::clone(&self.clock))),
        };

        tracing::debug!(
            net = %self.model.name,
            places = resolved.places.len(),
            transitions = resolved.transitions.len(),
            "net built"
        );

        Ok(Net {
            core: Arc::new(NetCore {
                name: self.model.name,
                place_index: resolved.place_index,
                places: resolved.places,
                transitions: resolved.transitions,
                config: self.config,
                sink: self.sink,
                clock: self.clock,
                ids,
                started: AtomicBool::new(false),
            }),
        })
    }
}

struct Resolved {
    places: Vec<Place>,
    place_index: HashMap<String, usize>,
    transitions: Vec<Transition>,
}

fn resolve(model: &NetModel) -> Result<Resolved, ConfigError> {
    // name -> kind（place と transition で名前空間は共有）
    let mut kinds: HashMap<&str, NodeKind> = HashMap::new();
    for p in &model.places {
        declare(&mut kinds, &p.name, NodeKind::Place)?;
        if p.initial_count < 0 {
            return Err(ConfigError::NegativeInitialCount {
                place: p.name.clone(),
                count: p.initial_count,
            });
        }
    }
    for t in &model.transitions {
        declare(&mut kinds, &t.name, NodeKind::Transition)?;
    }

    // グローバルなロック順序 = place 名の辞書順
    let mut ordered: Vec<(&str, u64)> = model
        .places
        .iter()
        .map(|p| (p.name.as_str(), p.initial_count as u64))
        .collect();
    ordered.sort_by(|a, b| a.0.cmp(b.0));
    let place_index: HashMap<String, usize> = ordered
        .iter()
        .enumerate()
        .map(|(i, (name, _))| (name.to_string(), i))
        .collect();
    let transition_index: HashMap<&str, usize> = model
        .transitions
        .iter()
        .enumerate()
        .map(|(i, t)| (t.name.as_str(), i))
        .collect();

    let mut arcs_by_transition: Vec<Vec<NetArc>> = vec![Vec::new(); model.transitions.len()];
    for spec in &model.arcs {
        let name = spec.display_name();
        let source = endpoint(&kinds, &name, &spec.source)?;
        let destination = endpoint(&kinds, &name, &spec.destination)?;
        let arc = NetArc::new(name, spec.weight, source, destination)?;
        arcs_by_transition[transition_index[arc.transition()]].push(arc);
    }

    let inboxes: Vec<Arc<Notify>> = (0..model.transitions.len())
        .map(|_| Arc::new(Notify::new()))
        .collect();
    let mut consumers: Vec<Vec<Arc<Notify>>> = vec![Vec::new(); ordered.len()];

    let mut transitions = Vec::with_capacity(model.transitions.len());
    for ((spec, arcs), inbox) in model
        .transitions
        .iter()
        .zip(arcs_by_transition)
        .zip(&inboxes)
    {
        let inputs = merge(&spec.name, &arcs, ArcRole::Input, &place_index)?;
        let outputs = merge(&spec.name, &arcs, ArcRole::Output, &place_index)?;

        let mut lock_plan: Vec<usize> = inputs.keys().chain(outputs.keys()).copied().collect();
        lock_plan.sort_unstable();
        lock_plan.dedup();

        // lock_plan は inputs/outputs のキーの和集合（昇順）なので、
        // plan を走査すれば全 binding の slot が探索なしで決まる
        let mut input_bindings = Vec::with_capacity(inputs.len());
        let mut output_bindings = Vec::with_capacity(outputs.len());
        for (slot, &place) in lock_plan.iter().enumerate() {
            if let Some(&weight) = inputs.get(&place) {
                input_bindings.push(Binding {
                    place,
                    slot,
                    weight,
                });
            }
            if let Some(&weight) = outputs.get(&place) {
                output_bindings.push(Binding {
                    place,
                    slot,
                    weight,
                });
            }
        }
        let inputs = input_bindings;
        let outputs = output_bindings;

        for b in &inputs {
            consumers[b.place].push(Arc::clone(inbox));
        }

        transitions.push(Transition::new(
            spec.name.clone(),
            arcs,
            inputs,
            outputs,
            lock_plan,
            Arc::clone(inbox),
        ));
    }

    let places = ordered
        .into_iter()
        .zip(consumers)
        .enumerate()
        .map(|(i, ((name, count), consumers))| Place::new(name.to_string(), i, count, consumers))
        .collect();

    Ok(Resolved {
        places,
        place_index,
        transitions,
    })
}

fn declare<'a>(
    kinds: &mut HashMap<&'a str, NodeKind>,
    name: &'a str,
    kind: NodeKind,
) -> Result<(), ConfigError> {
    if name.is_empty() {
        return Err(ConfigError::EmptyName(kind));
    }
    if kinds.insert(name, kind).is_some() {
        return Err(ConfigError::DuplicateName(name.to_string()));
    }
    Ok(())
}

fn endpoint<'a>(
    kinds: &HashMap<&str, NodeKind>,
    arc: &str,
    name: &'a str,
) -> Result<Endpoint<'a>, ConfigError> {
    match kinds.get(name) {
        Some(&kind) => Ok(Endpoint { name, kind }),
        None => Err(ConfigError::UnknownName {
            arc: arc.to_string(),
            name: name.to_string(),
        }),
    }
}

/// Sum the weights of every arc of `role` per place. Parallel arcs behave
/// like a single arc carrying their total weight.
fn merge(
    transition: &str,
    arcs: &[NetArc],
    role: ArcRole,
    place_index: &HashMap<String, usize>,
) -> Result<BTreeMap<usize, u64>, ConfigError> {
    let mut weights: BTreeMap<usize, u64> = BTreeMap::new();
    for arc in arcs.iter().filter(|a| a.role() == role) {
        let total = weights.entry(place_index[arc.place()]).or_insert(0);
        if *total > 0 {
            tracing::debug!(
                transition,
                place = arc.place(),
                ?role,
                "merging parallel arcs"
            );
        }
        *total = total
            .checked_add(arc.weight())
            .ok_or_else(|| ConfigError::WeightOverflow {
                transition: transition.to_string(),
                place: arc.place().to_string(),
            })?;
    }
    Ok(weights)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn handoff() -> NetModel {
        NetModel::new("handoff")
            .place("p0", 2)
            .place("p1", 0)
            .transition("t0")
            .weighted_arc("p0", "t0", 2)
            .arc("t0", "p1")
    }

    #[test]
    fn places_are_ranked_by_name() {
        let model = NetModel::new("n")
            .place("zeta", 0)
            .place("alpha", 0)
            .place("mid", 0);
        let resolved = resolve(&model).unwrap();

        let names: Vec<&str> = resolved.places.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
        assert_eq!(resolved.place_index["zeta"], 2);
        for (i, p) in resolved.places.iter().enumerate() {
            assert_eq!(p.lock_rank(), i);
        }
    }

    #[test]
    fn lock_plan_covers_inputs_and_outputs_in_rank_order() {
        let model = NetModel::new("n")
            .place("c", 1)
            .place("a", 1)
            .place("b", 0)
            .transition("t")
            .arc("c", "t")
            .arc("a", "t")
            .arc("t", "b");
        let resolved = resolve(&model).unwrap();

        assert_eq!(resolved.transitions[0].lock_plan(), &[0, 1, 2]);
    }

    #[tokio::test]
    async fn bindings_point_at_their_own_lock_slot() {
        // input ranks after output, self-loop in between
        let model = NetModel::new("n")
            .place("z_in", 5)
            .place("m_loop", 1)
            .place("a_out", 0)
            .transition("t")
            .weighted_arc("z_in", "t", 2)
            .arc("m_loop", "t")
            .weighted_arc("t", "m_loop", 3)
            .arc("t", "a_out");
        let resolved = resolve(&model).unwrap();
        let t = &resolved.transitions[0];

        t.try_fire(&resolved.places).await.unwrap().expect("enabled");

        let counts: Vec<u64> = snapshot_counts(&resolved.places).await;
        assert_eq!(counts, vec![1, 3, 3]); // a_out, m_loop, z_in
    }

    async fn snapshot_counts(places: &[Place]) -> Vec<u64> {
        let mut counts = Vec::with_capacity(places.len());
        for p in places {
            counts.push(p.snapshot_count().await);
        }
        counts
    }

    #[test]
    fn parallel_arcs_are_merged() {
        let model = NetModel::new("n")
            .place("p0", 3)
            .transition("t0")
            .arc("p0", "t0")
            .weighted_arc("p0", "t0", 2);
        let resolved = resolve(&model).unwrap();

        let t = &resolved.transitions[0];
        assert_eq!(t.arcs().len(), 2);
        assert_eq!(t.lock_plan(), &[0]);
    }

    #[test]
    fn consumers_are_wired_to_input_places_only() {
        let resolved = resolve(&handoff()).unwrap();
        assert!(format!("{:?}", resolved.places[0]).contains("consumers: 1"));
        assert!(format!("{:?}", resolved.places[1]).contains("consumers: 0"));
    }

    #[rstest]
    #[case::unknown_source(
        NetModel::new("n").place("p0", 1).transition("t0").arc("px", "t0"),
        ConfigError::UnknownName { arc: "px->t0".to_string(), name: "px".to_string() }
    )]
    #[case::unknown_destination(
        NetModel::new("n").place("p0", 1).transition("t0").arc("p0", "tx"),
        ConfigError::UnknownName { arc: "p0->tx".to_string(), name: "tx".to_string() }
    )]
    #[case::place_to_place(
        NetModel::new("n").place("p0", 1).place("p1", 0).arc("p0", "p1"),
        ConfigError::SameKindEndpoints { arc: "p0->p1".to_string(), kind: NodeKind::Place }
    )]
    #[case::transition_to_transition(
        NetModel::new("n").transition("t0").transition("t1").arc("t0", "t1"),
        ConfigError::SameKindEndpoints { arc: "t0->t1".to_string(), kind: NodeKind::Transition }
    )]
    #[case::shared_name(
        NetModel::new("n").place("x", 1).transition("x"),
        ConfigError::DuplicateName("x".to_string())
    )]
    #[case::duplicate_place(
        NetModel::new("n").place("p0", 1).place("p0", 2),
        ConfigError::DuplicateName("p0".to_string())
    )]
    #[case::zero_weight(
        NetModel::new("n").place("p0", 1).transition("t0").weighted_arc("p0", "t0", 0),
        ConfigError::NonPositiveWeight { arc: "p0->t0".to_string(), weight: 0 }
    )]
    #[case::negative_count(
        NetModel::new("n").place("p0", -1),
        ConfigError::NegativeInitialCount { place: "p0".to_string(), count: -1 }
    )]
    #[case::merged_weight_overflow(
        NetModel::new("n")
            .place("p0", 1)
            .transition("t0")
            .weighted_arc("p0", "t0", i64::MAX)
            .weighted_arc("p0", "t0", i64::MAX)
            .weighted_arc("p0", "t0", i64::MAX),
        ConfigError::WeightOverflow { transition: "t0".to_string(), place: "p0".to_string() }
    )]
    #[case::empty_name(
        NetModel::new("n").transition(""),
        ConfigError::EmptyName(NodeKind::Transition)
    )]
    fn invalid_models_are_rejected(#[case] model: NetModel, #[case] expected: ConfigError) {
        let err = NetBuilder::new(model).build().unwrap_err();
        assert_eq!(err, expected);
    }

    #[test]
    fn valid_model_builds() {
        let net = NetBuilder::new(handoff()).build().unwrap();
        assert_eq!(net.name(), "handoff");
        assert_eq!(net.place_names(), vec!["p0", "p1"]);
        assert_eq!(net.transition_names(), vec!["t0"]);
    }
}
