//! Structural model of a net: plain data, referencing entities by name.
//!
//! This is the input of `NetBuilder`. It says nothing about how it was
//! produced; it can be deserialized from JSON or assembled fluently:
//!
//! ```
//! use petri_core::domain::NetModel;
//!
//! let model = NetModel::new("handoff")
//!     .place("p0", 2)
//!     .place("p1", 0)
//!     .transition("t0")
//!     .weighted_arc("p0", "t0", 2)
//!     .arc("t0", "p1");
//! assert_eq!(model.arcs.len(), 2);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetModel {
    #[serde(default = "default_net_name")]
    pub name: String,

    #[serde(default)]
    pub places: Vec<PlaceSpec>,

    #[serde(default)]
    pub transitions: Vec<TransitionSpec>,

    #[serde(default)]
    pub arcs: Vec<ArcSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceSpec {
    pub name: String,

    /// Kept signed so a negative count surfaces as a `ConfigError` rather
    /// than a deserialization failure.
    #[serde(default = "default_initial_count")]
    pub initial_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionSpec {
    pub name: String,
}

/// A directed edge between a place and a transition.
///
/// The role (input or output) is not stated here; it follows from which
/// endpoint turns out to be the place. JSON accepts either
/// `{source, destination}` or `{place, transition, direction: "in"|"out"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ArcRecord")]
pub struct ArcSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub source: String,

    pub destination: String,

    #[serde(default = "default_weight")]
    pub weight: i64,
}

/// Wire forms of an arc.
#[derive(Deserialize)]
#[serde(untagged)]
enum ArcRecord {
    Directed {
        #[serde(default)]
        name: Option<String>,
        source: String,
        destination: String,
        #[serde(default = "default_weight")]
        weight: i64,
    },
    Bound {
        #[serde(default)]
        name: Option<String>,
        place: String,
        transition: String,
        direction: ArcRole,
        #[serde(default = "default_weight")]
        weight: i64,
    },
}

impl From<ArcRecord> for ArcSpec {
    fn from(record: ArcRecord) -> Self {
        match record {
            ArcRecord::Directed {
                name,
                source,
                destination,
                weight,
            } => ArcSpec {
                name,
                source,
                destination,
                weight,
            },
            ArcRecord::Bound {
                name,
                place,
                transition,
                direction,
                weight,
            } => {
                let (source, destination) = match direction {
                    ArcRole::Input => (place, transition),
                    ArcRole::Output => (transition, place),
                };
                ArcSpec {
                    name,
                    source,
                    destination,
                    weight,
                }
            }
        }
    }
}

fn default_net_name() -> String {
    "net".to_string()
}

fn default_initial_count() -> i64 {
    1
}

fn default_weight() -> i64 {
    1
}

impl NetModel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            places: Vec::new(),
            transitions: Vec::new(),
            arcs: Vec::new(),
        }
    }

    pub fn place(mut self, name: impl Into<String>, initial_count: i64) -> Self {
        self.places.push(PlaceSpec {
            name: name.into(),
            initial_count,
        });
        self
    }

    pub fn transition(mut self, name: impl Into<String>) -> Self {
        self.transitions.push(TransitionSpec { name: name.into() });
        self
    }

    /// Arc of weight 1.
    pub fn arc(self, source: impl Into<String>, destination: impl Into<String>) -> Self {
        self.weighted_arc(source, destination, 1)
    }

    pub fn weighted_arc(
        mut self,
        source: impl Into<String>,
        destination: impl Into<String>,
        weight: i64,
    ) -> Self {
        self.arcs.push(ArcSpec {
            name: None,
            source: source.into(),
            destination: destination.into(),
            weight,
        });
        self
    }

    /// Parse a model from its JSON form.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl ArcSpec {
    /// `name` if given, otherwise `<source>-><destination>`.
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("{}->{}", self.source, self.destination),
        }
    }
}

/// The closed set of node kinds an arc endpoint can resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Place,
    Transition,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Place => f.write_str("place"),
            NodeKind::Transition => f.write_str("transition"),
        }
    }
}

/// Direction of an arc relative to its transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArcRole {
    /// place -> transition
    #[serde(alias = "in")]
    Input,
    /// transition -> place
    #[serde(alias = "out")]
    Output,
}
