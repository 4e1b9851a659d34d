//! Resolved arcs.

use serde::Serialize;

use crate::domain::{ArcRole, NodeKind};
use crate::error::ConfigError;

/// One end of an arc once its name has been resolved to a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint<'a> {
    pub name: &'a str,
    pub kind: NodeKind,
}

impl<'a> Endpoint<'a> {
    pub fn place(name: &'a str) -> Self {
        Self {
            name,
            kind: NodeKind::Place,
        }
    }

    pub fn transition(name: &'a str) -> Self {
        Self {
            name,
            kind: NodeKind::Transition,
        }
    }
}

/// Immutable, validated arc between one place and one transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetArc {
    name: String,
    weight: u64,
    place: String,
    transition: String,
    role: ArcRole,
}

impl NetArc {
    /// The role follows from which endpoint is the place.
    pub fn new(
        name: impl Into<String>,
        weight: i64,
        source: Endpoint<'_>,
        destination: Endpoint<'_>,
    ) -> Result<Self, ConfigError> {
        let name = name.into();
        let (place, transition, role) = match (source.kind, destination.kind) {
            (NodeKind::Place, NodeKind::Transition) => {
                (source.name, destination.name, ArcRole::Input)
            }
            (NodeKind::Transition, NodeKind::Place) => {
                (destination.name, source.name, ArcRole::Output)
            }
            (kind, _) => return Err(ConfigError::SameKindEndpoints { arc: name, kind }),
        };
        let weight = u64::try_from(weight)
            .ok()
            .filter(|w| *w > 0)
            .ok_or_else(|| ConfigError::NonPositiveWeight {
                arc: name.clone(),
                weight,
            })?;
        Ok(Self {
            name,
            weight,
            place: place.to_string(),
            transition: transition.to_string(),
            role,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn weight(&self) -> u64 {
        self.weight
    }

    pub fn place(&self) -> &str {
        &self.place
    }

    pub fn transition(&self) -> &str {
        &self.transition
    }

    pub fn role(&self) -> ArcRole {
        self.role
    }
}
