//! Domain model (model, ids, events, worker state).
//!
//! 実行エンジンに依存しない「形」だけを定義する。

pub mod events;
pub mod ids;
pub mod model;
pub mod state;

pub use events::{FiringEvent, PlaceAmount};
pub use ids::{FiringId, Id, IdMarker, RunId};
pub use model::{ArcRole, ArcSpec, NetModel, NodeKind, PlaceSpec, TransitionSpec};
pub use state::WorkerState;
