//! petri-core
//!
//! Concurrent execution engine for place/transition nets.
//!
//! # モジュール構成
//! - **domain**: 構造モデル（NetModel）、ID、発火イベント、ワーカー状態
//! - **net**: Place / NetArc / Transition と NetBuilder（名前解決とロック順序）
//! - **worker**: WorkerGroup（起動・cancel・終了待ち）と発火ループ
//! - **ports**: Clock, IdGenerator, FiringSink
//! - **impls**: ChannelSink, LogSink, NoopSink
//! - **config**: EngineConfig
//! - **observability**: NetStatus, TerminationReport
//! - **error**: ConfigError, InvariantViolation, NetError
//!
//! ```no_run
//! use petri_core::domain::NetModel;
//! use petri_core::net::NetBuilder;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let model = NetModel::new("handoff")
//!     .place("p0", 2)
//!     .place("p1", 0)
//!     .transition("t0")
//!     .weighted_arc("p0", "t0", 2)
//!     .arc("t0", "p1");
//!
//! let (net, mut events) = NetBuilder::new(model).build_with_events()?;
//! let group = net.start()?;
//! if let Some(event) = events.recv().await {
//!     println!("{} fired", event.transition);
//! }
//! let report = group.shutdown_and_join().await?;
//! assert_eq!(report.marking["p1"], 1);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod domain;
pub mod error;
pub mod impls;
pub mod net;
pub mod observability;
pub mod ports;
pub mod worker;

pub use config::EngineConfig;
pub use error::{ConfigError, InvariantViolation, NetError};
pub use net::{Net, NetBuilder, build};
pub use observability::{NetStatus, TerminationReport, TransitionStatus};
pub use worker::WorkerGroup;
