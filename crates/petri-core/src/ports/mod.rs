//! Ports - 抽象化レイヤー
//!
//! エンジンが外部に依存する箇所（時刻、ID、イベント配送）を trait で切り出す。

pub mod clock;
pub mod event_sink;
pub mod id_generator;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::event_sink::FiringSink;
pub use self::id_generator::{IdGenerator, UlidGenerator};
