//! Impls - ports の実装
//!
//! - ChannelSink: tokio mpsc への配送（CLI やテストが受信する）
//! - LogSink: tracing へ出力
//! - NoopSink: 何もしない

pub mod channel_sink;
pub mod log_sink;

pub use self::channel_sink::ChannelSink;
pub use self::log_sink::{LogSink, NoopSink};
