//! Broadcast Group の実装
//!
//! ## 概要
//!
//! このモジュールは `BroadcastGroup` trait の具体的な実装を提供します。
//!
//! ## 実装
//!
//! - `in_process`: 単一プロセス内の mpsc チャンネルを使った実装
//! - 将来的に: `redis` など、複数プロセスにまたがるトランスポート

pub mod in_process;

pub use in_process::InProcessBroadcastGroup;
