//! Repository の具体的な実装
//!
//! - `inmemory`: プロセス内のメモリに保持する実装
//! - 将来的に: `postgres` など

pub mod inmemory;

pub use inmemory::{InMemoryMessageStore, InMemoryRoomRegistry};
