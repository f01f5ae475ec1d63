//! Shared utilities for the Lounge workspace.
//!
//! - `logger`: tracing subscriber bootstrap
//! - `time`: clock abstraction and timestamp formatting

pub mod logger;
pub mod time;
