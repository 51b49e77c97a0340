// Workflow Bridge — HTTP gateway to an external multi-agent workflow runner
// License: Apache-2.0

pub mod bridge;
pub mod config;
pub mod credentials;
pub mod logger;
pub mod runner;
pub mod web;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
