//! kb-infer: Policy-value oracle boundary + batching inference dispatcher.

pub mod oracle;
pub mod server;

pub use oracle::{Evaluation, Features, HeuristicOracle, Oracle, OracleError, UniformOracle};
pub use server::{InferenceServer, ServerOptions, ServerStatsSnapshot};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");


#[cfg(test)]
mod server_tests;
