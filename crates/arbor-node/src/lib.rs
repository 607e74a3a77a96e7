//! # arbor-node
//! Node composition around the block tree.
//!
//! - [`node::Node`]: serialises all block-tree access behind one lock
//! - [`config::NodeConfig`]: layered configuration (defaults, file, env)
//! - [`logging`]: tracing subscriber setup
//! - [`error::NodeError`]: startup errors

pub mod config;
pub mod error;
pub mod logging;
pub mod node;

pub use config::NodeConfig;
pub use error::NodeError;
pub use node::Node;
