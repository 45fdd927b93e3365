//! ZRM: liveliness-discovered publish/subscribe, service, and action
//! middleware over a pluggable Zenoh-like transport.
//!
//! See `SPEC_FULL.md` in the repository root for the full component
//! specification this crate implements.

pub mod action;
pub mod context;
pub mod entity;
pub mod error;
pub mod future;
pub mod graph;
pub mod logger;
pub mod message;
pub mod node;
pub mod service;
pub mod topic;

pub use context::{init, init_with_config, shutdown, Config, Context};
pub use entity::{Entity, EntityKind};
pub use error::{Error, Result};
pub use graph::Graph;
pub use message::{ActionSchema, Message, ServiceSchema};
pub use node::Node;

/// Goal handle types re-exported at the crate root for ergonomic imports,
/// mirroring how `zrm::Node` / `zrm::ServerGoalHandle` read in user code.
pub use action::{ActionClient, ActionServer, ClientGoalHandle, ServerGoalHandle};
pub use service::{Client as ServiceClient, Server as ServiceServer};
pub use topic::{Publisher, Subscriber};
