//! Type registry, validator and demand-driven scheduler for LinguFlow DAGs.
//!
//! This crate is the hard engineering core: the Registry/Resolver, the Node
//! Constructor, the Validator and the Scheduler, plus the block/pattern
//! contracts and a builtin set of registered blocks and patterns. Everything
//! outside this crate — HTTP surface, persistence, async invocation
//! orchestration — lives in `linguflow-service` and depends on this crate
//! rather than the other way around.

pub mod block;
pub mod builtins;
pub mod constructor;
pub mod error;
pub mod graph;
pub mod instance;
pub mod pattern;
pub mod registry;
pub mod resolver;
pub mod scheduler;
pub mod types;
pub mod validator;
pub mod value;

pub use block::{Bindings, Block, Context};
pub use constructor::construct_graph;
pub use error::{BlockError, ErrorKind, GraphCheckError, GraphError, NodeConstructError, NodeException, RegistryError};
pub use graph::{DagConfiguration, Edge, EdgeSpec, Graph, Node, NodeSpec};
pub use registry::{Registry, RegistryBuilder};
pub use resolver::Resolver;
pub use scheduler::Scheduler;
pub use validator::validate;
pub use value::Value;
