//! Block contracts.
//!
//! A block instance conforms to one of three variants: input, output, or
//! regular. Rather than three disjoint Rust traits — which would force the
//! scheduler and graph model to hold three different collection types — all
//! three are modeled as one object-safe `Block` trait, with `is_input`/
//! `is_output` flags distinguishing the variants at runtime, mirroring the
//! original `BaseBlock`/`InputBlock`/`OutputBlock` property-based dispatch
//! (`original_source/blocks/base.py`).

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::BlockError;
use crate::value::Value;

/// Named arguments bound to a block's invocation ports for one call.
pub type Bindings = BTreeMap<String, Value>;

/// The read-only context visible to blocks during a run. Populated once per
/// run by the scheduler from the Async Invoker and threaded explicitly
/// through the invocation chain, rather than kept as ambient task-local
/// state in this crate — `linguflow-service` installs its own task-local
/// copy for the sub-application invocation blocks that need it.
#[derive(Debug, Clone)]
pub struct Context {
    pub app_id: String,
    pub version_id: String,
    pub interaction_id: String,
    pub user: String,
    pub session_id: Option<String>,
}

impl Context {
    /// A context usable outside of any real run (doctests, unit tests).
    pub fn test_context() -> Self {
        Self {
            app_id: "test-app".to_string(),
            version_id: "test-version".to_string(),
            interaction_id: "test-interaction".to_string(),
            user: "test-user".to_string(),
            session_id: None,
        }
    }
}

/// A runtime DAG node. Every block declares its invocation signature
/// reflectively via [`crate::types::TypeDescriptor`] at registration time;
/// this trait is the callable behind that signature.
#[async_trait]
pub trait Block: Send + Sync + std::fmt::Debug {
    /// Invokes the block with its already-resolved port bindings. Regular
    /// and output blocks receive the bindings built by the scheduler; input
    /// blocks are invoked with an empty binding map once their value has
    /// been set via [`Block::set_input`].
    async fn invoke(&self, bindings: Bindings, ctx: &Context) -> Result<Value, BlockError>;

    /// True for the unique entry point of a graph.
    fn is_input(&self) -> bool {
        false
    }

    /// True for the unique exit point of a graph.
    fn is_output(&self) -> bool {
        false
    }

    /// Sets the value an input block will return the next time it's
    /// invoked. Only meaningful when [`Block::is_input`] is true; the
    /// default implementation is never reached for non-input blocks because
    /// the scheduler only calls it on the graph's single input node.
    fn set_input(&self, _value: Value) {
        unreachable!("set_input called on a non-input block")
    }
}
