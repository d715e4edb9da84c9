//! Error types for registry boot, node construction, graph validation and
//! node execution.
//!
//! # Error Hierarchy
//!
//! ```text
//! RegistryError      — raised once, at Resolver::bootstrap(), fails process start
//! ├── DuplicatedName
//! ├── DuplicatedType
//! └── Unregistered
//!
//! NodeConstructError — raised by the constructor, surfaced synchronously as HTTP 400
//!
//! GraphCheckError     — raised by the validator, surfaced synchronously as HTTP 400
//! ├── EndpointNotExist
//! ├── NotADag
//! ├── PortNotConnected
//! ├── InputOutputCount
//! ├── PortTypeMismatch
//! └── TypeHasNoStrMethod
//!
//! NodeException       — raised by the scheduler, persisted onto the Interaction row
//! ```

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Errors raised while the [`crate::registry::Registry`] checks its
/// invariants at construction time. Any of these aborts process start.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Two descriptors were registered under the same name.
    #[error("duplicated name: {0}")]
    DuplicatedName(String),

    /// Two descriptors were registered under the same implementation tag.
    #[error("duplicated type: {0}")]
    DuplicatedType(String),

    /// A slot, inport or outport of `name` references `referenced` which is
    /// not itself a registered name.
    #[error("{name} references unregistered type {referenced}")]
    Unregistered { name: String, referenced: String },
}

/// Errors raised while recursively materializing a block/pattern instance
/// from a JSON node spec.
#[derive(Debug, Error, Clone)]
pub enum NodeConstructError {
    #[error("name {0} not found")]
    NameNotFound(String),

    #[error("{0} is an abstract type and can NOT be constructed")]
    AbstractType(String),

    #[error("construct {name} failed: {reason}")]
    ConstructFailed { name: String, reason: String },
}

/// Errors raised by the validator's rule set. Every variant corresponds to
/// exactly one canonical rule, in the rule's own check order.
#[derive(Debug, Error, Clone)]
pub enum GraphCheckError {
    /// Rule 1 — EndpointExist.
    #[error("edge endpoint {0} not exist")]
    EndpointNotExist(String),

    /// Rule 2 — GraphIsDAG.
    #[error("graph is not a valid DAG")]
    NotADag,

    /// Rule 3 — RequiredInPortIsFit.
    #[error("port {node}.{port} not connected")]
    PortNotConnected { node: String, port: String },

    /// Rule 4 — ExactlyOneInputAndOutput.
    #[error(
        "expect exactly one input and output block, got {input_count} input blocks and {output_count} output blocks"
    )]
    InputOutputCount { input_count: usize, output_count: usize },

    /// Rule 5 — PortTypeMatch.
    #[error("port type mismatch on {sink}.{port}")]
    PortTypeMismatch { sink: String, port: String },

    /// Rule 6 — TypeHasStrMethod.
    #[error("{0} has no string-conversion capability")]
    TypeHasNoStrMethod(String),
}

/// A node raised an error during execution. The original cause is kept so
/// the caller (the Async Invoker's error renderer) can classify it.
#[derive(Debug, Error, Clone)]
#[error("node {node_id} failed: {source}")]
pub struct NodeException {
    pub node_id: String,
    #[source]
    pub source: Arc<dyn std::error::Error + Send + Sync>,
}

impl NodeException {
    pub fn new(node_id: impl Into<String>, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self {
            node_id: node_id.into(),
            source: Arc::new(source),
        }
    }

    pub fn from_message(node_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(node_id, BlockError::new(message))
    }
}

/// Which part of the system raised a [`BlockError`], carried alongside the
/// message so the invoker's error renderer can classify a failure by
/// `downcast_ref` instead of pattern-matching on rendered text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The failure originated from an `LlmModel` implementation.
    Llm,
    /// A sub-application invocation (or other bounded wait) ran past its
    /// deadline.
    Timeout,
    /// The failure originated from the repository facade.
    Database,
    /// Anything else — a block author's own domain error.
    Unknown,
}

/// An error raised by a block invocation. Carries a message plus the
/// [`ErrorKind`] the raiser already knows, rather than leaving classification
/// to whoever renders the error later.
#[derive(Debug, Clone)]
pub struct BlockError {
    pub message: String,
    pub kind: ErrorKind,
}

impl BlockError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), kind: ErrorKind::Unknown }
    }

    pub fn llm(message: impl Into<String>) -> Self {
        Self { message: message.into(), kind: ErrorKind::Llm }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self { message: message.into(), kind: ErrorKind::Timeout }
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self { message: message.into(), kind: ErrorKind::Database }
    }
}

impl fmt::Display for BlockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for BlockError {}

/// Top level error returned by graph construction, validation and
/// execution, used where a caller wants a single type to propagate with `?`.
#[derive(Debug, Error, Clone)]
pub enum GraphError {
    #[error(transparent)]
    Construct(#[from] NodeConstructError),

    #[error(transparent)]
    Check(#[from] GraphCheckError),

    #[error(transparent)]
    Node(#[from] NodeException),
}

pub type Result<T> = std::result::Result<T, GraphError>;
