//! In-memory DAG representation.
//!
//! A [`Graph`] is the immutable pair `(Nodes, Edges)`: node id → block
//! instance plus the node's invocation signature (captured once, at
//! construction, from its [`TypeDescriptor`](crate::types::TypeDescriptor) —
//! the validator and scheduler never need to go back to the [`Resolver`]),
//! and a list of directed, optionally port/case-labeled edges.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::block::Block;
use crate::types::PortDescriptor;
use crate::value::Value;

/// The wire format for one DAG node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSpec {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub slots: HashMap<String, Value>,
}

/// The wire format for one DAG edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeSpec {
    pub src_block: String,
    pub dst_block: String,
    #[serde(default)]
    pub dst_port: Option<String>,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub case: Option<Value>,
}

/// The wire format for an entire DAG (`version.configuration`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DagConfiguration {
    pub nodes: Vec<NodeSpec>,
    pub edges: Vec<EdgeSpec>,
}

/// A constructed, runtime DAG node: the block instance plus its invocation
/// signature (used by the validator and scheduler without a registry
/// round-trip).
#[derive(Clone)]
pub struct Node {
    pub id: String,
    pub block: Arc<dyn Block>,
    pub inports: Vec<PortDescriptor>,
    /// The node's declared outport type tag (its registered block's
    /// invocation return type), used by `PortTypeMatch`/`TypeHasStrMethod`.
    pub outport: String,
    /// Whether `outport` is a builtin or, if not, provides a
    /// string-conversion capability (`TypeDescriptor::displayable`).
    pub displayable: bool,
}

impl Node {
    pub fn variadic_port(&self) -> Option<&PortDescriptor> {
        self.inports.iter().find(|p| p.is_variadic())
    }

    pub fn find_inport(&self, name: &str) -> Option<&PortDescriptor> {
        self.inports.iter().find(|p| p.name == name)
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node").field("id", &self.id).field("inports", &self.inports.len()).finish()
    }
}

/// A directed edge between two constructed nodes. `port` names a declared
/// inport of the sink, or is `None` for a positional/guard edge. `case` is
/// an optional equality filter on the source's computed value.
#[derive(Debug, Clone)]
pub struct Edge {
    pub source: String,
    pub sink: String,
    pub port: Option<String>,
    pub case: Option<Value>,
}

impl From<&EdgeSpec> for Edge {
    fn from(e: &EdgeSpec) -> Self {
        Edge { source: e.src_block.clone(), sink: e.dst_block.clone(), port: e.dst_port.clone(), case: e.case.clone() }
    }
}

/// The immutable, constructed DAG. Produced by
/// [`crate::constructor::construct_graph`] and consumed by
/// [`crate::validator::validate`] and [`crate::scheduler::Scheduler`].
pub struct Graph {
    pub nodes: HashMap<String, Node>,
    pub edges: Vec<Edge>,
}

impl Graph {
    pub fn new(nodes: HashMap<String, Node>, edges: Vec<Edge>) -> Self {
        Self { nodes, edges }
    }

    pub fn in_edges(&self, node_id: &str) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |e| e.sink == node_id)
    }

    pub fn input_node(&self) -> Option<&Node> {
        self.nodes.values().find(|n| n.block.is_input())
    }

    pub fn output_node(&self) -> Option<&Node> {
        self.nodes.values().find(|n| n.block.is_output())
    }

    pub fn input_nodes(&self) -> Vec<&Node> {
        self.nodes.values().filter(|n| n.block.is_input()).collect()
    }

    pub fn output_nodes(&self) -> Vec<&Node> {
        self.nodes.values().filter(|n| n.block.is_output()).collect()
    }
}
