//! The validator: structural, type-compatibility and connectivity rules
//! applied before execution.
//!
//! Ported from `original_source/scheduler/rule.py`'s `Rule` ABC and its six
//! subclasses, run in the same fixed order: a DAG that fails an earlier rule
//! is never checked against a later one.

use crate::error::GraphCheckError;
use crate::graph::Graph;
use crate::resolver::Resolver;

/// One validation rule, a pure function of the graph.
pub trait Rule {
    fn check(&self, graph: &Graph) -> Result<(), GraphCheckError>;
}

/// Rule 1 — every edge's endpoints must exist, and a non-null `port` must
/// either name a declared inport of the sink or the sink must absorb
/// unknown names via a variadic-keyword inport.
pub struct EndpointExist;

impl Rule for EndpointExist {
    fn check(&self, graph: &Graph) -> Result<(), GraphCheckError> {
        for e in &graph.edges {
            if !graph.nodes.contains_key(&e.source) {
                return Err(GraphCheckError::EndpointNotExist(e.source.clone()));
            }
            let Some(sink) = graph.nodes.get(&e.sink) else {
                return Err(GraphCheckError::EndpointNotExist(e.sink.clone()));
            };
            if sink.variadic_port().is_some() {
                continue;
            }
            if let Some(port) = &e.port {
                if sink.find_inport(port).is_none() {
                    return Err(GraphCheckError::EndpointNotExist(format!("{}.{}", e.sink, port)));
                }
            }
        }
        Ok(())
    }
}

/// Rule 2 — the directed graph must be acyclic.
pub struct GraphIsDag;

impl Rule for GraphIsDag {
    fn check(&self, graph: &Graph) -> Result<(), GraphCheckError> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Unvisited,
            InProgress,
            Done,
        }
        use std::collections::HashMap;

        let mut marks: HashMap<&str, Mark> =
            graph.nodes.keys().map(|k| (k.as_str(), Mark::Unvisited)).collect();

        fn visit<'a>(
            node: &'a str,
            graph: &'a Graph,
            marks: &mut std::collections::HashMap<&'a str, Mark>,
        ) -> Result<(), GraphCheckError> {
            match marks.get(node) {
                Some(Mark::Done) => return Ok(()),
                Some(Mark::InProgress) => return Err(GraphCheckError::NotADag),
                _ => {}
            }
            marks.insert(node, Mark::InProgress);
            for e in graph.edges.iter().filter(|e| e.source == node) {
                visit(&e.sink, graph, marks)?;
            }
            marks.insert(node, Mark::Done);
            Ok(())
        }

        let ids: Vec<String> = graph.nodes.keys().cloned().collect();
        for id in &ids {
            visit(id, graph, &mut marks)?;
        }
        Ok(())
    }
}

/// Rule 3 — every required (no default, non-variadic) invocation parameter
/// must have at least one incoming edge targeting it by name.
pub struct RequiredInPortIsFit;

impl Rule for RequiredInPortIsFit {
    fn check(&self, graph: &Graph) -> Result<(), GraphCheckError> {
        for (node_id, node) in &graph.nodes {
            let mut required: Vec<&str> = node
                .inports
                .iter()
                .filter(|p| p.default.is_none() && !p.is_variadic())
                .map(|p| p.name.as_str())
                .collect();

            for e in graph.in_edges(node_id) {
                if let Some(port) = &e.port {
                    required.retain(|p| p != port);
                }
            }

            if let Some(first) = required.first() {
                return Err(GraphCheckError::PortNotConnected {
                    node: node_id.clone(),
                    port: first.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Rule 4 — the node set must contain exactly one input block and one
/// output block.
pub struct ExactlyOneInputAndOutput;

impl Rule for ExactlyOneInputAndOutput {
    fn check(&self, graph: &Graph) -> Result<(), GraphCheckError> {
        let input_count = graph.input_nodes().len();
        let output_count = graph.output_nodes().len();
        if input_count != 1 || output_count != 1 {
            return Err(GraphCheckError::InputOutputCount { input_count, output_count });
        }
        Ok(())
    }
}

/// Rule 5 — for every named-port edge, the source's declared return type
/// must be assignable to the sink port's declared type. `any` accepts
/// everything; a `None` port accepts anything (it carries no data).
pub struct PortTypeMatch<'r> {
    pub resolver: &'r Resolver,
}

impl<'r> Rule for PortTypeMatch<'r> {
    fn check(&self, graph: &Graph) -> Result<(), GraphCheckError> {
        for e in &graph.edges {
            let Some(port) = &e.port else { continue };
            let Some(sink) = graph.nodes.get(&e.sink) else { continue };
            let Some(inport) = sink.find_inport(port) else { continue };
            if inport.type_tag == crate::types::ANY {
                continue;
            }
            let Some(source) = graph.nodes.get(&e.source) else { continue };
            if source.outport == crate::types::ANY {
                continue;
            }
            if !self.resolver.is_subtype(&source.outport, &inport.type_tag) {
                return Err(GraphCheckError::PortTypeMismatch { sink: e.sink.clone(), port: port.clone() });
            }
        }
        Ok(())
    }
}

/// Rule 6 — every edge's source must declare a return type that is either a
/// registry builtin or one that provides a string-conversion capability
/// (values may be persisted as strings into the Interaction's `data` map).
pub struct TypeHasStrMethod;

impl Rule for TypeHasStrMethod {
    fn check(&self, graph: &Graph) -> Result<(), GraphCheckError> {
        for e in &graph.edges {
            let Some(source) = graph.nodes.get(&e.source) else { continue };
            if !source.displayable {
                return Err(GraphCheckError::TypeHasNoStrMethod(source.outport.clone()));
            }
        }
        Ok(())
    }
}

/// Runs the canonical rule set, in order, stopping at the first failure.
pub fn validate(graph: &Graph, resolver: &Resolver) -> Result<(), GraphCheckError> {
    EndpointExist.check(graph)?;
    GraphIsDag.check(graph)?;
    RequiredInPortIsFit.check(graph)?;
    ExactlyOneInputAndOutput.check(graph)?;
    PortTypeMatch { resolver }.check(graph)?;
    TypeHasStrMethod.check(graph)?;
    Ok(())
}
