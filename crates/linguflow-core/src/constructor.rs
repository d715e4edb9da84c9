//! The node constructor: turns a wire-format [`DagConfiguration`] into a
//! constructed [`Graph`] of live block/pattern instances.
//!
//! Ported from `original_source/blocks/invoke.py`'s `construct_graph_node`:
//! for each [`NodeSpec`], look up its name in the [`Resolver`], reject
//! unknown or abstract names, recursively resolve every slot value (a
//! nested node spec becomes a nested instance, an array resolves
//! element-wise, anything else is a JSON primitive passed straight through),
//! then invoke the registered constructor. A construction failure at any
//! depth is wrapped with the name of the node being built, not the leaf that
//! failed — callers get one `NodeConstructError::ConstructFailed` pointing
//! at the outermost node spec.

use std::collections::HashMap;

use serde_json::Value as Json;

use crate::error::NodeConstructError;
use crate::graph::{DagConfiguration, Edge, Graph, Node, NodeSpec};
use crate::instance::{ConstructArgs, Instance, SlotArg};
use crate::resolver::Resolver;

/// A slot value in a [`NodeSpec`] is itself either a plain JSON value, a
/// nested node spec object (`{"name": ..., "slots": {...}}`), or an array
/// mixing both — this mirrors the wire shape `original_source/model.py`
/// accepts for a slot.
fn is_nested_spec(value: &Json) -> bool {
    matches!(value, Json::Object(map) if map.contains_key("name"))
}

fn nested_spec_of(value: &Json) -> Result<NodeSpec, NodeConstructError> {
    serde_json::from_value(value.clone())
        .map_err(|e| NodeConstructError::ConstructFailed { name: "<nested>".into(), reason: e.to_string() })
}

/// Recursively resolves one slot value into a [`SlotArg`], constructing any
/// nested instance along the way.
fn resolve_slot_value(resolver: &Resolver, value: &Json) -> Result<SlotArg, NodeConstructError> {
    match value {
        Json::Array(items) => {
            let resolved = items
                .iter()
                .map(|v| resolve_slot_value(resolver, v))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(SlotArg::List(resolved))
        }
        v if is_nested_spec(v) => {
            let spec = nested_spec_of(v)?;
            let instance = construct_instance(resolver, &spec)?;
            match instance {
                Instance::Pattern(p) => Ok(SlotArg::Pattern(p)),
                Instance::Block(b) => Ok(SlotArg::Block(b)),
                Instance::Llm(m) => Ok(SlotArg::Llm(m)),
            }
        }
        other => Ok(SlotArg::Value(other.clone())),
    }
}

/// Builds the [`Instance`] named by a single node spec, recursing into
/// nested slot specs first and invoking the registered constructor last.
pub fn construct_instance(resolver: &Resolver, spec: &NodeSpec) -> Result<Instance, NodeConstructError> {
    let descriptor = resolver
        .lookup(&spec.name)
        .ok_or_else(|| NodeConstructError::NameNotFound(spec.name.clone()))?;

    if descriptor.abstract_ {
        return Err(NodeConstructError::AbstractType(spec.name.clone()));
    }

    let mut args: ConstructArgs = ConstructArgs::new();

    // Iterate the incoming spec's slots directly (not the descriptor's
    // declared list) so every key the caller submitted is forwarded, and a
    // key the descriptor doesn't declare fails construction instead of
    // being silently dropped — matches `construct_graph_node` forwarding
    // `slots.items()` straight into `cls(**properties)`.
    for (name, raw) in &spec.slots {
        if !descriptor.slots.iter().any(|slot| &slot.name == name) {
            return Err(NodeConstructError::ConstructFailed {
                name: spec.name.clone(),
                reason: format!("unknown slot {name}"),
            });
        }
        let resolved = resolve_slot_value(resolver, raw).map_err(|_| NodeConstructError::ConstructFailed {
            name: spec.name.clone(),
            reason: format!("failed to resolve slot {name}"),
        })?;
        args.insert(name.clone(), resolved);
    }

    for slot in &descriptor.slots {
        if spec.slots.contains_key(&slot.name) {
            continue;
        }
        let Some(default) = &slot.default else { continue };
        let resolved = resolve_slot_value(resolver, default).map_err(|_| NodeConstructError::ConstructFailed {
            name: spec.name.clone(),
            reason: format!("failed to resolve slot {}", slot.name),
        })?;
        args.insert(slot.name.clone(), resolved);
    }

    let constructor = resolver
        .registry()
        .constructor(&spec.name)
        .expect("a non-abstract registered descriptor always has a constructor")
        .clone();

    constructor(args).map_err(|reason| NodeConstructError::ConstructFailed { name: spec.name.clone(), reason })
}

/// Builds the full [`Graph`] from a wire-format [`DagConfiguration`]: every
/// node is constructed independently (slot nesting is local to one
/// [`NodeSpec`], it never spans node ids), then wired into edges.
pub fn construct_graph(resolver: &Resolver, config: &DagConfiguration) -> Result<Graph, NodeConstructError> {
    let mut nodes = HashMap::with_capacity(config.nodes.len());

    for spec in &config.nodes {
        let descriptor = resolver
            .lookup(&spec.name)
            .ok_or_else(|| NodeConstructError::NameNotFound(spec.name.clone()))?
            .clone();

        let instance = construct_instance(resolver, spec)?;
        let block = instance.into_block().ok_or_else(|| NodeConstructError::ConstructFailed {
            name: spec.name.clone(),
            reason: "a DAG node spec must name a Block type, not a Pattern".into(),
        })?;

        let outport = descriptor.outport.clone().unwrap_or_else(|| crate::types::ANY.to_string());
        let displayable = crate::types::BUILTIN_TYPES.contains(&outport.as_str()) || descriptor.displayable;

        nodes.insert(
            spec.id.clone(),
            Node { id: spec.id.clone(), block, inports: descriptor.inports.clone(), outport, displayable },
        );
    }

    let edges: Vec<Edge> = config.edges.iter().map(Edge::from).collect();

    Ok(Graph::new(nodes, edges))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_unknown_name() {
        let resolver = Resolver::new();
        let spec = NodeSpec { id: "n1".into(), name: "Does_Not_Exist".into(), alias: None, slots: HashMap::new() };
        let err = construct_instance(&resolver, &spec).unwrap_err();
        assert!(matches!(err, NodeConstructError::NameNotFound(n) if n == "Does_Not_Exist"));
    }

    #[test]
    fn rejects_abstract_name() {
        let resolver = Resolver::new();
        let spec = NodeSpec { id: "n1".into(), name: "TextComparator".into(), alias: None, slots: HashMap::new() };
        let err = construct_instance(&resolver, &spec).unwrap_err();
        assert!(matches!(err, NodeConstructError::AbstractType(n) if n == "TextComparator"));
    }

    #[test]
    fn constructs_text_input_block() {
        let resolver = Resolver::new();
        let spec = NodeSpec { id: "n1".into(), name: "TextInput".into(), alias: None, slots: HashMap::new() };
        let instance = construct_instance(&resolver, &spec).unwrap();
        assert!(instance.into_block().is_some());
    }

    #[test]
    fn rejects_unknown_slot_key() {
        let resolver = Resolver::new();
        let mut slots = HashMap::new();
        slots.insert("not_a_real_slot".into(), json!("hello"));
        let spec = NodeSpec { id: "n1".into(), name: "TextEqual".into(), alias: None, slots };
        let err = construct_instance(&resolver, &spec).unwrap_err();
        assert!(matches!(err, NodeConstructError::ConstructFailed { reason, .. } if reason.contains("unknown slot")));
    }

    #[test]
    fn constructs_nested_condition_with_comparator_pattern() {
        let resolver = Resolver::new();
        let mut slots = HashMap::new();
        slots.insert(
            "comparator".into(),
            json!({ "name": "TextEqual", "slots": { "value": "hello" } }),
        );
        let spec = NodeSpec { id: "n1".into(), name: "TextCondition".into(), alias: None, slots };
        let instance = construct_instance(&resolver, &spec).unwrap();
        assert!(instance.into_block().is_some());
    }
}
