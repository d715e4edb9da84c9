//! Integration tests for six worked end-to-end graph scenarios.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use linguflow_core::block::{Bindings, Block, Context};
use linguflow_core::error::BlockError;
use linguflow_core::graph::{DagConfiguration, Edge, Graph, Node};
use linguflow_core::types::PortDescriptor;
use linguflow_core::value::Value;
use linguflow_core::{construct_graph, validate, Resolver, Scheduler};

fn ctx() -> Context {
    Context::test_context()
}

/// A fixed-value source node with no incoming edges — the scheduler invokes
/// it directly regardless of whether it's flagged as the graph's unique
/// input block, since a node with no incoming edges is always ready.
#[derive(Debug)]
struct Constant(Value);

#[async_trait]
impl Block for Constant {
    async fn invoke(&self, _bindings: Bindings, _ctx: &Context) -> Result<Value, BlockError> {
        Ok(self.0.clone())
    }
}

fn node(id: &str, block: Arc<dyn Block>, inports: Vec<PortDescriptor>, outport: &str) -> Node {
    Node { id: id.to_string(), block, inports, outport: outport.to_string(), displayable: true }
}

// ---------------------------------------------------------------------
// 1. Linear passthrough
// ---------------------------------------------------------------------

#[tokio::test]
async fn linear_passthrough() {
    let resolver = Resolver::new();
    let config: DagConfiguration = serde_json::from_value(json!({
        "nodes": [
            {"id": "in", "name": "TextInput"},
            {"id": "out", "name": "Output"}
        ],
        "edges": [
            {"src_block": "in", "dst_block": "out", "dst_port": "input", "case": null}
        ]
    }))
    .unwrap();

    let graph = construct_graph(&resolver, &config).unwrap();
    validate(&graph, &resolver).unwrap();

    let scheduler = Scheduler::new(&graph);
    let out = scheduler.run(json!("hello"), &ctx()).await.unwrap();
    assert_eq!(out, json!("hello"));
}

// ---------------------------------------------------------------------
// 2. Conditional routing
// ---------------------------------------------------------------------

#[tokio::test]
async fn conditional_routing_picks_the_matching_branch() {
    let resolver = Resolver::new();
    let config: DagConfiguration = serde_json::from_value(json!({
        "nodes": [
            {"id": "in", "name": "TextInput"},
            {"id": "cond", "name": "TextCondition", "slots": {"comparator": {"name": "TextEqual", "slots": {"value": "yes"}}}},
            {"id": "out", "name": "Output"}
        ],
        "edges": [
            {"src_block": "in", "dst_block": "cond", "dst_port": "input", "case": null}
        ]
    }))
    .unwrap();

    let mut graph = construct_graph(&resolver, &config).unwrap();
    graph.nodes.insert("a".into(), node("a", Arc::new(Constant(json!("A"))), vec![], "text"));
    graph.nodes.insert("b".into(), node("b", Arc::new(Constant(json!("B"))), vec![], "text"));
    graph.edges.push(Edge { source: "cond".into(), sink: "a".into(), port: None, case: Some(json!(true)) });
    graph.edges.push(Edge { source: "cond".into(), sink: "b".into(), port: None, case: Some(json!(false)) });
    graph.edges.push(Edge { source: "a".into(), sink: "out".into(), port: Some("input".into()), case: None });
    graph.edges.push(Edge { source: "b".into(), sink: "out".into(), port: Some("input".into()), case: None });

    // "out" absorbs either "a" or "b" onto its declared "input" port, never both.
    let scheduler = Scheduler::new(&graph);
    let yes = scheduler.run(json!("yes"), &ctx()).await.unwrap();
    assert_eq!(yes, json!("A"));

    let scheduler = Scheduler::new(&graph);
    let no = scheduler.run(json!("no"), &ctx()).await.unwrap();
    assert_eq!(no, json!("B"));
}

// ---------------------------------------------------------------------
// 3. Null short-circuit
// ---------------------------------------------------------------------

#[tokio::test]
async fn null_short_circuits_without_invoking_downstream() {
    let resolver = Resolver::new();
    let config: DagConfiguration = serde_json::from_value(json!({
        "nodes": [
            {"id": "in", "name": "DictInput"},
            {"id": "sel", "name": "KeySelector", "slots": {"key": "x"}},
            {"id": "concat", "name": "ConcatList"},
            {"id": "out", "name": "Output"}
        ],
        "edges": [
            {"src_block": "in", "dst_block": "sel", "dst_port": "messages", "case": null},
            {"src_block": "sel", "dst_block": "concat", "dst_port": "seq1", "case": null},
            {"src_block": "concat", "dst_block": "out", "dst_port": "input", "case": null}
        ]
    }))
    .unwrap();

    let graph = construct_graph(&resolver, &config).unwrap();
    // ConcatList's "seq2" is never fed, so RequiredInPortIsFit would reject
    // this graph as submitted — exercise the scheduler directly to prove the
    // runtime short-circuit, independent of validation.
    let scheduler = Scheduler::new(&graph);
    let out = scheduler.run(json!({}), &ctx()).await.unwrap();
    assert_eq!(out, Value::Null);
}

// ---------------------------------------------------------------------
// 4. Variadic absorb
// ---------------------------------------------------------------------

#[tokio::test]
async fn variadic_keyword_port_absorbs_unknown_names() {
    let resolver = Resolver::new();
    let config: DagConfiguration = serde_json::from_value(json!({
        "nodes": [
            {"id": "join", "name": "JoinList", "slots": {"template": "{a}-{b}"}}
        ],
        "edges": []
    }))
    .unwrap();

    let mut graph = construct_graph(&resolver, &config).unwrap();
    graph.nodes.insert(
        "src_a".into(),
        node("src_a", Arc::new(Constant(json!(["x", "y"]))), vec![], "list"),
    );
    graph.nodes.insert(
        "src_b".into(),
        node("src_b", Arc::new(Constant(json!(["1", "2"]))), vec![], "list"),
    );
    graph.edges.push(Edge { source: "src_a".into(), sink: "join".into(), port: Some("a".into()), case: None });
    graph.edges.push(Edge { source: "src_b".into(), sink: "join".into(), port: Some("b".into()), case: None });

    let scheduler = Scheduler::new(&graph);
    let out = scheduler.run(Value::Null, &ctx()).await.unwrap();
    assert_eq!(out, json!("x-1\ny-2"));
}

// ---------------------------------------------------------------------
// 6. Validation rejection
// ---------------------------------------------------------------------

#[tokio::test]
async fn two_output_nodes_fail_validation_before_any_execution() {
    let resolver = Resolver::new();
    let config: DagConfiguration = serde_json::from_value(json!({
        "nodes": [
            {"id": "in", "name": "TextInput"},
            {"id": "out1", "name": "Output"},
            {"id": "out2", "name": "Output"}
        ],
        "edges": [
            {"src_block": "in", "dst_block": "out1", "dst_port": "input", "case": null},
            {"src_block": "in", "dst_block": "out2", "dst_port": "input", "case": null}
        ]
    }))
    .unwrap();

    let graph = construct_graph(&resolver, &config).unwrap();
    let err = validate(&graph, &resolver).unwrap_err();
    match err {
        linguflow_core::error::GraphCheckError::InputOutputCount { input_count, output_count } => {
            assert_eq!(input_count, 1);
            assert_eq!(output_count, 2);
        }
        other => panic!("expected InputOutputCount, got {other:?}"),
    }
}

#[tokio::test]
async fn each_node_runs_at_most_once() {
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct CountingPassthrough(Arc<AtomicUsize>);

    #[async_trait]
    impl Block for CountingPassthrough {
        async fn invoke(&self, bindings: Bindings, _ctx: &Context) -> Result<Value, BlockError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(bindings.get("input").cloned().unwrap_or(Value::Null))
        }
    }

    #[derive(Debug)]
    struct OutputJoin;

    #[async_trait]
    impl Block for OutputJoin {
        async fn invoke(&self, bindings: Bindings, _ctx: &Context) -> Result<Value, BlockError> {
            let a = bindings.get("a").cloned().unwrap_or(Value::Null);
            let b = bindings.get("b").cloned().unwrap_or(Value::Null);
            Ok(json!([a, b]))
        }
        fn is_output(&self) -> bool {
            true
        }
    }

    let calls = Arc::new(AtomicUsize::new(0));

    let mut nodes = HashMap::new();
    nodes.insert("in".to_string(), node("in", Arc::new(Constant(json!("x"))), vec![], "any"));
    nodes.insert(
        "mid".to_string(),
        node(
            "mid",
            Arc::new(CountingPassthrough(calls.clone())),
            vec![PortDescriptor::required("input", "any")],
            "any",
        ),
    );
    nodes.insert(
        "out".to_string(),
        node(
            "out",
            Arc::new(OutputJoin),
            vec![PortDescriptor::required("a", "any"), PortDescriptor::required("b", "any")],
            "any",
        ),
    );
    let edges = vec![
        Edge { source: "in".into(), sink: "mid".into(), port: Some("input".into()), case: None },
        // "mid" is demanded through two distinct downstream ports but must
        // only ever be invoked once thanks to memoization.
        Edge { source: "mid".into(), sink: "out".into(), port: Some("a".into()), case: None },
        Edge { source: "mid".into(), sink: "out".into(), port: Some("b".into()), case: None },
    ];
    let graph = Graph::new(nodes, edges);

    let scheduler = Scheduler::new(&graph);
    let out = scheduler.run(Value::Null, &ctx()).await.unwrap();
    assert_eq!(out, json!(["x", "x"]));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
