//! The Langfuse tracing seam (`LANGFUSE_*` environment keys). Grounded on
//! `orchestrator::services`'s trait-seam-over-external-vendor pattern: the
//! invoker depends only on [`TraceHook`], never on a concrete tracing SDK,
//! so the hook can be swapped or stubbed in tests.
//!
//! Hook failures must never interrupt a run: a run that produced a correct
//! output must not fail because tracing did not. Each method therefore
//! returns nothing and is expected to log and swallow its own errors.

use async_trait::async_trait;
use serde_json::Value;

use linguflow_core::block::Context;

/// One span per graph run, covering `graph_start` through either
/// `graph_end` or `graph_error`. `node_end` is called once per node
/// completion, mirroring the Scheduler's own callback granularity.
#[async_trait]
pub trait TraceHook: Send + Sync {
    async fn graph_start(&self, ctx: &Context, input: &Value);
    async fn node_end(&self, ctx: &Context, node_id: &str, output: &Value);
    async fn graph_end(&self, ctx: &Context, output: &Value);
    async fn graph_error(&self, ctx: &Context, error: &str);
}

/// Installed when no `LANGFUSE_*` keys are configured: every call is a
/// no-op, so the invoker never needs to branch on "is tracing configured"
/// at the call site.
#[derive(Debug, Default)]
pub struct NoopTraceHook;

#[async_trait]
impl TraceHook for NoopTraceHook {
    async fn graph_start(&self, _ctx: &Context, _input: &Value) {}
    async fn node_end(&self, _ctx: &Context, _node_id: &str, _output: &Value) {}
    async fn graph_end(&self, _ctx: &Context, _output: &Value) {}
    async fn graph_error(&self, _ctx: &Context, _error: &str) {}
}

/// Emits `tracing` events in place of talking to the Langfuse HTTP API —
/// real wiring to the vendor SDK is left to the deployment's own
/// composition root; this hook demonstrates the seam's shape and is
/// sufficient for local development where no Langfuse project is
/// configured.
#[derive(Debug, Default)]
pub struct TracingTraceHook;

#[async_trait]
impl TraceHook for TracingTraceHook {
    async fn graph_start(&self, ctx: &Context, input: &Value) {
        tracing::info!(interaction_id = %ctx.interaction_id, %input, "graph_start");
    }

    async fn node_end(&self, ctx: &Context, node_id: &str, output: &Value) {
        tracing::debug!(interaction_id = %ctx.interaction_id, node_id, %output, "node_end");
    }

    async fn graph_end(&self, ctx: &Context, output: &Value) {
        tracing::info!(interaction_id = %ctx.interaction_id, %output, "graph_end");
    }

    async fn graph_error(&self, ctx: &Context, error: &str) {
        tracing::warn!(interaction_id = %ctx.interaction_id, error, "graph_error");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn noop_hook_accepts_every_call_without_panicking() {
        let hook = NoopTraceHook;
        let ctx = Context::test_context();
        hook.graph_start(&ctx, &json!({"a": 1})).await;
        hook.node_end(&ctx, "node-1", &json!(null)).await;
        hook.graph_end(&ctx, &json!("done")).await;
        hook.graph_error(&ctx, "boom").await;
    }
}
