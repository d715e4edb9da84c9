//! Task-local propagation of [`linguflow_core::block::Context`], grounded on
//! `orchestrator::context::manager`'s ambient-context pattern but
//! reimplemented over `tokio::task_local!` instead of a shared registry,
//! since a DAG run's context is fixed for the lifetime of one spawned task
//! and never needs cross-task lookup by id.
//!
//! Alongside the context itself, [`scope`] installs a fresh sub-application
//! invocation memo keyed by `(app_id, canonicalized input)`, scoped to
//! exactly one enclosing run — never a process-wide `lru_cache` the way
//! `original_source/blocks/invoke.py` memoizes it, since that would leak
//! stale sub-interaction ids across unrelated runs of the same sub-app.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use linguflow_core::block::Context;

/// Shared, run-scoped cache of sub-application invocation results, keyed by
/// `format!("{app_id}:{}", value::canonicalize(&input))`.
pub type SubappMemo = Arc<Mutex<HashMap<String, Value>>>;

tokio::task_local! {
    static CURRENT: Context;
    static MEMO: SubappMemo;
}

/// Runs `f` with `ctx` installed as the task-local context for its duration,
/// then tears it down, alongside a fresh, empty [`SubappMemo`]. Nested calls
/// shadow rather than merge, matching `task_local!`'s own scoping rules —
/// each nested sub-application invocation that itself spawns a run (see
/// `crate::invoker::AsyncInvoker::invoke`) gets its own memo, scoped to the
/// lifetime of that enclosing run.
pub async fn scope<F, T>(ctx: Context, f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    let memo: SubappMemo = Arc::new(Mutex::new(HashMap::new()));
    CURRENT.scope(ctx, MEMO.scope(memo, f)).await
}

/// Reads the run-scoped sub-application invocation memo installed by the
/// innermost enclosing [`scope`] call. Panics outside of one, same as
/// [`current`].
pub fn current_memo() -> SubappMemo {
    MEMO.with(|memo| memo.clone())
}

/// Reads the ambient context installed by the innermost enclosing [`scope`]
/// call. Panics if called outside of one — blocks only run inside a
/// scheduler-driven invocation, which always establishes a scope first.
pub fn current() -> Context {
    CURRENT.with(|ctx| ctx.clone())
}

/// Like [`current`], but returns `None` instead of panicking when no scope
/// is installed. Useful from code paths that may run outside of a graph run
/// (e.g. trace-hook flush on shutdown).
pub fn try_current() -> Option<Context> {
    CURRENT.try_with(|ctx| ctx.clone()).ok()
}
