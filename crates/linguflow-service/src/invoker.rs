//! The Async Invoker: the only entry point that turns an `Application` id
//! and an input value into a running DAG execution.
//!
//! Ported from `original_source/blocks/invoke.py`'s `AsyncInvoker`: `invoke`
//! resolves the target version, constructs and validates a fresh [`Graph`],
//! type-checks the input against the graph's declared input type, creates
//! the `Interaction` row and spawns a background task that drives the
//! [`Scheduler`] to completion; `poll` just re-reads the `Interaction` row.
//! Unlike the original's `@functools.lru_cache`'d module-level `invoke()`
//! helper, recursive sub-application invocation here goes through
//! [`AsyncInvoker::invoke_and_wait`], used only by `crate::subapp`'s blocks.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use serde_json::Value;
use uuid::Uuid;

use linguflow_core::block::Context;
use linguflow_core::constructor::construct_graph;
use linguflow_core::registry::RegistryBuilder;
use linguflow_core::resolver::Resolver;
use linguflow_core::scheduler::Scheduler;
use linguflow_core::types::ANY;
use linguflow_core::validator::validate;
use linguflow_core::value;

use crate::config::ServiceConfig;
use crate::context;
use crate::error::{render_node_exception, InvokeError};
use crate::models::Interaction;
use crate::repository::Repository;
use crate::trace::{NoopTraceHook, TraceHook};

/// The arguments to one top-level [`AsyncInvoker::invoke`] call. A plain
/// struct rather than a long positional argument list, matching the
/// keyword-call convention `original_source/blocks/invoke.py`'s `invoke()`
/// helper uses.
#[derive(Debug, Clone)]
pub struct InvokeRequest {
    pub user: String,
    pub app_id: Uuid,
    /// `None` invokes the application's `active_version`; `Some` pins a
    /// specific version, bypassing `active_version`.
    pub version_id: Option<Uuid>,
    pub input: Value,
    pub session_id: Option<String>,
}

/// Coordinates version resolution, graph construction/validation, and the
/// background run of one [`Interaction`]. Owns its own [`Resolver`], built
/// once at construction time from the core builtins plus the sub-application
/// invocation blocks of [`crate::subapp`] — each `AsyncInvoker` gets its own
/// extended registry rather than sharing the process-wide one
/// ([`linguflow_core::Resolver::new`]), since the sub-app blocks must close
/// over a handle back to *this* invoker.
pub struct AsyncInvoker {
    repository: Repository,
    resolver: Resolver,
    trace: Arc<dyn TraceHook>,
    config: ServiceConfig,
}

impl AsyncInvoker {
    /// Builds an invoker whose registry extends the core builtins with
    /// sub-application invocation blocks that call back into this same
    /// invoker. `Arc::new_cyclic` gives those blocks' constructors a
    /// [`Weak`] handle before `Self` exists, mirroring the mutual reference
    /// the original `Invoke` block classes and their owning `AsyncInvoker`
    /// had in Python (there, simply two attributes of the same module).
    pub fn new(repository: Repository, trace: Arc<dyn TraceHook>, config: ServiceConfig) -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<AsyncInvoker>| {
            let mut builder = RegistryBuilder::new();
            linguflow_core::builtins::install(&mut builder);
            crate::subapp::install(&mut builder, weak.clone(), config.subapp_timeout_secs, config.subapp_poll_interval_secs);
            let registry = builder.build().expect("core builtins plus subapp blocks satisfy every registry invariant");
            let resolver = Resolver::from_registry(Arc::new(registry));
            Self { repository, resolver, trace, config }
        })
    }

    /// Convenience constructor for tests and local development: no
    /// `LANGFUSE_*` keys configured, so tracing is a no-op.
    pub fn with_noop_trace(repository: Repository, config: ServiceConfig) -> Arc<Self> {
        Self::new(repository, Arc::new(NoopTraceHook), config)
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Resolves the target version, constructs and validates the graph,
    /// checks the input's type, creates the `Interaction` row, and spawns
    /// the background run. Returns the interaction id immediately — the run
    /// has not necessarily started, let alone finished, when this returns.
    pub async fn invoke(&self, request: InvokeRequest) -> Result<Uuid, InvokeError> {
        let app = self
            .repository
            .applications
            .get(request.app_id)
            .await?
            .filter(|a| !a.is_deleted())
            .ok_or(InvokeError::ApplicationNotFound(request.app_id))?;

        let version_id = match request.version_id {
            Some(id) => id,
            None => app.active_version.ok_or(InvokeError::NoActiveVersion(request.app_id))?,
        };

        let version = self
            .repository
            .versions
            .get(version_id)
            .await?
            .filter(|v| !v.is_deleted())
            .ok_or(InvokeError::VersionNotFound(version_id))?;

        let graph = construct_graph(&self.resolver, &version.configuration)?;
        validate(&graph, &self.resolver)?;

        let input_node = graph.input_node().expect("validate: exactly one input node");
        let expected = input_node.outport.as_str();
        let actual = value::builtin_kind(&request.input);
        if expected != ANY && expected != actual {
            return Err(InvokeError::ApplicationInputTypeMismatch {
                expected: expected.to_string(),
                actual: actual.to_string(),
            });
        }

        let interaction = Interaction::new(request.app_id, version_id, request.user.clone(), request.session_id.clone());
        let interaction_id = interaction.id;
        self.repository.interactions.create(interaction).await?;

        let ctx = Context {
            app_id: request.app_id.to_string(),
            version_id: version_id.to_string(),
            interaction_id: interaction_id.to_string(),
            user: request.user,
            session_id: request.session_id,
        };

        let repository = self.repository.clone();
        let trace = self.trace.clone();
        let input = request.input;

        tokio::spawn(async move {
            context::scope(ctx.clone(), run_and_persist(graph, input, ctx, repository, trace, interaction_id)).await;
        });

        Ok(interaction_id)
    }

    /// Re-reads the current state of an interaction.
    pub async fn poll(&self, interaction_id: Uuid) -> Result<Interaction, InvokeError> {
        self.repository
            .interactions
            .get(interaction_id)
            .await?
            .ok_or(InvokeError::InteractionNotFound(interaction_id))
    }

    /// Invokes a sub-application and blocks until its interaction completes
    /// or `timeout_secs` elapses, polling every `poll_interval_secs`. Used
    /// only by `crate::subapp`'s invocation blocks — a top-level caller
    /// should use `invoke`/`poll` directly rather than block on a whole run.
    pub(crate) async fn invoke_and_wait(
        &self,
        user: String,
        app_id: Uuid,
        input: Value,
        session_id: Option<String>,
        timeout_secs: u64,
        poll_interval_secs: u64,
    ) -> Result<Value, InvokeError> {
        let interaction_id = self.invoke(InvokeRequest { user, app_id, version_id: None, input, session_id }).await?;

        let mut waited_secs = 0u64;
        loop {
            let interaction = self.poll(interaction_id).await?;
            if let Some(error) = interaction.error {
                return Err(InvokeError::SubInteractionFailed(error));
            }
            if let Some(output) = interaction.output {
                return Ok(output);
            }
            if waited_secs >= timeout_secs {
                return Err(InvokeError::SubappTimeout { app_id, interaction_id, timeout_secs });
            }
            tokio::time::sleep(Duration::from_secs(poll_interval_secs)).await;
            waited_secs += poll_interval_secs;
        }
    }
}

/// Drives one graph run to completion and persists the outcome. Split out of
/// `invoke` so the spawned task is a single, clearly-bounded `async move`
/// block; `context::scope` wraps this whole function so the sub-application
/// memo and ambient context are visible for the run's entire lifetime.
///
/// The `on_node` callback (overwrite `Interaction.data` after every node) is
/// a *synchronous* `Scheduler` callback, so persistence is bridged through
/// an unbounded channel drained by a concurrently-awaited task rather than
/// called inline — `Scheduler::run_with_callback`'s callback cannot itself
/// be `async`.
async fn run_and_persist(
    graph: linguflow_core::Graph,
    input: Value,
    ctx: Context,
    repository: Repository,
    trace: Arc<dyn TraceHook>,
    interaction_id: Uuid,
) {
    trace.graph_start(&ctx, &input).await;

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<(String, Value, Value)>();
    let accumulated: Arc<parking_lot::Mutex<HashMap<String, Value>>> = Arc::new(parking_lot::Mutex::new(HashMap::new()));
    let accumulated_cb = accumulated.clone();

    let scheduler = Scheduler::new(&graph);
    let run = scheduler.run_with_callback(input, &ctx, move |node_id, value| {
        let mut map = accumulated_cb.lock();
        map.insert(node_id.to_string(), value.clone());
        let snapshot = Value::Object(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect());
        let _ = tx.send((node_id.to_string(), value.clone(), snapshot));
    });

    let drain_repository = repository.interactions.clone();
    let drain_trace = trace.clone();
    let drain_ctx = ctx.clone();
    let drain = tokio::spawn(async move {
        while let Some((node_id, value, snapshot)) = rx.recv().await {
            let _ = drain_repository.update_data(interaction_id, snapshot).await;
            drain_trace.node_end(&drain_ctx, &node_id, &value).await;
        }
    });

    let result = run.await;
    let _ = drain.await;

    match result {
        Ok(output) => {
            let _ = repository.interactions.complete_output(interaction_id, output.clone()).await;
            trace.graph_end(&ctx, &output).await;
        }
        Err(exc) => {
            let rendered = render_node_exception(&exc);
            let _ = repository.interactions.complete_error(interaction_id, rendered).await;
            trace.graph_error(&ctx, &exc.to_string()).await;
        }
    }
}
