//! Sub-application invocation blocks.
//!
//! Ported from `original_source/blocks/invoke.py`'s `Invoke`/
//! `InvokeWithList`/`InvokeWithDict` block classes: each names another
//! `Application` by id and recursively runs it via
//! [`AsyncInvoker::invoke_and_wait`], blocking the current node until the
//! sub-interaction completes or times out. Calls are memoized per run by
//! `(app_id, canonicalized input)` through [`crate::context::current_memo`]
//! so that two nodes invoking the same sub-application with the same input
//! during one run trigger only a single background interaction — this
//! replaces the original's `HashableDict`/`HashableList`-keyed
//! `functools.lru_cache` with a run-scoped cache (a process-wide cache would
//! leak stale results across unrelated runs).
//!
//! Registered into an [`AsyncInvoker`]'s own extended registry
//! ([`AsyncInvoker::new`]) rather than the process-wide one, since these
//! blocks close over a [`Weak<AsyncInvoker>`] — a dependency
//! `linguflow-core` cannot take without inverting the crate graph.

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use linguflow_core::block::{Bindings, Block, Context};
use linguflow_core::error::BlockError;
use linguflow_core::instance::{ConstructArgs, Instance, SlotArg};
use linguflow_core::registry::RegistryBuilder;
use linguflow_core::types::{Category, PortDescriptor, SlotDescriptor, TypeDescriptor, ANY};
use linguflow_core::value;

use crate::context;
use crate::error::{InvokeError, SUB_INTERACTION_SENTINEL};
use crate::invoker::AsyncInvoker;

fn slot_app_id(args: &ConstructArgs) -> Result<Uuid, String> {
    let raw = args
        .get("app_id")
        .and_then(SlotArg::as_value)
        .and_then(Value::as_str)
        .ok_or("missing or non-text slot app_id")?;
    Uuid::parse_str(raw).map_err(|e| format!("slot app_id is not a valid uuid: {e}"))
}

fn slot_timeout_secs(args: &ConstructArgs, default_secs: u64) -> u64 {
    args.get("timeout").and_then(SlotArg::as_value).and_then(Value::as_u64).unwrap_or(default_secs)
}

/// Invokes `app_id` with the bound `input` port, memoized per run. Three
/// registered names share this one implementation, differing only in the
/// declared type of their `input` inport: `TextInvoke`, `ListInvoke`,
/// `DictInvoke` — the original's `Invoke`/`InvokeWithList`/`InvokeWithDict`.
#[derive(Debug)]
struct InvokeBlock {
    invoker: Weak<AsyncInvoker>,
    app_id: Uuid,
    timeout_secs: u64,
    poll_interval_secs: u64,
}

#[async_trait]
impl Block for InvokeBlock {
    async fn invoke(&self, bindings: Bindings, ctx: &Context) -> Result<Value, BlockError> {
        let input = bindings.get("input").cloned().unwrap_or(Value::Null);
        let key = format!("{}:{}", self.app_id, value::canonicalize(&input));

        let memo = context::current_memo();
        if let Some(cached) = memo.lock().get(&key).cloned() {
            return Ok(cached);
        }

        let invoker = self.invoker.upgrade().ok_or_else(|| BlockError::new("owning invoker has been dropped"))?;

        let result = invoker
            .invoke_and_wait(
                ctx.user.clone(),
                self.app_id,
                input,
                ctx.session_id.clone(),
                self.timeout_secs,
                self.poll_interval_secs,
            )
            .await;

        match result {
            Ok(output) => {
                memo.lock().insert(key, output.clone());
                Ok(output)
            }
            Err(InvokeError::SubInteractionFailed(rendered)) => {
                let payload = serde_json::to_string(&rendered).expect("RenderedError always serializes");
                Err(BlockError::new(format!("{SUB_INTERACTION_SENTINEL}{payload}")))
            }
            Err(err @ InvokeError::SubappTimeout { .. }) => Err(BlockError::timeout(err.to_string())),
            Err(err @ InvokeError::Repository(_)) => Err(BlockError::database(err.to_string())),
            Err(err) => Err(BlockError::new(err.to_string())),
        }
    }
}

/// Registers the three sub-application invocation blocks into `builder`,
/// each closing over `invoker` (to recursively invoke) and the service's
/// configured timeout/poll-interval defaults.
pub fn install(builder: &mut RegistryBuilder, invoker: Weak<AsyncInvoker>, default_timeout_secs: u64, poll_interval_secs: u64) {
    register_variant(builder, "TextInvoke", "text", invoker.clone(), default_timeout_secs, poll_interval_secs);
    register_variant(builder, "ListInvoke", "list", invoker.clone(), default_timeout_secs, poll_interval_secs);
    register_variant(builder, "DictInvoke", "dict", invoker, default_timeout_secs, poll_interval_secs);
}

fn register_variant(
    builder: &mut RegistryBuilder,
    name: &str,
    input_type: &str,
    invoker: Weak<AsyncInvoker>,
    default_timeout_secs: u64,
    poll_interval_secs: u64,
) {
    builder.register(
        TypeDescriptor {
            name: name.to_string(),
            alias: name.to_string(),
            category: Category::Block,
            dir: Some("invoke".into()),
            impl_tag: format!("subapp::{name}"),
            abstract_: false,
            implements: Vec::new(),
            // The sub-application's declared return type is never known
            // statically, unlike the original's `-> str` annotation — a
            // sub-app can return any JSON value as its output.
            displayable: true,
            slots: vec![
                SlotDescriptor::required("app_id", "text"),
                SlotDescriptor::with_default("timeout", "int", serde_json::json!(default_timeout_secs)),
            ],
            inports: vec![PortDescriptor::required("input", input_type)],
            outport: Some(ANY.to_string()),
        },
        Arc::new(move |args: ConstructArgs| {
            let app_id = slot_app_id(&args)?;
            let timeout_secs = slot_timeout_secs(&args, default_timeout_secs);
            Ok(Instance::Block(Arc::new(InvokeBlock {
                invoker: invoker.clone(),
                app_id,
                timeout_secs,
                poll_interval_secs,
            })))
        }),
    );
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap as StdHashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use linguflow_core::graph::{DagConfiguration, EdgeSpec, NodeSpec};
    use serde_json::json;

    use super::*;
    use crate::config::ServiceConfig;
    use crate::models::{Application, Interaction, RenderedError, Version};
    use crate::repository::{ApplicationRepo, InMemoryRepository, InteractionRepo, RepoResult, Repository, VersionRepo};

    fn passthrough_configuration() -> DagConfiguration {
        DagConfiguration {
            nodes: vec![
                NodeSpec { id: "in".into(), name: "TextInput".into(), alias: None, slots: StdHashMap::new() },
                NodeSpec { id: "out".into(), name: "Output".into(), alias: None, slots: StdHashMap::new() },
            ],
            edges: vec![EdgeSpec {
                src_block: "in".into(),
                dst_block: "out".into(),
                dst_port: Some("input".into()),
                alias: None,
                case: None,
            }],
        }
    }

    /// Wraps an [`InMemoryRepository`]'s [`InteractionRepo`] to count
    /// `create` calls, so the test can assert how many background
    /// sub-interactions were actually started, not just observe the final
    /// memoized value (which two independently-broken implementations could
    /// both produce correctly by accident).
    struct CountingInteractions {
        inner: Arc<InMemoryRepository>,
        creates: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl InteractionRepo for CountingInteractions {
        async fn create(&self, interaction: Interaction) -> RepoResult<Interaction> {
            self.creates.fetch_add(1, Ordering::SeqCst);
            self.inner.create(interaction).await
        }
        async fn get(&self, id: Uuid) -> RepoResult<Option<Interaction>> {
            self.inner.get(id).await
        }
        async fn update_data(&self, id: Uuid, data: Value) -> RepoResult<()> {
            self.inner.update_data(id, data).await
        }
        async fn complete_output(&self, id: Uuid, output: Value) -> RepoResult<()> {
            self.inner.complete_output(id, output).await
        }
        async fn complete_error(&self, id: Uuid, error: RenderedError) -> RepoResult<()> {
            self.inner.complete_error(id, error).await
        }
    }

    #[tokio::test]
    async fn identical_inputs_to_the_same_sub_application_invoke_only_once() {
        let store = Arc::new(InMemoryRepository::new());
        let creates = Arc::new(AtomicUsize::new(0));
        let repository = Repository {
            applications: store.clone(),
            versions: store.clone(),
            interactions: Arc::new(CountingInteractions { inner: store.clone(), creates: creates.clone() }),
        };

        let invoker = AsyncInvoker::with_noop_trace(repository.clone(), ServiceConfig::test_config());

        let mut sub_app = Application::new("sub", "alice");
        let sub_version = Version::new(sub_app.id, "v1", "alice", passthrough_configuration());
        sub_app.active_version = Some(sub_version.id);
        let sub_app_id = sub_app.id;
        repository.applications.create(sub_app).await.unwrap();
        repository.versions.create(sub_version).await.unwrap();

        let block = InvokeBlock { invoker: Arc::downgrade(&invoker), app_id: sub_app_id, timeout_secs: 5, poll_interval_secs: 1 };

        let ctx = Context::test_context();
        let mut first_bindings = Bindings::new();
        first_bindings.insert("input".to_string(), json!("hello"));

        let first = context::scope(ctx.clone(), async {
            let first = block.invoke(first_bindings.clone(), &ctx).await.unwrap();
            let second = block.invoke(first_bindings, &ctx).await.unwrap();
            (first, second)
        })
        .await;

        assert_eq!(first.0, json!("hello"));
        assert_eq!(first.1, json!("hello"));
        assert_eq!(creates.load(Ordering::SeqCst), 1, "identical input must trigger exactly one sub-interaction");
    }

    #[tokio::test]
    async fn mismatched_inputs_trigger_two_independent_invocations() {
        let store = Arc::new(InMemoryRepository::new());
        let creates = Arc::new(AtomicUsize::new(0));
        let repository = Repository {
            applications: store.clone(),
            versions: store.clone(),
            interactions: Arc::new(CountingInteractions { inner: store.clone(), creates: creates.clone() }),
        };

        let invoker = AsyncInvoker::with_noop_trace(repository.clone(), ServiceConfig::test_config());

        let mut sub_app = Application::new("sub", "alice");
        let sub_version = Version::new(sub_app.id, "v1", "alice", passthrough_configuration());
        sub_app.active_version = Some(sub_version.id);
        let sub_app_id = sub_app.id;
        repository.applications.create(sub_app).await.unwrap();
        repository.versions.create(sub_version).await.unwrap();

        let block = InvokeBlock { invoker: Arc::downgrade(&invoker), app_id: sub_app_id, timeout_secs: 5, poll_interval_secs: 1 };

        let ctx = Context::test_context();
        let mut a = Bindings::new();
        a.insert("input".to_string(), json!("hello"));
        let mut b = Bindings::new();
        b.insert("input".to_string(), json!("world"));

        context::scope(ctx.clone(), async {
            block.invoke(a, &ctx).await.unwrap();
            block.invoke(b, &ctx).await.unwrap();
        })
        .await;

        assert_eq!(creates.load(Ordering::SeqCst), 2);
    }
}
