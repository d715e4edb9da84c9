//! Invoker-level error kinds and the rendering logic that turns a
//! [`linguflow_core::error::NodeException`] into the
//! [`crate::models::RenderedError`] persisted onto an Interaction row.
//!
//! Grounded on `orchestrator`'s HTTP-status-per-error-kind tables (its
//! `api` layer mapped domain errors to status codes the same way); here the
//! mapping target is a persisted `RenderedError` rather than an HTTP
//! response, since binding to HTTP is out of scope for this crate.

use thiserror::Error;
use uuid::Uuid;

use linguflow_core::error::{BlockError, ErrorKind, GraphCheckError, NodeConstructError, NodeException};

use crate::models::RenderedError;

/// Pre-flight failures raised by [`crate::invoker::AsyncInvoker::invoke`]
/// before a background task is ever spawned.
#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("application {0} not found")]
    ApplicationNotFound(Uuid),

    #[error("application {0} has no active version")]
    NoActiveVersion(Uuid),

    #[error("version {0} not found")]
    VersionNotFound(Uuid),

    #[error("interaction {0} not found")]
    InteractionNotFound(Uuid),

    #[error("input type mismatch: expected {expected}, got {actual}")]
    ApplicationInputTypeMismatch { expected: String, actual: String },

    #[error(transparent)]
    Construct(#[from] NodeConstructError),

    #[error(transparent)]
    Check(#[from] GraphCheckError),

    #[error(transparent)]
    Repository(#[from] crate::db::error::DatabaseError),

    /// A sub-application invocation polled past its timeout without the
    /// inner interaction completing.
    #[error("sub-application {app_id} interaction {interaction_id} timed out after {timeout_secs}s")]
    SubappTimeout { app_id: Uuid, interaction_id: Uuid, timeout_secs: u64 },

    /// A sub-application's interaction itself finished with an error. Carried
    /// verbatim rather than classified — see [`SUB_INTERACTION_SENTINEL`].
    #[error("sub-application interaction failed: {0:?}")]
    SubInteractionFailed(RenderedError),
}

impl InvokeError {
    /// The (status, kind) pair a synchronous HTTP layer would surface. Not
    /// used by the invoker itself — provided for the binding layer, which
    /// this crate doesn't implement.
    pub fn status_and_kind(&self) -> (u16, &'static str) {
        match self {
            InvokeError::ApplicationNotFound(_)
            | InvokeError::NoActiveVersion(_)
            | InvokeError::VersionNotFound(_)
            | InvokeError::InteractionNotFound(_) => (404, "not_found"),
            InvokeError::ApplicationInputTypeMismatch { .. } => (400, "application_input_type_mismatch"),
            InvokeError::Construct(_) => (400, "node_construct_error"),
            InvokeError::Check(_) => (400, "bad_graph"),
            InvokeError::Repository(_) => (500, "db_query_error"),
            InvokeError::SubappTimeout { .. } => (500, "timeout"),
            InvokeError::SubInteractionFailed(_) => (400, "interaction_error"),
        }
    }
}

/// A sub-application invocation block (`crate::subapp`) encodes a failed
/// inner interaction as a [`linguflow_core::error::BlockError`] whose
/// message carries this prefix followed by the inner [`RenderedError`] as
/// JSON, so [`render_node_exception`] can re-render it verbatim instead of
/// running it back through [`classify`]. `BlockError`'s `Display` is the
/// plain message, so this sentinel round-trips through
/// `NodeException::source.to_string()` untouched.
pub const SUB_INTERACTION_SENTINEL: &str = "__linguflow_sub_interaction__:";

/// Renders a [`NodeException`] surfaced from a graph run into the
/// `{status_code, content}` shape persisted onto an Interaction's `error`
/// field. A sub-application interaction failure is detected via
/// [`SUB_INTERACTION_SENTINEL`] and re-rendered verbatim; everything else is
/// classified by downcasting the boxed cause to [`BlockError`] and reading
/// the [`ErrorKind`] its raiser already attached, rather than guessing from
/// the rendered message.
pub fn render_node_exception(exc: &NodeException) -> RenderedError {
    let message = exc.source.to_string();
    if let Some(json) = message.strip_prefix(SUB_INTERACTION_SENTINEL) {
        if let Ok(rendered) = serde_json::from_str::<RenderedError>(json) {
            return rendered;
        }
    }
    let (status_code, kind) = classify(exc.source.as_ref());
    RenderedError {
        status_code,
        content: serde_json::json!({
            "kind": kind,
            "node_id": exc.node_id,
            "message": message,
        }),
    }
}

fn classify(source: &(dyn std::error::Error + Send + Sync)) -> (u16, &'static str) {
    match source.downcast_ref::<BlockError>().map(|e| e.kind) {
        Some(ErrorKind::Llm) => (400, "llm_invalid_request"),
        Some(ErrorKind::Timeout) => (500, "timeout"),
        Some(ErrorKind::Database) => (400, "db_query_error"),
        Some(ErrorKind::Unknown) | None => (500, "unknown"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exception(error: BlockError) -> NodeException {
        NodeException::new("node-1", error)
    }

    #[test]
    fn classifies_llm_errors_as_bad_request() {
        let rendered = render_node_exception(&exception(BlockError::llm("provider rejected the prompt")));
        assert_eq!(rendered.status_code, 400);
        assert_eq!(rendered.content["kind"], "llm_invalid_request");
    }

    #[test]
    fn classifies_timeouts_as_server_error() {
        let rendered = render_node_exception(&exception(BlockError::timeout("sub-application call timed out")));
        assert_eq!(rendered.status_code, 500);
        assert_eq!(rendered.content["kind"], "timeout");
    }

    #[test]
    fn classifies_database_errors_as_bad_request() {
        let rendered = render_node_exception(&exception(BlockError::database("connection refused")));
        assert_eq!(rendered.status_code, 400);
        assert_eq!(rendered.content["kind"], "db_query_error");
    }

    #[test]
    fn message_content_alone_does_not_drive_classification() {
        // A plain domain error whose text happens to mention "timeout" or
        // "llm" must not be misclassified — only the attached ErrorKind does.
        let rendered = render_node_exception(&exception(BlockError::new("read timeout config was invalid")));
        assert_eq!(rendered.status_code, 500);
        assert_eq!(rendered.content["kind"], "unknown");
    }

    #[test]
    fn sub_interaction_failures_are_rendered_verbatim() {
        let inner = RenderedError { status_code: 418, content: serde_json::json!({"kind": "llm_invalid_request"}) };
        let message = format!("{}{}", SUB_INTERACTION_SENTINEL, serde_json::to_string(&inner).unwrap());
        let rendered = render_node_exception(&exception(BlockError::new(message)));
        assert_eq!(rendered.status_code, 418);
        assert_eq!(rendered.content["kind"], "llm_invalid_request");
    }

    #[test]
    fn falls_back_to_unknown_with_node_id() {
        let rendered = render_node_exception(&exception(BlockError::new("division by zero")));
        assert_eq!(rendered.status_code, 500);
        assert_eq!(rendered.content["kind"], "unknown");
        assert_eq!(rendered.content["node_id"], "node-1");
    }
}
