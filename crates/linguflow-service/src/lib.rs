//! Repository facade, persistence and the Async Invoker for LinguFlow DAG
//! runs.
//!
//! `linguflow-core` is the pure, no-I/O engine (registry, constructor,
//! validator, scheduler). This crate is everything that surrounds one run:
//! [`config`] (environment-driven `ServiceConfig`), [`context`] (task-local
//! propagation of a run's `Context` plus its sub-application invocation
//! memo), [`db`]/[`repository`] (the `sqlx`-backed and in-memory
//! persistence of `Application`/`Version`/`Interaction`), [`error`]
//! (`InvokeError` and the `NodeException` → `RenderedError` renderer),
//! [`invoker`] (the [`invoker::AsyncInvoker`] itself), [`models`] (the three
//! persisted entities), [`subapp`] (the sub-application invocation blocks
//! the invoker registers), and [`trace`] (the Langfuse tracing seam).

pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod invoker;
pub mod models;
pub mod repository;
pub mod subapp;
pub mod trace;

pub use config::{ObservabilityKeys, ServiceConfig};
pub use error::InvokeError;
pub use invoker::{AsyncInvoker, InvokeRequest};
pub use models::{Application, Interaction, RenderedError, Version};
pub use repository::Repository;
pub use trace::{NoopTraceHook, TraceHook, TracingTraceHook};
