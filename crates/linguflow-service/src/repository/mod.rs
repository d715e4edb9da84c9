//! The Repository Facade: an opaque CRUD layer over
//! `Application`/`Version`/`Interaction`, fronting either an in-memory store
//! (test tooling) or a `sqlx`-backed SQLite database.

pub mod in_memory;
pub mod sqlite;

use async_trait::async_trait;
use uuid::Uuid;

use crate::db::error::DatabaseError;
use crate::models::{Application, Interaction, RenderedError, Version};

pub use in_memory::InMemoryRepository;
pub use sqlite::SqliteRepository;

pub type RepoResult<T> = Result<T, DatabaseError>;

/// CRUD over [`Application`].
#[async_trait]
pub trait ApplicationRepo: Send + Sync {
    async fn create(&self, app: Application) -> RepoResult<Application>;
    async fn get(&self, id: Uuid) -> RepoResult<Option<Application>>;
    async fn update(&self, app: Application) -> RepoResult<Application>;
    /// Sets `active_version`. The caller is responsible for verifying the
    /// version belongs to this application and is not soft-deleted —
    /// `active_version` is a foreign reference that must never point at a
    /// deleted version.
    async fn set_active_version(&self, id: Uuid, version_id: Uuid) -> RepoResult<Application>;
    async fn soft_delete(&self, id: Uuid) -> RepoResult<()>;
    async fn list_by_user(&self, user: &str) -> RepoResult<Vec<Application>>;
}

/// CRUD over [`Version`].
#[async_trait]
pub trait VersionRepo: Send + Sync {
    async fn create(&self, version: Version) -> RepoResult<Version>;
    async fn get(&self, id: Uuid) -> RepoResult<Option<Version>>;
    async fn list_by_app(&self, app_id: Uuid) -> RepoResult<Vec<Version>>;
    async fn soft_delete(&self, id: Uuid) -> RepoResult<()>;
}

/// CRUD over [`Interaction`]. `update_data` is called after every node
/// completion and overwrites the whole `data` map rather than merging
/// fields, since the scheduler always hands it the complete bindings
/// snapshot for the run so far.
#[async_trait]
pub trait InteractionRepo: Send + Sync {
    async fn create(&self, interaction: Interaction) -> RepoResult<Interaction>;
    async fn get(&self, id: Uuid) -> RepoResult<Option<Interaction>>;
    async fn update_data(&self, id: Uuid, data: serde_json::Value) -> RepoResult<()>;
    async fn complete_output(&self, id: Uuid, output: serde_json::Value) -> RepoResult<()>;
    async fn complete_error(&self, id: Uuid, error: RenderedError) -> RepoResult<()>;
}

/// The three repositories bundled together, the shape the Async Invoker
/// actually depends on. Cheap to clone — each field is an `Arc` over a
/// shared backing store, so a clone is just three reference-count bumps,
/// used to hand a copy into the background task `AsyncInvoker::invoke`
/// spawns.
#[derive(Clone)]
pub struct Repository {
    pub applications: std::sync::Arc<dyn ApplicationRepo>,
    pub versions: std::sync::Arc<dyn VersionRepo>,
    pub interactions: std::sync::Arc<dyn InteractionRepo>,
}

impl Repository {
    pub fn in_memory() -> Self {
        let store = std::sync::Arc::new(InMemoryRepository::new());
        Self { applications: store.clone(), versions: store.clone(), interactions: store }
    }

    pub fn sqlite(repo: std::sync::Arc<SqliteRepository>) -> Self {
        Self { applications: repo.clone(), versions: repo.clone(), interactions: repo }
    }
}
