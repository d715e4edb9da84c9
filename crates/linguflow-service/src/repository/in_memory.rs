//! An in-memory [`Repository`](super::Repository) backing, used by
//! integration tests and doctests rather than product code — the teacher's
//! `tests/common` fixture pattern, generalized into a reusable type instead
//! of a test-only helper.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::Value;
use uuid::Uuid;

use super::{ApplicationRepo, InteractionRepo, RepoResult, VersionRepo};
use crate::db::error::DatabaseError;
use crate::models::{Application, Interaction, RenderedError, Version};

#[derive(Default)]
struct Store {
    applications: HashMap<Uuid, Application>,
    versions: HashMap<Uuid, Version>,
    interactions: HashMap<Uuid, Interaction>,
}

/// A single struct implements all three repo traits over one lock, since the
/// entities are small and a run's invoker touches at most one row of each
/// per call — no need for three separate locks.
pub struct InMemoryRepository {
    store: Mutex<Store>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self { store: Mutex::new(Store::default()) }
    }
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ApplicationRepo for InMemoryRepository {
    async fn create(&self, app: Application) -> RepoResult<Application> {
        let mut store = self.store.lock();
        if store.applications.contains_key(&app.id) {
            return Err(DatabaseError::constraint(format!("application {} already exists", app.id)));
        }
        store.applications.insert(app.id, app.clone());
        Ok(app)
    }

    async fn get(&self, id: Uuid) -> RepoResult<Option<Application>> {
        Ok(self.store.lock().applications.get(&id).cloned())
    }

    async fn update(&self, app: Application) -> RepoResult<Application> {
        let mut store = self.store.lock();
        if !store.applications.contains_key(&app.id) {
            return Err(DatabaseError::not_found(format!("application {}", app.id)));
        }
        store.applications.insert(app.id, app.clone());
        Ok(app)
    }

    async fn set_active_version(&self, id: Uuid, version_id: Uuid) -> RepoResult<Application> {
        let mut store = self.store.lock();
        let app = store
            .applications
            .get_mut(&id)
            .ok_or_else(|| DatabaseError::not_found(format!("application {id}")))?;
        app.active_version = Some(version_id);
        app.updated_at = Utc::now();
        Ok(app.clone())
    }

    async fn soft_delete(&self, id: Uuid) -> RepoResult<()> {
        let mut store = self.store.lock();
        let app = store.applications.get_mut(&id).ok_or_else(|| DatabaseError::not_found(format!("application {id}")))?;
        app.deleted_at = Some(Utc::now());
        Ok(())
    }

    async fn list_by_user(&self, user: &str) -> RepoResult<Vec<Application>> {
        Ok(self
            .store
            .lock()
            .applications
            .values()
            .filter(|a| a.user == user && !a.is_deleted())
            .cloned()
            .collect())
    }
}

#[async_trait]
impl VersionRepo for InMemoryRepository {
    async fn create(&self, version: Version) -> RepoResult<Version> {
        let mut store = self.store.lock();
        if store.versions.contains_key(&version.id) {
            return Err(DatabaseError::constraint(format!("version {} already exists", version.id)));
        }
        store.versions.insert(version.id, version.clone());
        Ok(version)
    }

    async fn get(&self, id: Uuid) -> RepoResult<Option<Version>> {
        Ok(self.store.lock().versions.get(&id).cloned())
    }

    async fn list_by_app(&self, app_id: Uuid) -> RepoResult<Vec<Version>> {
        Ok(self.store.lock().versions.values().filter(|v| v.app_id == app_id && !v.is_deleted()).cloned().collect())
    }

    async fn soft_delete(&self, id: Uuid) -> RepoResult<()> {
        let mut store = self.store.lock();
        let version =
            store.versions.get_mut(&id).ok_or_else(|| DatabaseError::not_found(format!("version {id}")))?;
        version.deleted_at = Some(Utc::now());
        Ok(())
    }
}

#[async_trait]
impl InteractionRepo for InMemoryRepository {
    async fn create(&self, interaction: Interaction) -> RepoResult<Interaction> {
        let mut store = self.store.lock();
        if store.interactions.contains_key(&interaction.id) {
            return Err(DatabaseError::constraint(format!("interaction {} already exists", interaction.id)));
        }
        store.interactions.insert(interaction.id, interaction.clone());
        Ok(interaction)
    }

    async fn get(&self, id: Uuid) -> RepoResult<Option<Interaction>> {
        Ok(self.store.lock().interactions.get(&id).cloned())
    }

    async fn update_data(&self, id: Uuid, data: Value) -> RepoResult<()> {
        let mut store = self.store.lock();
        let interaction =
            store.interactions.get_mut(&id).ok_or_else(|| DatabaseError::not_found(format!("interaction {id}")))?;
        interaction.data = Some(data);
        interaction.updated_at = Utc::now();
        Ok(())
    }

    async fn complete_output(&self, id: Uuid, output: Value) -> RepoResult<()> {
        let mut store = self.store.lock();
        let interaction =
            store.interactions.get_mut(&id).ok_or_else(|| DatabaseError::not_found(format!("interaction {id}")))?;
        interaction.output = Some(output);
        interaction.updated_at = Utc::now();
        Ok(())
    }

    async fn complete_error(&self, id: Uuid, error: RenderedError) -> RepoResult<()> {
        let mut store = self.store.lock();
        let interaction =
            store.interactions.get_mut(&id).ok_or_else(|| DatabaseError::not_found(format!("interaction {id}")))?;
        interaction.error = Some(error);
        interaction.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_then_get_roundtrips() {
        let repo = InMemoryRepository::new();
        let app = Application::new("demo", "alice");
        let id = app.id;
        repo.create(app).await.unwrap();
        let fetched = repo.get(id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "demo");
    }

    #[tokio::test]
    async fn set_active_version_updates_application() {
        let repo = InMemoryRepository::new();
        let app = Application::new("demo", "alice");
        let id = app.id;
        repo.create(app).await.unwrap();
        let version_id = Uuid::new_v4();
        let updated = repo.set_active_version(id, version_id).await.unwrap();
        assert_eq!(updated.active_version, Some(version_id));
    }

    #[tokio::test]
    async fn interaction_data_is_overwritten_not_merged() {
        let repo = InMemoryRepository::new();
        let interaction = Interaction::new(Uuid::new_v4(), Uuid::new_v4(), "alice", None);
        let id = interaction.id;
        repo.create(interaction).await.unwrap();
        repo.update_data(id, serde_json::json!({"a": 1})).await.unwrap();
        repo.update_data(id, serde_json::json!({"b": 2})).await.unwrap();
        let fetched = repo.get(id).await.unwrap().unwrap();
        assert_eq!(fetched.data, Some(serde_json::json!({"b": 2})));
    }

    #[tokio::test]
    async fn get_missing_returns_none_not_error() {
        let repo = InMemoryRepository::new();
        assert!(repo.get(Uuid::new_v4()).await.unwrap().is_none());
    }
}
