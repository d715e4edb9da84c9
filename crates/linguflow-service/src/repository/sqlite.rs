//! `sqlx`-backed SQLite implementation of the repository traits, grounded on
//! `orchestrator::db::connection::DatabaseConnection` and the
//! `orchestrator::db::repositories::*_repo` row-mapping style: a plain
//! `FromRow` struct mirrors the TEXT-only SQLite schema, converted to/from
//! the domain model at the repository boundary.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

use super::{ApplicationRepo, InteractionRepo, RepoResult, VersionRepo};
use crate::db::connection::DatabaseConnection;
use crate::db::error::DatabaseError;
use crate::models::{Application, Interaction, RenderedError, Version};

/// Owns the pool and runs the schema migration (`migrations/0001_init.sql`)
/// on construction; implements all three repo traits over the same
/// connection, matching the single-`DatabaseConnection` style of the
/// teacher's `*_repo.rs` modules, which each take `&DatabasePool` rather than
/// holding their own.
pub struct SqliteRepository {
    conn: DatabaseConnection,
}

impl SqliteRepository {
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let conn = DatabaseConnection::new(database_url).await?;
        conn.run_migrations().await.map_err(sqlx::Error::from)?;
        Ok(Self { conn })
    }
}

fn ts(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn parse_ts(raw: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(raw).map(|dt| dt.with_timezone(&Utc)).map_err(|e| DatabaseError::type_error(e.to_string()))
}

fn parse_uuid(raw: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(raw).map_err(|e| DatabaseError::type_error(e.to_string()))
}

// ---------------------------------------------------------------------
// Applications
// ---------------------------------------------------------------------

#[derive(FromRow)]
struct ApplicationRow {
    id: String,
    name: String,
    user: String,
    active_version: Option<String>,
    created_at: String,
    updated_at: String,
    deleted_at: Option<String>,
}

impl ApplicationRow {
    fn into_domain(self) -> RepoResult<Application> {
        Ok(Application {
            id: parse_uuid(&self.id)?,
            name: self.name,
            user: self.user,
            active_version: self.active_version.as_deref().map(parse_uuid).transpose()?,
            created_at: parse_ts(&self.created_at)?,
            updated_at: parse_ts(&self.updated_at)?,
            deleted_at: self.deleted_at.as_deref().map(parse_ts).transpose()?,
        })
    }
}

#[async_trait]
impl ApplicationRepo for SqliteRepository {
    async fn create(&self, app: Application) -> RepoResult<Application> {
        sqlx::query(
            "INSERT INTO applications (id, name, user, active_version, created_at, updated_at, deleted_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(app.id.to_string())
        .bind(&app.name)
        .bind(&app.user)
        .bind(app.active_version.map(|v| v.to_string()))
        .bind(ts(app.created_at))
        .bind(ts(app.updated_at))
        .bind(app.deleted_at.map(ts))
        .execute(self.conn.pool())
        .await?;
        Ok(app)
    }

    async fn get(&self, id: Uuid) -> RepoResult<Option<Application>> {
        let row = sqlx::query_as::<_, ApplicationRow>("SELECT * FROM applications WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(self.conn.pool())
            .await?;
        row.map(ApplicationRow::into_domain).transpose()
    }

    async fn update(&self, app: Application) -> RepoResult<Application> {
        let result = sqlx::query(
            "UPDATE applications SET name = ?, user = ?, active_version = ?, updated_at = ?, deleted_at = ?
             WHERE id = ?",
        )
        .bind(&app.name)
        .bind(&app.user)
        .bind(app.active_version.map(|v| v.to_string()))
        .bind(ts(app.updated_at))
        .bind(app.deleted_at.map(ts))
        .bind(app.id.to_string())
        .execute(self.conn.pool())
        .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found(format!("application {}", app.id)));
        }
        Ok(app)
    }

    async fn set_active_version(&self, id: Uuid, version_id: Uuid) -> RepoResult<Application> {
        let now = Utc::now();
        let result = sqlx::query("UPDATE applications SET active_version = ?, updated_at = ? WHERE id = ?")
            .bind(version_id.to_string())
            .bind(ts(now))
            .bind(id.to_string())
            .execute(self.conn.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found(format!("application {id}")));
        }
        self.get(id).await?.ok_or_else(|| DatabaseError::not_found(format!("application {id}")))
    }

    async fn soft_delete(&self, id: Uuid) -> RepoResult<()> {
        let result = sqlx::query("UPDATE applications SET deleted_at = ? WHERE id = ?")
            .bind(ts(Utc::now()))
            .bind(id.to_string())
            .execute(self.conn.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found(format!("application {id}")));
        }
        Ok(())
    }

    async fn list_by_user(&self, user: &str) -> RepoResult<Vec<Application>> {
        let rows = sqlx::query_as::<_, ApplicationRow>(
            "SELECT * FROM applications WHERE user = ? AND deleted_at IS NULL ORDER BY created_at DESC",
        )
        .bind(user)
        .fetch_all(self.conn.pool())
        .await?;
        rows.into_iter().map(ApplicationRow::into_domain).collect()
    }
}

// ---------------------------------------------------------------------
// Versions
// ---------------------------------------------------------------------

#[derive(FromRow)]
struct VersionRow {
    id: String,
    app_id: String,
    name: String,
    user: String,
    parent_id: Option<String>,
    meta: String,
    configuration: String,
    created_at: String,
    updated_at: String,
    deleted_at: Option<String>,
}

impl VersionRow {
    fn into_domain(self) -> RepoResult<Version> {
        Ok(Version {
            id: parse_uuid(&self.id)?,
            app_id: parse_uuid(&self.app_id)?,
            name: self.name,
            user: self.user,
            parent_id: self.parent_id.as_deref().map(parse_uuid).transpose()?,
            meta: serde_json::from_str(&self.meta).map_err(|e| DatabaseError::type_error(e.to_string()))?,
            configuration: serde_json::from_str(&self.configuration)
                .map_err(|e| DatabaseError::type_error(e.to_string()))?,
            created_at: parse_ts(&self.created_at)?,
            updated_at: parse_ts(&self.updated_at)?,
            deleted_at: self.deleted_at.as_deref().map(parse_ts).transpose()?,
        })
    }
}

#[async_trait]
impl VersionRepo for SqliteRepository {
    async fn create(&self, version: Version) -> RepoResult<Version> {
        let meta = serde_json::to_string(&version.meta).map_err(|e| DatabaseError::type_error(e.to_string()))?;
        let configuration =
            serde_json::to_string(&version.configuration).map_err(|e| DatabaseError::type_error(e.to_string()))?;
        sqlx::query(
            "INSERT INTO versions (id, app_id, name, user, parent_id, meta, configuration, created_at, updated_at, deleted_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(version.id.to_string())
        .bind(version.app_id.to_string())
        .bind(&version.name)
        .bind(&version.user)
        .bind(version.parent_id.map(|v| v.to_string()))
        .bind(meta)
        .bind(configuration)
        .bind(ts(version.created_at))
        .bind(ts(version.updated_at))
        .bind(version.deleted_at.map(ts))
        .execute(self.conn.pool())
        .await?;
        Ok(version)
    }

    async fn get(&self, id: Uuid) -> RepoResult<Option<Version>> {
        let row = sqlx::query_as::<_, VersionRow>("SELECT * FROM versions WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(self.conn.pool())
            .await?;
        row.map(VersionRow::into_domain).transpose()
    }

    async fn list_by_app(&self, app_id: Uuid) -> RepoResult<Vec<Version>> {
        let rows = sqlx::query_as::<_, VersionRow>(
            "SELECT * FROM versions WHERE app_id = ? AND deleted_at IS NULL ORDER BY created_at DESC",
        )
        .bind(app_id.to_string())
        .fetch_all(self.conn.pool())
        .await?;
        rows.into_iter().map(VersionRow::into_domain).collect()
    }

    async fn soft_delete(&self, id: Uuid) -> RepoResult<()> {
        let result = sqlx::query("UPDATE versions SET deleted_at = ? WHERE id = ?")
            .bind(ts(Utc::now()))
            .bind(id.to_string())
            .execute(self.conn.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found(format!("version {id}")));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------
// Interactions
// ---------------------------------------------------------------------

#[derive(FromRow)]
struct InteractionRow {
    id: String,
    app_id: String,
    version_id: String,
    user: String,
    session_id: Option<String>,
    created_at: String,
    updated_at: String,
    output: Option<String>,
    data: Option<String>,
    error: Option<String>,
}

impl InteractionRow {
    fn into_domain(self) -> RepoResult<Interaction> {
        Ok(Interaction {
            id: parse_uuid(&self.id)?,
            app_id: parse_uuid(&self.app_id)?,
            version_id: parse_uuid(&self.version_id)?,
            user: self.user,
            session_id: self.session_id,
            created_at: parse_ts(&self.created_at)?,
            updated_at: parse_ts(&self.updated_at)?,
            output: self.output.as_deref().map(parse_json).transpose()?,
            data: self.data.as_deref().map(parse_json).transpose()?,
            error: self.error.as_deref().map(parse_json).transpose()?,
        })
    }
}

fn parse_json<T: serde::de::DeserializeOwned>(raw: &str) -> RepoResult<T> {
    serde_json::from_str(raw).map_err(|e| DatabaseError::type_error(e.to_string()))
}

fn to_json<T: serde::Serialize>(value: &T) -> RepoResult<String> {
    serde_json::to_string(value).map_err(|e| DatabaseError::type_error(e.to_string()))
}

#[async_trait]
impl InteractionRepo for SqliteRepository {
    async fn create(&self, interaction: Interaction) -> RepoResult<Interaction> {
        sqlx::query(
            "INSERT INTO interactions (id, app_id, version_id, user, session_id, created_at, updated_at, output, data, error)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(interaction.id.to_string())
        .bind(interaction.app_id.to_string())
        .bind(interaction.version_id.to_string())
        .bind(&interaction.user)
        .bind(&interaction.session_id)
        .bind(ts(interaction.created_at))
        .bind(ts(interaction.updated_at))
        .bind(interaction.output.as_ref().map(to_json).transpose()?)
        .bind(interaction.data.as_ref().map(to_json).transpose()?)
        .bind(interaction.error.as_ref().map(to_json).transpose()?)
        .execute(self.conn.pool())
        .await?;
        Ok(interaction)
    }

    async fn get(&self, id: Uuid) -> RepoResult<Option<Interaction>> {
        let row = sqlx::query_as::<_, InteractionRow>("SELECT * FROM interactions WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(self.conn.pool())
            .await?;
        row.map(InteractionRow::into_domain).transpose()
    }

    async fn update_data(&self, id: Uuid, data: Value) -> RepoResult<()> {
        let encoded = to_json(&data)?;
        let result = sqlx::query("UPDATE interactions SET data = ?, updated_at = ? WHERE id = ?")
            .bind(encoded)
            .bind(ts(Utc::now()))
            .bind(id.to_string())
            .execute(self.conn.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found(format!("interaction {id}")));
        }
        Ok(())
    }

    async fn complete_output(&self, id: Uuid, output: Value) -> RepoResult<()> {
        let encoded = to_json(&output)?;
        let result = sqlx::query("UPDATE interactions SET output = ?, updated_at = ? WHERE id = ?")
            .bind(encoded)
            .bind(ts(Utc::now()))
            .bind(id.to_string())
            .execute(self.conn.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found(format!("interaction {id}")));
        }
        Ok(())
    }

    async fn complete_error(&self, id: Uuid, error: RenderedError) -> RepoResult<()> {
        let encoded = to_json(&error)?;
        let result = sqlx::query("UPDATE interactions SET error = ?, updated_at = ? WHERE id = ?")
            .bind(encoded)
            .bind(ts(Utc::now()))
            .bind(id.to_string())
            .execute(self.conn.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found(format!("interaction {id}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linguflow_core::graph::DagConfiguration;

    async fn repo() -> SqliteRepository {
        SqliteRepository::connect("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn create_then_get_application_roundtrips() {
        let repo = repo().await;
        let app = Application::new("demo", "alice");
        let id = app.id;
        repo.create(app).await.unwrap();
        let fetched = ApplicationRepo::get(&repo, id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "demo");
        assert!(fetched.active_version.is_none());
    }

    #[tokio::test]
    async fn create_version_persists_dag_configuration() {
        let repo = repo().await;
        let app = Application::new("demo", "alice");
        let app_id = app.id;
        repo.create(app).await.unwrap();

        let config: DagConfiguration = serde_json::from_value(serde_json::json!({"nodes": [], "edges": []})).unwrap();
        let version = Version::new(app_id, "v1", "alice", config);
        let version_id = version.id;
        VersionRepo::create(&repo, version).await.unwrap();

        let fetched = VersionRepo::get(&repo, version_id).await.unwrap().unwrap();
        assert_eq!(fetched.app_id, app_id);
        assert!(fetched.configuration.nodes.is_empty());
    }

    #[tokio::test]
    async fn interaction_data_overwrites_wholesale() {
        let repo = repo().await;
        let interaction = Interaction::new(Uuid::new_v4(), Uuid::new_v4(), "alice", None);
        let id = interaction.id;
        InteractionRepo::create(&repo, interaction).await.unwrap();

        repo.update_data(id, serde_json::json!({"a": 1})).await.unwrap();
        repo.update_data(id, serde_json::json!({"b": 2})).await.unwrap();

        let fetched = InteractionRepo::get(&repo, id).await.unwrap().unwrap();
        assert_eq!(fetched.data, Some(serde_json::json!({"b": 2})));
    }

    #[tokio::test]
    async fn set_active_version_is_visible_on_get() {
        let repo = repo().await;
        let app = Application::new("demo", "alice");
        let app_id = app.id;
        repo.create(app).await.unwrap();

        let version_id = Uuid::new_v4();
        let updated = repo.set_active_version(app_id, version_id).await.unwrap();
        assert_eq!(updated.active_version, Some(version_id));
    }
}
