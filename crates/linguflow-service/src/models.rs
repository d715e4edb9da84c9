//! `Application`/`Version`/`Interaction`, the three tables the Repository
//! Facade fronts. Grounded on `original_source/model.py`'s SQLAlchemy
//! models; all timestamps use `chrono::DateTime<Utc>` rather than the
//! original's naive `datetime.utcnow()`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use linguflow_core::graph::DagConfiguration;

/// A user-owned container for a tree of [`Version`]s, one of which may be
/// marked active.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    pub id: Uuid,
    pub name: String,
    pub user: String,
    pub active_version: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Application {
    pub fn new(name: impl Into<String>, user: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            user: user.into(),
            active_version: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// An immutable DAG definition, one node in an Application's version tree:
/// `parent_id` forms the tree, and no cycles are allowed there.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Version {
    pub id: Uuid,
    pub app_id: Uuid,
    pub name: String,
    pub user: String,
    pub parent_id: Option<Uuid>,
    pub meta: Value,
    pub configuration: DagConfiguration,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Version {
    pub fn new(app_id: Uuid, name: impl Into<String>, user: impl Into<String>, configuration: DagConfiguration) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            app_id,
            name: name.into(),
            user: user.into(),
            parent_id: None,
            meta: Value::Null,
            configuration,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// A rendered error attached to a failed [`Interaction`]: a `{status_code,
/// content}` shape produced by [`crate::error::render_node_exception`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderedError {
    pub status_code: u16,
    pub content: Value,
}

/// A single execution record of a [`Version`]. `data` is overwritten
/// wholesale after every node completion, never field-merged; `output` is
/// set once on success, `error` once on failure; exactly one of
/// `output`/`error` is set once the run is complete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    pub id: Uuid,
    pub app_id: Uuid,
    pub version_id: Uuid,
    pub user: String,
    pub session_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub output: Option<Value>,
    pub data: Option<Value>,
    pub error: Option<RenderedError>,
}

impl Interaction {
    pub fn new(app_id: Uuid, version_id: Uuid, user: impl Into<String>, session_id: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            app_id,
            version_id,
            user: user.into(),
            session_id,
            created_at: now,
            updated_at: now,
            output: None,
            data: None,
            error: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.output.is_some() || self.error.is_some()
    }
}
