use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::StoreError;
use crate::projects::policy::Scope;
use crate::projects::repo_types::{Project, ProjectChanges};

#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Every project, newest first.
    async fn list(&self) -> anyhow::Result<Vec<Project>>;

    async fn find(&self, id: Uuid, scope: Scope) -> anyhow::Result<Option<Project>>;

    async fn insert(&self, project: &Project) -> Result<Project, StoreError>;

    /// Applies `changes` to the owner's project in a single statement; columns
    /// not named in `changes` keep whatever is stored at that moment.
    /// `None` when no project with that id belongs to `owner_id`.
    async fn update(
        &self,
        id: Uuid,
        owner_id: Uuid,
        changes: &ProjectChanges,
        now: OffsetDateTime,
    ) -> anyhow::Result<Option<Project>>;

    /// `false` when no project with that id belongs to `owner_id`.
    async fn delete(&self, id: Uuid, owner_id: Uuid) -> anyhow::Result<bool>;
}

#[derive(Clone)]
pub struct PgProjectStore {
    db: PgPool,
}

impl PgProjectStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

const COLUMNS: &str = "id, owner_id, name, description, images, github_url, linkedin_url, \
                       demo_url, created_at, updated_at";

#[async_trait]
impl ProjectStore for PgProjectStore {
    async fn list(&self) -> anyhow::Result<Vec<Project>> {
        let rows = sqlx::query_as::<_, Project>(&format!(
            "SELECT {COLUMNS} FROM projects ORDER BY created_at DESC, id"
        ))
        .fetch_all(&self.db)
        .await
        .context("list projects")?;
        Ok(rows)
    }

    async fn find(&self, id: Uuid, scope: Scope) -> anyhow::Result<Option<Project>> {
        let query = match scope {
            Scope::Everyone => {
                sqlx::query_as::<_, Project>(&format!("SELECT {COLUMNS} FROM projects WHERE id = $1"))
                    .bind(id)
                    .fetch_optional(&self.db)
                    .await
            }
            Scope::OwnedBy(owner) => {
                sqlx::query_as::<_, Project>(&format!(
                    "SELECT {COLUMNS} FROM projects WHERE id = $1 AND owner_id = $2"
                ))
                .bind(id)
                .bind(owner)
                .fetch_optional(&self.db)
                .await
            }
        };
        query.context("find project")
    }

    async fn insert(&self, p: &Project) -> Result<Project, StoreError> {
        let row = sqlx::query_as::<_, Project>(&format!(
            r#"
            INSERT INTO projects ({COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(p.id)
        .bind(p.owner_id)
        .bind(&p.name)
        .bind(&p.description)
        .bind(&p.images)
        .bind(&p.github_url)
        .bind(&p.linkedin_url)
        .bind(&p.demo_url)
        .bind(p.created_at)
        .bind(p.updated_at)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    async fn update(
        &self,
        id: Uuid,
        owner_id: Uuid,
        changes: &ProjectChanges,
        now: OffsetDateTime,
    ) -> anyhow::Result<Option<Project>> {
        let row = sqlx::query_as::<_, Project>(&format!(
            r#"
            UPDATE projects
               SET name = COALESCE($3, name),
                   description = COALESCE($4, description),
                   images = COALESCE($5, images),
                   github_url = CASE WHEN $6 THEN $7 ELSE github_url END,
                   linkedin_url = CASE WHEN $8 THEN $9 ELSE linkedin_url END,
                   demo_url = CASE WHEN $10 THEN $11 ELSE demo_url END,
                   updated_at = GREATEST(updated_at, $12)
             WHERE id = $1 AND owner_id = $2
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(owner_id)
        .bind(&changes.name)
        .bind(&changes.description)
        .bind(&changes.images)
        .bind(changes.github_url.is_some())
        .bind(changes.github_url.clone().flatten())
        .bind(changes.linkedin_url.is_some())
        .bind(changes.linkedin_url.clone().flatten())
        .bind(changes.demo_url.is_some())
        .bind(changes.demo_url.clone().flatten())
        .bind(now)
        .fetch_optional(&self.db)
        .await
        .context("update project")?;
        Ok(row)
    }

    async fn delete(&self, id: Uuid, owner_id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(&self.db)
            .await
            .context("delete project")?;
        Ok(result.rows_affected() > 0)
    }
}
