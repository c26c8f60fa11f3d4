//! Process-local stores used when no database is configured and in tests.
//! A single lock covers every table so multi-record writes stay atomic and
//! unique constraints hold the same way the Postgres schema enforces them.

use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::auth::repo::IdentityStore;
use crate::auth::repo_types::{Credential, NewUser, User};
use crate::error::{StoreError, UniqueField};
use crate::projects::policy::Scope;
use crate::projects::repo::ProjectStore;
use crate::projects::repo_types::{Project, ProjectChanges};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    credentials: HashMap<Uuid, Credential>,
    /// Insertion order; listing breaks `created_at` ties newest-inserted first.
    projects: Vec<Project>,
}

impl Tables {
    fn token_taken(&self, token: &str) -> bool {
        self.credentials
            .values()
            .any(|c| c.token.as_deref() == Some(token))
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdentityStore for MemoryStore {
    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let t = self.tables.read().await;
        Ok(t.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_token(&self, token: &str) -> anyhow::Result<Option<User>> {
        let t = self.tables.read().await;
        let user = t
            .credentials
            .values()
            .find(|c| c.token.as_deref() == Some(token))
            .and_then(|c| t.users.get(&c.user_id))
            .cloned();
        Ok(user)
    }

    async fn create_user(&self, new: NewUser, token: &str) -> Result<User, StoreError> {
        let mut t = self.tables.write().await;
        if t.users.values().any(|u| u.email == new.email) {
            return Err(StoreError::Duplicate(UniqueField::Email));
        }
        if t.token_taken(token) {
            return Err(StoreError::Duplicate(UniqueField::Token));
        }

        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            email: new.email,
            name: new.name,
            password_hash: new.password_hash,
            created_at: now,
        };
        t.credentials.insert(
            user.id,
            Credential {
                user_id: user.id,
                token: Some(token.to_string()),
            },
        );
        t.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn ensure_token(&self, user_id: Uuid, candidate: &str) -> Result<String, StoreError> {
        let mut t = self.tables.write().await;
        if !t.users.contains_key(&user_id) {
            return Err(anyhow::anyhow!("no user {user_id}").into());
        }
        if let Some(existing) = t.credentials.get(&user_id).and_then(|c| c.token.clone()) {
            return Ok(existing);
        }
        if t.token_taken(candidate) {
            return Err(StoreError::Duplicate(UniqueField::Token));
        }
        let credential = t.credentials.entry(user_id).or_insert_with(|| Credential {
            user_id,
            token: None,
        });
        credential.token = Some(candidate.to_string());
        Ok(candidate.to_string())
    }
}

#[async_trait]
impl ProjectStore for MemoryStore {
    async fn list(&self) -> anyhow::Result<Vec<Project>> {
        let t = self.tables.read().await;
        let mut rows: Vec<Project> = t.projects.iter().rev().cloned().collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn find(&self, id: Uuid, scope: Scope) -> anyhow::Result<Option<Project>> {
        let t = self.tables.read().await;
        Ok(t
            .projects
            .iter()
            .find(|p| p.id == id && scope.permits(p))
            .cloned())
    }

    async fn insert(&self, project: &Project) -> Result<Project, StoreError> {
        let mut t = self.tables.write().await;
        if t.projects.iter().any(|p| p.id == project.id) {
            return Err(StoreError::Duplicate(UniqueField::ProjectId));
        }
        t.projects.push(project.clone());
        Ok(project.clone())
    }

    async fn update(
        &self,
        id: Uuid,
        owner_id: Uuid,
        changes: &ProjectChanges,
        now: OffsetDateTime,
    ) -> anyhow::Result<Option<Project>> {
        let mut t = self.tables.write().await;
        let Some(row) = t
            .projects
            .iter_mut()
            .find(|p| p.id == id && p.owner_id == owner_id)
        else {
            return Ok(None);
        };
        row.apply(changes.clone(), now);
        Ok(Some(row.clone()))
    }

    async fn delete(&self, id: Uuid, owner_id: Uuid) -> anyhow::Result<bool> {
        let mut t = self.tables.write().await;
        let before = t.projects.len();
        t.projects.retain(|p| !(p.id == id && p.owner_id == owner_id));
        Ok(t.projects.len() != before)
    }
}

#[cfg(test)]
impl MemoryStore {
    pub async fn user_count(&self) -> usize {
        self.tables.read().await.users.len()
    }

    pub async fn credential_count(&self) -> usize {
        self.tables.read().await.credentials.len()
    }

    /// Simulates a credential row whose token was never set.
    pub async fn clear_token(&self, user_id: Uuid) {
        if let Some(c) = self.tables.write().await.credentials.get_mut(&user_id) {
            c.token = None;
        }
    }
}
