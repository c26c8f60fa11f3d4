use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::repo_types::User;
use crate::error::{AppError, StoreError, UniqueField};
use crate::projects::dto::{ProjectPatch, ProjectWrite};
use crate::projects::policy::{authorize, Operation, Scope};
use crate::projects::repo::ProjectStore;
use crate::projects::repo_types::{Project, ProjectChanges};

const ID_ATTEMPTS: usize = 3;

/// Ids are opaque to clients; anything that is not one of ours is simply
/// not found.
pub fn parse_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| not_found())
}

fn not_found() -> AppError {
    AppError::not_found("Not found.")
}

fn owner_of(scope: Scope) -> anyhow::Result<Uuid> {
    match scope {
        Scope::OwnedBy(owner) => Ok(owner),
        Scope::Everyone => Err(anyhow::anyhow!("write operation authorised without an owner")),
    }
}

pub async fn list(store: &dyn ProjectStore, caller: Option<&User>) -> Result<Vec<Project>, AppError> {
    authorize(Operation::List, caller)?;
    Ok(store.list().await?)
}

pub async fn retrieve(
    store: &dyn ProjectStore,
    caller: Option<&User>,
    raw_id: &str,
) -> Result<Project, AppError> {
    let scope = authorize(Operation::Retrieve, caller)?;
    let id = parse_id(raw_id)?;
    store.find(id, scope).await?.ok_or_else(not_found)
}

pub async fn create(
    store: &dyn ProjectStore,
    caller: Option<&User>,
    payload: ProjectWrite,
) -> Result<Project, AppError> {
    let owner = owner_of(authorize(Operation::Create, caller)?)?;
    let fields = payload.validate()?;
    let now = OffsetDateTime::now_utc();

    for _ in 0..ID_ATTEMPTS {
        let project = Project::new(Uuid::new_v4(), owner, fields.clone(), now);
        match store.insert(&project).await {
            Ok(saved) => {
                info!(project_id = %saved.id, owner_id = %owner, "project created");
                return Ok(saved);
            }
            Err(StoreError::Duplicate(UniqueField::ProjectId)) => {
                warn!(project_id = %project.id, "project id collision; regenerating");
            }
            Err(e) => return Err(e.into()),
        }
    }
    Err(anyhow::anyhow!("could not allocate a unique project id").into())
}

/// `PUT`: every writable field is replaced.
pub async fn replace(
    store: &dyn ProjectStore,
    caller: Option<&User>,
    raw_id: &str,
    payload: ProjectWrite,
) -> Result<Project, AppError> {
    let owner = owner_of(authorize(Operation::Update, caller)?)?;
    let id = parse_id(raw_id)?;
    let fields = payload.validate()?;
    save(store, id, owner, fields.into()).await
}

/// `PATCH`: only the fields present in the body change.
pub async fn patch(
    store: &dyn ProjectStore,
    caller: Option<&User>,
    raw_id: &str,
    payload: ProjectPatch,
) -> Result<Project, AppError> {
    let owner = owner_of(authorize(Operation::Update, caller)?)?;
    let id = parse_id(raw_id)?;
    let changes = payload.validate()?;
    save(store, id, owner, changes).await
}

pub async fn delete(
    store: &dyn ProjectStore,
    caller: Option<&User>,
    raw_id: &str,
) -> Result<(), AppError> {
    let owner = owner_of(authorize(Operation::Delete, caller)?)?;
    let id = parse_id(raw_id)?;
    if store.delete(id, owner).await? {
        info!(project_id = %id, owner_id = %owner, "project deleted");
        Ok(())
    } else {
        warn!(project_id = %id, owner_id = %owner, "delete of missing or foreign project");
        Err(not_found())
    }
}

async fn save(
    store: &dyn ProjectStore,
    id: Uuid,
    owner: Uuid,
    changes: ProjectChanges,
) -> Result<Project, AppError> {
    match store
        .update(id, owner, &changes, OffsetDateTime::now_utc())
        .await?
    {
        Some(saved) => {
            info!(project_id = %saved.id, "project updated");
            Ok(saved)
        }
        None => {
            warn!(project_id = %id, owner_id = %owner, "write to missing or foreign project");
            Err(not_found())
        }
    }
}
