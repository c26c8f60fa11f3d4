//! Who may do what to a project.
//!
//! Reads are public and span every owner. Writes need a signed-in caller
//! and only ever see that caller's own projects, so touching someone
//! else's project looks exactly like touching one that does not exist.

use uuid::Uuid;

use crate::auth::repo_types::User;
use crate::error::AppError;
use crate::projects::repo_types::Project;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    List,
    Retrieve,
    Create,
    Update,
    Delete,
}

impl Operation {
    pub fn is_read(self) -> bool {
        matches!(self, Operation::List | Operation::Retrieve)
    }
}

/// Set of projects an operation may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Everyone,
    OwnedBy(Uuid),
}

impl Scope {
    pub fn permits(self, project: &Project) -> bool {
        match self {
            Scope::Everyone => true,
            Scope::OwnedBy(owner) => project.owner_id == owner,
        }
    }
}

pub fn authorize(op: Operation, caller: Option<&User>) -> Result<Scope, AppError> {
    if op.is_read() {
        return Ok(Scope::Everyone);
    }
    caller
        .map(|u| Scope::OwnedBy(u.id))
        .ok_or_else(|| AppError::unauthenticated("Authentication credentials were not provided."))
}
