use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Portfolio project row.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Project {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub description: String,
    pub images: Vec<String>,
    pub github_url: Option<String>,
    pub linkedin_url: Option<String>,
    pub demo_url: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Client-writable part of a project, already validated.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectFields {
    pub name: String,
    pub description: String,
    pub images: Vec<String>,
    pub github_url: Option<String>,
    pub linkedin_url: Option<String>,
    pub demo_url: Option<String>,
}

/// Column-level edit of a project. `None` leaves a column as stored; for
/// the links `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub images: Option<Vec<String>>,
    pub github_url: Option<Option<String>>,
    pub linkedin_url: Option<Option<String>>,
    pub demo_url: Option<Option<String>>,
}

impl From<ProjectFields> for ProjectChanges {
    fn from(f: ProjectFields) -> Self {
        Self {
            name: Some(f.name),
            description: Some(f.description),
            images: Some(f.images),
            github_url: Some(f.github_url),
            linkedin_url: Some(f.linkedin_url),
            demo_url: Some(f.demo_url),
        }
    }
}

impl Project {
    pub fn new(id: Uuid, owner_id: Uuid, fields: ProjectFields, now: OffsetDateTime) -> Self {
        Self {
            id,
            owner_id,
            name: fields.name,
            description: fields.description,
            images: fields.images,
            github_url: fields.github_url,
            linkedin_url: fields.linkedin_url,
            demo_url: fields.demo_url,
            created_at: now,
            updated_at: now,
        }
    }

    /// Writes the columns named in `changes` and bumps `updated_at`, which
    /// never moves backwards.
    pub fn apply(&mut self, changes: ProjectChanges, now: OffsetDateTime) {
        if let Some(name) = changes.name {
            self.name = name;
        }
        if let Some(description) = changes.description {
            self.description = description;
        }
        if let Some(images) = changes.images {
            self.images = images;
        }
        if let Some(url) = changes.github_url {
            self.github_url = url;
        }
        if let Some(url) = changes.linkedin_url {
            self.linkedin_url = url;
        }
        if let Some(url) = changes.demo_url {
            self.demo_url = url;
        }
        self.updated_at = now.max(self.updated_at);
    }
}
