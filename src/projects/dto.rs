use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::{AppError, FieldErrors};
use crate::projects::repo_types::{Project, ProjectChanges, ProjectFields};

const NAME_MAX_LEN: usize = 255;

/// Body of `POST /projects/` and `PUT /projects/{id}/`. Client-sent `id`,
/// owner and timestamps are dropped during deserialisation.
#[derive(Debug, Default, Deserialize)]
pub struct ProjectWrite {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub images: Option<Vec<String>>,
    #[serde(default)]
    pub github_url: Option<String>,
    #[serde(default)]
    pub linkedin_url: Option<String>,
    #[serde(default)]
    pub demo_url: Option<String>,
}

/// Body of `PATCH /projects/{id}/`; absent fields are left unchanged and an
/// explicit `null` clears a link.
#[derive(Debug, Default, Deserialize)]
pub struct ProjectPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub images: Option<Vec<String>>,
    #[serde(default, deserialize_with = "present")]
    pub github_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub linkedin_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub demo_url: Option<Option<String>>,
}

fn present<'de, D, T>(d: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(d).map(Some)
}

impl ProjectWrite {
    pub fn validate(self) -> Result<ProjectFields, AppError> {
        let mut errors = FieldErrors::default();
        let fields = ProjectFields {
            name: check_name(self.name, &mut errors),
            description: check_description(self.description, &mut errors),
            images: self.images.unwrap_or_default(),
            github_url: check_url("github_url", self.github_url, &mut errors),
            linkedin_url: check_url("linkedin_url", self.linkedin_url, &mut errors),
            demo_url: check_url("demo_url", self.demo_url, &mut errors),
        };
        errors.into_result()?;
        Ok(fields)
    }
}

impl ProjectPatch {
    /// Validates the fields that are present; absent ones stay `None` so
    /// the store leaves those columns untouched.
    pub fn validate(self) -> Result<ProjectChanges, AppError> {
        let mut errors = FieldErrors::default();
        let changes = ProjectChanges {
            name: self.name.map(|n| check_name(n, &mut errors)),
            description: self.description.map(|d| check_description(d, &mut errors)),
            images: self.images,
            github_url: self
                .github_url
                .map(|v| check_url("github_url", v, &mut errors)),
            linkedin_url: self
                .linkedin_url
                .map(|v| check_url("linkedin_url", v, &mut errors)),
            demo_url: self.demo_url.map(|v| check_url("demo_url", v, &mut errors)),
        };
        errors.into_result()?;
        Ok(changes)
    }
}

fn check_name(name: String, errors: &mut FieldErrors) -> String {
    let name = name.trim().to_string();
    if name.is_empty() {
        errors.add("name", "This field is required.");
    } else if name.chars().count() > NAME_MAX_LEN {
        errors.add(
            "name",
            format!("Ensure this field has no more than {NAME_MAX_LEN} characters."),
        );
    }
    name
}

fn check_description(description: String, errors: &mut FieldErrors) -> String {
    if description.trim().is_empty() {
        errors.add("description", "This field is required.");
    }
    description
}

pub(crate) fn is_valid_url(url: &str) -> bool {
    lazy_static! {
        static ref URL_RE: Regex = Regex::new(
            r"(?i)^https?://(?:localhost|[^\s/?#]+\.[^\s/?#]+)(?::\d+)?(?:[/?#]\S*)?$"
        )
        .unwrap();
    }
    URL_RE.is_match(url)
}

/// Empty links are stored as absent.
fn check_url(field: &'static str, url: Option<String>, errors: &mut FieldErrors) -> Option<String> {
    let url = url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty())?;
    if !is_valid_url(&url) {
        errors.add(field, "Enter a valid URL.");
    }
    Some(url)
}

#[derive(Debug, Serialize)]
pub struct ProjectResponse {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub images: Vec<String>,
    pub github_url: Option<String>,
    pub linkedin_url: Option<String>,
    pub demo_url: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<Project> for ProjectResponse {
    fn from(p: Project) -> Self {
        Self {
            id: p.id,
            name: p.name,
            description: p.description,
            images: p.images,
            github_url: p.github_url,
            linkedin_url: p.linkedin_url,
            demo_url: p.demo_url,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

/// Envelope used by `GET /projects/public/`.
#[derive(Debug, Serialize)]
pub struct PublicProjects {
    pub projects: Vec<ProjectResponse>,
}
