use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::extractors::MaybeAuthUser,
    error::{ApiJson, AppError},
    state::AppState,
};

use super::dto::{ProjectPatch, ProjectResponse, ProjectWrite, PublicProjects};
use super::services;

pub fn public_routes() -> Router<AppState> {
    Router::new().route("/projects/public/", get(list_public))
}

pub fn crud_routes() -> Router<AppState> {
    Router::new()
        .route("/projects/", get(list_projects).post(create_project))
        .route(
            "/projects/:id/",
            get(get_project)
                .put(replace_project)
                .patch(patch_project)
                .delete(delete_project),
        )
}

#[instrument(skip_all)]
pub async fn list_projects(
    State(state): State<AppState>,
    MaybeAuthUser(caller): MaybeAuthUser,
) -> Result<Json<Vec<ProjectResponse>>, AppError> {
    let projects = services::list(state.projects.as_ref(), caller.as_ref()).await?;
    Ok(Json(projects.into_iter().map(Into::into).collect()))
}

#[instrument(skip_all)]
pub async fn list_public(
    State(state): State<AppState>,
    MaybeAuthUser(caller): MaybeAuthUser,
) -> Result<Json<PublicProjects>, AppError> {
    let projects = services::list(state.projects.as_ref(), caller.as_ref()).await?;
    Ok(Json(PublicProjects {
        projects: projects.into_iter().map(Into::into).collect(),
    }))
}

#[instrument(skip(state, caller))]
pub async fn get_project(
    State(state): State<AppState>,
    MaybeAuthUser(caller): MaybeAuthUser,
    Path(id): Path<String>,
) -> Result<Json<ProjectResponse>, AppError> {
    let project = services::retrieve(state.projects.as_ref(), caller.as_ref(), &id).await?;
    Ok(Json(project.into()))
}

#[instrument(skip_all)]
pub async fn create_project(
    State(state): State<AppState>,
    MaybeAuthUser(caller): MaybeAuthUser,
    ApiJson(body): ApiJson<ProjectWrite>,
) -> Result<(StatusCode, Json<ProjectResponse>), AppError> {
    let project = services::create(state.projects.as_ref(), caller.as_ref(), body).await?;
    Ok((StatusCode::CREATED, Json(project.into())))
}

#[instrument(skip(state, caller, body))]
pub async fn replace_project(
    State(state): State<AppState>,
    MaybeAuthUser(caller): MaybeAuthUser,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<ProjectWrite>,
) -> Result<Json<ProjectResponse>, AppError> {
    let project = services::replace(state.projects.as_ref(), caller.as_ref(), &id, body).await?;
    Ok(Json(project.into()))
}

#[instrument(skip(state, caller, body))]
pub async fn patch_project(
    State(state): State<AppState>,
    MaybeAuthUser(caller): MaybeAuthUser,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<ProjectPatch>,
) -> Result<Json<ProjectResponse>, AppError> {
    let project = services::patch(state.projects.as_ref(), caller.as_ref(), &id, body).await?;
    Ok(Json(project.into()))
}

#[instrument(skip(state, caller))]
pub async fn delete_project(
    State(state): State<AppState>,
    MaybeAuthUser(caller): MaybeAuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    services::delete(state.projects.as_ref(), caller.as_ref(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
