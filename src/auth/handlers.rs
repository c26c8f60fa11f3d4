use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{AuthResponse, PublicUser, SigninRequest, SignupRequest},
        extractors::AuthUser,
        services,
    },
    error::{ApiJson, AppError},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup/", post(signup))
        .route("/signin/", post(signin))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me/", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<SignupRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let (user, token) = services::signup(state.identities.as_ref(), payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user: user.into(),
            token,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn signin(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<SigninRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let (user, token) = services::signin(state.identities.as_ref(), payload).await?;
    Ok(Json(AuthResponse {
        user: user.into(),
        token,
    }))
}

#[instrument(skip_all)]
pub async fn get_me(AuthUser(user): AuthUser) -> Json<PublicUser> {
    Json(user.into())
}
