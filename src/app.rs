use crate::state::AppState;
use crate::{auth, images, projects};
use axum::{extract::DefaultBodyLimit, routing::get, Json, Router};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub fn build_app(state: AppState) -> Router {
    let body_limit = state.config.upload_max_bytes;
    Router::new()
        .merge(auth::router())
        .merge(projects::router())
        .merge(images::router())
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!(
                        "http_request",
                        %method,
                        uri = %uri,
                        status = tracing::field::Empty
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn serve(app: Router, addr: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
    };
    use base64ct::{Base64, Encoding};
    use tower::ServiceExt;

    const BOUNDARY: &str = "folio-test-boundary";

    fn app() -> Router {
        build_app(AppState::in_memory(AppConfig::default()))
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = app.clone().oneshot(req).await.expect("infallible");
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .expect("read body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, body)
    }

    fn json_req(method: Method, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(t) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {t}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get_req(uri: &str, auth: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(a) = auth {
            builder = builder.header(header::AUTHORIZATION, a);
        }
        builder.body(Body::empty()).unwrap()
    }

    fn upload_req(token: Option<&str>, field: &str, content_type: &str, data: &[u8]) -> Request<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"f.bin\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        let mut builder = Request::builder()
            .method(Method::POST)
            .uri("/upload/")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            );
        if let Some(t) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {t}"));
        }
        builder.body(Body::from(body)).unwrap()
    }

    async fn signup(app: &Router, email: &str) -> String {
        let (status, body) = send(
            app,
            json_req(
                Method::POST,
                "/signup/",
                None,
                json!({ "email": email, "password": "secret1", "name": "Tester" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["token"].as_str().expect("token").to_string()
    }

    fn project_body(name: &str) -> Value {
        json!({
            "name": name,
            "description": "A portfolio piece",
            "images": ["data:image/png;base64,AA=="],
            "github_url": "https://github.com/me/thing",
            "linkedin_url": "",
        })
    }

    #[tokio::test]
    async fn health_is_ok() {
        let (status, body) = send(&app(), get_req("/health", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn signup_token_authenticates_me() {
        let app = app();
        let token = signup(&app, "ada@example.com").await;
        let (status, body) = send(&app, get_req("/me/", Some(format!("Bearer {token}").as_str()))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["email"], "ada@example.com");
        assert_eq!(body["name"], "Tester");
    }

    #[tokio::test]
    async fn duplicate_signup_is_a_400_on_email() {
        let app = app();
        signup(&app, "ada@example.com").await;
        let (status, body) = send(
            &app,
            json_req(
                Method::POST,
                "/signup/",
                None,
                json!({ "email": "ada@example.com", "password": "another", "name": "Ada" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["fields"]["email"].is_array());
    }

    #[tokio::test]
    async fn signin_failures_share_status_and_body() {
        let app = app();
        let token = signup(&app, "ada@example.com").await;

        let (ok_status, ok_body) = send(
            &app,
            json_req(
                Method::POST,
                "/signin/",
                None,
                json!({ "email": "ada@example.com", "password": "secret1" }),
            ),
        )
        .await;
        assert_eq!(ok_status, StatusCode::OK);
        assert_eq!(ok_body["token"], token.as_str());

        let wrong = send(
            &app,
            json_req(
                Method::POST,
                "/signin/",
                None,
                json!({ "email": "ada@example.com", "password": "wrong-one" }),
            ),
        )
        .await;
        let unknown = send(
            &app,
            json_req(
                Method::POST,
                "/signin/",
                None,
                json!({ "email": "nobody@example.com", "password": "secret1" }),
            ),
        )
        .await;
        assert_eq!(wrong.0, StatusCode::UNAUTHORIZED);
        assert_eq!(wrong, unknown);
    }

    #[tokio::test]
    async fn malformed_json_is_a_400() {
        let req = Request::builder()
            .method(Method::POST)
            .uri("/signin/")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(&app(), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn authorization_header_handling() {
        let app = app();
        // absent: anonymous read is fine
        let (status, _) = send(&app, get_req("/projects/", None)).await;
        assert_eq!(status, StatusCode::OK);
        // malformed or unknown: rejected even on public reads
        for header in ["Bearer", "Token abc", "Bearer a b", "Bearer unknown-token"] {
            let (status, _) = send(&app, get_req("/projects/", Some(header))).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{header}");
        }
        // anonymous write
        let (status, _) = send(
            &app,
            json_req(Method::POST, "/projects/", None, project_body("x")),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn project_lifecycle_and_ownership() {
        let app = app();
        let alice = signup(&app, "alice@example.com").await;
        let bob = signup(&app, "bob@example.com").await;

        let mut body = project_body("Site");
        body["id"] = json!("chosen-by-client");
        let (status, created) = send(
            &app,
            json_req(Method::POST, "/projects/", Some(alice.as_str()), body),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{created}");
        let id = created["id"].as_str().unwrap().to_string();
        assert_ne!(id, "chosen-by-client");
        assert_eq!(created["linkedin_url"], Value::Null);
        let detail = format!("/projects/{id}/");

        // public reads
        let (status, listed) = send(&app, get_req("/projects/", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed.as_array().unwrap().len(), 1);
        let (_, public) = send(&app, get_req("/projects/public/", None)).await;
        assert_eq!(public["projects"][0]["id"], id.as_str());
        let (status, fetched) = send(&app, get_req(&detail, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["name"], "Site");

        // bob can see but not touch
        let (status, _) = send(
            &app,
            json_req(Method::PUT, &detail, Some(bob.as_str()), project_body("Hijacked")),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(
            &app,
            json_req(Method::PATCH, &detail, Some(bob.as_str()), json!({ "name": "Hijacked" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&app, json_req(Method::DELETE, &detail, Some(bob.as_str()), Value::Null)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        // alice edits and deletes
        let (status, patched) = send(
            &app,
            json_req(Method::PATCH, &detail, Some(alice.as_str()), json!({ "name": "Renamed" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(patched["name"], "Renamed");
        assert_eq!(patched["description"], "A portfolio piece");
        assert_eq!(patched["created_at"], created["created_at"]);

        let (status, body) = send(&app, json_req(Method::DELETE, &detail, Some(alice.as_str()), Value::Null)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(body, Value::Null);
        let (status, _) = send(&app, get_req(&detail, None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn invalid_project_payload_lists_fields() {
        let app = app();
        let token = signup(&app, "ada@example.com").await;
        let (status, body) = send(
            &app,
            json_req(
                Method::POST,
                "/projects/",
                Some(token.as_str()),
                json!({ "name": "", "demo_url": "nope" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["fields"]["name"].is_array());
        assert!(body["fields"]["description"].is_array());
        assert!(body["fields"]["demo_url"].is_array());
    }

    #[tokio::test]
    async fn upload_roundtrip_and_rejections() {
        let app = app();
        let token = signup(&app, "ada@example.com").await;
        let png: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0, 1, 2, 255];

        let (status, body) = send(&app, upload_req(Some(token.as_str()), "file", "image/png", png)).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        let url = body["url"].as_str().unwrap();
        let payload = url.strip_prefix("data:image/png;base64,").expect("prefix");
        assert_eq!(Base64::decode_vec(payload).unwrap(), png);

        let (status, _) = send(&app, upload_req(Some(token.as_str()), "file", "text/plain", b"hi")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(&app, upload_req(Some(token.as_str()), "other", "image/png", png)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No file provided");

        let (status, _) = send(&app, upload_req(None, "file", "image/png", png)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
