use std::net::SocketAddr;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use crate::{nutrition, pantry, recipes, recommendations, seed, sessions};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .nest(
            "/api/v1",
            Router::new()
                .merge(recipes::router())
                .merge(nutrition::router())
                .merge(pantry::router())
                .merge(recommendations::router())
                .merge(sessions::router())
                .merge(seed::router())
                .route("/health", get(|| async { "ok" })),
        )
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
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod app_tests {
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::auth::JwtKeys;
    use crate::generation::provider::Operation;
    use crate::testing::{sample_recipe_def, Harness};

    fn bearer(h: &Harness, user: Uuid) -> String {
        format!("Bearer {}", JwtKeys::new(&h.state.config.jwt).sign_access(user))
    }

    async fn call(
        h: &Harness,
        method: Method,
        uri: &str,
        auth: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(a) = auth {
            req = req.header(header::AUTHORIZATION, a);
        }
        let req = match body {
            Some(b) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(b.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };
        let res = build_app(h.state.clone()).oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
        };
        (status, value)
    }

    #[tokio::test]
    async fn health_is_public() {
        let h = Harness::new();
        let (status, body) = call(&h, Method::GET, "/api/v1/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Value::String("ok".into()));
    }

    #[tokio::test]
    async fn user_scoped_routes_require_a_token() {
        let h = Harness::new();
        for uri in ["/api/v1/pantry", "/api/v1/sessions", "/api/v1/recommendations"] {
            let (status, _) = call(&h, Method::GET, uri, None, None).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", uri);
        }
        let (status, _) = call(&h, Method::GET, "/api/v1/pantry", Some("Bearer not-a-jwt"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn errors_carry_kind_and_message() {
        let h = Harness::new();
        let id = Uuid::new_v4();
        let (status, body) = call(&h, Method::GET, &format!("/api/v1/recipes/{}", id), None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");
        assert!(body["message"].as_str().unwrap().contains(&id.to_string()));
    }

    #[tokio::test]
    async fn pantry_round_trip() {
        let h = Harness::new();
        let auth = bearer(&h, Uuid::new_v4());
        let (status, item) = call(
            &h,
            Method::POST,
            "/api/v1/pantry",
            Some(&auth),
            Some(json!({"name": "rice", "category": "grains", "quantity": 2, "unit": "lbs",
                        "expiration_date": "2030-01-31"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(item["expiration_date"], "2030-01-31");

        let (status, list) = call(&h, Method::GET, "/api/v1/pantry", Some(&auth), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list.as_array().unwrap().len(), 1);

        let uri = format!("/api/v1/pantry/{}", item["id"].as_str().unwrap());
        let (status, _) = call(&h, Method::DELETE, &uri, Some(&auth), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = call(&h, Method::DELETE, &uri, Some(&auth), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn cooking_session_over_http() {
        let h = Harness::new();
        let auth = bearer(&h, Uuid::new_v4());

        let def = serde_json::to_value(sample_recipe_def()).unwrap();
        let (status, recipe) = call(&h, Method::POST, "/api/v1/recipes", Some(&auth), Some(def)).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, session) = call(
            &h,
            Method::POST,
            "/api/v1/sessions",
            Some(&auth),
            Some(json!({"base_recipe_id": recipe["id"]})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(session["status"], "in_progress");
        let base = format!("/api/v1/sessions/{}", session["id"].as_str().unwrap());

        let (status, body) = call(
            &h,
            Method::POST,
            &format!("{}/decisions", base),
            Some(&auth),
            Some(json!({"branch_point": 3, "choice": "smoky"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation_error");

        h.llm.push_ok(Operation::Recompose, "{\"ingredients\": []}");
        let (status, body) = call(
            &h,
            Method::POST,
            &format!("{}/decisions", base),
            Some(&auth),
            Some(json!({"branch_point": 3, "choice": "spicy"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        // raw model output stays out of the response
        assert!(!body["message"].as_str().unwrap().contains("ingredients"));

        h.llm.push_ok(Operation::Story, "Done.");
        let (status, body) = call(
            &h,
            Method::POST,
            &format!("{}/complete", base),
            Some(&auth),
            Some(json!({"rating": 5})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["session"]["status"], "completed");
        assert_eq!(body["story"]["decisions_count"], 0);

        let (status, body) = call(&h, Method::POST, &format!("{}/complete", base), Some(&auth), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "conflict");

        // another user cannot see it
        let other = bearer(&h, Uuid::new_v4());
        let (status, _) = call(&h, Method::GET, &base, Some(&other), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
