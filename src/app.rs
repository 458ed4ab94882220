use std::net::SocketAddr;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    auth, db, email_config, error::ErrorBody, notifications, products, reports, state::AppState,
    transactions, users,
};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .nest(
            "/api",
            Router::new()
                .merge(auth::router())
                .merge(users::router())
                .merge(products::router())
                .merge(transactions::router())
                .merge(reports::router())
                .merge(email_config::router())
                .merge(notifications::router())
                .route("/health", get(health)),
        )
        .fallback(not_found)
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, ?latency, "response");
                        } else {
                            tracing::info!(%status, ?latency, "response");
                        }
                    },
                ),
        )
}

async fn health(State(state): State<AppState>) -> Response {
    let connected = db::ping(&state.db).await;
    let status = if connected {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(json!({
            "success": connected,
            "message": "Inventory management API",
            "database": if connected { "connected" } else { "disconnected" },
        })),
    )
        .into_response()
}

async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody {
            success: false,
            message: "Route not found".into(),
        }),
    )
        .into_response()
}

pub async fn serve(app: Router, host: &str, port: u16) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{host}:{port}").parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        extract::FromRef,
        http::{header, Request},
    };
    use tower::ServiceExt;

    use super::*;
    use crate::{
        auth::jwt::{tests::user_with_role, JwtKeys},
        users::repo_types::Role,
    };

    async fn call(req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let resp = build_app(AppState::fake()).oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn get(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(t) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {t}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn protected_routes_require_a_token() {
        for uri in ["/api/products", "/api/transactions", "/api/reports/dashboard", "/api/auth/me"] {
            let (status, body) = call(get(uri, None)).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
            assert_eq!(body["success"], false);
            assert_eq!(body["message"], "Missing Authorization header");
        }
    }

    #[tokio::test]
    async fn garbage_token_is_rejected() {
        let (status, body) = call(get("/api/products", Some("not-a-jwt"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid or expired token");
    }

    #[tokio::test]
    async fn refresh_token_cannot_be_used_for_access() {
        let state = AppState::fake();
        let refresh = JwtKeys::from_ref(&state)
            .sign_refresh(&user_with_role(Role::Admin))
            .unwrap();
        let (status, body) = call(get("/api/products", Some(&refresh))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Access token required");
    }

    #[tokio::test]
    async fn register_validates_before_touching_the_database() {
        let req = Request::builder()
            .method("POST")
            .uri("/api/auth/register")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                r#"{"username":"ann","email":"not-an-email","password":"secret1"}"#,
            ))
            .unwrap();
        let (status, body) = call(req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid email");

        let req = Request::builder()
            .method("POST")
            .uri("/api/auth/register")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"username":"ann","email":"ann@example.com","password":"123"}"#))
            .unwrap();
        let (status, _) = call(req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn malformed_json_is_a_validation_error() {
        let req = Request::builder()
            .method("POST")
            .uri("/api/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = call(req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn unknown_routes_get_the_error_envelope() {
        let (status, body) = call(get("/api/nope", None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Route not found");
    }
}
