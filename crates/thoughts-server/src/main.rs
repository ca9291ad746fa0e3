mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, middleware, routing::get};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use thoughts_api::auth::TokenSigner;
use thoughts_api::handlers::{self, GRAPHQL_PATH};
use thoughts_api::middleware::resolve_caller;
use thoughts_api::{AppState, AppStateInner, Resolvers, build_schema};
use thoughts_db::Database;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "thoughts=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    // Init database
    let db = Database::open(&config.db_path)?;

    // Shared state
    let signer = TokenSigner::new(&config.jwt_secret, config.token_ttl);
    let resolvers = Resolvers::new(Arc::new(db), signer.clone());
    let state: AppState = Arc::new(AppStateInner {
        schema: build_schema(resolvers),
        signer,
    });

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Thoughts server listening on {}", addr);
    info!("GraphiQL available at http://{}{}", addr, GRAPHQL_PATH);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn app(state: AppState) -> Router {
    Router::new()
        .route(GRAPHQL_PATH, get(handlers::playground).post(handlers::graphql))
        .layer(middleware::from_fn_with_state(state.clone(), resolve_caller))
        .route("/health", get(handlers::health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;

    fn test_app() -> Router {
        let signer = TokenSigner::new("test-secret", chrono::Duration::hours(2));
        let resolvers = Resolvers::new(Arc::new(Database::open_in_memory().unwrap()), signer.clone());
        app(Arc::new(AppStateInner {
            schema: build_schema(resolvers),
            signer,
        }))
    }

    async fn post_graphql(app: &Router, token: Option<&str>, body: Value) -> Value {
        let mut req = Request::post(GRAPHQL_PATH).header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let res = app
            .clone()
            .oneshot(req.body(Body::from(body.to_string())).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let res = test_app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn playground_is_served() {
        let res = test_app()
            .oneshot(Request::get(GRAPHQL_PATH).body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn bearer_token_identifies_the_caller() {
        let app = test_app();

        let signup = post_graphql(
            &app,
            None,
            json!({
                "query": "mutation { addUser(username: \"lernantino\", email: \"l@example.com\", password: \"password12345\") { token } }"
            }),
        )
        .await;
        let token = signup["data"]["addUser"]["token"].as_str().unwrap().to_string();

        let me = post_graphql(&app, Some(&token), json!({ "query": "{ me { username email } }" })).await;
        assert_eq!(me["data"]["me"], json!({ "username": "lernantino", "email": "l@example.com" }));

        let anonymous = post_graphql(&app, None, json!({ "query": "{ me { username } }" })).await;
        assert_eq!(anonymous["errors"][0]["extensions"]["code"], "UNAUTHENTICATED");

        let forged = post_graphql(&app, Some("forged.token.value"), json!({ "query": "{ me { username } }" })).await;
        assert_eq!(forged["errors"][0]["extensions"]["code"], "UNAUTHENTICATED");
    }

    #[tokio::test]
    async fn public_queries_need_no_token() {
        let app = test_app();

        let res = post_graphql(&app, None, json!({ "query": "{ thoughts { _id } users { _id } }" })).await;

        assert!(res.get("errors").is_none());
        assert_eq!(res["data"], json!({ "thoughts": [], "users": [] }));
    }
}
