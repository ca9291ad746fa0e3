use async_graphql::http::GraphiQLSource;
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::{
    Extension, Json,
    extract::State,
    response::{Html, IntoResponse},
};

use crate::AppState;
use crate::auth::Caller;

pub const GRAPHQL_PATH: &str = "/graphql";

/// Executes a query or mutation as the caller resolved by
/// [`crate::middleware::resolve_caller`].
pub async fn graphql(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    req: GraphQLRequest,
) -> GraphQLResponse {
    state.schema.execute(req.into_inner().data(caller)).await.into()
}

pub async fn playground() -> impl IntoResponse {
    Html(GraphiQLSource::build().endpoint(GRAPHQL_PATH).finish())
}

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}
