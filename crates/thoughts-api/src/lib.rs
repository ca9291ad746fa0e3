pub mod auth;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod resolvers;
pub mod schema;

use std::sync::Arc;

pub use error::{ApiError, ApiResult};
pub use resolvers::Resolvers;
pub use schema::{ThoughtsSchema, build_schema};

use auth::TokenSigner;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub schema: ThoughtsSchema,
    pub signer: TokenSigner,
}
