//! The operations behind every GraphQL query and mutation. Identity is an
//! explicit argument on the gated ones; the GraphQL layer only adapts
//! arguments and errors.

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use thoughts_db::{Store, password};
use thoughts_types::api::Identity;
use thoughts_types::models::{NewReaction, NewUser, Thought, User};

use crate::auth::TokenSigner;
use crate::error::{ApiError, ApiResult};

/// Result of a successful signup or login.
#[derive(Debug, Clone)]
pub struct AuthPayload {
    pub token: String,
    pub user: User,
}

#[derive(Clone)]
pub struct Resolvers {
    store: Arc<dyn Store>,
    signer: TokenSigner,
}

fn require(caller: Option<&Identity>) -> ApiResult<&Identity> {
    caller.ok_or(ApiError::Unauthenticated)
}

impl Resolvers {
    pub fn new(store: Arc<dyn Store>, signer: TokenSigner) -> Self {
        Self { store, signer }
    }

    // -- Queries --

    /// The caller's own profile; `None` if their account no longer exists.
    pub async fn me(&self, caller: Option<&Identity>) -> ApiResult<Option<User>> {
        let identity = require(caller)?;
        Ok(self.store.find_user_by_id(identity.id).await?)
    }

    pub async fn thoughts(&self, username: Option<&str>) -> ApiResult<Vec<Thought>> {
        Ok(self.store.find_thoughts(username).await?)
    }

    /// An id that is not even well formed cannot match anything.
    pub async fn thought(&self, id: &str) -> ApiResult<Option<Thought>> {
        let Ok(id) = id.parse::<Uuid>() else {
            return Ok(None);
        };
        Ok(self.store.find_thought(id).await?)
    }

    pub async fn users(&self) -> ApiResult<Vec<User>> {
        Ok(self.store.find_users().await?)
    }

    pub async fn user(&self, username: &str) -> ApiResult<Option<User>> {
        Ok(self.store.find_user_by_username(username).await?)
    }

    /// Friends that have since disappeared are skipped.
    pub async fn friends_of(&self, user: &User) -> ApiResult<Vec<User>> {
        Ok(self.store.find_users_by_ids(&user.friend_ids).await?)
    }

    /// In the order they were posted.
    pub async fn thoughts_of(&self, user: &User) -> ApiResult<Vec<Thought>> {
        Ok(self.store.find_thoughts_by_ids(&user.thought_ids).await?)
    }

    // -- Mutations --

    pub async fn add_user(&self, new_user: NewUser) -> ApiResult<AuthPayload> {
        let user = self.store.create_user(new_user).await?;
        let token = self.signer.sign(&user)?;

        info!("Registered user {} ({})", user.username, user.id);
        Ok(AuthPayload { token, user })
    }

    pub async fn login(&self, email: &str, password: &str) -> ApiResult<AuthPayload> {
        let Some(credentials) = self.store.find_credentials_by_email(email).await? else {
            debug!("Login for unknown email");
            return Err(ApiError::InvalidCredentials);
        };

        if !password::verify(password, &credentials.password_hash) {
            debug!("Login with wrong password for {}", credentials.user.id);
            return Err(ApiError::InvalidCredentials);
        }

        let token = self.signer.sign(&credentials.user)?;
        Ok(AuthPayload {
            token,
            user: credentials.user,
        })
    }

    /// The author is always the caller; there is no way to post as someone
    /// else.
    pub async fn add_thought(
        &self,
        caller: Option<&Identity>,
        thought_text: &str,
    ) -> ApiResult<Thought> {
        let identity = require(caller)?;

        Ok(self
            .store
            .create_thought(identity.id, &identity.username, thought_text)
            .await?)
    }

    /// `None` when `thought_id` matches no thought.
    pub async fn add_reaction(
        &self,
        caller: Option<&Identity>,
        thought_id: &str,
        reaction_body: &str,
    ) -> ApiResult<Option<Thought>> {
        let identity = require(caller)?;
        let Ok(thought_id) = thought_id.parse::<Uuid>() else {
            return Ok(None);
        };

        let reaction = NewReaction {
            reaction_body: reaction_body.to_string(),
            username: identity.username.clone(),
        };
        Ok(self.store.append_reaction(thought_id, reaction).await?)
    }

    /// Adds a one-way friend edge from the caller. Repeating it changes
    /// nothing.
    pub async fn add_friend(
        &self,
        caller: Option<&Identity>,
        friend_id: &str,
    ) -> ApiResult<Option<User>> {
        let identity = require(caller)?;
        let friend_id = friend_id
            .parse::<Uuid>()
            .map_err(|_| ApiError::InvalidId(friend_id.to_string()))?;

        Ok(self.store.add_friend(identity.id, friend_id).await?)
    }
}
