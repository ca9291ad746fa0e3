use async_trait::async_trait;
use tracing::error;
use uuid::Uuid;

use thoughts_types::models::{NewReaction, NewUser, Thought, User};

use crate::{Database, StoreError, StoreResult};

/// A user together with the stored password hash. Only the login path
/// should ever ask for this.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub user: User,
    pub password_hash: String,
}

/// Persistence operations the resolvers depend on. Lookups that find nothing
/// return `Ok(None)` or an empty list; errors are reserved for failed writes
/// and backend trouble.
#[async_trait]
pub trait Store: Send + Sync {
    async fn find_users(&self) -> StoreResult<Vec<User>>;

    /// Users in the order of `ids`, skipping ids that match nothing.
    async fn find_users_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<User>>;

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    async fn find_credentials_by_email(&self, email: &str) -> StoreResult<Option<Credentials>>;

    /// Persists a new user. The plaintext password is hashed before it is
    /// stored; username and email must both be unique.
    async fn create_user(&self, new_user: NewUser) -> StoreResult<User>;

    /// All thoughts, or those by `username`, newest first.
    async fn find_thoughts(&self, username: Option<&str>) -> StoreResult<Vec<Thought>>;

    /// Thoughts in the order of `ids`, skipping ids that match nothing.
    async fn find_thoughts_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Thought>>;

    async fn find_thought(&self, id: Uuid) -> StoreResult<Option<Thought>>;

    /// Creates a thought and appends its id to the author's thought list as
    /// a single atomic step.
    async fn create_thought(
        &self,
        author_id: Uuid,
        username: &str,
        thought_text: &str,
    ) -> StoreResult<Thought>;

    async fn append_reaction(
        &self,
        thought_id: Uuid,
        reaction: NewReaction,
    ) -> StoreResult<Option<Thought>>;

    /// Add-if-absent on the user's friend set. `None` when the user is gone.
    async fn add_friend(&self, user_id: Uuid, friend_id: Uuid) -> StoreResult<Option<User>>;
}

/// Run a blocking DB call off the async runtime.
async fn blocking<F, T>(f: F) -> StoreResult<T>
where
    F: FnOnce() -> StoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result,
        Err(e) => {
            error!("spawn_blocking join error: {}", e);
            Err(StoreError::Backend(e.into()))
        }
    }
}

#[async_trait]
impl Store for Database {
    async fn find_users(&self) -> StoreResult<Vec<User>> {
        let db = self.clone();
        blocking(move || db.get_users()).await
    }

    async fn find_users_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<User>> {
        let db = self.clone();
        let ids = ids.to_vec();
        blocking(move || db.get_users_by_ids(&ids)).await
    }

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let db = self.clone();
        blocking(move || db.get_user_by_id(id)).await
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let db = self.clone();
        let username = username.to_string();
        blocking(move || db.get_user_by_username(&username)).await
    }

    async fn find_credentials_by_email(&self, email: &str) -> StoreResult<Option<Credentials>> {
        let db = self.clone();
        let email = email.to_string();
        blocking(move || db.get_credentials_by_email(&email)).await
    }

    async fn create_user(&self, new_user: NewUser) -> StoreResult<User> {
        let db = self.clone();
        blocking(move || db.create_user(&new_user)).await
    }

    async fn find_thoughts(&self, username: Option<&str>) -> StoreResult<Vec<Thought>> {
        let db = self.clone();
        let username = username.map(str::to_string);
        blocking(move || db.get_thoughts(username.as_deref())).await
    }

    async fn find_thoughts_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Thought>> {
        let db = self.clone();
        let ids = ids.to_vec();
        blocking(move || db.get_thoughts_by_ids(&ids)).await
    }

    async fn find_thought(&self, id: Uuid) -> StoreResult<Option<Thought>> {
        let db = self.clone();
        blocking(move || db.get_thought(id)).await
    }

    async fn create_thought(
        &self,
        author_id: Uuid,
        username: &str,
        thought_text: &str,
    ) -> StoreResult<Thought> {
        let db = self.clone();
        let username = username.to_string();
        let thought_text = thought_text.to_string();
        blocking(move || db.create_thought(author_id, &username, &thought_text)).await
    }

    async fn append_reaction(
        &self,
        thought_id: Uuid,
        reaction: NewReaction,
    ) -> StoreResult<Option<Thought>> {
        let db = self.clone();
        blocking(move || db.append_reaction(thought_id, &reaction)).await
    }

    async fn add_friend(&self, user_id: Uuid, friend_id: Uuid) -> StoreResult<Option<User>> {
        let db = self.clone();
        blocking(move || db.add_friend(user_id, friend_id)).await
    }
}
