//! An in-process [`Store`] with the same observable behavior as the SQLite
//! database: unique usernames and emails, reference checks on friends,
//! atomic thought creation. Used to exercise the resolvers without a file.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use thoughts_types::models::{NewReaction, NewUser, Reaction, Thought, User};

use crate::store::{Credentials, Store};
use crate::{StoreError, StoreResult, password};

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

#[derive(Default)]
struct Collections {
    /// Insertion order doubles as the natural order of `find_users`.
    users: Vec<Credentials>,
    thoughts: Vec<Thought>,
}

impl Collections {
    fn user(&self, id: Uuid) -> Option<&Credentials> {
        self.users.iter().find(|c| c.user.id == id)
    }

    fn user_mut(&mut self, id: Uuid) -> Option<&mut Credentials> {
        self.users.iter_mut().find(|c| c.user.id == id)
    }

    fn thought(&self, id: Uuid) -> Option<&Thought> {
        self.thoughts.iter().find(|t| t.id == id)
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_users(&self) -> StoreResult<Vec<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.iter().map(|c| c.user.clone()).collect())
    }

    async fn find_users_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<User>> {
        let inner = self.inner.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| inner.user(*id))
            .map(|c| c.user.clone())
            .collect())
    }

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.user(id).map(|c| c.user.clone()))
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .iter()
            .find(|c| c.user.username == username)
            .map(|c| c.user.clone()))
    }

    async fn find_credentials_by_email(&self, email: &str) -> StoreResult<Option<Credentials>> {
        let inner = self.inner.read().await;
        Ok(inner.users.iter().find(|c| c.user.email == email).cloned())
    }

    async fn create_user(&self, new_user: NewUser) -> StoreResult<User> {
        let password_hash = password::hash(&new_user.password)?;
        let mut inner = self.inner.write().await;

        if inner.users.iter().any(|c| c.user.username == new_user.username) {
            return Err(StoreError::Constraint(
                "UNIQUE constraint failed: users.username".into(),
            ));
        }
        if inner.users.iter().any(|c| c.user.email == new_user.email) {
            return Err(StoreError::Constraint(
                "UNIQUE constraint failed: users.email".into(),
            ));
        }

        let user = User {
            id: Uuid::new_v4(),
            username: new_user.username,
            email: new_user.email,
            thought_ids: vec![],
            friend_ids: vec![],
            created_at: Utc::now(),
        };
        inner.users.push(Credentials {
            user: user.clone(),
            password_hash,
        });

        Ok(user)
    }

    async fn find_thoughts(&self, username: Option<&str>) -> StoreResult<Vec<Thought>> {
        let inner = self.inner.read().await;

        // Walk newest-inserted first so the stable sort breaks ties the same
        // way the database does.
        let mut thoughts: Vec<Thought> = inner
            .thoughts
            .iter()
            .rev()
            .filter(|t| username.is_none_or(|name| t.username == name))
            .cloned()
            .collect();
        thoughts.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(thoughts)
    }

    async fn find_thoughts_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Thought>> {
        let inner = self.inner.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| inner.thought(*id))
            .cloned()
            .collect())
    }

    async fn find_thought(&self, id: Uuid) -> StoreResult<Option<Thought>> {
        let inner = self.inner.read().await;
        Ok(inner.thought(id).cloned())
    }

    async fn create_thought(
        &self,
        author_id: Uuid,
        username: &str,
        thought_text: &str,
    ) -> StoreResult<Thought> {
        let mut inner = self.inner.write().await;

        let thought = Thought {
            id: Uuid::new_v4(),
            thought_text: thought_text.to_string(),
            username: username.to_string(),
            created_at: Utc::now(),
            reactions: vec![],
        };

        let author = inner
            .user_mut(author_id)
            .ok_or_else(|| StoreError::Constraint("FOREIGN KEY constraint failed".into()))?;
        author.user.thought_ids.push(thought.id);
        inner.thoughts.push(thought.clone());

        Ok(thought)
    }

    async fn append_reaction(
        &self,
        thought_id: Uuid,
        reaction: NewReaction,
    ) -> StoreResult<Option<Thought>> {
        let mut inner = self.inner.write().await;

        let Some(thought) = inner.thoughts.iter_mut().find(|t| t.id == thought_id) else {
            return Ok(None);
        };
        thought.reactions.push(Reaction {
            id: Uuid::new_v4(),
            reaction_body: reaction.reaction_body,
            username: reaction.username,
            created_at: Utc::now(),
        });

        Ok(Some(thought.clone()))
    }

    async fn add_friend(&self, user_id: Uuid, friend_id: Uuid) -> StoreResult<Option<User>> {
        let mut inner = self.inner.write().await;

        if inner.user(user_id).is_none() {
            return Ok(None);
        }
        if inner.user(friend_id).is_none() {
            return Err(StoreError::Constraint("FOREIGN KEY constraint failed".into()));
        }

        let Some(entry) = inner.user_mut(user_id) else {
            return Ok(None);
        };
        if !entry.user.friend_ids.contains(&friend_id) {
            entry.user.friend_ids.push(friend_id);
        }

        Ok(Some(entry.user.clone()))
    }
}
