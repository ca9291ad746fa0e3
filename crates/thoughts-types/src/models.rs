use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user profile as seen by readers. There is deliberately no password
/// field here; the hash only leaves the store through a credentials lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    /// Authored thoughts in the order they were posted.
    pub thought_ids: Vec<Uuid>,
    /// One-directional: listing someone here says nothing about their list.
    pub friend_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thought {
    pub id: Uuid,
    pub thought_text: String,
    /// Copy of the author's username at posting time.
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub reactions: Vec<Reaction>,
}

/// Embedded in a [`Thought`]; reactions only exist through their parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reaction {
    pub id: Uuid,
    pub reaction_body: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

/// Signup payload. The store receives the plaintext password and persists
/// only its hash.
#[derive(Clone, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct NewReaction {
    pub reaction_body: String,
    pub username: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_user_debug_hides_password() {
        let new_user = NewUser {
            username: "lernantino".into(),
            email: "lernantino@example.com".into(),
            password: "hunter22".into(),
        };

        let rendered = format!("{:?}", new_user);
        assert!(rendered.contains("lernantino@example.com"));
        assert!(!rendered.contains("hunter22"));
    }

    #[test]
    fn user_serializes_without_password() {
        let user = User {
            id: Uuid::new_v4(),
            username: "lernantino".into(),
            email: "lernantino@example.com".into(),
            thought_ids: vec![],
            friend_ids: vec![],
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["username"], "lernantino");
    }
}
