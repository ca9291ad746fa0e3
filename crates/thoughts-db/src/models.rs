//! Database row types, mapping directly to SQLite rows.
//! Distinct from thoughts-types models to keep the DB layer independent.

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use tracing::warn;
use uuid::Uuid;

use thoughts_types::models::{Reaction, Thought, User};

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub created_at: String,
}

pub struct ThoughtRow {
    pub id: String,
    pub thought_text: String,
    pub username: String,
    pub created_at: String,
}

pub struct ReactionRow {
    pub id: String,
    pub thought_id: String,
    pub reaction_body: String,
    pub username: String,
    pub created_at: String,
}

impl UserRow {
    pub fn into_user(self, thought_ids: Vec<Uuid>, friend_ids: Vec<Uuid>) -> Result<User> {
        Ok(User {
            id: parse_id(&self.id)?,
            created_at: parse_timestamp(&self.created_at, &self.id),
            username: self.username,
            email: self.email,
            thought_ids,
            friend_ids,
        })
    }
}

impl ThoughtRow {
    pub fn into_thought(self, reactions: Vec<Reaction>) -> Result<Thought> {
        Ok(Thought {
            id: parse_id(&self.id)?,
            created_at: parse_timestamp(&self.created_at, &self.id),
            thought_text: self.thought_text,
            username: self.username,
            reactions,
        })
    }
}

impl ReactionRow {
    pub fn into_reaction(self) -> Result<Reaction> {
        Ok(Reaction {
            id: parse_id(&self.id)?,
            created_at: parse_timestamp(&self.created_at, &self.id),
            reaction_body: self.reaction_body,
            username: self.username,
        })
    }
}

/// Fixed-width RFC 3339, so lexical order in SQL matches time order.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_id(raw: &str) -> Result<Uuid> {
    raw.parse().with_context(|| format!("Corrupt id '{}'", raw))
}

fn parse_timestamp(raw: &str, row_id: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .or_else(|_| {
            // Rows written by hand through the sqlite shell use datetime('now').
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt created_at '{}' on row '{}': {}", raw, row_id, e);
            DateTime::default()
        })
}
