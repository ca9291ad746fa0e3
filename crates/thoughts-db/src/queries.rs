use std::collections::HashMap;

use anyhow::anyhow;
use chrono::Utc;
use rusqlite::Connection;
use uuid::Uuid;

use thoughts_types::models::{NewReaction, NewUser, Reaction, Thought, User};

use crate::models::{ReactionRow, ThoughtRow, UserRow, format_timestamp, parse_id};
use crate::store::Credentials;
use crate::{Database, StoreError, StoreResult, password};

impl Database {
    // -- Users --

    /// Hashes the plaintext password and inserts the user. Duplicate
    /// usernames or emails come back as `StoreError::Constraint`.
    pub fn create_user(&self, new_user: &NewUser) -> StoreResult<User> {
        let id = Uuid::new_v4().to_string();
        let password_hash = password::hash(&new_user.password)?;

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, email, password, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    id,
                    new_user.username,
                    new_user.email,
                    password_hash,
                    format_timestamp(Utc::now())
                ],
            )?;

            let row = query_user(conn, UserKey::Id, &id)?
                .ok_or_else(|| anyhow!("User vanished after insert: {}", id))?;
            hydrate_user(conn, row)
        })
    }

    pub fn get_users(&self) -> StoreResult<Vec<User>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, username, email, password, created_at FROM users ORDER BY rowid",
            )?;
            let rows = stmt
                .query_map([], map_user_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            rows.into_iter().map(|row| hydrate_user(conn, row)).collect()
        })
    }

    /// Users in the order of `ids`; ids without a user are skipped.
    pub fn get_users_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<User>> {
        self.with_conn(|conn| {
            let mut users = Vec::with_capacity(ids.len());
            for id in ids {
                if let Some(row) = query_user(conn, UserKey::Id, &id.to_string())? {
                    users.push(hydrate_user(conn, row)?);
                }
            }
            Ok(users)
        })
    }

    pub fn get_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        self.with_conn(|conn| {
            query_user(conn, UserKey::Id, &id.to_string())?
                .map(|row| hydrate_user(conn, row))
                .transpose()
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        self.with_conn(|conn| {
            query_user(conn, UserKey::Username, username)?
                .map(|row| hydrate_user(conn, row))
                .transpose()
        })
    }

    pub fn get_credentials_by_email(&self, email: &str) -> StoreResult<Option<Credentials>> {
        self.with_conn(|conn| {
            let Some(row) = query_user(conn, UserKey::Email, email)? else {
                return Ok(None);
            };
            let password_hash = row.password.clone();
            let user = hydrate_user(conn, row)?;

            Ok(Some(Credentials { user, password_hash }))
        })
    }

    /// Adds `friend_id` to the user's friend set unless already present.
    /// Returns `None` when the user itself does not exist.
    pub fn add_friend(&self, user_id: Uuid, friend_id: Uuid) -> StoreResult<Option<User>> {
        self.with_conn(|conn| {
            let Some(row) = query_user(conn, UserKey::Id, &user_id.to_string())? else {
                return Ok(None);
            };

            // OR IGNORE covers the primary key only; a dangling friend_id
            // still fails the foreign key.
            conn.execute(
                "INSERT OR IGNORE INTO friends (user_id, friend_id) VALUES (?1, ?2)",
                (user_id.to_string(), friend_id.to_string()),
            )?;

            hydrate_user(conn, row).map(Some)
        })
    }

    // -- Thoughts --

    /// Newest first. Thoughts sharing a timestamp keep reverse insertion order.
    pub fn get_thoughts(&self, username: Option<&str>) -> StoreResult<Vec<Thought>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, thought_text, username, created_at
                 FROM thoughts
                 WHERE ?1 IS NULL OR username = ?1
                 ORDER BY created_at DESC, rowid DESC",
            )?;
            let rows = stmt
                .query_map([username], map_thought_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            hydrate_thoughts(conn, rows)
        })
    }

    /// Thoughts in the order of `ids`; ids without a thought are skipped.
    pub fn get_thoughts_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Thought>> {
        self.with_conn(|conn| {
            let mut rows = Vec::with_capacity(ids.len());
            for id in ids {
                if let Some(row) = query_thought(conn, &id.to_string())? {
                    rows.push(row);
                }
            }
            hydrate_thoughts(conn, rows)
        })
    }

    pub fn get_thought(&self, id: Uuid) -> StoreResult<Option<Thought>> {
        self.with_conn(|conn| load_thought(conn, &id.to_string()))
    }

    /// Inserts the thought and links it onto the author's list in one
    /// transaction, so no reader sees one write without the other.
    pub fn create_thought(
        &self,
        author_id: Uuid,
        username: &str,
        thought_text: &str,
    ) -> StoreResult<Thought> {
        let id = Uuid::new_v4().to_string();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO thoughts (id, thought_text, username, created_at) VALUES (?1, ?2, ?3, ?4)",
                (&id, thought_text, username, format_timestamp(Utc::now())),
            )?;
            tx.execute(
                "INSERT INTO user_thoughts (user_id, thought_id) VALUES (?1, ?2)",
                (author_id.to_string(), &id),
            )?;
            tx.commit()?;

            let thought = load_thought(conn, &id)?
                .ok_or_else(|| anyhow!("Thought vanished after insert: {}", id))?;
            Ok(thought)
        })
    }

    // -- Reactions --

    /// Appends a reaction and returns the updated thought, or `None` when no
    /// thought has that id.
    pub fn append_reaction(
        &self,
        thought_id: Uuid,
        reaction: &NewReaction,
    ) -> StoreResult<Option<Thought>> {
        let thought_id = thought_id.to_string();

        self.with_conn(|conn| {
            if query_thought(conn, &thought_id)?.is_none() {
                return Ok(None);
            }

            conn.execute(
                "INSERT INTO reactions (id, thought_id, reaction_body, username, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    Uuid::new_v4().to_string(),
                    thought_id,
                    reaction.reaction_body,
                    reaction.username,
                    format_timestamp(Utc::now())
                ],
            )?;

            load_thought(conn, &thought_id)
        })
    }
}

#[derive(Clone, Copy)]
enum UserKey {
    Id,
    Username,
    Email,
}

impl UserKey {
    fn sql(self) -> &'static str {
        match self {
            UserKey::Id => "SELECT id, username, email, password, created_at FROM users WHERE id = ?1",
            UserKey::Username => {
                "SELECT id, username, email, password, created_at FROM users WHERE username = ?1"
            }
            UserKey::Email => {
                "SELECT id, username, email, password, created_at FROM users WHERE email = ?1"
            }
        }
    }
}

fn map_user_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn map_thought_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ThoughtRow> {
    Ok(ThoughtRow {
        id: row.get(0)?,
        thought_text: row.get(1)?,
        username: row.get(2)?,
        created_at: row.get(3)?,
    })
}

fn query_user(conn: &Connection, key: UserKey, value: &str) -> StoreResult<Option<UserRow>> {
    let mut stmt = conn.prepare(key.sql())?;
    let row = stmt.query_row([value], map_user_row).optional()?;
    Ok(row)
}

/// Resolves the user's reference lists, both in insertion order.
fn hydrate_user(conn: &Connection, row: UserRow) -> StoreResult<User> {
    let thought_ids = query_ids(
        conn,
        "SELECT thought_id FROM user_thoughts WHERE user_id = ?1 ORDER BY rowid",
        &row.id,
    )?;
    let friend_ids = query_ids(
        conn,
        "SELECT friend_id FROM friends WHERE user_id = ?1 ORDER BY rowid",
        &row.id,
    )?;

    Ok(row.into_user(thought_ids, friend_ids)?)
}

fn query_ids(conn: &Connection, sql: &str, owner: &str) -> StoreResult<Vec<Uuid>> {
    let mut stmt = conn.prepare(sql)?;
    let raw = stmt
        .query_map([owner], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    raw.iter()
        .map(|id| parse_id(id).map_err(StoreError::from))
        .collect()
}

fn query_thought(conn: &Connection, id: &str) -> StoreResult<Option<ThoughtRow>> {
    let mut stmt = conn
        .prepare("SELECT id, thought_text, username, created_at FROM thoughts WHERE id = ?1")?;
    let row = stmt.query_row([id], map_thought_row).optional()?;
    Ok(row)
}

fn load_thought(conn: &Connection, id: &str) -> StoreResult<Option<Thought>> {
    let Some(row) = query_thought(conn, id)? else {
        return Ok(None);
    };
    Ok(hydrate_thoughts(conn, vec![row])?.pop())
}

/// Attaches reactions to each thought with one batched query.
fn hydrate_thoughts(conn: &Connection, rows: Vec<ThoughtRow>) -> StoreResult<Vec<Thought>> {
    let thought_ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();

    let mut reactions: HashMap<String, Vec<Reaction>> = HashMap::new();
    for row in query_reactions(conn, &thought_ids)? {
        let thought_id = row.thought_id.clone();
        reactions
            .entry(thought_id)
            .or_default()
            .push(row.into_reaction()?);
    }

    rows.into_iter()
        .map(|row| -> StoreResult<Thought> {
            let attached = reactions.remove(&row.id).unwrap_or_default();
            Ok(row.into_thought(attached)?)
        })
        .collect()
}

/// Bound on `IN (...)` placeholders per statement; SQLite refuses more than
/// 32766 host parameters.
const MAX_IN_PARAMS: usize = 500;

fn query_reactions(conn: &Connection, thought_ids: &[String]) -> StoreResult<Vec<ReactionRow>> {
    let mut rows = Vec::new();

    for chunk in thought_ids.chunks(MAX_IN_PARAMS) {
        let placeholders: Vec<String> = (1..=chunk.len()).map(|i| format!("?{}", i)).collect();
        let sql = format!(
            "SELECT id, thought_id, reaction_body, username, created_at FROM reactions WHERE thought_id IN ({}) ORDER BY rowid",
            placeholders.join(", ")
        );

        let mut stmt = conn.prepare(&sql)?;
        let params: Vec<&dyn rusqlite::types::ToSql> = chunk
            .iter()
            .map(|id| id as &dyn rusqlite::types::ToSql)
            .collect();

        let chunk_rows = stmt
            .query_map(params.as_slice(), |row| {
                Ok(ReactionRow {
                    id: row.get(0)?,
                    thought_id: row.get(1)?,
                    reaction_body: row.get(2)?,
                    username: row.get(3)?,
                    created_at: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows.extend(chunk_rows);
    }

    Ok(rows)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> StoreResult<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> StoreResult<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
