//! Mood journal persistence.
//!
//! Every query is scoped to the owning user; another user's entry is
//! indistinguishable from a missing one.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::uuid::uuidv7;

pub const MIN_MOOD_SCORE: i32 = 1;
pub const MAX_MOOD_SCORE: i32 = 10;
pub const DEFAULT_PAGE_LIMIT: i64 = 100;
pub const MAX_PAGE_LIMIT: i64 = 500;

#[derive(Debug, Error)]
pub enum MoodError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Mood entry not found")]
    NotFound,

    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct MoodEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub mood_score: i32,
    pub note: Option<String>,
    pub tags: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// Fields a client supplies on create and update.
#[derive(Debug, Clone, Default)]
pub struct MoodInput {
    pub mood_score: i32,
    pub note: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl MoodInput {
    /// Check the score range and tidy tags (trimmed, blanks dropped).
    pub fn validated(self) -> Result<Self, MoodError> {
        if !(MIN_MOOD_SCORE..=MAX_MOOD_SCORE).contains(&self.mood_score) {
            return Err(MoodError::Validation(format!(
                "mood_score must be between {MIN_MOOD_SCORE} and {MAX_MOOD_SCORE}"
            )));
        }
        let tags = self.tags.map(|tags| {
            tags.into_iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect()
        });
        Ok(Self { tags, ..self })
    }
}

/// Offset pagination. Negative skip becomes 0; limit is clamped to
/// `1..=MAX_PAGE_LIMIT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub skip: i64,
    pub limit: i64,
}

impl Page {
    pub fn new(skip: Option<i64>, limit: Option<i64>) -> Self {
        Self {
            skip: skip.unwrap_or(0).max(0),
            limit: limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT),
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}

pub async fn create_entry(
    pool: &PgPool,
    user_id: Uuid,
    input: MoodInput,
) -> Result<MoodEntry, MoodError> {
    let input = input.validated()?;
    let entry = sqlx::query_as::<_, MoodEntry>(
        r#"
        INSERT INTO mood_entries (id, user_id, mood_score, note, tags)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, user_id, mood_score, note, tags, timestamp
        "#,
    )
    .bind(uuidv7())
    .bind(user_id)
    .bind(input.mood_score)
    .bind(&input.note)
    .bind(input.tags.unwrap_or_default())
    .fetch_one(pool)
    .await?;
    Ok(entry)
}

/// Newest first.
pub async fn list_entries(
    pool: &PgPool,
    user_id: Uuid,
    page: Page,
) -> Result<Vec<MoodEntry>, MoodError> {
    let rows = sqlx::query_as::<_, MoodEntry>(
        r#"
        SELECT id, user_id, mood_score, note, tags, timestamp
        FROM mood_entries
        WHERE user_id = $1
        ORDER BY timestamp DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(user_id)
    .bind(page.limit)
    .bind(page.skip)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn get_entry(pool: &PgPool, user_id: Uuid, entry_id: Uuid) -> Result<MoodEntry, MoodError> {
    sqlx::query_as::<_, MoodEntry>(
        r#"
        SELECT id, user_id, mood_score, note, tags, timestamp
        FROM mood_entries
        WHERE id = $1 AND user_id = $2
        "#,
    )
    .bind(entry_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or(MoodError::NotFound)
}

/// Replace score, note and tags. The original timestamp is kept.
pub async fn update_entry(
    pool: &PgPool,
    user_id: Uuid,
    entry_id: Uuid,
    input: MoodInput,
) -> Result<MoodEntry, MoodError> {
    let input = input.validated()?;
    sqlx::query_as::<_, MoodEntry>(
        r#"
        UPDATE mood_entries
        SET mood_score = $1, note = $2, tags = $3
        WHERE id = $4 AND user_id = $5
        RETURNING id, user_id, mood_score, note, tags, timestamp
        "#,
    )
    .bind(input.mood_score)
    .bind(&input.note)
    .bind(input.tags.unwrap_or_default())
    .bind(entry_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or(MoodError::NotFound)
}

pub async fn delete_entry(pool: &PgPool, user_id: Uuid, entry_id: Uuid) -> Result<(), MoodError> {
    let result = sqlx::query("DELETE FROM mood_entries WHERE id = $1 AND user_id = $2")
        .bind(entry_id)
        .bind(user_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(MoodError::NotFound);
    }
    Ok(())
}
