//! Database operations for the entries table.

use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use tally_engine::{BatchEntry, BatchNumber, EntryId, NewEntry, UserId};

/// A stored entry row from the database.
#[derive(Debug)]
pub struct StoredEntry {
    pub id: i64,
    pub user_id: i64,
    pub candidate_name: String,
    pub vote_delta: i64,
    pub batch_number: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for StoredEntry {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(StoredEntry {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            candidate_name: row.try_get("candidate_name")?,
            vote_delta: row.try_get("vote_delta")?,
            batch_number: row.try_get("batch_number")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl StoredEntry {
    /// Convert database row to a tally-engine entry.
    pub fn to_entry(&self) -> BatchEntry {
        BatchEntry {
            id: self.id,
            user_id: self.user_id,
            candidate_name: self.candidate_name.clone(),
            vote_delta: self.vote_delta,
            batch_number: self.batch_number,
        }
    }
}

/// Get every entry, oldest first.
pub async fn get_all_entries(pool: &PgPool) -> Result<Vec<StoredEntry>, sqlx::Error> {
    sqlx::query_as::<_, StoredEntry>(
        r#"
        SELECT id, user_id, candidate_name, vote_delta, batch_number, created_at
        FROM entries
        ORDER BY id ASC
        "#,
    )
    .fetch_all(pool)
    .await
}

/// Get a user's entries, newest first.
pub async fn get_user_entries(
    pool: &PgPool,
    user_id: UserId,
    limit: i64,
) -> Result<Vec<StoredEntry>, sqlx::Error> {
    sqlx::query_as::<_, StoredEntry>(
        r#"
        SELECT id, user_id, candidate_name, vote_delta, batch_number, created_at
        FROM entries
        WHERE user_id = $1
        ORDER BY id DESC
        LIMIT $2
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// Highest batch number across all users.
pub async fn get_max_batch_number(pool: &PgPool) -> Result<Option<BatchNumber>, sqlx::Error> {
    let result: Option<(i64,)> =
        sqlx::query_as(r#"SELECT batch_number FROM entries ORDER BY batch_number DESC LIMIT 1"#)
            .fetch_optional(pool)
            .await?;

    Ok(result.map(|r| r.0))
}

/// Highest batch number written by one user.
pub async fn get_last_batch_for_user(
    pool: &PgPool,
    user_id: UserId,
) -> Result<Option<BatchNumber>, sqlx::Error> {
    let result: Option<(i64,)> = sqlx::query_as(
        r#"
        SELECT batch_number FROM entries
        WHERE user_id = $1
        ORDER BY batch_number DESC
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(result.map(|r| r.0))
}

/// The most recent entry for a user and candidate, as `(id, vote_delta)`.
pub async fn find_user_entry(
    pool: &PgPool,
    user_id: UserId,
    candidate_name: &str,
) -> Result<Option<(EntryId, i64)>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT id, vote_delta FROM entries
        WHERE user_id = $1 AND candidate_name = $2
        ORDER BY id DESC
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .bind(candidate_name)
    .fetch_optional(pool)
    .await
}

/// Insert entries in one statement inside a transaction.
///
/// Either every row is written or none is.
pub async fn insert_entries(pool: &PgPool, entries: &[NewEntry]) -> Result<u64, sqlx::Error> {
    if entries.is_empty() {
        return Ok(0);
    }

    let mut tx = pool.begin().await?;

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
        "INSERT INTO entries (user_id, candidate_name, vote_delta, batch_number) ",
    );
    builder.push_values(entries, |mut row, entry| {
        row.push_bind(entry.user_id)
            .push_bind(&entry.candidate_name)
            .push_bind(entry.vote_delta)
            .push_bind(entry.batch_number);
    });
    let result = builder.build().execute(&mut *tx).await?;

    tx.commit().await?;

    Ok(result.rows_affected())
}

/// Overwrite the vote delta of one entry.
pub async fn update_entry_delta(
    pool: &PgPool,
    id: EntryId,
    vote_delta: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(r#"UPDATE entries SET vote_delta = $1 WHERE id = $2"#)
        .bind(vote_delta)
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete every entry for a candidate, for all users and batches.
pub async fn delete_candidate_entries(
    pool: &PgPool,
    candidate_name: &str,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(r#"DELETE FROM entries WHERE candidate_name = $1"#)
        .bind(candidate_name)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

/// Delete one user's entries in one batch.
pub async fn delete_user_batch(
    pool: &PgPool,
    user_id: UserId,
    batch_number: BatchNumber,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(r#"DELETE FROM entries WHERE user_id = $1 AND batch_number = $2"#)
        .bind(user_id)
        .bind(batch_number)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}
