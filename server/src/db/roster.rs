//! Read-only roster tables: candidates and users.

use serde::Serialize;
use sqlx::{PgPool, Row};
use tally_engine::{CandidateName, UserId};

/// A data-entry operator.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredUser {
    pub id: UserId,
    pub display_name: String,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for StoredUser {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(StoredUser {
            id: row.try_get("id")?,
            display_name: row.try_get("display_name")?,
        })
    }
}

/// Candidate names in roster order.
pub async fn get_candidates(pool: &PgPool) -> Result<Vec<CandidateName>, sqlx::Error> {
    sqlx::query_scalar(r#"SELECT name FROM candidates ORDER BY id ASC"#)
        .fetch_all(pool)
        .await
}

/// All users by id.
pub async fn get_users(pool: &PgPool) -> Result<Vec<StoredUser>, sqlx::Error> {
    sqlx::query_as::<_, StoredUser>(r#"SELECT id, display_name FROM users ORDER BY id ASC"#)
        .fetch_all(pool)
        .await
}

/// Check whether a user id exists.
pub async fn user_exists(pool: &PgPool, user_id: UserId) -> Result<bool, sqlx::Error> {
    let result: (bool,) = sqlx::query_as(r#"SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)"#)
        .bind(user_id)
        .fetch_one(pool)
        .await?;

    Ok(result.0)
}
