//! Integration tests for the tally API.
//!
//! The wire-format tests run anywhere. The live tests need a running server
//! with a migrated PostgreSQL database that has candidates and users loaded;
//! set TALLY_SERVER_URL and DATABASE_URL (the server's database) and run
//! with `--ignored`.

use serde_json::json;
use tally_engine::{AddOutcome, BatchLedger, SaveReceipt, TallyView, UndoReceipt, VoteRecord};

fn roster() -> Vec<String> {
    vec!["A".to_string(), "B".to_string(), "C".to_string()]
}

#[cfg(test)]
mod wire_format_tests {
    use super::*;

    #[test]
    fn test_vote_record_serialization() {
        let record = VoteRecord::new("Alice", 2);
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"name":"Alice","votes":2}"#);
    }

    #[test]
    fn test_add_outcome_serialization() {
        let outcome = AddOutcome::Incremented {
            name: "Alice".to_string(),
            votes: 3,
        };
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(
            value,
            json!({"kind": "incremented", "name": "Alice", "votes": 3})
        );
    }

    #[test]
    fn test_tally_view_serialization() {
        let mut ledger = BatchLedger::new(roster());
        ledger.save_selection(&["B".to_string()], Some(1)).unwrap();

        let view = ledger.refresh_aggregate();
        let json = serde_json::to_string(&view).unwrap();

        assert!(json.contains("\"maxBatchNumber\":1"));
        assert!(json.contains("\"totalVoters\":2"));
        assert!(json.contains("\"totalVotes\":2"));
        assert!(json.contains("\"leader\":\"A\""));
    }

    #[test]
    fn test_empty_tally_view_serialization() {
        let view = BatchLedger::new(roster()).refresh_aggregate();
        let value = serde_json::to_value(&view).unwrap();

        assert_eq!(value["records"], json!([]));
        assert_eq!(value["summary"]["leader"], serde_json::Value::Null);
        assert_eq!(value["maxBatchNumber"], serde_json::Value::Null);
    }

    #[test]
    fn test_receipt_roundtrip() {
        let mut ledger = BatchLedger::new(roster());
        let saved = ledger.save_selection(&[], Some(2)).unwrap();
        let undone = ledger.undo_last_batch(Some(2)).unwrap();

        let saved_json = serde_json::to_string(&saved).unwrap();
        let undone_json = serde_json::to_string(&undone).unwrap();

        assert_eq!(
            serde_json::from_str::<SaveReceipt>(&saved_json).unwrap(),
            saved
        );
        assert_eq!(
            serde_json::from_str::<UndoReceipt>(&undone_json).unwrap(),
            undone
        );
        assert!(undone_json.contains("\"removed\":3"));
    }
}

#[cfg(test)]
mod live_tests {
    use super::*;
    use sqlx::PgPool;
    use tally_engine::UserId;
    use tokio::sync::Mutex;

    /// Live tests share one database; run them one at a time.
    static LIVE: Mutex<()> = Mutex::const_new(());

    fn base_url() -> String {
        std::env::var("TALLY_SERVER_URL").unwrap_or_else(|_| "http://127.0.0.1:3000".to_string())
    }

    async fn connect() -> PgPool {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        PgPool::connect(&url).await.unwrap()
    }

    /// Users and candidates created for one test and removed afterwards.
    struct Fixture {
        users: Vec<UserId>,
        candidates: Vec<String>,
    }

    impl Fixture {
        async fn create(pool: &PgPool, users: usize, candidates: usize) -> Self {
            let tag = uuid::Uuid::new_v4().simple().to_string();

            let mut user_ids = Vec::new();
            for i in 0..users {
                let id: i64 =
                    sqlx::query_scalar("INSERT INTO users (display_name) VALUES ($1) RETURNING id")
                        .bind(format!("live-{}-{}", tag, i))
                        .fetch_one(pool)
                        .await
                        .unwrap();
                user_ids.push(id);
            }

            let mut names = Vec::new();
            for i in 0..candidates {
                let name = format!("live-{}-{}", tag, i);
                sqlx::query("INSERT INTO candidates (name) VALUES ($1)")
                    .bind(&name)
                    .execute(pool)
                    .await
                    .unwrap();
                names.push(name);
            }

            Fixture {
                users: user_ids,
                candidates: names,
            }
        }

        async fn remove(self, pool: &PgPool) {
            sqlx::query("DELETE FROM entries WHERE user_id = ANY($1) OR candidate_name = ANY($2)")
                .bind(&self.users)
                .bind(&self.candidates)
                .execute(pool)
                .await
                .unwrap();
            sqlx::query("DELETE FROM candidates WHERE name = ANY($1)")
                .bind(&self.candidates)
                .execute(pool)
                .await
                .unwrap();
            sqlx::query("DELETE FROM users WHERE id = ANY($1)")
                .bind(&self.users)
                .execute(pool)
                .await
                .unwrap();
        }
    }

    async fn user_entries(
        client: &reqwest::Client,
        user_id: UserId,
    ) -> Vec<serde_json::Value> {
        client
            .get(format!("{}/users/{}/entries?limit=1000", base_url(), user_id))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }

    fn batch_of(entries: &[serde_json::Value], batch_number: i64) -> Vec<String> {
        let mut names: Vec<String> = entries
            .iter()
            .filter(|e| e["batchNumber"] == batch_number)
            .map(|e| e["candidateName"].as_str().unwrap().to_string())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    #[ignore = "requires a running server and database"]
    async fn test_undo_keeps_other_users_entries_in_same_batch() {
        let _guard = LIVE.lock().await;
        let pool = connect().await;
        let fixture = Fixture::create(&pool, 2, 2).await;
        let (first, second) = (fixture.users[0], fixture.users[1]);
        let client = reqwest::Client::new();

        // Two users holding the same batch number can only come from rows
        // written outside the save path, so write them directly.
        let shared: i64 =
            sqlx::query_scalar("SELECT COALESCE(MAX(batch_number), 0) + 1 FROM entries")
                .fetch_one(&pool)
                .await
                .unwrap();
        for user_id in [first, second] {
            for name in &fixture.candidates {
                sqlx::query(
                    "INSERT INTO entries (user_id, candidate_name, vote_delta, batch_number) \
                     VALUES ($1, $2, 1, $3)",
                )
                .bind(user_id)
                .bind(name)
                .bind(shared)
                .execute(&pool)
                .await
                .unwrap();
            }
        }

        let undone: UndoReceipt = client
            .post(format!("{}/batches/undo", base_url()))
            .json(&json!({"userId": first, "confirm": true}))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(undone.batch_number, shared);
        assert_eq!(undone.user_id, first);
        assert_eq!(undone.removed, 2);

        let mut expected = fixture.candidates.clone();
        expected.sort();
        assert!(batch_of(&user_entries(&client, first).await, shared).is_empty());
        assert_eq!(batch_of(&user_entries(&client, second).await, shared), expected);

        let response = client
            .post(format!("{}/batches/undo", base_url()))
            .json(&json!({"userId": first, "confirm": true}))
            .send()
            .await
            .unwrap();
        assert_eq!(
            response.status(),
            reqwest::StatusCode::UNPROCESSABLE_ENTITY
        );

        fixture.remove(&pool).await;
    }

    #[tokio::test]
    #[ignore = "requires a running server and database"]
    async fn test_save_with_exclusion_then_delete_candidate() {
        let _guard = LIVE.lock().await;
        let pool = connect().await;
        let fixture = Fixture::create(&pool, 2, 3).await;
        let (first, second) = (fixture.users[0], fixture.users[1]);
        let names = &fixture.candidates;
        let client = reqwest::Client::new();

        let saved: SaveReceipt = client
            .post(format!("{}/batches", base_url()))
            .json(&json!({"userId": first, "excluded": [names[1]]}))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert!(saved.candidates.contains(&names[0]));
        assert!(!saved.candidates.contains(&names[1]));
        assert!(saved.candidates.contains(&names[2]));

        let entries = user_entries(&client, first).await;
        let batch: Vec<&serde_json::Value> = entries
            .iter()
            .filter(|e| e["batchNumber"] == saved.batch_number)
            .collect();
        assert_eq!(batch.len(), saved.candidates.len());
        assert!(batch.iter().all(|e| e["voteDelta"] == 1));

        let other: SaveReceipt = client
            .post(format!("{}/batches", base_url()))
            .json(&json!({"userId": second, "excluded": []}))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(other.batch_number, saved.batch_number + 1);

        let before: TallyView = client
            .get(format!("{}/tally", base_url()))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let votes_for = |view: &TallyView, name: &str| {
            view.records
                .iter()
                .find(|r| r.name == name)
                .map(|r| r.votes)
        };
        assert_eq!(votes_for(&before, &names[0]), Some(2));
        assert_eq!(votes_for(&before, &names[1]), Some(1));

        let deleted: serde_json::Value = client
            .delete(format!("{}/candidates/{}/entries", base_url(), names[0]))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(deleted["removed"], 2);

        let after: TallyView = serde_json::from_value(deleted["tally"].clone()).unwrap();
        assert_eq!(votes_for(&after, &names[0]), None);
        assert_eq!(votes_for(&after, &names[2]), Some(2));
        assert!(user_entries(&client, second)
            .await
            .iter()
            .all(|e| e["candidateName"] != names[0].as_str()));

        fixture.remove(&pool).await;
    }

    #[tokio::test]
    #[ignore = "requires a running server and database"]
    async fn test_save_then_undo_round_trip() {
        let _guard = LIVE.lock().await;
        let client = reqwest::Client::new();
        let base = base_url();

        let users: Vec<serde_json::Value> = client
            .get(format!("{}/roster/users", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let user_id = users[0]["id"].as_i64().unwrap();

        let before: TallyView = client
            .get(format!("{}/tally", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        let saved: SaveReceipt = client
            .post(format!("{}/batches", base))
            .json(&json!({"userId": user_id, "excluded": []}))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(
            saved.batch_number,
            before.max_batch_number.unwrap_or(0) + 1
        );

        let response = client
            .post(format!("{}/batches/undo", base))
            .json(&json!({"userId": user_id}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

        let undone: UndoReceipt = client
            .post(format!("{}/batches/undo", base))
            .json(&json!({"userId": user_id, "confirm": true}))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(undone.batch_number, saved.batch_number);
        assert_eq!(undone.removed, saved.candidates.len());

        let after: TallyView = client
            .get(format!("{}/tally", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(after.summary.total_votes, before.summary.total_votes);
    }

    #[tokio::test]
    #[ignore = "requires a running server and database"]
    async fn test_save_without_user_is_rejected() {
        let client = reqwest::Client::new();

        let response = client
            .post(format!("{}/batches", base_url()))
            .json(&json!({"excluded": []}))
            .send()
            .await
            .unwrap();

        assert_eq!(
            response.status(),
            reqwest::StatusCode::UNPROCESSABLE_ENTITY
        );
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["severity"], "warning");
    }
}
