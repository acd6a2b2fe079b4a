use eventpulse::adapters::sqlite::{create_migrated_test_pool, SqliteEventRepository};
use eventpulse::domain::models::Event;
use eventpulse::domain::ports::EventRepository;
use sqlx::SqlitePool;

/// Create an in-memory SQLite database for testing
///
/// Each call creates a completely isolated database with migrations applied.
pub async fn setup_test_db() -> SqlitePool {
    create_migrated_test_pool()
        .await
        .expect("failed to create test database")
}

/// Teardown test database
pub async fn teardown_test_db(pool: SqlitePool) {
    pool.close().await;
}

/// Repository over a fresh database, pre-populated with `events`.
pub async fn seeded_repository(events: &[Event]) -> (SqlitePool, SqliteEventRepository) {
    let pool = setup_test_db().await;
    let repo = SqliteEventRepository::new(pool.clone());
    for event in events {
        repo.insert(event).await.expect("failed to seed event");
    }
    (pool, repo)
}
