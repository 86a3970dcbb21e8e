//! Repository tests against a real Postgres instance.
//!
//! Each test creates its own database from `configuration.yaml` / `APP_*`
//! settings. Run with `cargo test -- --ignored` once Postgres is up.

use std::sync::Arc;

use chrono::{Duration, Utc};
use sqlx::{Connection, Executor, PgConnection, PgPool};
use token_rotation::auth::TokenService;
use token_rotation::configuration::{get_configuration, DatabaseSettings, RefreshTokenSettings};
use token_rotation::error::AppError;
use token_rotation::store::{
    ConsumeOutcome, PostgresRefreshTokenRepository, RefreshTokenRecord, RefreshTokenRepository,
};

const USER_ID: &str = "11111111-1111-4111-8111-111111111111";

pub async fn configure_database(config: &DatabaseSettings) -> PgPool {
    let mut connection = PgConnection::connect(&config.connection_string_without_db())
        .await
        .expect("Failed to connect to Postgres");
    connection
        .execute(&*format!(r#"CREATE DATABASE "{}";"#, config.database_name))
        .await
        .expect("Failed to create database.");

    let connection_pool = PgPool::connect(&config.connection_string())
        .await
        .expect("Failed to connect to Postgres.");
    sqlx::migrate!("./migrations")
        .run(&connection_pool)
        .await
        .expect("Failed to migrate the database.");
    connection_pool
}

async fn repository() -> (PgPool, PostgresRefreshTokenRepository) {
    let mut configuration = get_configuration().expect("Failed to read configuration.");
    configuration.database.database_name = uuid::Uuid::new_v4().to_string();
    let pool = configure_database(&configuration.database).await;
    (pool.clone(), PostgresRefreshTokenRepository::new(pool))
}

fn record(hash: &str, created_at: chrono::DateTime<Utc>) -> RefreshTokenRecord {
    RefreshTokenRecord {
        user_id: USER_ID.to_string(),
        token_hash: hash.to_string(),
        client_ip: "10.0.0.1".to_string(),
        created_at,
    }
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn consume_latest_deletes_matching_row() {
    let (pool, repo) = repository().await;
    let now = Utc::now();
    repo.insert(&record("older", now - Duration::minutes(1)), false)
        .await
        .unwrap();
    repo.insert(&record("newer", now), false).await.unwrap();

    let outcome = repo
        .consume_latest(USER_ID, &|hash: &str| Ok::<bool, AppError>(hash == "newer"))
        .await
        .unwrap();
    assert!(matches!(outcome, ConsumeOutcome::Consumed(ref r) if r.token_hash == "newer"));

    let remaining =
        sqlx::query_scalar::<_, String>("SELECT refresh_token_hash FROM refresh_tokens WHERE user_id = $1")
            .bind(USER_ID)
            .fetch_all(&pool)
            .await
            .unwrap();
    assert_eq!(remaining, vec!["older".to_string()]);
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn mismatch_leaves_row_in_place() {
    let (_, repo) = repository().await;
    repo.insert(&record("h1", Utc::now()), false).await.unwrap();

    let outcome = repo
        .consume_latest(USER_ID, &|_: &str| Ok::<bool, AppError>(false))
        .await
        .unwrap();

    assert_eq!(outcome, ConsumeOutcome::Mismatch);
    assert_eq!(repo.count_for_user(USER_ID).await.unwrap(), 1);
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn replace_existing_and_purge() {
    let (_, repo) = repository().await;
    let now = Utc::now();
    repo.insert(&record("h1", now - Duration::days(60)), false)
        .await
        .unwrap();
    repo.insert(&record("h2", now - Duration::days(45)), false)
        .await
        .unwrap();
    assert_eq!(
        repo.purge_created_before(now - Duration::days(50)).await.unwrap(),
        1
    );

    repo.insert(&record("h3", now), true).await.unwrap();
    assert_eq!(repo.count_for_user(USER_ID).await.unwrap(), 1);
    assert_eq!(repo.latest(USER_ID).await.unwrap().unwrap().token_hash, "h3");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "requires a running Postgres"]
async fn concurrent_refresh_has_one_winner() {
    let (_, repo) = repository().await;
    let configuration = get_configuration().expect("Failed to read configuration.");
    let refresh = RefreshTokenSettings {
        hash_cost: 4,
        single_active_token: false,
    };
    let service = TokenService::new(&configuration.jwt, &refresh, Arc::new(repo));
    let pair = service.issue_pair(USER_ID, "10.0.0.1").await.unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let service = service.clone();
            let token = pair.refresh_token.clone();
            tokio::spawn(async move { service.refresh(USER_ID, &token, "10.0.0.1").await })
        })
        .collect();

    let mut successes = 0;
    for handle in handles {
        if handle.await.expect("task panicked").is_ok() {
            successes += 1;
        }
    }
    assert_eq!(successes, 1);
}
