use chat_service::migrations;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

/// Connect to the test database, or None when DATABASE_URL is not
/// exported (the suite skips instead of failing on dev machines
/// without Postgres).
pub async fn test_pool() -> Option<PgPool> {
    dotenvy::dotenv().ok();
    let url = match std::env::var("DATABASE_URL") {
        Ok(u) => u,
        Err(_) => {
            eprintln!("DATABASE_URL not set; skipping database-backed test");
            return None;
        }
    };
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("connect to test database");
    migrations::run_all(&pool).await.expect("run migrations");
    Some(pool)
}

pub async fn seed_user(pool: &PgPool, name: &str) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO users (id, name, email) VALUES ($1, $2, $3)")
        .bind(id)
        .bind(name)
        .bind(format!("{id}@example.test"))
        .execute(pool)
        .await
        .expect("seed user");
    id
}
