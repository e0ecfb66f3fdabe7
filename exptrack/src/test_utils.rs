//! Test utilities for integration testing.

use crate::api::models::experiments::{ExperimentCreate, ExperimentResponse};
use crate::config::{Config, PoolSettings};
use crate::db::{
    handlers::{Experiments, Repository, Users},
    models::{experiments::ExperimentCreateDBRequest, users::UserCreateDBRequest, users::UserDBResponse},
};
use axum_test::TestServer;
use sqlx::SqlitePool;

pub async fn create_test_app(pool: SqlitePool) -> TestServer {
    let config = create_test_config();

    let app = crate::Application::new_with_pool(config, Some(pool))
        .await
        .expect("Failed to create application");

    app.into_test_server()
}

pub fn create_test_config() -> Config {
    let mut config = Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        seed_on_startup: false,
        ..Default::default()
    };
    config.database.pool = PoolSettings {
        max_connections: 1,
        min_connections: 0,
        ..Default::default()
    };
    config
}

pub async fn create_test_user(pool: &SqlitePool, name: &str, email: &str) -> UserDBResponse {
    let mut conn = pool.acquire().await.expect("Failed to acquire database connection");
    let mut users = Users::new(&mut conn);

    let request = UserCreateDBRequest::builder()
        .name(name)
        .email(email)
        .department("Marketing")
        .profile_picture("/static/avatar1.png")
        .build();

    users.create(&request).await.expect("Failed to create test user")
}

/// Create an experiment from a JSON body, exactly as the create endpoint would accept it.
pub async fn create_test_experiment(pool: &SqlitePool, body: serde_json::Value) -> ExperimentResponse {
    let input: ExperimentCreate = serde_json::from_value(body).expect("Invalid test experiment body");
    input.validate().expect("Test experiment body failed validation");

    let mut conn = pool.acquire().await.expect("Failed to acquire database connection");
    let mut experiments = Experiments::new(&mut conn);

    let request = ExperimentCreateDBRequest::from(input);
    let created = experiments.create(&request).await.expect("Failed to create test experiment");

    ExperimentResponse::from(created)
}
