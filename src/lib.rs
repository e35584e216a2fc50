pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use crate::services::{question_service::QuestionService, test_service::TestService};
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub question_service: QuestionService,
    pub test_service: TestService,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        let question_service = QuestionService::new(pool.clone());
        let test_service = TestService::new(pool.clone());

        Self {
            pool,
            question_service,
            test_service,
        }
    }
}
