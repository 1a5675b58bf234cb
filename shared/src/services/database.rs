use sqlx::{PgPool, postgres::PgPoolOptions};
use tracing::info;

use crate::utilities::{config::Config, errors::AppError};

#[derive(Clone)]
pub struct Database {
    pub pool: PgPool,
}

impl Database {
    pub async fn new(config: &Config) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(20)
            .connect(&config.database_url)
            .await?;

        info!("✅ Postgres pool created.");

        Ok(Self { pool })
    }
}
