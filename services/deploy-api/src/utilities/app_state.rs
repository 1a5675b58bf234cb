use axum::extract::FromRef;
use shared::{
    services::{amqp::Amqp, database::Database},
    utilities::{config::Config, errors::AppError},
};

#[derive(FromRef, Clone)]
pub struct AppState {
    pub database: Database,
    pub amqp: Amqp,
    pub config: Config,
}

impl AppState {
    pub async fn init(config: &Config) -> Result<Self, AppError> {
        let database = Database::new(config).await?;
        let amqp = Amqp::new(config).await?;

        Ok(Self {
            database,
            amqp,
            config: config.clone(),
        })
    }
}
