use std::sync::Arc;

use lapin::{
    BasicProperties, Channel, Connection, ConnectionProperties,
    options::{
        BasicPublishOptions, ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions,
    },
    types::FieldTable,
};
use serde::Serialize;
use tracing::info;

use crate::utilities::{config::Config, errors::AppError, subjects::Subjects};

#[derive(Clone)]
pub struct Amqp {
    connection: Arc<Connection>,
}

impl Amqp {
    pub async fn new(config: &Config) -> Result<Self, AppError> {
        let connection =
            Connection::connect(&config.amqp_addr, ConnectionProperties::default()).await?;

        info!("✅ RabbitMQ connection established.");

        Ok(Self {
            connection: Arc::new(connection),
        })
    }

    pub async fn channel(&self) -> Result<Channel, AppError> {
        Ok(self.connection.create_channel().await?)
    }

    /// Declare both stream exchanges and their durable subject queues.
    ///
    /// Idempotent; every role runs it on startup and the publisher runs it
    /// before the first publish, so the topology exists no matter which
    /// process comes up first. The live-tail subject `build.log.<id>` gets no
    /// durable queue here on purpose.
    pub async fn declare_topology(channel: &Channel) -> Result<(), AppError> {
        for (exchange, queue) in [
            (Subjects::DEPLOYMENTS_EXCHANGE, Subjects::DEPLOY_REQUEST),
            (Subjects::BUILDS_EXCHANGE, Subjects::BUILD_COMPLETE),
        ] {
            channel
                .exchange_declare(
                    exchange,
                    lapin::ExchangeKind::Topic,
                    ExchangeDeclareOptions {
                        durable: true,
                        auto_delete: false,
                        internal: false,
                        nowait: false,
                        passive: false,
                    },
                    FieldTable::default(),
                )
                .await?;

            channel
                .queue_declare(
                    queue,
                    QueueDeclareOptions {
                        durable: true,
                        exclusive: false,
                        auto_delete: false,
                        nowait: false,
                        passive: false,
                    },
                    FieldTable::default(),
                )
                .await?;

            channel
                .queue_bind(
                    queue,
                    exchange,
                    queue,
                    QueueBindOptions::default(),
                    FieldTable::default(),
                )
                .await?;
        }

        Ok(())
    }

    /// Publish a durable event and wait for the broker confirm.
    pub async fn basic_publish<T: Serialize>(
        &self,
        exchange: &str,
        routing_key: &str,
        message: &T,
    ) -> Result<(), AppError> {
        let channel = self.channel().await?;

        let payload = serde_json::to_vec(message)?;

        channel
            .basic_publish(
                exchange,
                routing_key,
                BasicPublishOptions {
                    mandatory: false,
                    immediate: false,
                },
                &payload,
                BasicProperties::default()
                    .with_delivery_mode(2)
                    .with_content_type("application/json".into()),
            )
            .await?
            .await?;

        Ok(())
    }
}
