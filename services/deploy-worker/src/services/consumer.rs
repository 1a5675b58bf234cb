use futures::StreamExt;
use kube::Client;
use lapin::{
    Consumer,
    options::{BasicAckOptions, BasicConsumeOptions, BasicQosOptions, BasicRejectOptions},
    types::FieldTable,
};
use sqlx::PgPool;
use shared::{
    schemas::BuildCompleteMessage,
    services::amqp::Amqp,
    utilities::{config::Config, errors::AppError, subjects::Subjects},
};
use tracing::{error, info, warn};

use crate::services::{kubernetes_service::KubernetesService, rollout_service::RolloutService};

pub async fn start_consumer(
    amqp: Amqp,
    pool: PgPool,
    client: Client,
    config: Config,
) -> Result<(), AppError> {
    let channel = amqp.channel().await?;
    Amqp::declare_topology(&channel).await?;

    channel.basic_qos(10, BasicQosOptions::default()).await?;

    let consumer = channel
        .basic_consume(
            Subjects::BUILD_COMPLETE,
            "rollouter",
            BasicConsumeOptions::default(),
            FieldTable::default(),
        )
        .await?;

    let service = RolloutService {
        pool,
        kubernetes: KubernetesService {
            client,
            namespace: config.k8s_namespace,
            base_domain: config.base_domain,
        },
    };

    info!("🎯 Rollout consumer started");
    handle_build_completions(service, consumer).await;

    Ok(())
}

async fn handle_build_completions(service: RolloutService, mut consumer: Consumer) {
    while let Some(delivery) = consumer.next().await {
        match delivery {
            Ok(delivery) => {
                match serde_json::from_slice::<BuildCompleteMessage>(&delivery.data) {
                    Ok(event) => {
                        info!("🚀 Deploying {}", event.deployment_id);

                        // Deployment-fatal failures are recorded on the row;
                        // infrastructure failures land here and would fail the
                        // same way on redelivery, so the event is acked either
                        // way and the row stays observable.
                        if let Err(e) = service.process(event).await {
                            error!("Failed to process build.complete: {}", e);
                        }

                        if let Err(e) = delivery.ack(BasicAckOptions::default()).await {
                            error!("Failed to ack message: {}", e);
                        }
                    }
                    Err(e) => {
                        error!("❌ Failed to parse BuildCompleteMessage: {}", e);
                        warn!("Payload: {}", String::from_utf8_lossy(&delivery.data));

                        // Don't requeue malformed messages
                        if let Err(e) = delivery.reject(BasicRejectOptions { requeue: false }).await
                        {
                            error!("Failed to reject message: {}", e);
                        }
                    }
                }
            }
            Err(e) => {
                error!("Consumer error: {}", e);
            }
        }
    }
}
