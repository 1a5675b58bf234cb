use futures::StreamExt;
use lapin::{
    Consumer,
    options::{
        BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicQosOptions,
        BasicRejectOptions,
    },
    types::FieldTable,
};
use shared::{
    schemas::DeployRequestMessage,
    services::amqp::Amqp,
    utilities::{config::Config, errors::AppError, subjects::Subjects},
};
use tracing::{error, info, warn};

use crate::services::build_service::BuildService;

pub async fn start_consumer(amqp: Amqp, config: Config) -> Result<(), AppError> {
    let channel = amqp.channel().await?;
    Amqp::declare_topology(&channel).await?;

    // One build at a time per worker; throughput comes from replicas.
    channel.basic_qos(1, BasicQosOptions::default()).await?;

    let consumer = channel
        .basic_consume(
            Subjects::DEPLOY_REQUEST,
            "builder",
            BasicConsumeOptions::default(),
            FieldTable::default(),
        )
        .await?;

    let service = BuildService { amqp, config };

    info!("🎯 Build consumer started");
    handle_deploy_requests(service, consumer).await;

    Ok(())
}

async fn handle_deploy_requests(service: BuildService, mut consumer: Consumer) {
    while let Some(delivery) = consumer.next().await {
        match delivery {
            Ok(delivery) => {
                match serde_json::from_slice::<DeployRequestMessage>(&delivery.data) {
                    Ok(event) => {
                        let deployment_id = event.deployment_id;
                        info!("📦 Processing deployment {}", deployment_id);

                        let completion = service.process(event).await;

                        // Ack only once the completion event is on the bus; a
                        // failed publish redelivers the whole build rather
                        // than stranding the deployment in pending.
                        let published = service
                            .amqp
                            .basic_publish(
                                Subjects::BUILDS_EXCHANGE,
                                Subjects::BUILD_COMPLETE,
                                &completion,
                            )
                            .await;

                        match published {
                            Ok(()) => {
                                if completion.success {
                                    info!("✅ Build for {} complete", deployment_id);
                                } else {
                                    warn!("❌ Build for {} failed", deployment_id);
                                }

                                if let Err(e) = delivery.ack(BasicAckOptions::default()).await {
                                    error!("Failed to ack message: {}", e);
                                }
                            }
                            Err(e) => {
                                error!(
                                    "Failed to publish build.complete for {}: {}",
                                    deployment_id, e
                                );

                                if let Err(e) = delivery
                                    .nack(BasicNackOptions {
                                        requeue: true,
                                        multiple: false,
                                    })
                                    .await
                                {
                                    error!("Failed to nack message: {}", e);
                                }
                            }
                        }
                    }
                    Err(e) => {
                        error!("❌ Failed to parse DeployRequestMessage: {}", e);
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
