use axum::{
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures::StreamExt;
use lapin::{
    Consumer,
    options::{BasicConsumeOptions, QueueBindOptions, QueueDeclareOptions},
    types::FieldTable,
};
use serde_json::json;
use shared::{
    services::amqp::Amqp,
    utilities::{errors::AppError, subjects::Subjects},
};
use tracing::debug;
use uuid::Uuid;

/// Live build log tail. Binds an ephemeral queue to `build.log.<id>` and
/// forwards every chunk to the websocket until the client goes away. Chunks
/// published while nobody is attached are dropped by the broker; the full log
/// always lands on the deployment row.
pub async fn ws_build_logs(
    ws: WebSocketUpgrade,
    Path(deployment_id): Path<Uuid>,
    State(amqp): State<Amqp>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, deployment_id, amqp))
}

async fn handle_socket(mut socket: WebSocket, deployment_id: Uuid, amqp: Amqp) {
    let mut consumer = match attach_tail(&amqp, deployment_id).await {
        Ok(consumer) => consumer,
        Err(e) => {
            let payload = json!({ "error": e.to_string() }).to_string();
            let _ = socket.send(Message::Text(payload.into())).await;
            return;
        }
    };

    loop {
        tokio::select! {
            delivery = consumer.next() => {
                match delivery {
                    Some(Ok(delivery)) => {
                        let chunk = String::from_utf8_lossy(&delivery.data).to_string();
                        if socket.send(Message::Text(chunk.into())).await.is_err() {
                            // Client disconnected
                            break;
                        }
                    }
                    _ => break,
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    debug!("Log tail for {} closed", deployment_id);
}

async fn attach_tail(amqp: &Amqp, deployment_id: Uuid) -> Result<Consumer, AppError> {
    let channel = amqp.channel().await?;
    Amqp::declare_topology(&channel).await?;

    // Server-named, exclusive, auto-delete: gone as soon as the tail detaches.
    let queue = channel
        .queue_declare(
            "",
            QueueDeclareOptions {
                durable: false,
                exclusive: true,
                auto_delete: true,
                nowait: false,
                passive: false,
            },
            FieldTable::default(),
        )
        .await?;

    channel
        .queue_bind(
            queue.name().as_str(),
            Subjects::BUILDS_EXCHANGE,
            &Subjects::build_log(deployment_id),
            QueueBindOptions::default(),
            FieldTable::default(),
        )
        .await?;

    let consumer = channel
        .basic_consume(
            queue.name().as_str(),
            "log-tail",
            BasicConsumeOptions {
                no_ack: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await?;

    Ok(consumer)
}
