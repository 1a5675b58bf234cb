use lapin::{BasicProperties, Channel, options::BasicPublishOptions};
use shared::utilities::subjects::Subjects;
use tracing::debug;
use uuid::Uuid;

/// Build log writer with live fan-out.
///
/// The in-memory buffer is authoritative and is what the completion event
/// carries. Each appended chunk is additionally offered to the per-deployment
/// tail subject, where the broker drops it unless a tail is attached, so a
/// publish failure here never fails a build.
pub struct BuildLog {
    buffer: String,
    channel: Option<Channel>,
    routing_key: String,
}

impl BuildLog {
    pub fn new(channel: Option<Channel>, deployment_id: Uuid) -> Self {
        Self {
            buffer: String::new(),
            channel,
            routing_key: Subjects::build_log(deployment_id),
        }
    }

    pub async fn append(&mut self, chunk: &str) {
        self.buffer.push_str(chunk);

        let Some(channel) = &self.channel else {
            return;
        };

        let published = channel
            .basic_publish(
                Subjects::BUILDS_EXCHANGE,
                &self.routing_key,
                BasicPublishOptions::default(),
                chunk.as_bytes(),
                BasicProperties::default()
                    .with_delivery_mode(1)
                    .with_content_type("text/plain".into()),
            )
            .await;

        if let Err(e) = published {
            debug!("Live chunk for {} not published: {}", self.routing_key, e);
        }
    }

    pub fn into_contents(self) -> String {
        self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn buffer_accumulates_without_a_channel() {
        let mut log = BuildLog::new(None, Uuid::new_v4());
        log.append("Cloning repository\n").await;
        log.append("Detected framework: static\n").await;

        assert_eq!(
            log.into_contents(),
            "Cloning repository\nDetected framework: static\n"
        );
    }
}
