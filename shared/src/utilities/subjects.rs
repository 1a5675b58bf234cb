use uuid::Uuid;

/// Exchange, queue and routing-key names shared by every role on the bus.
///
/// One durable topic exchange per logical stream; the durable subjects double
/// as queue names so a queue is trivially traceable back to its binding.
pub struct Subjects;

impl Subjects {
    /// Exchange carrying `deploy.*` subjects.
    pub const DEPLOYMENTS_EXCHANGE: &'static str = "deployments";

    /// Exchange carrying `build.*` subjects.
    pub const BUILDS_EXCHANGE: &'static str = "builds";

    /// Durable subject consumed by the build worker.
    pub const DEPLOY_REQUEST: &'static str = "deploy.request";

    /// Durable subject consumed by the deploy worker.
    pub const BUILD_COMPLETE: &'static str = "build.complete";

    /// Per-deployment live log subject. No durable queue is bound to it, so
    /// chunks published here reach only currently-attached tails.
    pub fn build_log(deployment_id: Uuid) -> String {
        format!("build.log.{deployment_id}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_log_subject_embeds_the_deployment_id() {
        let id = Uuid::nil();
        assert_eq!(
            Subjects::build_log(id),
            "build.log.00000000-0000-0000-0000-000000000000"
        );
    }
}
