use sqlx::PgPool;
use tracing::{error, info, warn};
use uuid::Uuid;

use shared::{
    models::DeploymentStatus, schemas::BuildCompleteMessage, utilities::errors::AppError,
};

use super::kubernetes_service::{KubernetesService, route_host};

#[derive(Clone)]
pub struct RolloutService {
    pub pool: PgPool,
    pub kubernetes: KubernetesService,
}

impl RolloutService {
    /// Apply one `build.complete` event to the deployment row and the
    /// cluster.
    ///
    /// Safe under redelivery: every status write is a guarded forward-only
    /// transition and the cluster calls converge, so processing the same
    /// event twice ends in the same row and the same objects.
    pub async fn process(&self, event: BuildCompleteMessage) -> Result<(), AppError> {
        let deployment_id = event.deployment_id;

        let Some((status, subdomain)) = self.fetch_row(deployment_id).await? else {
            warn!("No deployment row for {}, dropping event", deployment_id);
            return Ok(());
        };

        if status.is_terminal() {
            info!(
                "Deployment {} already settled as {}, ignoring redelivery",
                deployment_id, status
            );
            return Ok(());
        }

        // The build has happened by the time this event arrives; record the
        // stage and its log on behalf of the builder.
        self.advance_status(deployment_id, DeploymentStatus::Building)
            .await?;
        self.persist_logs(deployment_id, &event.logs).await?;

        if !event.success {
            self.advance_status(deployment_id, DeploymentStatus::Error)
                .await?;
            warn!("❌ Build for {} failed, deployment marked error", deployment_id);
            return Ok(());
        }

        // Image first, then status: a deploying row always names its image.
        self.persist_image(deployment_id, &event.image_url).await?;
        self.advance_status(deployment_id, DeploymentStatus::Deploying)
            .await?;

        match self.rollout(deployment_id, &event.image_url, &subdomain).await {
            Ok(()) => {
                self.advance_status(deployment_id, DeploymentStatus::Ready)
                    .await?;
                info!(
                    "✅ Deployment {} is ready at {}",
                    deployment_id,
                    route_host(&subdomain, &self.kubernetes.base_domain)
                );
            }
            Err(e) => {
                error!("Rollout for {} failed: {}", deployment_id, e);
                self.advance_status(deployment_id, DeploymentStatus::Error)
                    .await?;
            }
        }

        Ok(())
    }

    async fn rollout(
        &self,
        deployment_id: Uuid,
        image_url: &str,
        subdomain: &str,
    ) -> Result<(), AppError> {
        let name = KubernetesService::object_name(deployment_id);

        self.kubernetes.ensure_namespace().await?;
        self.kubernetes.ensure_workload(&name, image_url).await?;
        self.kubernetes.ensure_service(&name).await?;
        self.kubernetes.ensure_ingress(&name, subdomain).await?;

        // Best effort: a deployment without its autoscaler still serves.
        if let Err(e) = self.kubernetes.ensure_autoscaler(&name).await {
            warn!("Autoscaler for {} not applied: {}", name, e);
        }

        Ok(())
    }

    async fn fetch_row(
        &self,
        deployment_id: Uuid,
    ) -> Result<Option<(DeploymentStatus, String)>, AppError> {
        let row = sqlx::query_as::<_, (DeploymentStatus, String)>(
            r#"
                SELECT status, subdomain
                FROM deployments
                WHERE id = $1
            "#,
        )
        .bind(deployment_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Guarded forward-only transition; reports whether the row moved.
    /// A redelivered or racing write that would not advance matches no row
    /// and is thereby a no-op.
    async fn advance_status(
        &self,
        deployment_id: Uuid,
        next: DeploymentStatus,
    ) -> Result<bool, AppError> {
        let allowed = DeploymentStatus::allowed_predecessors(next);

        let result = sqlx::query(
            r#"
                UPDATE deployments
                SET status = $1, updated_at = CURRENT_TIMESTAMP
                WHERE id = $2 AND status = ANY($3)
            "#,
        )
        .bind(next)
        .bind(deployment_id)
        .bind(&allowed)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn persist_logs(&self, deployment_id: Uuid, logs: &str) -> Result<(), AppError> {
        sqlx::query(
            r#"
                UPDATE deployments
                SET build_logs = $1, updated_at = CURRENT_TIMESTAMP
                WHERE id = $2
            "#,
        )
        .bind(logs)
        .bind(deployment_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn persist_image(&self, deployment_id: Uuid, image_url: &str) -> Result<(), AppError> {
        sqlx::query(
            r#"
                UPDATE deployments
                SET image_url = $1, updated_at = CURRENT_TIMESTAMP
                WHERE id = $2
            "#,
        )
        .bind(image_url)
        .bind(deployment_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
