use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use shared::{
    schemas::{DeployRequestMessage, ListResponse, TriggerDeployRequest},
    services::{amqp::Amqp, database::Database},
    utilities::{errors::AppError, subjects::Subjects},
};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::features::repository::{DeploymentRepository, ProjectRepository};

const MAX_SUBDOMAIN_ATTEMPTS: usize = 5;

// ============================================
// DEPLOYMENT HANDLERS
// ============================================

pub async fn trigger_deployment(
    State(database): State<Database>,
    State(amqp): State<Amqp>,
    Json(req): Json<TriggerDeployRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    // Verify project ownership
    let project = ProjectRepository::get_by_id(&database.pool, req.project_id)
        .await?
        .ok_or_else(|| AppError::NotFoundError("Project not found".to_string()))?;

    if project.user_id != req.user_id {
        return Err(AppError::ForbiddenError(
            "Project belongs to another user".to_string(),
        ));
    }

    let commit_hash = req.commit_hash.unwrap_or_default();

    // Insert with a fresh subdomain; the unique constraint arbitrates the
    // rare collision and we retry with a new one.
    let mut deployment = None;
    for attempt in 1..=MAX_SUBDOMAIN_ATTEMPTS {
        let subdomain = generate_subdomain();

        match DeploymentRepository::create(&database.pool, project.id, &subdomain, &commit_hash)
            .await
        {
            Ok(created) => {
                deployment = Some(created);
                break;
            }
            Err(e) if is_unique_violation(&e) => {
                warn!(
                    "Subdomain {} already taken (attempt {}/{})",
                    subdomain, attempt, MAX_SUBDOMAIN_ATTEMPTS
                );
            }
            Err(e) => return Err(e.into()),
        }
    }

    let deployment = deployment.ok_or_else(|| {
        AppError::ConflictError("Could not allocate a unique subdomain".to_string())
    })?;

    // The row is durably written at this point. A failed publish leaves it
    // pending and reports the bus outage to the caller.
    let channel = amqp.channel().await?;
    Amqp::declare_topology(&channel).await?;

    let message = DeployRequestMessage {
        deployment_id: deployment.id,
        project_id: project.id,
        repo_url: project.repo_url,
        build_command: project.build_command,
        output_dir: project.output_dir,
        commit_hash,
    };

    amqp.basic_publish(
        Subjects::DEPLOYMENTS_EXCHANGE,
        Subjects::DEPLOY_REQUEST,
        &message,
    )
    .await?;

    info!("📦 Deployment {} triggered", deployment.id);

    Ok((StatusCode::CREATED, Json(deployment)))
}

pub async fn get_deployment(
    Path(deployment_id): Path<Uuid>,
    State(database): State<Database>,
) -> Result<impl IntoResponse, AppError> {
    let deployment = DeploymentRepository::get_by_id(&database.pool, deployment_id)
        .await?
        .ok_or_else(|| AppError::NotFoundError("Deployment not found".to_string()))?;

    Ok(Json(deployment))
}

pub async fn get_deployments(
    Path(project_id): Path<Uuid>,
    State(database): State<Database>,
) -> Result<impl IntoResponse, AppError> {
    let (deployments, total) =
        DeploymentRepository::get_all_by_project(&database.pool, project_id).await?;

    Ok(Json(ListResponse {
        data: deployments,
        total,
    }))
}

/// `app-` plus the first eight hex characters of a fresh uuid.
fn generate_subdomain() -> String {
    format!("app-{}", &Uuid::new_v4().simple().to_string()[..8])
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subdomains_are_app_prefixed_lowercase_hex() {
        for _ in 0..64 {
            let subdomain = generate_subdomain();
            let suffix = subdomain.strip_prefix("app-").expect("app- prefix");
            assert_eq!(suffix.len(), 8);
            assert!(suffix.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        }
    }
}
