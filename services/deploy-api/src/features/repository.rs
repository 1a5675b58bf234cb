use sqlx::PgPool;
use uuid::Uuid;

use shared::models::{Deployment, Project};

pub struct ProjectRepository;

impl ProjectRepository {
    pub async fn get_by_id(pool: &PgPool, project_id: Uuid) -> Result<Option<Project>, sqlx::Error> {
        sqlx::query_as::<_, Project>(
            r#"
                SELECT id, user_id, name, repo_url, build_command, output_dir, created_at
                FROM projects
                WHERE id = $1
            "#,
        )
        .bind(project_id)
        .fetch_optional(pool)
        .await
    }
}

pub struct DeploymentRepository;

impl DeploymentRepository {
    /// Insert the new row with its generated subdomain. The row starts out
    /// `pending` via the column default; the insert is the commit point of a
    /// trigger. Bubbles the unique-violation up so the caller can retry with
    /// a fresh subdomain.
    pub async fn create(
        pool: &PgPool,
        project_id: Uuid,
        subdomain: &str,
        commit_hash: &str,
    ) -> Result<Deployment, sqlx::Error> {
        sqlx::query_as::<_, Deployment>(
            r#"
                INSERT INTO deployments (project_id, subdomain, commit_hash)
                VALUES ($1, $2, $3)
                RETURNING id, project_id, status, subdomain, image_url,
                          commit_hash, build_logs, created_at, updated_at
            "#,
        )
        .bind(project_id)
        .bind(subdomain)
        .bind(commit_hash)
        .fetch_one(pool)
        .await
    }

    pub async fn get_by_id(
        pool: &PgPool,
        deployment_id: Uuid,
    ) -> Result<Option<Deployment>, sqlx::Error> {
        sqlx::query_as::<_, Deployment>(
            r#"
                SELECT id, project_id, status, subdomain, image_url,
                       commit_hash, build_logs, created_at, updated_at
                FROM deployments
                WHERE id = $1
            "#,
        )
        .bind(deployment_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn get_all_by_project(
        pool: &PgPool,
        project_id: Uuid,
    ) -> Result<(Vec<Deployment>, i64), sqlx::Error> {
        let deployments = sqlx::query_as::<_, Deployment>(
            r#"
                SELECT id, project_id, status, subdomain, image_url,
                       commit_hash, build_logs, created_at, updated_at
                FROM deployments
                WHERE project_id = $1
                ORDER BY created_at DESC
            "#,
        )
        .bind(project_id)
        .fetch_all(pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(
            r#"
                SELECT COUNT(*)
                FROM deployments
                WHERE project_id = $1
            "#,
        )
        .bind(project_id)
        .fetch_one(pool)
        .await?;

        Ok((deployments, total))
    }
}
