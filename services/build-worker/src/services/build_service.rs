use shared::{
    schemas::{BuildCompleteMessage, DeployRequestMessage},
    services::amqp::Amqp,
    utilities::config::Config,
};

use super::{detector, dockerfile, log_stream::BuildLog, runner, workspace::Workspace};
use crate::utilities::command::{CommandError, run_command};

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("{0}")]
    Command(#[from] CommandError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Clone)]
pub struct BuildService {
    pub amqp: Amqp,
    pub config: Config,
}

impl BuildService {
    /// Run the whole pipeline for one `deploy.request` and return the
    /// completion event to publish. Every failure inside the pipeline is
    /// encoded into the event instead of escaping, so a broken repository
    /// never triggers redelivery.
    pub async fn process(&self, event: DeployRequestMessage) -> BuildCompleteMessage {
        let deployment_id = event.deployment_id;

        // Best effort: without a channel the build still runs, just untailed.
        let channel = self.amqp.channel().await.ok();
        let mut log = BuildLog::new(channel, deployment_id);

        match self.run_build(&event, &mut log).await {
            Ok(image_url) => {
                log.append("Build complete\n").await;
                BuildCompleteMessage {
                    deployment_id,
                    image_url,
                    success: true,
                    logs: log.into_contents(),
                }
            }
            Err(e) => {
                log.append(&format!("Build failed: {e}\n")).await;
                BuildCompleteMessage {
                    deployment_id,
                    image_url: String::new(),
                    success: false,
                    logs: log.into_contents(),
                }
            }
        }
    }

    async fn run_build(
        &self,
        event: &DeployRequestMessage,
        log: &mut BuildLog,
    ) -> Result<String, BuildError> {
        // 1. Workspace
        let workspace = Workspace::allocate(&self.config.workspace_dir).await?;

        // 2. Acquire source
        log.append(&format!("Cloning repository: {}\n", event.repo_url))
            .await;
        let mut clone_args = vec!["clone", "--depth", "1"];
        if !event.commit_hash.is_empty() {
            // Ref name (branch or tag); bare commit SHAs are not clonable this way
            clone_args.extend(["--branch", event.commit_hash.as_str()]);
        }
        clone_args.extend([event.repo_url.as_str(), "."]);
        run_command(workspace.path(), "git", &clone_args).await?;

        // 3. Detect framework
        let framework = detector::detect(workspace.path());
        log.append(&format!("Detected framework: {framework}\n")).await;

        // 4. Build
        runner::build(framework, workspace.path(), &event.build_command, log).await?;

        // 5. Containerize
        let image_tag = format!(
            "{}/dejavu/{}:{}",
            self.config.registry_url,
            event.project_id,
            workspace.build_id()
        );
        log.append(&format!("Building image {image_tag}\n")).await;

        let recipe = dockerfile::render(framework, &event.output_dir);
        tokio::fs::write(workspace.path().join(dockerfile::FILE_NAME), recipe).await?;

        run_command(
            workspace.path(),
            "docker",
            &["build", "-f", dockerfile::FILE_NAME, "-t", &image_tag, "."],
        )
        .await?;

        // 6. Publish to the registry
        if let (Some(username), Some(password)) = (
            &self.config.registry_username,
            &self.config.registry_password,
        ) {
            run_command(
                workspace.path(),
                "docker",
                &["login", &self.config.registry_url, "-u", username, "-p", password],
            )
            .await?;
        }

        log.append("Pushing to registry...\n").await;
        run_command(workspace.path(), "docker", &["push", &image_tag]).await?;

        Ok(image_tag)
    }
}
