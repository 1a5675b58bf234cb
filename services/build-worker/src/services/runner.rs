use std::path::Path;

use super::detector::Framework;
use super::log_stream::BuildLog;
use crate::utilities::command::{CommandError, run_command};

const DEFAULT_NODE_BUILD: &str = "npm run build";
const DEFAULT_GO_BUILD: &str = "go build -o main .";

/// The commands a framework needs to turn a fresh clone into build output.
/// Single dispatch point over the framework tag; a custom `build_command`
/// replaces the framework default where one exists.
pub fn plan(framework: Framework, build_command: &str) -> Vec<Vec<String>> {
    match framework {
        Framework::NextJs | Framework::NuxtJs => {
            let build = if build_command.is_empty() {
                DEFAULT_NODE_BUILD
            } else {
                build_command
            };
            vec![argv(&["npm", "install"]), shell(build)]
        }
        Framework::NodeJs => {
            let mut steps = vec![argv(&["npm", "install"])];
            if !build_command.is_empty() && build_command != DEFAULT_NODE_BUILD {
                steps.push(shell(build_command));
            }
            steps
        }
        Framework::Bun => {
            let mut steps = vec![argv(&["bun", "install"])];
            if !build_command.is_empty() {
                steps.push(shell(build_command));
            }
            steps
        }
        Framework::Go => {
            let build = if build_command.is_empty() {
                DEFAULT_GO_BUILD
            } else {
                build_command
            };
            vec![shell(build)]
        }
        Framework::Php => {
            let mut steps = vec![argv(&[
                "composer",
                "install",
                "--no-dev",
                "--optimize-autoloader",
            ])];
            if !build_command.is_empty() {
                steps.push(shell(build_command));
            }
            steps
        }
        Framework::Static => {
            if build_command.is_empty() {
                vec![]
            } else {
                vec![shell(build_command)]
            }
        }
    }
}

/// Run every planned step in the workspace, appending each command's combined
/// output to the build log. The first non-zero exit aborts the stage.
pub async fn build(
    framework: Framework,
    dir: &Path,
    build_command: &str,
    log: &mut BuildLog,
) -> Result<(), CommandError> {
    for step in plan(framework, build_command) {
        log.append(&format!("$ {}\n", step.join(" "))).await;

        let args: Vec<&str> = step[1..].iter().map(String::as_str).collect();
        let output = run_command(dir, &step[0], &args).await?;

        if !output.is_empty() {
            log.append(&output).await;
        }
    }

    Ok(())
}

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

fn shell(command: &str) -> Vec<String> {
    vec!["sh".to_string(), "-c".to_string(), command.to_string()]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(framework: Framework, build_command: &str) -> Vec<String> {
        plan(framework, build_command)
            .into_iter()
            .map(|step| step.join(" "))
            .collect()
    }

    #[test]
    fn nextjs_installs_then_builds_with_the_default() {
        assert_eq!(
            rendered(Framework::NextJs, ""),
            ["npm install", "sh -c npm run build"]
        );
    }

    #[test]
    fn a_custom_command_replaces_the_default() {
        assert_eq!(
            rendered(Framework::NuxtJs, "npm run generate"),
            ["npm install", "sh -c npm run generate"]
        );
    }

    #[test]
    fn plain_node_skips_the_redundant_default_build() {
        assert_eq!(rendered(Framework::NodeJs, ""), ["npm install"]);
        assert_eq!(rendered(Framework::NodeJs, "npm run build"), ["npm install"]);
        assert_eq!(
            rendered(Framework::NodeJs, "npm run dist"),
            ["npm install", "sh -c npm run dist"]
        );
    }

    #[test]
    fn go_builds_with_its_default_toolchain_invocation() {
        assert_eq!(rendered(Framework::Go, ""), ["sh -c go build -o main ."]);
    }

    #[test]
    fn php_installs_production_dependencies() {
        assert_eq!(
            rendered(Framework::Php, ""),
            ["composer install --no-dev --optimize-autoloader"]
        );
    }

    #[test]
    fn static_sites_build_nothing_by_default() {
        assert!(plan(Framework::Static, "").is_empty());
        assert_eq!(rendered(Framework::Static, "make site"), ["sh -c make site"]);
    }

    #[tokio::test]
    async fn steps_run_in_the_workspace_and_feed_the_log() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = BuildLog::new(None, uuid::Uuid::new_v4());

        build(Framework::Static, dir.path(), "echo built > marker.txt", &mut log)
            .await
            .unwrap();

        assert!(dir.path().join("marker.txt").exists());
        assert!(log.into_contents().contains("$ sh -c echo built > marker.txt"));
    }
}
