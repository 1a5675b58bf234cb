use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;

/// A subprocess that failed to spawn or exited non-zero, carrying everything
/// it managed to say on the way down.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} exited with {status}\n{output}")]
    Failed {
        program: String,
        status: std::process::ExitStatus,
        output: String,
    },
}

/// Run `program` with `args` in `dir`, capturing stdout and stderr together.
///
/// Every external tool the builder touches (git, npm, bun, composer, docker)
/// goes through here so failures all read the same way in the build log.
pub async fn run_command(dir: &Path, program: &str, args: &[&str]) -> Result<String, CommandError> {
    let output = Command::new(program)
        .args(args)
        .current_dir(dir)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|source| CommandError::Spawn {
            program: program.to_string(),
            source,
        })?;

    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));

    if !output.status.success() {
        return Err(CommandError::Failed {
            program: program.to_string(),
            status: output.status,
            output: combined,
        });
    }

    Ok(combined)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_stdout_and_stderr_together() {
        let dir = tempfile::tempdir().unwrap();
        let output = run_command(dir.path(), "sh", &["-c", "echo visible; echo hidden 1>&2"])
            .await
            .unwrap();

        assert!(output.contains("visible"));
        assert!(output.contains("hidden"));
    }

    #[tokio::test]
    async fn nonzero_exit_fails_with_output_attached() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_command(dir.path(), "sh", &["-c", "echo boom 1>&2; exit 3"])
            .await
            .unwrap_err();

        match err {
            CommandError::Failed { status, output, .. } => {
                assert_eq!(status.code(), Some(3));
                assert!(output.contains("boom"));
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_command(dir.path(), "definitely-not-a-real-tool", &[])
            .await
            .unwrap_err();

        assert!(matches!(err, CommandError::Spawn { .. }));
    }
}
