use std::path::{Path, PathBuf};

use uuid::Uuid;

/// Scratch directory for one in-flight build, `<workspace_root>/<build_id>`.
///
/// Removal happens on drop, so the directory is gone on every exit path out
/// of the pipeline, including early failures.
pub struct Workspace {
    path: PathBuf,
    build_id: String,
}

impl Workspace {
    pub async fn allocate(root: &Path) -> std::io::Result<Self> {
        let token = Uuid::new_v4().simple().to_string();
        let build_id = token[..8].to_string();
        let path = root.join(&build_id);

        tokio::fs::create_dir_all(&path).await?;

        Ok(Self { path, build_id })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn build_id(&self) -> &str {
        &self.build_id
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir_all(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!("Failed to remove workspace {}: {}", self.path.display(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn build_ids_are_short_hex_tokens() {
        let root = tempfile::tempdir().unwrap();
        let workspace = Workspace::allocate(root.path()).await.unwrap();

        assert_eq!(workspace.build_id().len(), 8);
        assert!(workspace.build_id().chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(workspace.path(), root.path().join(workspace.build_id()));
    }

    #[tokio::test]
    async fn dropping_the_workspace_removes_it() {
        let root = tempfile::tempdir().unwrap();
        let workspace = Workspace::allocate(root.path()).await.unwrap();
        let path = workspace.path().to_path_buf();

        tokio::fs::write(path.join("artifact.txt"), b"contents")
            .await
            .unwrap();
        assert!(path.exists());

        drop(workspace);
        assert!(!path.exists());
    }
}
