use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

// ============================================
// API SCHEMAS
// ============================================

#[derive(Serialize, Debug)]
pub struct ListResponse<T> {
    pub data: Vec<T>,
    pub total: i64,
}

#[derive(Serialize, Debug)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

/// Body of the deployment trigger call.
#[derive(Deserialize, Validate, Debug, Clone)]
pub struct TriggerDeployRequest {
    pub user_id: Uuid,

    pub project_id: Uuid,

    /// Git ref name (branch or tag) to deploy instead of the default branch.
    #[validate(length(min = 1, max = 255), regex(path = *GIT_REF))]
    pub commit_hash: Option<String>,
}

static GIT_REF: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._/-]*$").unwrap());

// ============================================
// BUS MESSAGE TYPES
// ============================================
//
// Field names below are wire contract: both events are consumed by workers
// that may be deployed independently of the API, so they stay snake_case and
// never get renamed.

/// Published to `deploy.request` once the deployment row is durably written.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct DeployRequestMessage {
    pub deployment_id: Uuid,
    pub project_id: Uuid,
    pub repo_url: String,
    pub build_command: String,
    pub output_dir: String,
    /// Ref name passed to `git clone --branch`; empty means default branch.
    /// Arbitrary commit SHAs are not supported.
    pub commit_hash: String,
}

/// Published to `build.complete` after every build attempt, successful or not.
/// `logs` always carries the full build log; `image_url` is empty on failure.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct BuildCompleteMessage {
    pub deployment_id: Uuid,
    pub image_url: String,
    pub success: bool,
    pub logs: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn git_ref_rejects_shell_metacharacters() {
        let ok = TriggerDeployRequest {
            user_id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            commit_hash: Some("release/v1.2.3".to_string()),
        };
        assert!(ok.validate().is_ok());

        for bad in ["v1; rm -rf /", "a b", "$(whoami)", "-delete"] {
            let req = TriggerDeployRequest {
                commit_hash: Some(bad.to_string()),
                ..ok.clone()
            };
            assert!(req.validate().is_err(), "{bad:?} must not validate");
        }
    }

    #[test]
    fn build_complete_wire_format_is_stable() {
        let message = BuildCompleteMessage {
            deployment_id: Uuid::nil(),
            image_url: String::new(),
            success: false,
            logs: "clone failed".to_string(),
        };

        let value = serde_json::to_value(&message).unwrap();
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, ["deployment_id", "image_url", "logs", "success"]);
    }

    #[test]
    fn deploy_request_wire_format_is_stable() {
        let message = DeployRequestMessage {
            deployment_id: Uuid::nil(),
            project_id: Uuid::nil(),
            repo_url: "https://git.example/u/site".to_string(),
            build_command: String::new(),
            output_dir: "dist".to_string(),
            commit_hash: String::new(),
        };

        let value = serde_json::to_value(&message).unwrap();
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            [
                "build_command",
                "commit_hash",
                "deployment_id",
                "output_dir",
                "project_id",
                "repo_url"
            ]
        );
    }
}
