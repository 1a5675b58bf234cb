use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

// ============================================
// ENUMS
// ============================================

#[derive(Type, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "deployment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DeploymentStatus {
    Pending,
    Building,
    Deploying,
    Ready,
    Error,
}

impl DeploymentStatus {
    /// Position on the status ladder. `Ready` and `Error` share the terminal
    /// rank; everything else is strictly ordered.
    fn rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Building => 1,
            Self::Deploying => 2,
            Self::Ready | Self::Error => 3,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Ready | Self::Error)
    }

    /// Whether a row currently in `self` may be moved to `next`.
    ///
    /// Statuses only move forward: a terminal row never changes again,
    /// `Ready` is only reachable from `Deploying`, and `Error` is reachable
    /// from any non-terminal status. Redelivered events that would move a row
    /// backwards (or sideways) must be treated as no-ops by the caller.
    pub fn can_advance_to(self, next: Self) -> bool {
        if self.is_terminal() || next == self {
            return false;
        }
        match next {
            Self::Pending => false,
            Self::Ready => self == Self::Deploying,
            Self::Error => true,
            _ => next.rank() > self.rank(),
        }
    }

    /// The statuses a row may be in for a transition to `next` to apply.
    /// Used as the guard set of the conditional UPDATE that performs the
    /// transition, so that concurrent or redelivered writers race safely.
    pub fn allowed_predecessors(next: Self) -> Vec<Self> {
        [Self::Pending, Self::Building, Self::Deploying]
            .into_iter()
            .filter(|from| from.can_advance_to(next))
            .collect()
    }
}

impl std::fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Building => write!(f, "building"),
            Self::Deploying => write!(f, "deploying"),
            Self::Ready => write!(f, "ready"),
            Self::Error => write!(f, "error"),
        }
    }
}

// ============================================
// MODELS
// ============================================

#[derive(FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct Project {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub repo_url: String,
    pub build_command: String,
    pub output_dir: String,
    pub created_at: DateTime<Utc>,
}

#[derive(FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct Deployment {
    pub id: Uuid,
    pub project_id: Uuid,
    pub status: DeploymentStatus,
    pub subdomain: String,
    pub image_url: String,
    pub commit_hash: String,
    pub build_logs: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::DeploymentStatus;
    use super::DeploymentStatus::*;

    #[test]
    fn statuses_only_move_forward() {
        assert!(Pending.can_advance_to(Building));
        assert!(Building.can_advance_to(Deploying));
        assert!(Deploying.can_advance_to(Ready));

        assert!(!Building.can_advance_to(Pending));
        assert!(!Deploying.can_advance_to(Building));
        assert!(!Ready.can_advance_to(Building));
    }

    #[test]
    fn terminal_statuses_absorb() {
        for next in [Pending, Building, Deploying, Ready, Error] {
            assert!(!Ready.can_advance_to(next), "ready -> {next} must be a no-op");
            assert!(!Error.can_advance_to(next), "error -> {next} must be a no-op");
        }
    }

    #[test]
    fn error_is_reachable_from_any_live_status() {
        assert!(Pending.can_advance_to(Error));
        assert!(Building.can_advance_to(Error));
        assert!(Deploying.can_advance_to(Error));
    }

    #[test]
    fn ready_only_follows_deploying() {
        assert!(!Pending.can_advance_to(Ready));
        assert!(!Building.can_advance_to(Ready));
        assert!(Deploying.can_advance_to(Ready));
    }

    #[test]
    fn predecessor_sets_match_the_ladder() {
        assert_eq!(DeploymentStatus::allowed_predecessors(Building), vec![Pending]);
        assert_eq!(
            DeploymentStatus::allowed_predecessors(Deploying),
            vec![Pending, Building]
        );
        assert_eq!(DeploymentStatus::allowed_predecessors(Ready), vec![Deploying]);
        assert_eq!(
            DeploymentStatus::allowed_predecessors(Error),
            vec![Pending, Building, Deploying]
        );
    }
}
