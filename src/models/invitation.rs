use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ServiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Rejected,
}

impl InvitationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvitationStatus::Pending => "pending",
            InvitationStatus::Accepted => "accepted",
            InvitationStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for InvitationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvitationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(InvitationStatus::Pending),
            "accepted" => Ok(InvitationStatus::Accepted),
            "rejected" => Ok(InvitationStatus::Rejected),
            other => Err(format!("unknown invitation status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Invitation {
    pub id: Uuid,
    pub group_id: Uuid,
    pub invitee_id: Uuid,
    pub inviter_id: Uuid,
    pub status: InvitationStatus,
    pub created_at: DateTime<Utc>,
}

impl Invitation {
    pub fn new(group_id: Uuid, invitee_id: Uuid, inviter_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            group_id,
            invitee_id,
            inviter_id,
            status: InvitationStatus::Pending,
            created_at: Utc::now(),
        }
    }

    pub fn involves(&self, user_id: Uuid) -> bool {
        self.invitee_id == user_id || self.inviter_id == user_id
    }

    /// 检查状态迁移是否合法
    ///
    /// pending 可以进入任一终态；终态之间不能互相迁移，也不能回到 pending。
    /// 重复进入同一终态视为合法（用于失败后重试）。
    pub fn check_transition(&self, target: InvitationStatus) -> Result<(), ServiceError> {
        match (self.status, target) {
            (InvitationStatus::Pending, _) => Ok(()),
            (current, target) if current == target => Ok(()),
            (current, target) => Err(ServiceError::conflict(format!(
                "invitation is already {current}, cannot become {target}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn with_status(status: InvitationStatus) -> Invitation {
        Invitation {
            status,
            ..Invitation::new(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4())
        }
    }

    #[rstest]
    #[case(InvitationStatus::Pending, InvitationStatus::Accepted, true)]
    #[case(InvitationStatus::Pending, InvitationStatus::Rejected, true)]
    #[case(InvitationStatus::Accepted, InvitationStatus::Accepted, true)]
    #[case(InvitationStatus::Rejected, InvitationStatus::Rejected, true)]
    #[case(InvitationStatus::Accepted, InvitationStatus::Rejected, false)]
    #[case(InvitationStatus::Rejected, InvitationStatus::Accepted, false)]
    #[case(InvitationStatus::Accepted, InvitationStatus::Pending, false)]
    fn transitions(
        #[case] from: InvitationStatus,
        #[case] to: InvitationStatus,
        #[case] allowed: bool,
    ) {
        let result = with_status(from).check_transition(to);
        if allowed {
            assert!(result.is_ok());
        } else {
            assert!(matches!(result, Err(ServiceError::Conflict(_))));
        }
    }

    #[test]
    fn new_invitation_is_pending() {
        let invitation = Invitation::new(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        assert_eq!(invitation.status, InvitationStatus::Pending);
    }

    #[test]
    fn status_parses_its_own_names() {
        for status in [
            InvitationStatus::Pending,
            InvitationStatus::Accepted,
            InvitationStatus::Rejected,
        ] {
            assert_eq!(status.as_str().parse::<InvitationStatus>(), Ok(status));
        }
    }
}
