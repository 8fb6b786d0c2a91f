// 实体模型
// 所有实体由存储层持有，这里的结构只是单次请求内的视图

pub mod group;
pub mod invitation;
pub mod location;
pub mod review;
pub mod user;

pub use group::Group;
pub use invitation::{Invitation, InvitationStatus};
pub use location::{Location, LocationDraft, LocationPatch, LocationType, NewLocation, Photo};
pub use review::{Review, ReviewView};
pub use user::{NewUser, User};

use uuid::Uuid;

/// 去重并保持原有顺序
pub(crate) fn dedup_ids(ids: Vec<Uuid>) -> Vec<Uuid> {
    let mut seen = std::collections::HashSet::with_capacity(ids.len());
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

pub(crate) fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}
