// 业务操作
// 每个 XxxOperation 持有存储句柄，由处理器按请求创建

pub mod group;
pub mod invitation;
pub mod location;
pub mod review;
pub mod user;

pub use group::GroupOperation;
pub use invitation::InvitationOperation;
pub use location::{LocationOperation, NearbyQuery};
pub use review::ReviewOperation;
pub use user::UserOperation;

use uuid::Uuid;

use crate::error::ServiceError;
use crate::store::DocumentStore;

/// 调用者所在群组的ID，用于群组授权判断
pub(crate) async fn caller_groups(
    store: &dyn DocumentStore,
    caller: Uuid,
) -> Result<Vec<Uuid>, ServiceError> {
    Ok(store
        .find_groups_by_member(caller)
        .await?
        .into_iter()
        .map(|group| group.id)
        .collect())
}
