// 文档存储
// 业务层只依赖 DocumentStore trait；生产环境使用 Postgres，本地开发和测试使用内存实现

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{Group, Invitation, InvitationStatus, Location, Review, User};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// 唯一约束冲突，携带冲突的字段名
    #[error("duplicate {0}")]
    Duplicate(String),
    #[error("corrupt record: {0}")]
    Corrupt(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LocationFilter {
    All,
    /// 球面距离不超过 radius_km 的地点
    Near {
        latitude: f64,
        longitude: f64,
        radius_km: f64,
    },
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn insert_user(&self, user: &User) -> StoreResult<()>;
    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn find_users(&self, ids: &[Uuid]) -> StoreResult<Vec<User>>;

    async fn insert_group(&self, group: &Group) -> StoreResult<()>;
    async fn find_group(&self, id: Uuid) -> StoreResult<Option<Group>>;
    async fn find_groups_by_member(&self, user_id: Uuid) -> StoreResult<Vec<Group>>;
    /// 幂等追加成员；群组不存在时返回 None
    async fn add_group_member(&self, group_id: Uuid, user_id: Uuid) -> StoreResult<Option<Group>>;
    async fn add_group_location(
        &self,
        group_id: Uuid,
        location_id: Uuid,
    ) -> StoreResult<Option<Group>>;

    async fn insert_location(&self, location: &Location) -> StoreResult<()>;
    async fn find_location(&self, id: Uuid) -> StoreResult<Option<Location>>;
    /// 按创建时间排序
    async fn find_locations(&self, filter: LocationFilter) -> StoreResult<Vec<Location>>;
    /// 整体覆盖可变字段，后写者胜出；记录不存在时返回 false
    async fn update_location(&self, location: &Location) -> StoreResult<bool>;
    async fn delete_location(&self, id: Uuid) -> StoreResult<bool>;

    /// 写入评论并把评论ID追加到地点上，两者在同一事务中完成；地点不存在时返回 false
    async fn insert_review(&self, review: &Review) -> StoreResult<bool>;
    async fn find_reviews_by_location(&self, location_id: Uuid) -> StoreResult<Vec<Review>>;

    async fn insert_invitation(&self, invitation: &Invitation) -> StoreResult<()>;
    async fn find_invitation(&self, id: Uuid) -> StoreResult<Option<Invitation>>;
    /// 调用者作为被邀请人或邀请人的全部邀请，最新的在前
    async fn find_invitations_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Invitation>>;
    /// 同一事务内把被邀请人加入群组并把状态置为 accepted
    ///
    /// 仅当邀请处于 pending 或 accepted 时生效，否则返回 None。
    async fn accept_invitation(&self, id: Uuid) -> StoreResult<Option<Invitation>>;
    /// 仅修改 pending 或已处于目标状态的邀请，否则返回 None
    async fn set_invitation_status(
        &self,
        id: Uuid,
        status: InvitationStatus,
    ) -> StoreResult<Option<Invitation>>;
    /// 仅删除 pending 状态的邀请
    async fn delete_pending_invitation(&self, id: Uuid) -> StoreResult<bool>;

    /// 关闭连接池等资源
    async fn close(&self) {}
}
