use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub creator_id: Uuid,
    /// 成员中每个用户只出现一次
    pub members: Vec<Uuid>,
    pub locations: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Group {
    /// 创建者自动成为第一个成员
    pub fn new(name: String, creator_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            creator_id,
            members: vec![creator_id],
            locations: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn is_member(&self, user_id: Uuid) -> bool {
        self.members.contains(&user_id)
    }

    /// 已是成员时不做修改，返回是否新增
    pub fn add_member(&mut self, user_id: Uuid) -> bool {
        if self.is_member(user_id) {
            return false;
        }
        self.members.push(user_id);
        true
    }

    pub fn add_location(&mut self, location_id: Uuid) -> bool {
        if self.locations.contains(&location_id) {
            return false;
        }
        self.locations.push(location_id);
        true
    }
}
