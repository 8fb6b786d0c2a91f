// 地点访问控制
//
// 读权限由四个可见性通道中的任意一个满足：作者本人、用户授权、群组授权、公开。
// 写权限（修改、删除、上传图片）只属于作者，授权永远不会带来写权限。
// 这里全部是纯函数，调用方负责事先加载调用者所在的群组。

use uuid::Uuid;

use crate::models::{Location, LocationType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Permission {
    None,
    Read,
    Write,
}

pub fn can_read(caller: Uuid, location: &Location, caller_groups: &[Uuid]) -> bool {
    location.location_type == LocationType::Public
        || location.author_id == caller
        || location.allowed_users.contains(&caller)
        || location
            .allowed_groups
            .iter()
            .any(|group| caller_groups.contains(group))
}

pub fn can_write(caller: Uuid, location: &Location) -> bool {
    location.author_id == caller
}

pub fn effective_permission(caller: Uuid, location: &Location, caller_groups: &[Uuid]) -> Permission {
    if can_write(caller, location) {
        Permission::Write
    } else if can_read(caller, location, caller_groups) {
        Permission::Read
    } else {
        Permission::None
    }
}
