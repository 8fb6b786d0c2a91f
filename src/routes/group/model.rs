use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CreateGroupRequest {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AttachLocationRequest {
    pub location_id: Option<Uuid>,
}
