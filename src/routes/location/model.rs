use serde::Deserialize;

/// 搜索参数保持原始字符串，由 NearbyQuery::parse 统一校验
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub radius: Option<String>,
}

/// multipart 中承载图片的字段名，可重复出现
pub const PHOTO_FIELD: &str = "photos";
pub const DESCRIPTION_FIELD: &str = "description";
