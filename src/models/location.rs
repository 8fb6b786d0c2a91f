use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{FieldErrors, ServiceError};

use super::{dedup_ids, is_blank};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationType {
    Public,
    Private,
}

impl LocationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocationType::Public => "public",
            LocationType::Private => "private",
        }
    }
}

impl fmt::Display for LocationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LocationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(LocationType::Public),
            "private" => Ok(LocationType::Private),
            other => Err(format!("unknown location type '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Photo {
    pub url: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Location {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub location_type: LocationType,
    pub category: String,
    pub latitude: f64,
    pub longitude: f64,
    /// 作者，创建后不可修改
    pub author_id: Uuid,
    pub allowed_users: Vec<Uuid>,
    pub allowed_groups: Vec<Uuid>,
    /// 按上传顺序保存
    pub photos: Vec<Photo>,
    pub reviews: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// 创建地点请求，字段均可缺省，以便一次性报告全部错误
#[derive(Debug, Default, Deserialize)]
pub struct NewLocation {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub location_type: Option<String>,
    pub category: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(default)]
    pub allowed_users: Vec<Uuid>,
    #[serde(default)]
    pub allowed_groups: Vec<Uuid>,
}

/// 校验通过的地点字段
#[derive(Debug, Clone)]
pub struct LocationDraft {
    pub name: String,
    pub description: String,
    pub location_type: LocationType,
    pub category: String,
    pub latitude: f64,
    pub longitude: f64,
    pub allowed_users: Vec<Uuid>,
    pub allowed_groups: Vec<Uuid>,
}

/// 允许修改的字段白名单，作者和ID不在其中
#[derive(Debug, Default, Deserialize)]
pub struct LocationPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub location_type: Option<String>,
    pub category: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub allowed_users: Option<Vec<Uuid>>,
    pub allowed_groups: Option<Vec<Uuid>>,
}

fn check_latitude(errors: &mut FieldErrors, value: f64) {
    if !value.is_finite() || !(-90.0..=90.0).contains(&value) {
        errors.push("latitude", "must be between -90 and 90");
    }
}

fn check_longitude(errors: &mut FieldErrors, value: f64) {
    if !value.is_finite() || !(-180.0..=180.0).contains(&value) {
        errors.push("longitude", "must be between -180 and 180");
    }
}

fn check_type(errors: &mut FieldErrors, value: Option<&str>) -> Option<LocationType> {
    match value.map(str::parse::<LocationType>) {
        Some(Ok(parsed)) => Some(parsed),
        Some(Err(_)) | None => {
            errors.push("type", "must be 'public' or 'private'");
            None
        }
    }
}

fn check_text(errors: &mut FieldErrors, field: &'static str, value: Option<&str>) {
    if is_blank(value) {
        errors.push(field, "must not be empty");
    }
}

impl NewLocation {
    pub fn validate(self) -> Result<LocationDraft, ServiceError> {
        let mut errors = FieldErrors::new();

        check_text(&mut errors, "name", self.name.as_deref());
        check_text(&mut errors, "description", self.description.as_deref());
        let location_type = check_type(&mut errors, self.location_type.as_deref());
        check_text(&mut errors, "category", self.category.as_deref());

        match self.latitude {
            Some(lat) => check_latitude(&mut errors, lat),
            None => errors.push("latitude", "is required"),
        }
        match self.longitude {
            Some(lon) => check_longitude(&mut errors, lon),
            None => errors.push("longitude", "is required"),
        }

        errors.into_result()?;

        // 以上校验保证下列字段均存在
        match (location_type, self.latitude, self.longitude) {
            (Some(location_type), Some(latitude), Some(longitude)) => Ok(LocationDraft {
                name: self.name.unwrap_or_default(),
                description: self.description.unwrap_or_default(),
                location_type,
                category: self.category.unwrap_or_default(),
                latitude,
                longitude,
                allowed_users: dedup_ids(self.allowed_users),
                allowed_groups: dedup_ids(self.allowed_groups),
            }),
            _ => Err(ServiceError::Internal("location draft incomplete".into())),
        }
    }
}

impl Location {
    pub fn new(draft: LocationDraft, author_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: draft.name,
            description: draft.description,
            location_type: draft.location_type,
            category: draft.category,
            latitude: draft.latitude,
            longitude: draft.longitude,
            author_id,
            allowed_users: draft.allowed_users,
            allowed_groups: draft.allowed_groups,
            photos: Vec::new(),
            reviews: Vec::new(),
            created_at: Utc::now(),
        }
    }
}

impl LocationPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.location_type.is_none()
            && self.category.is_none()
            && self.latitude.is_none()
            && self.longitude.is_none()
            && self.allowed_users.is_none()
            && self.allowed_groups.is_none()
    }

    /// 只校验并修改出现的字段；任一字段非法时不做任何修改
    pub fn apply_to(self, location: &mut Location) -> Result<(), ServiceError> {
        let mut errors = FieldErrors::new();

        if let Some(name) = self.name.as_deref() {
            check_text(&mut errors, "name", Some(name));
        }
        if let Some(description) = self.description.as_deref() {
            check_text(&mut errors, "description", Some(description));
        }
        let location_type = match self.location_type.as_deref() {
            Some(raw) => check_type(&mut errors, Some(raw)),
            None => None,
        };
        if let Some(category) = self.category.as_deref() {
            check_text(&mut errors, "category", Some(category));
        }
        if let Some(lat) = self.latitude {
            check_latitude(&mut errors, lat);
        }
        if let Some(lon) = self.longitude {
            check_longitude(&mut errors, lon);
        }

        errors.into_result()?;

        if let Some(name) = self.name {
            location.name = name;
        }
        if let Some(description) = self.description {
            location.description = description;
        }
        if let Some(location_type) = location_type {
            location.location_type = location_type;
        }
        if let Some(category) = self.category {
            location.category = category;
        }
        if let Some(lat) = self.latitude {
            location.latitude = lat;
        }
        if let Some(lon) = self.longitude {
            location.longitude = lon;
        }
        if let Some(users) = self.allowed_users {
            location.allowed_users = dedup_ids(users);
        }
        if let Some(groups) = self.allowed_groups {
            location.allowed_groups = dedup_ids(groups);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_request() -> NewLocation {
        NewLocation {
            name: Some("Old mill".into()),
            description: Some("Ruins by the river".into()),
            location_type: Some("private".into()),
            category: Some("history".into()),
            latitude: Some(40.0),
            longitude: Some(-73.0),
            ..Default::default()
        }
    }

    fn field_names(err: ServiceError) -> Vec<&'static str> {
        match err {
            ServiceError::Validation(fields) => fields.into_iter().map(|f| f.field).collect(),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn empty_request_reports_all_fields() {
        let err = NewLocation::default().validate().unwrap_err();
        assert_eq!(
            field_names(err),
            ["name", "description", "type", "category", "latitude", "longitude"]
        );
    }

    #[test]
    fn out_of_range_coordinates_are_both_reported() {
        let err = NewLocation {
            latitude: Some(91.0),
            longitude: Some(-180.5),
            ..valid_request()
        }
        .validate()
        .unwrap_err();
        assert_eq!(field_names(err), ["latitude", "longitude"]);
    }

    #[test]
    fn boundary_coordinates_are_accepted() {
        let draft = NewLocation {
            latitude: Some(-90.0),
            longitude: Some(180.0),
            ..valid_request()
        }
        .validate()
        .unwrap();
        assert_eq!((draft.latitude, draft.longitude), (-90.0, 180.0));
    }

    #[test]
    fn grants_are_deduplicated_in_order() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let draft = NewLocation {
            allowed_users: vec![a, b, a],
            ..valid_request()
        }
        .validate()
        .unwrap();
        assert_eq!(draft.allowed_users, vec![a, b]);
    }

    #[test]
    fn patch_touches_only_present_fields() {
        let mut location = Location::new(valid_request().validate().unwrap(), Uuid::new_v4());
        let before = location.clone();

        LocationPatch {
            category: Some("food".into()),
            ..Default::default()
        }
        .apply_to(&mut location)
        .unwrap();

        assert_eq!(location.category, "food");
        assert_eq!(location.name, before.name);
        assert_eq!(location.description, before.description);
        assert_eq!(location.latitude, before.latitude);
    }

    #[test]
    fn invalid_patch_leaves_location_untouched() {
        let mut location = Location::new(valid_request().validate().unwrap(), Uuid::new_v4());
        let before = location.clone();

        let err = LocationPatch {
            name: Some("New name".into()),
            category: Some("  ".into()),
            latitude: Some(120.0),
            ..Default::default()
        }
        .apply_to(&mut location)
        .unwrap_err();

        assert_eq!(field_names(err), ["category", "latitude"]);
        assert_eq!(location, before);
    }

    #[test]
    fn patch_cannot_address_author() {
        let patch: LocationPatch =
            serde_json::from_str(r#"{"author_id":"00000000-0000-0000-0000-000000000000"}"#)
                .unwrap();
        assert!(patch.is_empty());
    }

    #[test]
    fn serializes_type_field_name() {
        let location = Location::new(valid_request().validate().unwrap(), Uuid::new_v4());
        let json = serde_json::to_value(&location).unwrap();
        assert_eq!(json["type"], "private");
    }
}
