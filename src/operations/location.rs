// 地点操作
// 读写前先确认地点存在，再交给访问控制判断

use std::sync::Arc;

use futures_util::future::try_join_all;
use uuid::Uuid;

use super::caller_groups;
use crate::access::{Permission, can_read, can_write, effective_permission};
use crate::error::ServiceError;
use crate::models::{Location, LocationPatch, NewLocation, Photo};
use crate::storage::{FileStorage, Upload};
use crate::store::{DocumentStore, LocationFilter};

/// 附近搜索参数，半径单位为千米
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearbyQuery {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_km: f64,
}

impl NearbyQuery {
    /// 三个参数缺一不可，且必须是数字
    pub fn parse(
        latitude: Option<&str>,
        longitude: Option<&str>,
        radius: Option<&str>,
    ) -> Result<Self, ServiceError> {
        fn number(raw: Option<&str>) -> Option<f64> {
            raw.and_then(|v| v.trim().parse::<f64>().ok())
                .filter(|v| v.is_finite())
        }

        let (lat, lon, radius) = (number(latitude), number(longitude), number(radius));
        let mut invalid = Vec::new();
        if lat.is_none() {
            invalid.push("latitude");
        }
        if lon.is_none() {
            invalid.push("longitude");
        }
        if radius.is_none_or(|r| r < 0.0) {
            invalid.push("radius");
        }

        match (lat, lon, radius) {
            (Some(latitude), Some(longitude), Some(radius_km)) if invalid.is_empty() => Ok(Self {
                latitude,
                longitude,
                radius_km,
            }),
            _ => Err(ServiceError::bad_request(format!(
                "missing or non-numeric search parameter(s): {}",
                invalid.join(", ")
            ))),
        }
    }
}

pub struct LocationOperation {
    store: Arc<dyn DocumentStore>,
}

impl LocationOperation {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    async fn load(&self, id: Uuid) -> Result<Location, ServiceError> {
        self.store
            .find_location(id)
            .await?
            .ok_or(ServiceError::NotFound("Location"))
    }

    /// 加载地点并要求调用者是作者
    async fn load_for_write(&self, caller: Uuid, id: Uuid) -> Result<Location, ServiceError> {
        let location = self.load(id).await?;
        if !can_write(caller, &location) {
            tracing::debug!(%caller, location_id = %id, "write denied");
            return Err(ServiceError::forbidden(
                "You are not the author of this location",
            ));
        }
        Ok(location)
    }

    pub async fn create(&self, author: Uuid, input: NewLocation) -> Result<Location, ServiceError> {
        let location = Location::new(input.validate()?, author);
        self.store.insert_location(&location).await?;

        tracing::info!(
            location_id = %location.id,
            %author,
            kind = %location.location_type,
            "location created"
        );
        Ok(location)
    }

    pub async fn list_visible(&self, caller: Uuid) -> Result<Vec<Location>, ServiceError> {
        let groups = caller_groups(self.store.as_ref(), caller).await?;
        let locations = self.store.find_locations(LocationFilter::All).await?;

        Ok(locations
            .into_iter()
            .filter(|location| can_read(caller, location, &groups))
            .collect())
    }

    pub async fn get(&self, caller: Uuid, id: Uuid) -> Result<Location, ServiceError> {
        let location = self.load(id).await?;
        let groups = caller_groups(self.store.as_ref(), caller).await?;

        match effective_permission(caller, &location, &groups) {
            Permission::None => Err(ServiceError::forbidden(
                "You do not have access to this location",
            )),
            Permission::Read | Permission::Write => Ok(location),
        }
    }

    pub async fn update(
        &self,
        caller: Uuid,
        id: Uuid,
        patch: LocationPatch,
    ) -> Result<Location, ServiceError> {
        let mut location = self.load_for_write(caller, id).await?;
        if patch.is_empty() {
            return Ok(location);
        }
        patch.apply_to(&mut location)?;

        if !self.store.update_location(&location).await? {
            return Err(ServiceError::NotFound("Location"));
        }
        tracing::info!(location_id = %id, "location updated");
        Ok(location)
    }

    /// 评论不随地点删除
    pub async fn delete(&self, caller: Uuid, id: Uuid) -> Result<(), ServiceError> {
        self.load_for_write(caller, id).await?;

        if !self.store.delete_location(id).await? {
            return Err(ServiceError::NotFound("Location"));
        }
        tracing::info!(location_id = %id, "location deleted");
        Ok(())
    }

    pub async fn add_photos(
        &self,
        files: &dyn FileStorage,
        caller: Uuid,
        id: Uuid,
        uploads: Vec<Upload>,
        description: String,
    ) -> Result<Location, ServiceError> {
        let mut location = self.load_for_write(caller, id).await?;
        if uploads.is_empty() {
            return Err(ServiceError::bad_request("No files uploaded"));
        }
        files.check(&uploads)?;

        // try_join_all 保持输入顺序
        let urls = try_join_all(uploads.iter().map(|upload| files.store(upload))).await?;
        location.photos.extend(urls.into_iter().map(|url| Photo {
            url,
            description: description.clone(),
        }));

        if !self.store.update_location(&location).await? {
            return Err(ServiceError::NotFound("Location"));
        }
        tracing::info!(location_id = %id, count = uploads.len(), "photos added");
        Ok(location)
    }

    pub async fn list_photos(&self, caller: Uuid, id: Uuid) -> Result<Vec<Photo>, ServiceError> {
        Ok(self.get(caller, id).await?.photos)
    }

    /// 不做读权限过滤，与地点列表的行为不同
    pub async fn search_nearby(&self, query: NearbyQuery) -> Result<Vec<Location>, ServiceError> {
        Ok(self
            .store
            .find_locations(LocationFilter::Near {
                latitude: query.latitude,
                longitude: query.longitude,
                radius_km: query.radius_km,
            })
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Group;
    use crate::storage::{LocalFileStorage, UploadLimits};
    use crate::store::MemoryStore;
    use axum::body::Bytes;

    fn request(kind: &str, latitude: f64, longitude: f64) -> NewLocation {
        NewLocation {
            name: Some("Harbour".into()),
            description: Some("Old harbour wall".into()),
            location_type: Some(kind.into()),
            category: Some("sights".into()),
            latitude: Some(latitude),
            longitude: Some(longitude),
            ..Default::default()
        }
    }

    fn setup() -> (Arc<MemoryStore>, LocationOperation) {
        let store = Arc::new(MemoryStore::new());
        (store.clone(), LocationOperation::new(store))
    }

    #[tokio::test]
    async fn coordinates_round_trip_exactly() {
        let (_, ops) = setup();
        let author = Uuid::new_v4();
        let created = ops.create(author, request("private", 40.0, -73.0)).await.unwrap();

        let fetched = ops.get(author, created.id).await.unwrap();
        assert_eq!((fetched.latitude, fetched.longitude), (40.0, -73.0));
        assert_eq!(fetched.author_id, author);
    }

    #[tokio::test]
    async fn private_location_scenario() {
        let (_, ops) = setup();
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let created = ops
            .create(
                a,
                NewLocation {
                    allowed_users: vec![b],
                    ..request("private", 1.0, 2.0)
                },
            )
            .await
            .unwrap();

        assert!(matches!(ops.get(c, created.id).await, Err(ServiceError::Forbidden(_))));
        assert!(ops.get(b, created.id).await.is_ok());

        ops.update(
            a,
            created.id,
            LocationPatch {
                category: Some("food".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let fetched = ops.get(a, created.id).await.unwrap();
        assert_eq!(fetched.category, "food");
        assert_eq!(fetched.name, created.name);
        assert_eq!(fetched.description, created.description);
    }

    #[tokio::test]
    async fn group_grant_is_resolved_from_membership() {
        let (store, ops) = setup();
        let (author, member) = (Uuid::new_v4(), Uuid::new_v4());
        let mut group = Group::new("friends".into(), author);
        group.add_member(member);
        store.insert_group(&group).await.unwrap();

        let created = ops
            .create(
                author,
                NewLocation {
                    allowed_groups: vec![group.id],
                    ..request("private", 0.0, 0.0)
                },
            )
            .await
            .unwrap();

        assert!(ops.get(member, created.id).await.is_ok());
        assert_eq!(ops.list_visible(member).await.unwrap().len(), 1);
        assert!(ops.list_visible(Uuid::new_v4()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_includes_public_and_own_only() {
        let (_, ops) = setup();
        let (me, other) = (Uuid::new_v4(), Uuid::new_v4());
        let public = ops.create(other, request("public", 0.0, 0.0)).await.unwrap();
        ops.create(other, request("private", 0.0, 0.0)).await.unwrap();
        let mine = ops.create(me, request("private", 0.0, 0.0)).await.unwrap();

        let ids: Vec<_> = ops.list_visible(me).await.unwrap().into_iter().map(|l| l.id).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&public.id) && ids.contains(&mine.id));
    }

    #[tokio::test]
    async fn grants_never_allow_writes() {
        let (_, ops) = setup();
        let (author, friend) = (Uuid::new_v4(), Uuid::new_v4());
        let created = ops
            .create(
                author,
                NewLocation {
                    allowed_users: vec![friend],
                    ..request("public", 0.0, 0.0)
                },
            )
            .await
            .unwrap();

        let patch = LocationPatch {
            name: Some("mine now".into()),
            ..Default::default()
        };
        assert!(matches!(
            ops.update(friend, created.id, patch).await,
            Err(ServiceError::Forbidden(_))
        ));
        assert!(matches!(
            ops.delete(friend, created.id).await,
            Err(ServiceError::Forbidden(_))
        ));
        assert_eq!(ops.get(author, created.id).await.unwrap().name, "Harbour");
    }

    #[tokio::test]
    async fn missing_location_is_not_found_before_permission() {
        let (_, ops) = setup();
        let id = Uuid::new_v4();
        let caller = Uuid::new_v4();
        assert!(matches!(ops.get(caller, id).await, Err(ServiceError::NotFound(_))));
        assert!(matches!(
            ops.update(caller, id, LocationPatch::default()).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(ops.delete(caller, id).await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn delete_removes_location() {
        let (_, ops) = setup();
        let author = Uuid::new_v4();
        let created = ops.create(author, request("public", 0.0, 0.0)).await.unwrap();
        ops.delete(author, created.id).await.unwrap();
        assert!(matches!(ops.get(author, created.id).await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn search_scenario_and_missing_read_filter() {
        let (_, ops) = setup();
        let owner = Uuid::new_v4();
        let near = ops.create(owner, request("private", 0.0, 0.0)).await.unwrap();
        ops.create(owner, request("public", 10.0, 10.0)).await.unwrap();

        let query = NearbyQuery::parse(Some("0"), Some("0"), Some("1")).unwrap();
        let found = ops.search_nearby(query).await.unwrap();
        // 私有地点同样出现在搜索结果中
        assert_eq!(found.iter().map(|l| l.id).collect::<Vec<_>>(), vec![near.id]);
    }

    #[test]
    fn search_parameters_must_be_numeric() {
        let err = NearbyQuery::parse(Some("abc"), None, Some("-1")).unwrap_err();
        match err {
            ServiceError::BadRequest(msg) => {
                assert!(msg.contains("latitude, longitude, radius"), "{msg}")
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn large_radius_is_used_as_given() {
        let (_, ops) = setup();
        let owner = Uuid::new_v4();
        // (0,9) 距原点约 1000 km
        let far = ops.create(owner, request("public", 0.0, 9.0)).await.unwrap();

        let query = NearbyQuery::parse(Some("0"), Some("0"), Some("1100")).unwrap();
        assert_eq!(query.radius_km, 1100.0);
        let found = ops.search_nearby(query).await.unwrap();
        assert_eq!(found.iter().map(|l| l.id).collect::<Vec<_>>(), vec![far.id]);

        let query = NearbyQuery::parse(Some("0"), Some("0"), Some("900")).unwrap();
        assert!(ops.search_nearby(query).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn photos_require_author_and_files() {
        let (_, ops) = setup();
        let dir = tempfile::tempdir().unwrap();
        let files = LocalFileStorage::new(dir.path(), "", UploadLimits::default());
        let author = Uuid::new_v4();
        let created = ops.create(author, request("public", 0.0, 0.0)).await.unwrap();

        let upload = |bytes: &'static [u8]| Upload {
            file_name: Some("p.png".into()),
            content_type: Some("image/png".into()),
            bytes: Bytes::from_static(bytes),
        };

        assert!(matches!(
            ops.add_photos(&files, Uuid::new_v4(), created.id, vec![upload(b"x")], String::new())
                .await,
            Err(ServiceError::Forbidden(_))
        ));
        assert!(matches!(
            ops.add_photos(&files, author, created.id, vec![], String::new()).await,
            Err(ServiceError::BadRequest(_))
        ));

        let updated = ops
            .add_photos(
                &files,
                author,
                created.id,
                vec![upload(b"first"), upload(b"second")],
                "sunset".into(),
            )
            .await
            .unwrap();
        assert_eq!(updated.photos.len(), 2);
        assert!(updated.photos.iter().all(|p| p.description == "sunset"));

        let photos = ops.list_photos(Uuid::new_v4(), created.id).await.unwrap();
        assert_eq!(photos, updated.photos);
        assert_ne!(photos[0].url, photos[1].url);
    }
}
