// 评论操作
// 评论只要求地点存在，不检查调用者能否查看该地点

use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::error::ServiceError;
use crate::models::{Review, ReviewView, dedup_ids};
use crate::store::DocumentStore;

pub struct ReviewOperation {
    store: Arc<dyn DocumentStore>,
}

impl ReviewOperation {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn add(
        &self,
        caller: Uuid,
        location_id: Uuid,
        rating: Option<i64>,
        comment: Option<String>,
    ) -> Result<Review, ServiceError> {
        if self.store.find_location(location_id).await?.is_none() {
            return Err(ServiceError::NotFound("Location"));
        }
        let review = Review::new(location_id, caller, rating, comment)?;

        // 地点可能在校验之后被删除
        if !self.store.insert_review(&review).await? {
            return Err(ServiceError::NotFound("Location"));
        }

        tracing::info!(
            review_id = %review.id,
            %location_id,
            rating = review.rating,
            "review added"
        );
        Ok(review)
    }

    /// 按创建时间排列，并附上评论者的显示名
    pub async fn list(&self, location_id: Uuid) -> Result<Vec<ReviewView>, ServiceError> {
        if self.store.find_location(location_id).await?.is_none() {
            return Err(ServiceError::NotFound("Location"));
        }
        let reviews = self.store.find_reviews_by_location(location_id).await?;

        let author_ids = dedup_ids(reviews.iter().map(|r| r.user_id).collect());
        let names: HashMap<Uuid, String> = self
            .store
            .find_users(&author_ids)
            .await?
            .into_iter()
            .map(|user| (user.id, user.full_name))
            .collect();

        Ok(reviews
            .into_iter()
            .map(|review| ReviewView {
                user_name: names.get(&review.user_id).cloned(),
                review,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Location, NewLocation, User};
    use crate::store::MemoryStore;
    use chrono::Utc;
    use rstest::rstest;

    async fn setup() -> (Arc<MemoryStore>, ReviewOperation, Location) {
        let store = Arc::new(MemoryStore::new());
        let draft = NewLocation {
            name: Some("Cellar".into()),
            description: Some("Secret bar".into()),
            location_type: Some("private".into()),
            category: Some("bars".into()),
            latitude: Some(5.0),
            longitude: Some(5.0),
            ..Default::default()
        }
        .validate()
        .unwrap();
        let location = Location::new(draft, Uuid::new_v4());
        store.insert_location(&location).await.unwrap();
        (store.clone(), ReviewOperation::new(store), location)
    }

    #[rstest]
    #[case(Some(0), Some("meh"))]
    #[case(Some(6), Some("wow"))]
    #[case(None, Some("no rating"))]
    #[case(Some(3), Some("  "))]
    #[tokio::test]
    async fn invalid_reviews_are_rejected(#[case] rating: Option<i64>, #[case] comment: Option<&str>) {
        let (_, ops, location) = setup().await;
        let result = ops
            .add(Uuid::new_v4(), location.id, rating, comment.map(String::from))
            .await;
        assert!(matches!(result, Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn reviews_are_accepted_on_unreadable_location() {
        let (store, ops, location) = setup().await;
        let stranger = User {
            id: Uuid::new_v4(),
            email: "eve@example.com".into(),
            username: "eve".into(),
            full_name: "Eve Stranger".into(),
            password_hash: String::new(),
            created_at: Utc::now(),
        };
        store.insert_user(&stranger).await.unwrap();

        let review = ops
            .add(stranger.id, location.id, Some(5), Some("found it".into()))
            .await
            .unwrap();

        let stored = store.find_location(location.id).await.unwrap().unwrap();
        assert_eq!(stored.reviews, vec![review.id]);

        let listed = ops.list(location.id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].user_name.as_deref(), Some("Eve Stranger"));
    }

    #[tokio::test]
    async fn missing_location_is_not_found() {
        let (_, ops, _) = setup().await;
        assert!(matches!(
            ops.add(Uuid::new_v4(), Uuid::new_v4(), Some(3), Some("x".into())).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(ops.list(Uuid::new_v4()).await, Err(ServiceError::NotFound(_))));
    }
}
