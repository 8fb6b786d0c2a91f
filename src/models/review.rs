use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::{FieldErrors, ServiceError};

use super::is_blank;

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Review {
    pub id: Uuid,
    pub location_id: Uuid,
    pub user_id: Uuid,
    pub rating: i32,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

/// 评论列表中附带评论者的显示名
#[derive(Debug, Clone, Serialize)]
pub struct ReviewView {
    #[serde(flatten)]
    pub review: Review,
    pub user_name: Option<String>,
}

impl Review {
    /// 评分必须是 1 到 5 的整数，评论不能为空
    pub fn new(
        location_id: Uuid,
        user_id: Uuid,
        rating: Option<i64>,
        comment: Option<String>,
    ) -> Result<Self, ServiceError> {
        let mut errors = FieldErrors::new();

        let rating = match rating {
            Some(r) if (1..=5).contains(&r) => r as i32,
            Some(_) => {
                errors.push("rating", "must be an integer between 1 and 5");
                0
            }
            None => {
                errors.push("rating", "is required");
                0
            }
        };
        if is_blank(comment.as_deref()) {
            errors.push("comment", "must not be empty");
        }
        errors.into_result()?;

        Ok(Self {
            id: Uuid::new_v4(),
            location_id,
            user_id,
            rating,
            comment: comment.unwrap_or_default(),
            created_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Some(0))]
    #[case(Some(6))]
    #[case(None)]
    fn rejects_rating_outside_range(#[case] rating: Option<i64>) {
        let err = Review::new(Uuid::new_v4(), Uuid::new_v4(), rating, Some("ok".into()));
        assert!(matches!(err, Err(ServiceError::Validation(f)) if f[0].field == "rating"));
    }

    #[test]
    fn reports_rating_and_comment_together() {
        let err = Review::new(Uuid::new_v4(), Uuid::new_v4(), Some(9), Some(" ".into()));
        match err {
            Err(ServiceError::Validation(fields)) => assert_eq!(fields.len(), 2),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn accepts_bounds() {
        for rating in [1, 5] {
            let review =
                Review::new(Uuid::new_v4(), Uuid::new_v4(), Some(rating), Some("fine".into()))
                    .unwrap();
            assert_eq!(review.rating as i64, rating);
        }
    }
}
