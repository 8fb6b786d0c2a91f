use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{Executor, FromRow, PgPool};
use uuid::Uuid;

use super::{DocumentStore, LocationFilter, StoreError, StoreResult};
use crate::models::{Group, Invitation, InvitationStatus, Location, Photo, Review, User};
use crate::utils::within_radius;

// 纬度每度约 111km，取略小的值让预筛选范围稍大一些
const KM_PER_DEGREE_LATITUDE: f64 = 110.0;

const SELECT_USER: &str =
    "SELECT id, email, username, full_name, password_hash, created_at FROM users";
const SELECT_GROUP: &str = "SELECT id, name, creator_id, members, locations, created_at FROM groups";
const SELECT_LOCATION: &str = r#"
    SELECT id, name, description, location_type, category, latitude, longitude,
           author_id, allowed_users, allowed_groups, photos, review_ids, created_at
    FROM locations"#;
const SELECT_REVIEW: &str =
    "SELECT id, location_id, user_id, rating, comment, created_at FROM reviews";
const INVITATION_COLUMNS: &str = "id, group_id, invitee_id, inviter_id, status, created_at";

#[derive(FromRow)]
struct LocationRow {
    id: Uuid,
    name: String,
    description: String,
    location_type: String,
    category: String,
    latitude: f64,
    longitude: f64,
    author_id: Uuid,
    allowed_users: Vec<Uuid>,
    allowed_groups: Vec<Uuid>,
    photos: Json<Vec<Photo>>,
    review_ids: Vec<Uuid>,
    created_at: DateTime<Utc>,
}

impl TryFrom<LocationRow> for Location {
    type Error = StoreError;

    fn try_from(row: LocationRow) -> Result<Self, Self::Error> {
        Ok(Location {
            id: row.id,
            name: row.name,
            description: row.description,
            location_type: row.location_type.parse().map_err(StoreError::Corrupt)?,
            category: row.category,
            latitude: row.latitude,
            longitude: row.longitude,
            author_id: row.author_id,
            allowed_users: row.allowed_users,
            allowed_groups: row.allowed_groups,
            photos: row.photos.0,
            reviews: row.review_ids,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct InvitationRow {
    id: Uuid,
    group_id: Uuid,
    invitee_id: Uuid,
    inviter_id: Uuid,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<InvitationRow> for Invitation {
    type Error = StoreError;

    fn try_from(row: InvitationRow) -> Result<Self, Self::Error> {
        Ok(Invitation {
            id: row.id,
            group_id: row.group_id,
            invitee_id: row.invitee_id,
            inviter_id: row.inviter_id,
            status: row.status.parse().map_err(StoreError::Corrupt)?,
            created_at: row.created_at,
        })
    }
}

fn locations_from_rows(rows: Vec<LocationRow>) -> StoreResult<Vec<Location>> {
    rows.into_iter().map(Location::try_from).collect()
}

/// 唯一约束冲突转换为 Duplicate，其余保持数据库错误
fn map_write_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            let field = match db.constraint() {
                Some("users_email_key") => "email",
                Some("users_username_key") => "username",
                Some(other) => other,
                None => "record",
            };
            return StoreError::Duplicate(field.to_string());
        }
    }
    StoreError::Database(err)
}

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    conn.execute("SET application_name = 'locshare_backend';")
                        .await?;
                    Ok(())
                })
            })
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for PgStore {
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, username, full_name, password_hash, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.full_name)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let sql = format!("{SELECT_USER} WHERE id = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let sql = format!("{SELECT_USER} WHERE email = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_users(&self, ids: &[Uuid]) -> StoreResult<Vec<User>> {
        let sql = format!("{SELECT_USER} WHERE id = ANY($1)");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn insert_group(&self, group: &Group) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO groups (id, name, creator_id, members, locations, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(group.id)
        .bind(&group.name)
        .bind(group.creator_id)
        .bind(&group.members[..])
        .bind(&group.locations[..])
        .bind(group.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;
        Ok(())
    }

    async fn find_group(&self, id: Uuid) -> StoreResult<Option<Group>> {
        let sql = format!("{SELECT_GROUP} WHERE id = $1");
        Ok(sqlx::query_as::<_, Group>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_groups_by_member(&self, user_id: Uuid) -> StoreResult<Vec<Group>> {
        let sql = format!("{SELECT_GROUP} WHERE $1 = ANY(members) ORDER BY created_at, id");
        Ok(sqlx::query_as::<_, Group>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn add_group_member(&self, group_id: Uuid, user_id: Uuid) -> StoreResult<Option<Group>> {
        // 行锁保证并发加入时不会重复追加
        Ok(sqlx::query_as::<_, Group>(
            r#"
            UPDATE groups
            SET members = CASE WHEN $2 = ANY(members) THEN members ELSE array_append(members, $2) END
            WHERE id = $1
            RETURNING id, name, creator_id, members, locations, created_at
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn add_group_location(
        &self,
        group_id: Uuid,
        location_id: Uuid,
    ) -> StoreResult<Option<Group>> {
        Ok(sqlx::query_as::<_, Group>(
            r#"
            UPDATE groups
            SET locations = CASE WHEN $2 = ANY(locations) THEN locations ELSE array_append(locations, $2) END
            WHERE id = $1
            RETURNING id, name, creator_id, members, locations, created_at
            "#,
        )
        .bind(group_id)
        .bind(location_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn insert_location(&self, location: &Location) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO locations (
                id, name, description, location_type, category, latitude, longitude,
                author_id, allowed_users, allowed_groups, photos, review_ids, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(location.id)
        .bind(&location.name)
        .bind(&location.description)
        .bind(location.location_type.as_str())
        .bind(&location.category)
        .bind(location.latitude)
        .bind(location.longitude)
        .bind(location.author_id)
        .bind(&location.allowed_users[..])
        .bind(&location.allowed_groups[..])
        .bind(Json(&location.photos))
        .bind(&location.reviews[..])
        .bind(location.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;
        Ok(())
    }

    async fn find_location(&self, id: Uuid) -> StoreResult<Option<Location>> {
        let sql = format!("{SELECT_LOCATION} WHERE id = $1");
        sqlx::query_as::<_, LocationRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Location::try_from)
            .transpose()
    }

    async fn find_locations(&self, filter: LocationFilter) -> StoreResult<Vec<Location>> {
        match filter {
            LocationFilter::All => {
                let sql = format!("{SELECT_LOCATION} ORDER BY created_at, id");
                let rows = sqlx::query_as::<_, LocationRow>(&sql)
                    .fetch_all(&self.pool)
                    .await?;
                locations_from_rows(rows)
            }
            LocationFilter::Near {
                latitude,
                longitude,
                radius_km,
            } => {
                // 先按纬度带粗筛，经度在高纬度和日期变更线附近不适合做区间过滤，
                // 最终以球面距离为准
                let band = radius_km / KM_PER_DEGREE_LATITUDE;
                let sql = format!(
                    "{SELECT_LOCATION} WHERE latitude BETWEEN $1 AND $2 ORDER BY created_at, id"
                );
                let rows = sqlx::query_as::<_, LocationRow>(&sql)
                    .bind(latitude - band)
                    .bind(latitude + band)
                    .fetch_all(&self.pool)
                    .await?;
                Ok(locations_from_rows(rows)?
                    .into_iter()
                    .filter(|loc| {
                        within_radius(loc.latitude, loc.longitude, latitude, longitude, radius_km)
                    })
                    .collect())
            }
        }
    }

    async fn update_location(&self, location: &Location) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE locations
            SET name = $2, description = $3, location_type = $4, category = $5,
                latitude = $6, longitude = $7, allowed_users = $8, allowed_groups = $9,
                photos = $10
            WHERE id = $1
            "#,
        )
        .bind(location.id)
        .bind(&location.name)
        .bind(&location.description)
        .bind(location.location_type.as_str())
        .bind(&location.category)
        .bind(location.latitude)
        .bind(location.longitude)
        .bind(&location.allowed_users[..])
        .bind(&location.allowed_groups[..])
        .bind(Json(&location.photos))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_location(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM locations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_review(&self, review: &Review) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;

        let attached = sqlx::query(
            "UPDATE locations SET review_ids = array_append(review_ids, $2) WHERE id = $1",
        )
        .bind(review.location_id)
        .bind(review.id)
        .execute(&mut *tx)
        .await?;
        if attached.rows_affected() == 0 {
            return Ok(false);
        }

        sqlx::query(
            r#"
            INSERT INTO reviews (id, location_id, user_id, rating, comment, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(review.id)
        .bind(review.location_id)
        .bind(review.user_id)
        .bind(review.rating)
        .bind(&review.comment)
        .bind(review.created_at)
        .execute(&mut *tx)
        .await
        .map_err(map_write_error)?;

        tx.commit().await?;
        Ok(true)
    }

    async fn find_reviews_by_location(&self, location_id: Uuid) -> StoreResult<Vec<Review>> {
        let sql = format!("{SELECT_REVIEW} WHERE location_id = $1 ORDER BY created_at, id");
        Ok(sqlx::query_as::<_, Review>(&sql)
            .bind(location_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn insert_invitation(&self, invitation: &Invitation) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO invitations (id, group_id, invitee_id, inviter_id, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(invitation.id)
        .bind(invitation.group_id)
        .bind(invitation.invitee_id)
        .bind(invitation.inviter_id)
        .bind(invitation.status.as_str())
        .bind(invitation.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;
        Ok(())
    }

    async fn find_invitation(&self, id: Uuid) -> StoreResult<Option<Invitation>> {
        let sql = format!("SELECT {INVITATION_COLUMNS} FROM invitations WHERE id = $1");
        sqlx::query_as::<_, InvitationRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Invitation::try_from)
            .transpose()
    }

    async fn find_invitations_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Invitation>> {
        let sql = format!(
            "SELECT {INVITATION_COLUMNS} FROM invitations \
             WHERE invitee_id = $1 OR inviter_id = $1 ORDER BY created_at DESC, id"
        );
        sqlx::query_as::<_, InvitationRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Invitation::try_from)
            .collect()
    }

    async fn accept_invitation(&self, id: Uuid) -> StoreResult<Option<Invitation>> {
        let mut tx = self.pool.begin().await?;

        let sql = format!("SELECT {INVITATION_COLUMNS} FROM invitations WHERE id = $1 FOR UPDATE");
        let Some(row) = sqlx::query_as::<_, InvitationRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };
        let invitation = Invitation::try_from(row)?;
        if invitation.status == InvitationStatus::Rejected {
            return Ok(None);
        }

        let joined = sqlx::query(
            r#"
            UPDATE groups
            SET members = CASE WHEN $2 = ANY(members) THEN members ELSE array_append(members, $2) END
            WHERE id = $1
            "#,
        )
        .bind(invitation.group_id)
        .bind(invitation.invitee_id)
        .execute(&mut *tx)
        .await?;
        if joined.rows_affected() == 0 {
            return Err(StoreError::Corrupt(format!(
                "invitation {id} references a missing group"
            )));
        }

        let sql = format!(
            "UPDATE invitations SET status = 'accepted' WHERE id = $1 RETURNING {INVITATION_COLUMNS}"
        );
        let row = sqlx::query_as::<_, InvitationRow>(&sql)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Invitation::try_from(row).map(Some)
    }

    async fn set_invitation_status(
        &self,
        id: Uuid,
        status: InvitationStatus,
    ) -> StoreResult<Option<Invitation>> {
        let sql = format!(
            "UPDATE invitations SET status = $2 \
             WHERE id = $1 AND (status = 'pending' OR status = $2) \
             RETURNING {INVITATION_COLUMNS}"
        );
        sqlx::query_as::<_, InvitationRow>(&sql)
            .bind(id)
            .bind(status.as_str())
            .fetch_optional(&self.pool)
            .await?
            .map(Invitation::try_from)
            .transpose()
    }

    async fn delete_pending_invitation(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM invitations WHERE id = $1 AND status = 'pending'")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
