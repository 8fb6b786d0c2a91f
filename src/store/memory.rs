use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{DocumentStore, LocationFilter, StoreError, StoreResult};
use crate::models::{Group, Invitation, InvitationStatus, Location, Review, User};
use crate::utils::within_radius;

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    groups: HashMap<Uuid, Group>,
    locations: HashMap<Uuid, Location>,
    reviews: HashMap<Uuid, Review>,
    invitations: HashMap<Uuid, Invitation>,
}

/// 进程内存储，所有写操作在同一把写锁下完成
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate("email".into()));
        }
        if tables.users.values().any(|u| u.username == user.username) {
            return Err(StoreError::Duplicate("username".into()));
        }
        tables.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_users(&self, ids: &[Uuid]) -> StoreResult<Vec<User>> {
        let tables = self.tables.read().await;
        Ok(ids.iter().filter_map(|id| tables.users.get(id).cloned()).collect())
    }

    async fn insert_group(&self, group: &Group) -> StoreResult<()> {
        self.tables.write().await.groups.insert(group.id, group.clone());
        Ok(())
    }

    async fn find_group(&self, id: Uuid) -> StoreResult<Option<Group>> {
        Ok(self.tables.read().await.groups.get(&id).cloned())
    }

    async fn find_groups_by_member(&self, user_id: Uuid) -> StoreResult<Vec<Group>> {
        let tables = self.tables.read().await;
        let mut groups: Vec<Group> = tables
            .groups
            .values()
            .filter(|g| g.is_member(user_id))
            .cloned()
            .collect();
        groups.sort_by_key(|g| (g.created_at, g.id));
        Ok(groups)
    }

    async fn add_group_member(&self, group_id: Uuid, user_id: Uuid) -> StoreResult<Option<Group>> {
        let mut tables = self.tables.write().await;
        Ok(tables.groups.get_mut(&group_id).map(|group| {
            group.add_member(user_id);
            group.clone()
        }))
    }

    async fn add_group_location(
        &self,
        group_id: Uuid,
        location_id: Uuid,
    ) -> StoreResult<Option<Group>> {
        let mut tables = self.tables.write().await;
        Ok(tables.groups.get_mut(&group_id).map(|group| {
            group.add_location(location_id);
            group.clone()
        }))
    }

    async fn insert_location(&self, location: &Location) -> StoreResult<()> {
        self.tables
            .write()
            .await
            .locations
            .insert(location.id, location.clone());
        Ok(())
    }

    async fn find_location(&self, id: Uuid) -> StoreResult<Option<Location>> {
        Ok(self.tables.read().await.locations.get(&id).cloned())
    }

    async fn find_locations(&self, filter: LocationFilter) -> StoreResult<Vec<Location>> {
        let tables = self.tables.read().await;
        let mut locations: Vec<Location> = tables
            .locations
            .values()
            .filter(|loc| match filter {
                LocationFilter::All => true,
                LocationFilter::Near {
                    latitude,
                    longitude,
                    radius_km,
                } => within_radius(loc.latitude, loc.longitude, latitude, longitude, radius_km),
            })
            .cloned()
            .collect();
        locations.sort_by_key(|loc| (loc.created_at, loc.id));
        Ok(locations)
    }

    async fn update_location(&self, location: &Location) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.locations.get_mut(&location.id) {
            Some(stored) => {
                // 评论列表只由 insert_review 维护
                let reviews = std::mem::take(&mut stored.reviews);
                *stored = Location {
                    reviews,
                    author_id: stored.author_id,
                    created_at: stored.created_at,
                    ..location.clone()
                };
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_location(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.tables.write().await.locations.remove(&id).is_some())
    }

    async fn insert_review(&self, review: &Review) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.locations.get_mut(&review.location_id) {
            Some(location) => {
                location.reviews.push(review.id);
                tables.reviews.insert(review.id, review.clone());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_reviews_by_location(&self, location_id: Uuid) -> StoreResult<Vec<Review>> {
        let tables = self.tables.read().await;
        let mut reviews: Vec<Review> = tables
            .reviews
            .values()
            .filter(|r| r.location_id == location_id)
            .cloned()
            .collect();
        reviews.sort_by_key(|r| (r.created_at, r.id));
        Ok(reviews)
    }

    async fn insert_invitation(&self, invitation: &Invitation) -> StoreResult<()> {
        self.tables
            .write()
            .await
            .invitations
            .insert(invitation.id, invitation.clone());
        Ok(())
    }

    async fn find_invitation(&self, id: Uuid) -> StoreResult<Option<Invitation>> {
        Ok(self.tables.read().await.invitations.get(&id).cloned())
    }

    async fn find_invitations_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Invitation>> {
        let tables = self.tables.read().await;
        let mut invitations: Vec<Invitation> = tables
            .invitations
            .values()
            .filter(|i| i.involves(user_id))
            .cloned()
            .collect();
        invitations.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(invitations)
    }

    async fn accept_invitation(&self, id: Uuid) -> StoreResult<Option<Invitation>> {
        let mut guard = self.tables.write().await;
        let tables = &mut *guard;

        let Some(invitation) = tables.invitations.get_mut(&id) else {
            return Ok(None);
        };
        if invitation.status == InvitationStatus::Rejected {
            return Ok(None);
        }
        let group = tables.groups.get_mut(&invitation.group_id).ok_or_else(|| {
            StoreError::Corrupt(format!("invitation {id} references a missing group"))
        })?;

        group.add_member(invitation.invitee_id);
        invitation.status = InvitationStatus::Accepted;
        Ok(Some(invitation.clone()))
    }

    async fn set_invitation_status(
        &self,
        id: Uuid,
        status: InvitationStatus,
    ) -> StoreResult<Option<Invitation>> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .invitations
            .get_mut(&id)
            .filter(|i| i.status == InvitationStatus::Pending || i.status == status)
            .map(|invitation| {
                invitation.status = status;
                invitation.clone()
            }))
    }

    async fn delete_pending_invitation(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let pending = tables
            .invitations
            .get(&id)
            .is_some_and(|i| i.status == InvitationStatus::Pending);
        if pending {
            tables.invitations.remove(&id);
        }
        Ok(pending)
    }
}
