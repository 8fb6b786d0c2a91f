// 需要可用的 Postgres：未设置 DATABASE_URL 时跳过

use chrono::Utc;
use locshare_backend::{
    models::{Group, Invitation, InvitationStatus, Location, NewLocation, Review, User},
    store::{DocumentStore, PgStore},
};
use uuid::Uuid;

async fn pg_store() -> Option<PgStore> {
    let Some(url) = std::env::var("DATABASE_URL").ok().filter(|url| !url.is_empty()) else {
        eprintln!("DATABASE_URL not set, skipping Postgres test");
        return None;
    };
    let store = PgStore::connect(&url, 2).await.unwrap();
    store.migrate().await.unwrap();
    Some(store)
}

async fn insert_user(store: &PgStore) -> User {
    let tag = Uuid::new_v4().simple().to_string();
    let user = User {
        id: Uuid::new_v4(),
        email: format!("{tag}@example.com"),
        username: format!("user_{tag}"),
        full_name: "Test User".into(),
        password_hash: String::new(),
        created_at: Utc::now(),
    };
    store.insert_user(&user).await.unwrap();
    user
}

async fn insert_location(store: &PgStore, author: Uuid) -> Location {
    let draft = NewLocation {
        name: Some("Pier".into()),
        description: Some("Wooden pier".into()),
        location_type: Some("public".into()),
        category: Some("sights".into()),
        latitude: Some(12.5),
        longitude: Some(-3.25),
        ..Default::default()
    }
    .validate()
    .unwrap();
    let location = Location::new(draft, author);
    store.insert_location(&location).await.unwrap();
    location
}

#[tokio::test]
async fn accept_adds_member_once_and_blocks_reject() {
    let Some(store) = pg_store().await else { return };
    let inviter = insert_user(&store).await;
    let invitee = insert_user(&store).await;
    let group = Group::new("crew".into(), inviter.id);
    store.insert_group(&group).await.unwrap();

    let invitation = Invitation::new(group.id, invitee.id, inviter.id);
    store.insert_invitation(&invitation).await.unwrap();

    for _ in 0..2 {
        let accepted = store.accept_invitation(invitation.id).await.unwrap().unwrap();
        assert_eq!(accepted.status, InvitationStatus::Accepted);
    }

    let group = store.find_group(group.id).await.unwrap().unwrap();
    assert_eq!(group.members.iter().filter(|id| **id == invitee.id).count(), 1);

    let rejected = store
        .set_invitation_status(invitation.id, InvitationStatus::Rejected)
        .await
        .unwrap();
    assert!(rejected.is_none());
    assert!(!store.delete_pending_invitation(invitation.id).await.unwrap());
}

#[tokio::test]
async fn rejected_invitation_is_not_accepted() {
    let Some(store) = pg_store().await else { return };
    let inviter = insert_user(&store).await;
    let invitee = insert_user(&store).await;
    let group = Group::new("crew".into(), inviter.id);
    store.insert_group(&group).await.unwrap();

    let invitation = Invitation::new(group.id, invitee.id, inviter.id);
    store.insert_invitation(&invitation).await.unwrap();
    store
        .set_invitation_status(invitation.id, InvitationStatus::Rejected)
        .await
        .unwrap()
        .unwrap();

    assert!(store.accept_invitation(invitation.id).await.unwrap().is_none());
    let group = store.find_group(group.id).await.unwrap().unwrap();
    assert!(!group.members.contains(&invitee.id));
}

#[tokio::test]
async fn group_appends_skip_duplicates() {
    let Some(store) = pg_store().await else { return };
    let creator = insert_user(&store).await;
    let member = Uuid::new_v4();
    let group = Group::new("hikers".into(), creator.id);
    store.insert_group(&group).await.unwrap();
    let location = insert_location(&store, creator.id).await;

    for _ in 0..2 {
        store.add_group_member(group.id, member).await.unwrap().unwrap();
        store.add_group_location(group.id, location.id).await.unwrap().unwrap();
    }
    // 创建者本身已是成员
    store.add_group_member(group.id, creator.id).await.unwrap().unwrap();

    let group = store.find_group(group.id).await.unwrap().unwrap();
    assert_eq!(group.members, vec![creator.id, member]);
    assert_eq!(group.locations, vec![location.id]);

    assert!(store.add_group_member(Uuid::new_v4(), member).await.unwrap().is_none());
    assert!(store.find_groups_by_member(member).await.unwrap().iter().any(|g| g.id == group.id));
}

#[tokio::test]
async fn review_insert_links_location() {
    let Some(store) = pg_store().await else { return };
    let author = insert_user(&store).await;
    let location = insert_location(&store, author.id).await;

    let review = Review::new(location.id, author.id, Some(4), Some("Nice view".into())).unwrap();
    assert!(store.insert_review(&review).await.unwrap());

    let stored = store.find_location(location.id).await.unwrap().unwrap();
    assert_eq!(stored.reviews, vec![review.id]);
    assert_eq!((stored.latitude, stored.longitude), (12.5, -3.25));

    let reviews = store.find_reviews_by_location(location.id).await.unwrap();
    assert_eq!(reviews.len(), 1);
    assert_eq!(reviews[0].rating, 4);

    let orphan = Review::new(Uuid::new_v4(), author.id, Some(3), Some("Gone".into())).unwrap();
    assert!(!store.insert_review(&orphan).await.unwrap());
    assert!(store.find_reviews_by_location(orphan.location_id).await.unwrap().is_empty());
}
