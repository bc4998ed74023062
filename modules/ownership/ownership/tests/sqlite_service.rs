#![allow(clippy::unwrap_used, clippy::expect_used)]

//! End-to-end ownership flows against SQLite.

mod support;

use ownership::domain::repo::OwnershipRepository;
use ownership::infra::storage::ScopeTarget;
use ownership::{AddOwnerOptions, OwnedByScope, OwnedResource, OwnershipEvent, OwnershipMode};
use ownership_security::{OwnerRef, ResourceRef};
use sea_orm::sea_query::{Alias, Query};
use sea_orm::{ConnectionTrait, DatabaseConnection, FromQueryResult};

use support::{config, ctx_as, seed_post, sql_harness, user};

#[derive(Debug, FromQueryResult)]
struct PostRow {
    id: String,
    owner_type: Option<String>,
    owner_id: Option<String>,
}

async fn posts_where(db: &DatabaseConnection, target: &ScopeTarget, scope: &OwnedByScope) -> Vec<PostRow> {
    let select = Query::select()
        .columns([Alias::new("id"), Alias::new("owner_type"), Alias::new("owner_id")])
        .from(Alias::new("posts"))
        .cond_where(target.condition(scope))
        .order_by(Alias::new("id"), sea_orm::sea_query::Order::Asc)
        .to_owned();
    let stmt = db.get_database_backend().build(&select);
    PostRow::find_by_statement(stmt).all(db).await.unwrap()
}

#[tokio::test]
async fn multiple_mode_round_trip() {
    let h = sql_harness(&config(OwnershipMode::Multiple)).await;
    let post = ResourceRef::new("post", 1);
    let (alice, bob, carol) = (user(1), user(2), user(3));

    h.service
        .add_owner(&post, &alice, AddOwnerOptions::role("owner"))
        .await
        .unwrap();
    h.service
        .add_owner(&post, &bob, AddOwnerOptions::role("viewer"))
        .await
        .unwrap();
    // Second add for the same owner updates in place.
    h.service
        .add_owner(&post, &bob, AddOwnerOptions::role("editor"))
        .await
        .unwrap();

    assert_eq!(h.service.get_owners(&post, None).await.unwrap().len(), 2);
    assert!(h.service.owner_has_permission(&post, &alice, "delete").await.unwrap());
    assert!(h.service.owner_has_permission(&post, &bob, "edit").await.unwrap());
    assert!(!h.service.owner_has_permission(&post, &bob, "delete").await.unwrap());

    let mut resource = OwnedResource::new(post.clone());
    assert!(h.service.transfer_ownership(&mut resource, &bob, &carol).await.unwrap());
    assert!(h.service.has_owner_with_role(&post, &carol, "editor").await.unwrap());
    assert!(h.service.remove_owner(&post, &carol).await.unwrap());

    assert_eq!(
        h.events.names(),
        vec![
            "OwnershipCreated",
            "OwnershipCreated",
            "OwnershipTransferred",
            "OwnershipDeleted"
        ]
    );
    assert_eq!(h.repo.count(&post).await.unwrap(), 1);
}

#[tokio::test]
async fn sync_is_atomic_and_silent() {
    let h = sql_harness(&config(OwnershipMode::Multiple)).await;
    let post = ResourceRef::new("post", 1);
    h.service
        .add_owners(&post, &[user(1), user(2)], &AddOwnerOptions::role("editor"))
        .await
        .unwrap();
    h.events.drain();

    let records = h
        .service
        .sync_owners(&post, &[user(2), user(3)], AddOwnerOptions::role("viewer"))
        .await
        .unwrap();
    assert_eq!(records.len(), 2);
    assert!(!h.service.has_owner(&post, &user(1)).await.unwrap());
    assert!(h.service.has_owner_with_role(&post, &user(3), "viewer").await.unwrap());
    assert!(h.events.events().is_empty());
}

#[tokio::test]
async fn single_mode_persists_inline_columns() {
    let h = sql_harness(&config(OwnershipMode::Single)).await;
    seed_post(&h.db, "1", "Hello").await;
    seed_post(&h.db, "2", "World").await;

    let ctx = ctx_as(user(1));
    let mut first = OwnedResource::new(ResourceRef::new("post", 1));
    h.service.on_creating(&ctx, &mut first);
    let owner = first.owner.clone().unwrap();
    assert!(h.service.set_owner(&mut first, &owner).await.unwrap());

    let mut second = OwnedResource::new(ResourceRef::new("post", 2));
    h.service.set_owner(&mut second, &user(2)).await.unwrap();

    let target = ScopeTarget::new("post", "posts", "owner", "ownerships");
    let mine = posts_where(&h.db, &target, &h.service.global_scope(&ctx)).await;
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].id, "1");
    assert_eq!(mine[0].owner_type.as_deref(), Some("user"));
    assert_eq!(mine[0].owner_id.as_deref(), Some("1"));

    assert!(h.service.clear_owner(&mut first).await.unwrap());
    let everyone = posts_where(&h.db, &target, &OwnedByScope::Unrestricted).await;
    assert_eq!(everyone.len(), 2);
    assert_eq!(everyone[0].owner_type, None);

    // A resource without a row is reported as not saved.
    let mut ghost = OwnedResource::new(ResourceRef::new("post", 99));
    assert!(!h.service.set_owner(&mut ghost, &user(1)).await.unwrap());
    assert_eq!(ghost.owner, None);
}

#[tokio::test]
async fn multiple_mode_scope_uses_ownership_records() {
    let h = sql_harness(&config(OwnershipMode::Multiple)).await;
    for (id, title) in [("1", "a"), ("2", "b"), ("3", "c")] {
        seed_post(&h.db, id, title).await;
    }
    h.service
        .add_owner(&ResourceRef::new("post", 1), &user(1), AddOwnerOptions::default())
        .await
        .unwrap();
    h.service
        .add_owner(&ResourceRef::new("post", 2), &user(2), AddOwnerOptions::default())
        .await
        .unwrap();
    h.service
        .add_owner(
            &ResourceRef::new("post", 3),
            &OwnerRef::new("team", 1),
            AddOwnerOptions::default(),
        )
        .await
        .unwrap();

    let target = ScopeTarget::new("post", "posts", "owner", "ownerships");
    let ctx = ctx_as(user(2));
    let mine = posts_where(&h.db, &target, &h.service.owned_by(&ctx, None)).await;
    assert_eq!(mine.iter().map(|p| p.id.as_str()).collect::<Vec<_>>(), vec!["2"]);

    let teams = posts_where(
        &h.db,
        &target,
        &h.service.owned_by(&ctx, Some(&OwnerRef::new("team", 1))),
    )
    .await;
    assert_eq!(teams.len(), 1);
    assert_eq!(teams[0].id, "3");

    let anyone = posts_where(&h.db, &target, &OwnedByScope::AnyOwnershipRecord).await;
    assert_eq!(anyone.len(), 3);
}

#[tokio::test]
async fn custom_table_and_morph_names() {
    let mut cfg = config(OwnershipMode::Multiple);
    cfg.multiple_ownership.table_name = "post_owners".to_owned();
    cfg.morph_name = "holder".to_owned();
    let h = sql_harness(&cfg).await;

    let post = ResourceRef::new("post", 1);
    let record = h
        .service
        .add_owner(&post, &user(1), AddOwnerOptions::role("viewer"))
        .await
        .unwrap();
    assert_eq!(h.repo.table_name(), "post_owners");
    assert_eq!(
        h.events.events().first(),
        Some(&OwnershipEvent::Created {
            resource: post,
            record,
        })
    );
}
