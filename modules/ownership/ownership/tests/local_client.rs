#![allow(clippy::unwrap_used, clippy::expect_used)]

//! `OwnershipClient` contract through the in-process client.

mod support;

use std::sync::Arc;

use ownership::{LocalClient, OwnedResource, OwnershipClient, OwnershipError, OwnershipMode};
use ownership_security::ResourceRef;
use tracing_test::traced_test;

use support::{config, ctx_as, sql_harness, user};

async fn client(mode: OwnershipMode) -> Arc<dyn OwnershipClient> {
    let h = sql_harness(&config(mode)).await;
    Arc::new(LocalClient::new(h.service))
}

#[tokio::test]
async fn client_manages_owners() {
    let client = client(OwnershipMode::Multiple).await;
    let post = ResourceRef::new("post", 1);

    let record = client
        .add_owner(&post, &user(1), Some("editor"), Some(vec!["publish".to_owned()]))
        .await
        .unwrap();
    assert_eq!(record.role(), Some("editor"));
    assert!(client.owner_has_permission(&post, &user(1), "publish").await.unwrap());

    let resource = OwnedResource::new(post.clone());
    assert!(
        client
            .is_owned_by(&ctx_as(user(1)), &resource, None)
            .await
            .unwrap()
    );

    assert!(client.transfer_ownership(&post, &user(1), &user(2)).await.unwrap());
    assert!(client.update_owner_role(&post, &user(2), "viewer").await.unwrap());
    assert_eq!(client.get_owners(&post, Some("user")).await.unwrap().len(), 1);

    let synced = client
        .sync_owners(&post, &[user(3), user(4)], None, None)
        .await
        .unwrap();
    assert_eq!(synced.len(), 2);
    assert!(client.remove_owner(&post, &user(3)).await.unwrap());
    assert!(!client.has_owner(&post, &user(3)).await.unwrap());
}

#[tokio::test]
async fn client_maps_domain_errors() {
    let client = client(OwnershipMode::Multiple).await;
    let post = ResourceRef::new("post", 1);

    let err = client
        .add_owner(&post, &user(1), Some("maintainer"), None)
        .await
        .unwrap_err();
    assert!(
        matches!(&err, OwnershipError::InvalidOwner(msg) if msg == "The role [maintainer] is not valid.")
    );

    client.add_owner(&post, &user(1), None, None).await.unwrap();
    client.add_owner(&post, &user(2), None, None).await.unwrap();
    let err = client
        .transfer_ownership(&post, &user(1), &user(2))
        .await
        .unwrap_err();
    assert!(err.is_invalid_owner());

    let single = client_single().await;
    let err = single.get_owners(&post, None).await.unwrap_err();
    assert!(err.is_invalid_owner());
}

async fn client_single() -> Arc<dyn OwnershipClient> {
    client(OwnershipMode::Single).await
}

#[traced_test]
#[tokio::test]
async fn mutations_are_logged() {
    let client = client(OwnershipMode::Multiple).await;
    let post = ResourceRef::new("post", 1);

    client.add_owner(&post, &user(1), None, None).await.unwrap();
    assert!(logs_contain("owner added"));

    let _ = client.add_owner(&post, &user(2), Some("ghost"), None).await;
    assert!(logs_contain("unknown role rejected"));
}
