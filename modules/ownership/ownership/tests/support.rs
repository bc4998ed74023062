#![allow(clippy::unwrap_used, clippy::expect_used)]
#![allow(dead_code)]

//! Shared helpers for the ownership integration tests.

use std::sync::Arc;

use ownership::infra::events::RecordingEventPublisher;
use ownership::infra::storage::migration::{self, add_owner_columns};
use ownership::infra::storage::{SeaOrmOwnershipRepository, SeaOrmResourceStore};
use ownership::{OwnershipConfig, OwnershipMode, OwnershipService};
use ownership_security::{ActorContext, NoBypass, OwnerRef};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection};
use sea_orm_migration::SchemaManager;

pub struct SqlHarness {
    pub db: DatabaseConnection,
    pub service: OwnershipService,
    pub events: Arc<RecordingEventPublisher>,
    pub repo: Arc<SeaOrmOwnershipRepository>,
}

pub async fn inmem_db() -> DatabaseConnection {
    Database::connect("sqlite::memory:")
        .await
        .expect("Failed to connect to in-memory database")
}

/// `posts` table with inline owner columns, for single-mode tests.
pub async fn create_posts_table(db: &DatabaseConnection, morph_name: &str) {
    db.execute_unprepared("CREATE TABLE posts (id TEXT PRIMARY KEY NOT NULL, title TEXT NOT NULL)")
        .await
        .expect("Failed to create posts table");
    let manager = SchemaManager::new(db);
    add_owner_columns(&manager, "posts", morph_name)
        .await
        .expect("Failed to add owner columns");
}

pub async fn seed_post(db: &DatabaseConnection, id: &str, title: &str) {
    db.execute_unprepared(&format!(
        "INSERT INTO posts (id, title) VALUES ('{id}', '{title}')"
    ))
    .await
    .expect("Failed to seed post");
}

#[must_use]
pub fn config(mode: OwnershipMode) -> OwnershipConfig {
    OwnershipConfig {
        mode: Some(mode),
        ..OwnershipConfig::default()
    }
}

pub async fn sql_harness(cfg: &OwnershipConfig) -> SqlHarness {
    let db = inmem_db().await;
    let table = cfg.multiple_ownership.table_name.clone();
    migration::install(&db, &table)
        .await
        .expect("Failed to install ownership table");
    create_posts_table(&db, &cfg.morph_name).await;

    let repo = Arc::new(SeaOrmOwnershipRepository::new(db.clone(), table));
    let resources = Arc::new(SeaOrmResourceStore::new(
        db.clone(),
        "post",
        "posts",
        &cfg.morph_name,
    ));
    let events = Arc::new(RecordingEventPublisher::new());
    let service = OwnershipService::new(
        cfg,
        repo.clone(),
        resources,
        events.clone(),
        Arc::new(NoBypass),
    )
    .expect("valid configuration");

    SqlHarness {
        db,
        service,
        events,
        repo,
    }
}

#[must_use]
pub fn user(id: u32) -> OwnerRef {
    OwnerRef::new("user", id)
}

#[must_use]
pub fn ctx_as(actor: OwnerRef) -> ActorContext {
    ActorContext::builder().authenticated(actor).build()
}
