#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use ownership_sdk::OwnershipMode;
use ownership_security::{ActorContext, NoBypass, OwnerRef};

use crate::config::OwnershipConfig;
use crate::domain::service::OwnershipService;
use crate::infra::events::RecordingEventPublisher;
use crate::infra::storage::{InMemoryOwnershipRepository, InMemoryResourceStore};

pub struct Harness {
    pub service: OwnershipService,
    pub events: Arc<RecordingEventPublisher>,
    pub repo: Arc<InMemoryOwnershipRepository>,
    pub resources: Arc<InMemoryResourceStore>,
}

#[must_use]
pub fn config(mode: OwnershipMode) -> OwnershipConfig {
    OwnershipConfig {
        mode: Some(mode),
        ..OwnershipConfig::default()
    }
}

#[must_use]
pub fn harness(mode: OwnershipMode) -> Harness {
    harness_with(&config(mode))
}

#[must_use]
pub fn harness_with(cfg: &OwnershipConfig) -> Harness {
    let events = Arc::new(RecordingEventPublisher::new());
    let repo = Arc::new(InMemoryOwnershipRepository::new());
    let resources = Arc::new(InMemoryResourceStore::new());
    let service = OwnershipService::new(
        cfg,
        repo.clone(),
        resources.clone(),
        events.clone(),
        Arc::new(NoBypass),
    )
    .expect("valid test configuration");
    Harness {
        service,
        events,
        repo,
        resources,
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
