//! Storage adapters for the ownership ports.
//!
//! - `in_memory_repo` - process-local storage
//! - `sea_orm_repo` - ownership table on a SeaORM connection
//! - `resource_store` - inline owner columns of an ownable table
//! - `migration` - DDL for both
//! - `scope` - SQL filters for owned-by listings

pub mod in_memory_repo;
pub mod migration;
pub mod resource_store;
pub mod schema;
pub mod scope;
pub mod sea_orm_repo;

pub use in_memory_repo::{InMemoryOwnershipRepository, InMemoryResourceStore};
pub use resource_store::SeaOrmResourceStore;
pub use scope::ScopeTarget;
pub use sea_orm_repo::SeaOrmOwnershipRepository;
