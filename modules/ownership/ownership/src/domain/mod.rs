pub mod cache;
pub mod engine;
pub mod error;
pub mod local_client;
pub mod policy;
pub mod ports;
pub mod registry;
pub mod repo;
pub mod service;
