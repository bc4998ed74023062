pub mod events;
pub mod storage;
