pub mod config;
pub mod error;
pub mod feed;
pub mod memory_store;
pub mod record_mapper;
pub mod sqlite_store;
pub mod storage;
pub mod store;
