pub mod list;
pub mod manifest;
pub mod proxy;
pub mod repo;
pub mod update;
