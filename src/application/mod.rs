//! Application services layer.

pub mod auth;
pub mod error;
pub mod feed;
pub mod follows;
pub mod pagination;
pub mod posts;
pub mod profiles;
pub mod repos;
