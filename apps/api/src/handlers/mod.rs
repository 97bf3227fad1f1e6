//! HTTP request handlers.

pub mod assignments;
pub mod auth;
pub mod health;
pub mod logs;
pub mod permissions;
pub mod roles;
pub mod users;
