//! API handlers for the auth and account routes.

pub mod auth;
pub mod health;
pub mod root;
