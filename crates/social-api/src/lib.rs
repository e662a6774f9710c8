//! HTTP layer for the social graph API.

pub mod config;
pub mod error;
pub mod server;
