//! Core types and traits for the social graph API.
//!
//! Entities mirror the node attribute tables of the graph (User, Post, Comment);
//! request/response DTOs are the flat JSON bodies exchanged over HTTP.

mod dto;
mod graph;
mod traits;

pub use dto::*;
pub use graph::*;
pub use traits::*;
