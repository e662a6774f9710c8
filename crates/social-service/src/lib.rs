//! Domain services: the business rules behind each API operation, composed from the entity
//! repository and relation operations.
//!
//! Every operation validates required fields before touching the store and resolves every
//! referenced entity before mutating anything, so a failed call never leaves a partial write.

mod comments;
mod posts;
mod users;

pub use comments::CommentService;
pub use posts::PostService;
pub use social_types::ServiceError;
pub use users::UserService;

use social_graph::Repository;
use social_types::{Entity, GraphStore};
use std::sync::Arc;

/// All services sharing one injected store.
#[derive(Clone)]
pub struct Services {
    pub users: UserService,
    pub posts: PostService,
    pub comments: CommentService,
}

impl Services {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self {
            users: UserService::new(Arc::clone(&store)),
            posts: PostService::new(Arc::clone(&store)),
            comments: CommentService::new(store),
        }
    }
}

fn new_key() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Current time as fractional seconds since the Unix epoch.
fn now_timestamp() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

fn require_field(value: Option<String>, field: &'static str) -> Result<String, ServiceError> {
    value.ok_or(ServiceError::MissingField(field))
}

async fn require_entity<E: Entity>(
    repo: &Repository,
    key: &str,
    message: &str,
) -> Result<E, ServiceError> {
    repo.find::<E>(key)
        .await?
        .ok_or_else(|| ServiceError::NotFound(message.to_string()))
}
