//! Comment operations addressed by comment id alone.

use crate::{require_entity, require_field, ServiceError};
use social_graph::{RelationOps, Repository, LIKES_COMMENT};
use social_types::{Comment, GraphStore, LikeRequest, UpdateCommentRequest, User};
use std::sync::Arc;

const COMMENT_NOT_FOUND: &str = "Comment not found.";

#[derive(Clone)]
pub struct CommentService {
    repo: Repository,
    relations: RelationOps,
}

impl CommentService {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self {
            repo: Repository::new(Arc::clone(&store)),
            relations: RelationOps::new(store),
        }
    }

    async fn comment(&self, comment_id: &str) -> Result<Comment, ServiceError> {
        require_entity(&self.repo, comment_id, COMMENT_NOT_FOUND).await
    }

    pub async fn list(&self) -> Result<Vec<Comment>, ServiceError> {
        Ok(self.repo.list::<Comment>().await?)
    }

    pub async fn get(&self, comment_id: &str) -> Result<Comment, ServiceError> {
        tracing::debug!(comment_id, "get comment");
        self.comment(comment_id).await
    }

    pub async fn update(
        &self,
        comment_id: &str,
        req: UpdateCommentRequest,
    ) -> Result<Comment, ServiceError> {
        let mut comment = self.comment(comment_id).await?;
        if let Some(content) = req.content {
            comment.content = content;
        }
        self.repo.save(&comment, &[]).await?;
        tracing::info!(comment_id, "comment updated");
        Ok(comment)
    }

    /// Removes the comment along with its author and parent-post edges.
    pub async fn delete(&self, comment_id: &str) -> Result<(), ServiceError> {
        let comment = self.comment(comment_id).await?;
        self.repo.delete(&comment).await?;
        tracing::info!(comment_id, "comment deleted");
        Ok(())
    }

    async fn like_target(
        &self,
        comment_id: &str,
        req: LikeRequest,
    ) -> Result<(User, Comment), ServiceError> {
        let user_id = require_field(req.user_id, "user_id")?;
        let user = require_entity::<User>(&self.repo, &user_id, "User not found.").await?;
        let comment = self.comment(comment_id).await?;
        Ok((user, comment))
    }

    /// Returns the id of the liking user.
    pub async fn like(&self, comment_id: &str, req: LikeRequest) -> Result<String, ServiceError> {
        let (user, comment) = self.like_target(comment_id, req).await?;
        self.relations
            .add_edge(LIKES_COMMENT, &user, &comment)
            .await?;
        tracing::info!(comment_id, user_id = %user.user_id, "comment liked");
        Ok(user.user_id)
    }

    pub async fn unlike(&self, comment_id: &str, req: LikeRequest) -> Result<String, ServiceError> {
        let (user, comment) = self.like_target(comment_id, req).await?;
        self.relations
            .remove_edge(LIKES_COMMENT, &user, &comment)
            .await?;
        tracing::info!(comment_id, user_id = %user.user_id, "comment unliked");
        Ok(user.user_id)
    }
}
