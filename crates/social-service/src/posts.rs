//! Post operations, including likes and the comments a post contains.

use crate::{new_key, now_timestamp, require_entity, require_field, ServiceError};
use social_graph::{RelationOps, Repository, CREATED_COMMENT, HAS_COMMENT, LIKES_POST};
use social_types::{
    Comment, CreateCommentRequest, Entity, GraphStore, LikeRequest, NodeRef, Post,
    UpdatePostRequest, User,
};
use std::sync::Arc;

const POST_NOT_FOUND: &str = "Post not found.";
const USER_NOT_FOUND: &str = "User not found.";
const COMMENT_NOT_FOUND: &str = "Comment not found.";

#[derive(Clone)]
pub struct PostService {
    repo: Repository,
    relations: RelationOps,
}

impl PostService {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self {
            repo: Repository::new(Arc::clone(&store)),
            relations: RelationOps::new(store),
        }
    }

    async fn post(&self, post_id: &str) -> Result<Post, ServiceError> {
        require_entity(&self.repo, post_id, POST_NOT_FOUND).await
    }

    pub async fn list(&self) -> Result<Vec<Post>, ServiceError> {
        Ok(self.repo.list::<Post>().await?)
    }

    pub async fn get(&self, post_id: &str) -> Result<Post, ServiceError> {
        tracing::debug!(post_id, "get post");
        self.post(post_id).await
    }

    pub async fn update(
        &self,
        post_id: &str,
        req: UpdatePostRequest,
    ) -> Result<Post, ServiceError> {
        let mut post = self.post(post_id).await?;
        if let Some(title) = req.title {
            post.title = title;
        }
        if let Some(content) = req.content {
            post.content = content;
        }
        self.repo.save(&post, &[]).await?;
        tracing::info!(post_id, "post updated");
        Ok(post)
    }

    /// Deletes the post together with every comment it contains, in one store call.
    pub async fn delete(&self, post_id: &str) -> Result<(), ServiceError> {
        let post = self.post(post_id).await?;
        let mut doomed: Vec<NodeRef> = self
            .relations
            .neighbors(HAS_COMMENT, &post)
            .await?
            .iter()
            .map(|c| c.node_ref())
            .collect();
        let comment_count = doomed.len();
        doomed.push(post.node_ref());
        self.repo.delete_all(&doomed).await?;
        tracing::info!(post_id, comment_count, "post deleted");
        Ok(())
    }

    async fn like_target(
        &self,
        post_id: &str,
        req: LikeRequest,
    ) -> Result<(User, Post), ServiceError> {
        let user_id = require_field(req.user_id, "user_id")?;
        let user = require_entity::<User>(&self.repo, &user_id, USER_NOT_FOUND).await?;
        let post = self.post(post_id).await?;
        Ok((user, post))
    }

    /// Returns the id of the liking user.
    pub async fn like(&self, post_id: &str, req: LikeRequest) -> Result<String, ServiceError> {
        let (user, post) = self.like_target(post_id, req).await?;
        self.relations.add_edge(LIKES_POST, &user, &post).await?;
        tracing::info!(post_id, user_id = %user.user_id, "post liked");
        Ok(user.user_id)
    }

    pub async fn unlike(&self, post_id: &str, req: LikeRequest) -> Result<String, ServiceError> {
        let (user, post) = self.like_target(post_id, req).await?;
        self.relations.remove_edge(LIKES_POST, &user, &post).await?;
        tracing::info!(post_id, user_id = %user.user_id, "post unliked");
        Ok(user.user_id)
    }

    pub async fn comments(&self, post_id: &str) -> Result<Vec<Comment>, ServiceError> {
        let post = self.post(post_id).await?;
        Ok(self.relations.neighbors(HAS_COMMENT, &post).await?)
    }

    /// New comment under the post; the node, its `CREATED` author edge and its `HAS_COMMENT`
    /// parent edge are written together.
    pub async fn create_comment(
        &self,
        post_id: &str,
        req: CreateCommentRequest,
    ) -> Result<Comment, ServiceError> {
        let user_id = require_field(req.user_id, "user_id")?;
        let content = require_field(req.content, "content")?;
        let user = require_entity::<User>(&self.repo, &user_id, USER_NOT_FOUND).await?;
        let post = self.post(post_id).await?;

        let comment = Comment {
            comment_id: new_key(),
            content,
            created_at: now_timestamp(),
        };
        self.repo
            .insert(
                &comment,
                &[
                    CREATED_COMMENT.link(&user, &comment),
                    HAS_COMMENT.link(&post, &comment),
                ],
            )
            .await?;
        tracing::info!(post_id, comment_id = %comment.comment_id, "comment created");
        Ok(comment)
    }

    /// Deletes a comment only if it belongs to this post.
    pub async fn delete_comment(
        &self,
        post_id: &str,
        comment_id: &str,
    ) -> Result<(), ServiceError> {
        let post = self.post(post_id).await?;
        let comment = require_entity::<Comment>(&self.repo, comment_id, COMMENT_NOT_FOUND).await?;
        if !self.relations.has_edge(HAS_COMMENT, &post, &comment).await? {
            tracing::warn!(post_id, comment_id, "comment belongs to another post");
            return Err(ServiceError::RelationNotFound(format!(
                "Comment not found in Post {}",
                post_id
            )));
        }
        self.repo.delete(&comment).await?;
        tracing::info!(post_id, comment_id, "comment deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Services;
    use social_graph::InMemoryGraphStore;
    use social_types::{CreatePostRequest, CreateUserRequest};

    async fn setup() -> (Services, User, Post) {
        let services = Services::new(Arc::new(InMemoryGraphStore::new()));
        let user = services
            .users
            .create(CreateUserRequest {
                name: Some("Ann".to_string()),
                email: Some("a@x.com".to_string()),
            })
            .await
            .unwrap();
        let post = services
            .users
            .create_post(
                &user.user_id,
                CreatePostRequest {
                    title: Some("T".to_string()),
                    content: Some("C".to_string()),
                },
            )
            .await
            .unwrap();
        (services, user, post)
    }

    fn comment_req(user: &User, content: &str) -> CreateCommentRequest {
        CreateCommentRequest {
            user_id: Some(user.user_id.clone()),
            content: Some(content.to_string()),
        }
    }

    #[tokio::test]
    async fn partial_update_keeps_title() {
        let (services, _, post) = setup().await;
        services
            .posts
            .update(
                &post.post_id,
                UpdatePostRequest {
                    title: None,
                    content: Some("C2".to_string()),
                },
            )
            .await
            .unwrap();
        let got = services.posts.get(&post.post_id).await.unwrap();
        assert_eq!(got.title, "T");
        assert_eq!(got.content, "C2");
        assert_eq!(got.created_at, post.created_at);
    }

    #[tokio::test]
    async fn like_twice_equals_like_once() {
        let (services, user, post) = setup().await;
        let req = || LikeRequest {
            user_id: Some(user.user_id.clone()),
        };
        services.posts.like(&post.post_id, req()).await.unwrap();
        services.posts.like(&post.post_id, req()).await.unwrap();
        let likers = services
            .posts
            .relations
            .sources(LIKES_POST, &post)
            .await
            .unwrap();
        assert_eq!(likers.len(), 1);

        services.posts.unlike(&post.post_id, req()).await.unwrap();
        services.posts.unlike(&post.post_id, req()).await.unwrap();
        assert!(!services
            .posts
            .relations
            .has_edge(LIKES_POST, &user, &post)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn like_requires_user_id_and_existing_entities() {
        let (services, user, _) = setup().await;
        assert!(matches!(
            services.posts.like("p", LikeRequest::default()).await,
            Err(ServiceError::MissingField("user_id"))
        ));
        assert!(matches!(
            services
                .posts
                .like(
                    "missing",
                    LikeRequest {
                        user_id: Some(user.user_id.clone())
                    }
                )
                .await,
            Err(ServiceError::NotFound(msg)) if msg == "Post not found."
        ));
    }

    #[tokio::test]
    async fn comment_without_content_is_missing_field_and_creates_nothing() {
        let (services, user, post) = setup().await;
        let err = services
            .posts
            .create_comment(
                &post.post_id,
                CreateCommentRequest {
                    user_id: Some(user.user_id.clone()),
                    content: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::MissingField("content")));
        assert!(services.comments.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_post_cascades_to_comments() {
        let (services, user, post) = setup().await;
        let c1 = services
            .posts
            .create_comment(&post.post_id, comment_req(&user, "hi"))
            .await
            .unwrap();
        let c2 = services
            .posts
            .create_comment(&post.post_id, comment_req(&user, "there"))
            .await
            .unwrap();
        assert_eq!(services.posts.comments(&post.post_id).await.unwrap().len(), 2);

        services.posts.delete(&post.post_id).await.unwrap();
        for c in [&c1, &c2] {
            assert!(matches!(
                services.comments.get(&c.comment_id).await,
                Err(ServiceError::NotFound(_))
            ));
        }
        assert!(matches!(
            services.posts.get(&post.post_id).await,
            Err(ServiceError::NotFound(_))
        ));
        // The author survives, with no dangling authorship.
        assert!(services.users.posts(&user.user_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn scoped_comment_delete_requires_containment() {
        let (services, user, post) = setup().await;
        let other = services
            .users
            .create_post(
                &user.user_id,
                CreatePostRequest {
                    title: Some("T2".to_string()),
                    content: Some("C2".to_string()),
                },
            )
            .await
            .unwrap();
        let comment = services
            .posts
            .create_comment(&post.post_id, comment_req(&user, "hi"))
            .await
            .unwrap();

        let err = services
            .posts
            .delete_comment(&other.post_id, &comment.comment_id)
            .await
            .unwrap_err();
        let expected = format!("Comment not found in Post {}", other.post_id);
        assert!(matches!(err, ServiceError::RelationNotFound(ref msg) if *msg == expected));
        assert!(services.comments.get(&comment.comment_id).await.is_ok());

        assert!(matches!(
            services.posts.delete_comment(&post.post_id, "missing").await,
            Err(ServiceError::NotFound(msg)) if msg == "Comment not found."
        ));

        services
            .posts
            .delete_comment(&post.post_id, &comment.comment_id)
            .await
            .unwrap();
        assert!(services.posts.comments(&post.post_id).await.unwrap().is_empty());
    }
}
