//! User operations: CRUD, the friendship graph, and authored posts.

use crate::{new_key, now_timestamp, require_entity, require_field, ServiceError};
use social_graph::{RelationOps, Repository, SymmetricCommand, CREATED_POST, FRIENDS_WITH};
use social_types::{
    AddFriendRequest, CreatePostRequest, CreateUserRequest, FriendSummary, GraphStore, Post,
    UpdateUserRequest, User, UserFriends,
};
use std::sync::Arc;

const USER_NOT_FOUND: &str = "User not found.";

#[derive(Clone)]
pub struct UserService {
    repo: Repository,
    relations: RelationOps,
}

impl UserService {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self {
            repo: Repository::new(Arc::clone(&store)),
            relations: RelationOps::new(store),
        }
    }

    async fn user(&self, user_id: &str, message: &str) -> Result<User, ServiceError> {
        require_entity(&self.repo, user_id, message).await
    }

    pub async fn list(&self) -> Result<Vec<User>, ServiceError> {
        Ok(self.repo.list::<User>().await?)
    }

    pub async fn get(&self, user_id: &str) -> Result<User, ServiceError> {
        tracing::debug!(user_id, "get user");
        self.user(user_id, USER_NOT_FOUND).await
    }

    pub async fn create(&self, req: CreateUserRequest) -> Result<User, ServiceError> {
        let name = require_field(req.name, "name")?;
        let email = require_field(req.email, "email")?;
        let user = User {
            user_id: new_key(),
            name,
            email,
            created_at: now_timestamp(),
        };
        self.repo.insert(&user, &[]).await?;
        tracing::info!(user_id = %user.user_id, "user created");
        Ok(user)
    }

    pub async fn update(
        &self,
        user_id: &str,
        req: UpdateUserRequest,
    ) -> Result<User, ServiceError> {
        let mut user = self.user(user_id, USER_NOT_FOUND).await?;
        if let Some(name) = req.name {
            user.name = name;
        }
        if let Some(email) = req.email {
            user.email = email;
        }
        self.repo.save(&user, &[]).await?;
        tracing::info!(user_id, "user updated");
        Ok(user)
    }

    /// Removes the user and every edge touching it. Authored posts and comments stay.
    pub async fn delete(&self, user_id: &str) -> Result<(), ServiceError> {
        let user = self.user(user_id, USER_NOT_FOUND).await?;
        self.repo.delete(&user).await?;
        tracing::info!(user_id, "user deleted");
        Ok(())
    }

    pub async fn friends(&self, user_id: &str) -> Result<UserFriends, ServiceError> {
        let user = self.user(user_id, USER_NOT_FOUND).await?;
        let friends = self
            .relations
            .neighbors(FRIENDS_WITH, &user)
            .await?
            .into_iter()
            .map(|f| FriendSummary {
                user_id: f.user_id,
                name: f.name,
            })
            .collect();
        Ok(UserFriends {
            user_id: user.user_id,
            friends,
        })
    }

    pub async fn add_friend(
        &self,
        user_id: &str,
        req: AddFriendRequest,
    ) -> Result<(), ServiceError> {
        let friend_id = require_field(req.friend_id, "friend_id")?;
        let user = self.user(user_id, USER_NOT_FOUND).await?;
        let friend = self.user(&friend_id, "Friend User to add not found.").await?;

        let command = SymmetricCommand::link(FRIENDS_WITH, &user, &friend);
        self.relations.execute(&command).await.inspect_err(|e| {
            tracing::error!(user_id, friend_id = %friend_id, error = %e, "friendship link failed");
        })?;
        tracing::info!(user_id, friend_id = %friend_id, "friendship added");
        Ok(())
    }

    pub async fn remove_friend(&self, user_id: &str, friend_id: &str) -> Result<(), ServiceError> {
        let user = self.user(user_id, USER_NOT_FOUND).await?;
        let friend = self.user(friend_id, "Friend User to remove not found.").await?;

        let command = SymmetricCommand::unlink(FRIENDS_WITH, &user, &friend);
        self.relations.execute(&command).await.inspect_err(|e| {
            tracing::error!(user_id, friend_id, error = %e, "friendship unlink failed");
        })?;
        tracing::info!(user_id, friend_id, "friendship removed");
        Ok(())
    }

    pub async fn are_friends(&self, user_id: &str, friend_id: &str) -> Result<bool, ServiceError> {
        let user = self.user(user_id, USER_NOT_FOUND).await?;
        let friend = self.user(friend_id, "Friend User not found.").await?;
        Ok(self.relations.has_edge(FRIENDS_WITH, &user, &friend).await?)
    }

    /// Ids of users who are friends with both. Order is arbitrary.
    pub async fn mutual_friends(
        &self,
        user_id: &str,
        other_id: &str,
    ) -> Result<Vec<String>, ServiceError> {
        let user = self.user(user_id, USER_NOT_FOUND).await?;
        let other = self.user(other_id, "Other User not found.").await?;
        Ok(self
            .relations
            .mutual_neighbors(FRIENDS_WITH, &user, &other)
            .await?)
    }

    /// Posts the user created.
    pub async fn posts(&self, user_id: &str) -> Result<Vec<Post>, ServiceError> {
        let user = self.user(user_id, USER_NOT_FOUND).await?;
        Ok(self.relations.neighbors(CREATED_POST, &user).await?)
    }

    /// New post authored by the user; node and `CREATED` edge are written together.
    pub async fn create_post(
        &self,
        user_id: &str,
        req: CreatePostRequest,
    ) -> Result<Post, ServiceError> {
        let title = require_field(req.title, "title")?;
        let content = require_field(req.content, "content")?;
        let user = self.user(user_id, USER_NOT_FOUND).await?;

        let post = Post {
            post_id: new_key(),
            title,
            content,
            created_at: now_timestamp(),
        };
        self.repo
            .insert(&post, &[CREATED_POST.link(&user, &post)])
            .await?;
        tracing::info!(user_id, post_id = %post.post_id, "post created");
        Ok(post)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use social_graph::InMemoryGraphStore;
    use std::collections::HashSet;

    fn service() -> UserService {
        UserService::new(Arc::new(InMemoryGraphStore::new()))
    }

    async fn create(svc: &UserService, name: &str) -> User {
        svc.create(CreateUserRequest {
            name: Some(name.to_string()),
            email: Some(format!("{}@x.com", name)),
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn created_user_is_retrievable_with_fields_preserved() {
        let svc = service();
        let u = svc
            .create(CreateUserRequest {
                name: Some("Ann".to_string()),
                email: Some("a@x.com".to_string()),
            })
            .await
            .unwrap();
        let got = svc.get(&u.user_id).await.unwrap();
        assert_eq!(got, u);
        assert_eq!(got.name, "Ann");
        assert_eq!(got.email, "a@x.com");
        assert!(got.created_at > 0.0);
    }

    #[tokio::test]
    async fn create_without_email_is_missing_field_and_writes_nothing() {
        let svc = service();
        let err = svc
            .create(CreateUserRequest {
                name: Some("Ann".to_string()),
                email: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::MissingField("email")));
        assert!(svc.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn partial_update_keeps_other_fields() {
        let svc = service();
        let u = create(&svc, "ann").await;
        svc.update(
            &u.user_id,
            UpdateUserRequest {
                name: Some("Anna".to_string()),
                email: None,
            },
        )
        .await
        .unwrap();
        let got = svc.get(&u.user_id).await.unwrap();
        assert_eq!(got.name, "Anna");
        assert_eq!(got.email, u.email);
        assert_eq!(got.created_at, u.created_at);

        // No fields at all is not an error.
        svc.update(&u.user_id, UpdateUserRequest::default())
            .await
            .unwrap();
        assert_eq!(svc.get(&u.user_id).await.unwrap().name, "Anna");
    }

    #[tokio::test]
    async fn unknown_user_is_not_found() {
        let svc = service();
        assert!(matches!(
            svc.get("nope").await,
            Err(ServiceError::NotFound(msg)) if msg == "User not found."
        ));
        assert!(matches!(
            svc.delete("nope").await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn friendship_is_symmetric() {
        let svc = service();
        let a = create(&svc, "a").await;
        let b = create(&svc, "b").await;

        svc.add_friend(
            &a.user_id,
            AddFriendRequest {
                friend_id: Some(b.user_id.clone()),
            },
        )
        .await
        .unwrap();
        assert!(svc.are_friends(&a.user_id, &b.user_id).await.unwrap());
        assert!(svc.are_friends(&b.user_id, &a.user_id).await.unwrap());
        let friends_of_b = svc.friends(&b.user_id).await.unwrap();
        assert_eq!(
            friends_of_b.friends,
            vec![FriendSummary {
                user_id: a.user_id.clone(),
                name: "a".to_string()
            }]
        );

        svc.remove_friend(&b.user_id, &a.user_id).await.unwrap();
        assert!(!svc.are_friends(&a.user_id, &b.user_id).await.unwrap());
        assert!(!svc.are_friends(&b.user_id, &a.user_id).await.unwrap());
        // Removing again is a no-op.
        svc.remove_friend(&a.user_id, &b.user_id).await.unwrap();
    }

    #[tokio::test]
    async fn add_friend_checks_before_mutating() {
        let svc = service();
        let a = create(&svc, "a").await;

        let err = svc
            .add_friend(&a.user_id, AddFriendRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::MissingField("friend_id")));

        let err = svc
            .add_friend(
                &a.user_id,
                AddFriendRequest {
                    friend_id: Some("ghost".to_string()),
                },
            )
            .await
            .unwrap_err();
        assert!(
            matches!(err, ServiceError::NotFound(msg) if msg == "Friend User to add not found.")
        );
        assert!(svc.friends(&a.user_id).await.unwrap().friends.is_empty());
    }

    #[tokio::test]
    async fn mutual_friends_is_intersection() {
        let svc = service();
        let a = create(&svc, "a").await;
        let b = create(&svc, "b").await;
        let x = create(&svc, "x").await;
        let y = create(&svc, "y").await;
        let z = create(&svc, "z").await;
        let w = create(&svc, "w").await;
        for (u, f) in [(&a, &x), (&a, &y), (&a, &z), (&b, &y), (&b, &z), (&b, &w)] {
            svc.add_friend(
                &u.user_id,
                AddFriendRequest {
                    friend_id: Some(f.user_id.clone()),
                },
            )
            .await
            .unwrap();
        }

        let mutual: HashSet<String> = svc
            .mutual_friends(&a.user_id, &b.user_id)
            .await
            .unwrap()
            .into_iter()
            .collect();
        let expected: HashSet<String> = [y.user_id.clone(), z.user_id.clone()].into();
        assert_eq!(mutual, expected);

        assert!(matches!(
            svc.mutual_friends(&a.user_id, "ghost").await,
            Err(ServiceError::NotFound(msg)) if msg == "Other User not found."
        ));
    }

    #[tokio::test]
    async fn create_post_links_author() {
        let svc = service();
        let a = create(&svc, "a").await;
        let post = svc
            .create_post(
                &a.user_id,
                CreatePostRequest {
                    title: Some("T".to_string()),
                    content: Some("C".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(svc.posts(&a.user_id).await.unwrap(), vec![post]);

        let err = svc
            .create_post(
                "ghost",
                CreatePostRequest {
                    title: Some("T".to_string()),
                    content: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::MissingField("content")));
    }

    #[tokio::test]
    async fn deleting_user_removes_friend_edges() {
        let svc = service();
        let a = create(&svc, "a").await;
        let b = create(&svc, "b").await;
        svc.add_friend(
            &a.user_id,
            AddFriendRequest {
                friend_id: Some(b.user_id.clone()),
            },
        )
        .await
        .unwrap();
        svc.delete(&a.user_id).await.unwrap();
        assert!(svc.friends(&b.user_id).await.unwrap().friends.is_empty());
    }
}
