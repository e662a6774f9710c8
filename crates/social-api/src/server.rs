//! Axum server and routes.

use crate::error::ApiError;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use social_service::Services;
use social_types::{
    AddFriendRequest, Comment, CommentCreated, CreateCommentRequest, CreatePostRequest,
    CreateUserRequest, ErrorResponse, FriendSummary, GraphStore, LikeRequest, MessageResponse,
    Post, PostCreated, UpdateCommentRequest, UpdatePostRequest, UpdateUserRequest, User,
    UserCreated, UserFriends,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Path of the generated OpenAPI document; the Swagger UI is served under `/docs/`.
pub const OPENAPI_PATH: &str = "/docs/apispec_1.json";

pub struct AppState {
    pub services: Services,
}

impl AppState {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self {
            services: Services::new(store),
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(title = "Social Graph API", description = "Users, posts, comments, friendships and likes"),
    paths(
        list_users,
        create_user,
        get_user,
        update_user,
        delete_user,
        get_friends,
        add_friend,
        check_friendship,
        remove_friend,
        mutual_friends,
        user_posts,
        create_post,
        list_posts,
        get_post,
        update_post,
        delete_post,
        like_post,
        unlike_post,
        post_comments,
        create_comment,
        delete_post_comment,
        list_comments,
        get_comment,
        update_comment,
        delete_comment,
        like_comment,
        unlike_comment,
        handle_health,
    ),
    components(schemas(
        User,
        Post,
        Comment,
        CreateUserRequest,
        UpdateUserRequest,
        AddFriendRequest,
        CreatePostRequest,
        UpdatePostRequest,
        LikeRequest,
        CreateCommentRequest,
        UpdateCommentRequest,
        FriendSummary,
        UserFriends,
        MessageResponse,
        UserCreated,
        PostCreated,
        CommentCreated,
        ErrorResponse,
    )),
    tags(
        (name = "users", description = "Users, friendships and authored posts"),
        (name = "posts", description = "Posts, likes and the comments they contain"),
        (name = "comments", description = "Comments addressed by id"),
    )
)]
pub struct ApiDoc;

type Shared = State<Arc<AppState>>;
type Body<T> = Result<Json<T>, JsonRejection>;
type Created<T> = Result<(StatusCode, Json<T>), ApiError>;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/:user_id",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/users/:user_id/friends", get(get_friends).post(add_friend))
        .route(
            "/users/:user_id/friends/:friend_id",
            get(check_friendship).delete(remove_friend),
        )
        .route(
            "/users/:user_id/mutual-friends/:other_id",
            get(mutual_friends),
        )
        .route("/users/:user_id/posts", get(user_posts).post(create_post))
        .route("/posts", get(list_posts))
        .route(
            "/posts/:post_id",
            get(get_post).put(update_post).delete(delete_post),
        )
        .route("/posts/:post_id/like", post(like_post).delete(unlike_post))
        .route(
            "/posts/:post_id/comments",
            get(post_comments).post(create_comment),
        )
        .route(
            "/posts/:post_id/comments/:comment_id",
            delete(delete_post_comment),
        )
        .route("/comments", get(list_comments))
        .route(
            "/comments/:comment_id",
            get(get_comment).put(update_comment).delete(delete_comment),
        )
        .route(
            "/comments/:comment_id/like",
            post(like_comment).delete(unlike_comment),
        )
        .route("/health", get(handle_health))
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url(OPENAPI_PATH, ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

fn message(status: StatusCode, text: impl Into<String>) -> (StatusCode, Json<MessageResponse>) {
    (
        status,
        Json(MessageResponse {
            message: text.into(),
        }),
    )
}

// Users

#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    responses((status = 200, description = "All users", body = [User]))
)]
async fn list_users(State(state): Shared) -> Result<Json<Vec<User>>, ApiError> {
    Ok(Json(state.services.users.list().await?))
}

#[utoipa::path(
    get,
    path = "/users/{user_id}",
    tag = "users",
    params(("user_id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "The user", body = User),
        (status = 404, description = "User not found", body = ErrorResponse),
    )
)]
async fn get_user(
    State(state): Shared,
    Path(user_id): Path<String>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(state.services.users.get(&user_id).await?))
}

#[utoipa::path(
    post,
    path = "/users",
    tag = "users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserCreated),
        (status = 400, description = "Missing name or email", body = ErrorResponse),
    )
)]
async fn create_user(
    State(state): Shared,
    body: Body<CreateUserRequest>,
) -> Created<UserCreated> {
    let Json(req) = body?;
    let user = state.services.users.create(req).await?;
    Ok((
        StatusCode::CREATED,
        Json(UserCreated {
            message: "User successfully created".to_string(),
            user_id: user.user_id,
        }),
    ))
}

#[utoipa::path(
    put,
    path = "/users/{user_id}",
    tag = "users",
    params(("user_id" = String, Path, description = "User id")),
    request_body = UpdateUserRequest,
    responses(
        (status = 201, description = "User updated", body = MessageResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
    )
)]
async fn update_user(
    State(state): Shared,
    Path(user_id): Path<String>,
    body: Body<UpdateUserRequest>,
) -> Created<MessageResponse> {
    let Json(req) = body?;
    state.services.users.update(&user_id, req).await?;
    Ok(message(StatusCode::CREATED, "User successfully updated"))
}

#[utoipa::path(
    delete,
    path = "/users/{user_id}",
    tag = "users",
    params(("user_id" = String, Path, description = "User id")),
    responses(
        (status = 204, description = "User and its relationships deleted"),
        (status = 404, description = "User not found", body = ErrorResponse),
    )
)]
async fn delete_user(
    State(state): Shared,
    Path(user_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.services.users.delete(&user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/users/{user_id}/friends",
    tag = "users",
    params(("user_id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "The user's friends", body = UserFriends),
        (status = 404, description = "User not found", body = ErrorResponse),
    )
)]
async fn get_friends(
    State(state): Shared,
    Path(user_id): Path<String>,
) -> Result<Json<UserFriends>, ApiError> {
    Ok(Json(state.services.users.friends(&user_id).await?))
}

#[utoipa::path(
    post,
    path = "/users/{user_id}/friends",
    tag = "users",
    params(("user_id" = String, Path, description = "User id")),
    request_body = AddFriendRequest,
    responses(
        (status = 201, description = "Friendship added in both directions", body = MessageResponse),
        (status = 400, description = "Missing friend_id", body = ErrorResponse),
        (status = 404, description = "User or friend not found", body = ErrorResponse),
    )
)]
async fn add_friend(
    State(state): Shared,
    Path(user_id): Path<String>,
    body: Body<AddFriendRequest>,
) -> Created<MessageResponse> {
    let Json(req) = body?;
    state.services.users.add_friend(&user_id, req).await?;
    Ok(message(StatusCode::CREATED, "Friend successfully added"))
}

#[utoipa::path(
    delete,
    path = "/users/{user_id}/friends/{friend_id}",
    tag = "users",
    params(
        ("user_id" = String, Path, description = "User id"),
        ("friend_id" = String, Path, description = "Friend's user id"),
    ),
    responses(
        (status = 201, description = "Friendship removed in both directions", body = MessageResponse),
        (status = 404, description = "User or friend not found", body = ErrorResponse),
    )
)]
async fn remove_friend(
    State(state): Shared,
    Path((user_id, friend_id)): Path<(String, String)>,
) -> Created<MessageResponse> {
    state
        .services
        .users
        .remove_friend(&user_id, &friend_id)
        .await?;
    Ok(message(StatusCode::CREATED, "Friend successfully removed"))
}

#[utoipa::path(
    get,
    path = "/users/{user_id}/friends/{friend_id}",
    tag = "users",
    params(
        ("user_id" = String, Path, description = "User id"),
        ("friend_id" = String, Path, description = "Other user's id"),
    ),
    responses(
        (status = 200, description = "Whether the two users are friends", body = bool),
        (status = 404, description = "User or friend not found", body = ErrorResponse),
    )
)]
async fn check_friendship(
    State(state): Shared,
    Path((user_id, friend_id)): Path<(String, String)>,
) -> Result<Json<bool>, ApiError> {
    Ok(Json(
        state
            .services
            .users
            .are_friends(&user_id, &friend_id)
            .await?,
    ))
}

#[utoipa::path(
    get,
    path = "/users/{user_id}/mutual-friends/{other_id}",
    tag = "users",
    params(
        ("user_id" = String, Path, description = "User id"),
        ("other_id" = String, Path, description = "Other user's id"),
    ),
    responses(
        (status = 200, description = "Ids of users friends with both, in no particular order", body = [String]),
        (status = 404, description = "User or other user not found", body = ErrorResponse),
    )
)]
async fn mutual_friends(
    State(state): Shared,
    Path((user_id, other_id)): Path<(String, String)>,
) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(
        state
            .services
            .users
            .mutual_friends(&user_id, &other_id)
            .await?,
    ))
}

#[utoipa::path(
    get,
    path = "/users/{user_id}/posts",
    tag = "users",
    params(("user_id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "Posts the user created", body = [Post]),
        (status = 404, description = "User not found", body = ErrorResponse),
    )
)]
async fn user_posts(
    State(state): Shared,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Post>>, ApiError> {
    Ok(Json(state.services.users.posts(&user_id).await?))
}

#[utoipa::path(
    post,
    path = "/users/{user_id}/posts",
    tag = "users",
    params(("user_id" = String, Path, description = "Author's user id")),
    request_body = CreatePostRequest,
    responses(
        (status = 201, description = "Post created", body = PostCreated),
        (status = 400, description = "Missing title or content", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
    )
)]
async fn create_post(
    State(state): Shared,
    Path(user_id): Path<String>,
    body: Body<CreatePostRequest>,
) -> Created<PostCreated> {
    let Json(req) = body?;
    let post = state.services.users.create_post(&user_id, req).await?;
    Ok((
        StatusCode::CREATED,
        Json(PostCreated {
            message: "Post successfully created".to_string(),
            post_id: post.post_id,
        }),
    ))
}

// Posts

#[utoipa::path(
    get,
    path = "/posts",
    tag = "posts",
    responses((status = 200, description = "All posts", body = [Post]))
)]
async fn list_posts(State(state): Shared) -> Result<Json<Vec<Post>>, ApiError> {
    Ok(Json(state.services.posts.list().await?))
}

#[utoipa::path(
    get,
    path = "/posts/{post_id}",
    tag = "posts",
    params(("post_id" = String, Path, description = "Post id")),
    responses(
        (status = 200, description = "The post", body = Post),
        (status = 404, description = "Post not found", body = ErrorResponse),
    )
)]
async fn get_post(
    State(state): Shared,
    Path(post_id): Path<String>,
) -> Result<Json<Post>, ApiError> {
    Ok(Json(state.services.posts.get(&post_id).await?))
}

#[utoipa::path(
    put,
    path = "/posts/{post_id}",
    tag = "posts",
    params(("post_id" = String, Path, description = "Post id")),
    request_body = UpdatePostRequest,
    responses(
        (status = 201, description = "Post updated", body = MessageResponse),
        (status = 404, description = "Post not found", body = ErrorResponse),
    )
)]
async fn update_post(
    State(state): Shared,
    Path(post_id): Path<String>,
    body: Body<UpdatePostRequest>,
) -> Created<MessageResponse> {
    let Json(req) = body?;
    state.services.posts.update(&post_id, req).await?;
    Ok(message(StatusCode::CREATED, "Post successfully updated"))
}

#[utoipa::path(
    delete,
    path = "/posts/{post_id}",
    tag = "posts",
    params(("post_id" = String, Path, description = "Post id")),
    responses(
        (status = 204, description = "Post and its comments deleted"),
        (status = 404, description = "Post not found", body = ErrorResponse),
    )
)]
async fn delete_post(
    State(state): Shared,
    Path(post_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.services.posts.delete(&post_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/posts/{post_id}/like",
    tag = "posts",
    params(("post_id" = String, Path, description = "Post id")),
    request_body = LikeRequest,
    responses(
        (status = 201, description = "Post liked", body = MessageResponse),
        (status = 400, description = "Missing user_id", body = ErrorResponse),
        (status = 404, description = "User or post not found", body = ErrorResponse),
    )
)]
async fn like_post(
    State(state): Shared,
    Path(post_id): Path<String>,
    body: Body<LikeRequest>,
) -> Created<MessageResponse> {
    let Json(req) = body?;
    let user_id = state.services.posts.like(&post_id, req).await?;
    Ok(message(
        StatusCode::CREATED,
        format!("Post successfully liked by User {}", user_id),
    ))
}

#[utoipa::path(
    delete,
    path = "/posts/{post_id}/like",
    tag = "posts",
    params(("post_id" = String, Path, description = "Post id")),
    request_body = LikeRequest,
    responses(
        (status = 201, description = "Like removed", body = MessageResponse),
        (status = 400, description = "Missing user_id", body = ErrorResponse),
        (status = 404, description = "User or post not found", body = ErrorResponse),
    )
)]
async fn unlike_post(
    State(state): Shared,
    Path(post_id): Path<String>,
    body: Body<LikeRequest>,
) -> Created<MessageResponse> {
    let Json(req) = body?;
    let user_id = state.services.posts.unlike(&post_id, req).await?;
    Ok(message(
        StatusCode::CREATED,
        format!("Post successfully unliked by User {}", user_id),
    ))
}

#[utoipa::path(
    get,
    path = "/posts/{post_id}/comments",
    tag = "posts",
    params(("post_id" = String, Path, description = "Post id")),
    responses(
        (status = 200, description = "Comments on the post", body = [Comment]),
        (status = 404, description = "Post not found", body = ErrorResponse),
    )
)]
async fn post_comments(
    State(state): Shared,
    Path(post_id): Path<String>,
) -> Result<Json<Vec<Comment>>, ApiError> {
    Ok(Json(state.services.posts.comments(&post_id).await?))
}

#[utoipa::path(
    post,
    path = "/posts/{post_id}/comments",
    tag = "posts",
    params(("post_id" = String, Path, description = "Post id")),
    request_body = CreateCommentRequest,
    responses(
        (status = 201, description = "Comment created", body = CommentCreated),
        (status = 400, description = "Missing user_id or content", body = ErrorResponse),
        (status = 404, description = "User or post not found", body = ErrorResponse),
    )
)]
async fn create_comment(
    State(state): Shared,
    Path(post_id): Path<String>,
    body: Body<CreateCommentRequest>,
) -> Created<CommentCreated> {
    let Json(req) = body?;
    let comment = state.services.posts.create_comment(&post_id, req).await?;
    Ok((
        StatusCode::CREATED,
        Json(CommentCreated {
            message: "Comment successfully created".to_string(),
            comment_id: comment.comment_id,
        }),
    ))
}

#[utoipa::path(
    delete,
    path = "/posts/{post_id}/comments/{comment_id}",
    tag = "posts",
    params(
        ("post_id" = String, Path, description = "Post id"),
        ("comment_id" = String, Path, description = "Comment id"),
    ),
    responses(
        (status = 204, description = "Comment deleted"),
        (status = 404, description = "Post or comment not found, or comment belongs to another post", body = ErrorResponse),
    )
)]
async fn delete_post_comment(
    State(state): Shared,
    Path((post_id, comment_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    state
        .services
        .posts
        .delete_comment(&post_id, &comment_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// Comments

#[utoipa::path(
    get,
    path = "/comments",
    tag = "comments",
    responses((status = 200, description = "All comments", body = [Comment]))
)]
async fn list_comments(State(state): Shared) -> Result<Json<Vec<Comment>>, ApiError> {
    Ok(Json(state.services.comments.list().await?))
}

#[utoipa::path(
    get,
    path = "/comments/{comment_id}",
    tag = "comments",
    params(("comment_id" = String, Path, description = "Comment id")),
    responses(
        (status = 200, description = "The comment", body = Comment),
        (status = 404, description = "Comment not found", body = ErrorResponse),
    )
)]
async fn get_comment(
    State(state): Shared,
    Path(comment_id): Path<String>,
) -> Result<Json<Comment>, ApiError> {
    Ok(Json(state.services.comments.get(&comment_id).await?))
}

#[utoipa::path(
    put,
    path = "/comments/{comment_id}",
    tag = "comments",
    params(("comment_id" = String, Path, description = "Comment id")),
    request_body = UpdateCommentRequest,
    responses(
        (status = 201, description = "Comment updated", body = MessageResponse),
        (status = 404, description = "Comment not found", body = ErrorResponse),
    )
)]
async fn update_comment(
    State(state): Shared,
    Path(comment_id): Path<String>,
    body: Body<UpdateCommentRequest>,
) -> Created<MessageResponse> {
    let Json(req) = body?;
    state.services.comments.update(&comment_id, req).await?;
    Ok(message(StatusCode::CREATED, "Comment successfully updated"))
}

#[utoipa::path(
    delete,
    path = "/comments/{comment_id}",
    tag = "comments",
    params(("comment_id" = String, Path, description = "Comment id")),
    responses(
        (status = 204, description = "Comment deleted"),
        (status = 404, description = "Comment not found", body = ErrorResponse),
    )
)]
async fn delete_comment(
    State(state): Shared,
    Path(comment_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.services.comments.delete(&comment_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/comments/{comment_id}/like",
    tag = "comments",
    params(("comment_id" = String, Path, description = "Comment id")),
    request_body = LikeRequest,
    responses(
        (status = 201, description = "Comment liked", body = MessageResponse),
        (status = 400, description = "Missing user_id", body = ErrorResponse),
        (status = 404, description = "User or comment not found", body = ErrorResponse),
    )
)]
async fn like_comment(
    State(state): Shared,
    Path(comment_id): Path<String>,
    body: Body<LikeRequest>,
) -> Created<MessageResponse> {
    let Json(req) = body?;
    let user_id = state.services.comments.like(&comment_id, req).await?;
    Ok(message(
        StatusCode::CREATED,
        format!("Comment successfully liked by User {}", user_id),
    ))
}

#[utoipa::path(
    delete,
    path = "/comments/{comment_id}/like",
    tag = "comments",
    params(("comment_id" = String, Path, description = "Comment id")),
    request_body = LikeRequest,
    responses(
        (status = 201, description = "Like removed", body = MessageResponse),
        (status = 400, description = "Missing user_id", body = ErrorResponse),
        (status = 404, description = "User or comment not found", body = ErrorResponse),
    )
)]
async fn unlike_comment(
    State(state): Shared,
    Path(comment_id): Path<String>,
    body: Body<LikeRequest>,
) -> Created<MessageResponse> {
    let Json(req) = body?;
    let user_id = state.services.comments.unlike(&comment_id, req).await?;
    Ok(message(
        StatusCode::CREATED,
        format!("Comment successfully unliked by User {}", user_id),
    ))
}

#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Liveness", body = String, content_type = "text/plain"))
)]
async fn handle_health() -> &'static str {
    "ok"
}
