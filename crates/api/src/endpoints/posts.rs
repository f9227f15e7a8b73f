//! Post, like and comment endpoints.

use axum::{
    Json, Router,
    extract::{Multipart, Path, State},
    routing::{get, post},
};
use orbit_common::AppResult;
use orbit_core::{
    CommentView, CreateCommentInput, CreatePostInput, LikeState, PostView, UpdatePostInput,
};
use orbit_db::entities::{comment, post};
use serde::Serialize;

use crate::{
    endpoints::read_file_field,
    extractors::{AuthSession, MaybeAuthSession},
    middleware::AppState,
    response::{ApiResponse, Success},
};

/// Single post page.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDetailResponse {
    pub post: PostView,
    pub comments: Vec<CommentView>,
    /// Whether the viewer liked the post. `false` when signed out.
    pub liked: bool,
}

#[derive(Serialize)]
pub struct UploadedImage {
    pub url: String,
}

async fn create(
    AuthSession(session): AuthSession,
    State(state): State<AppState>,
    Json(input): Json<CreatePostInput>,
) -> AppResult<ApiResponse<post::Model>> {
    let post = state
        .post_service
        .create_post(session.user_id(), input)
        .await?;
    Ok(ApiResponse::created(post))
}

/// Store an image for a post that is about to be created.
async fn upload_image(
    AuthSession(session): AuthSession,
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<ApiResponse<UploadedImage>> {
    let (content_type, data) = read_file_field(multipart).await?;

    let url = state
        .upload_service
        .upload_post_image(session.user_id(), &content_type, &data)
        .await?;
    Ok(ApiResponse::created(UploadedImage { url }))
}

async fn show(
    viewer: MaybeAuthSession,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<PostDetailResponse>> {
    let post = state.post_service.get_post(&id).await?;
    let comments = state.comment_service.list_comments(&id).await?;
    let liked = match viewer.user_id() {
        Some(user_id) => state.like_service.is_liked(user_id, &id).await?,
        None => false,
    };

    Ok(ApiResponse::ok(PostDetailResponse {
        post,
        comments,
        liked,
    }))
}

async fn update(
    AuthSession(session): AuthSession,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UpdatePostInput>,
) -> AppResult<ApiResponse<post::Model>> {
    let post = state.post_service.update_post(&session, &id, input).await?;
    Ok(ApiResponse::ok(post))
}

async fn delete(
    AuthSession(session): AuthSession,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<Success>> {
    state.post_service.delete_post(&session, &id).await?;
    Ok(Success::ok())
}

async fn like(
    AuthSession(session): AuthSession,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<LikeState>> {
    let like = state.like_service.like(session.user_id(), &id).await?;
    Ok(ApiResponse::ok(like))
}

async fn unlike(
    AuthSession(session): AuthSession,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<LikeState>> {
    let like = state.like_service.unlike(session.user_id(), &id).await?;
    Ok(ApiResponse::ok(like))
}

async fn add_comment(
    AuthSession(session): AuthSession,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<CreateCommentInput>,
) -> AppResult<ApiResponse<comment::Model>> {
    let comment = state
        .comment_service
        .add_comment(session.user_id(), &id, input)
        .await?;
    Ok(ApiResponse::created(comment))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create))
        .route("/images", post(upload_image))
        .route("/{id}", get(show).patch(update).delete(delete))
        .route("/{id}/like", post(like).delete(unlike))
        .route("/{id}/comments", post(add_comment))
}
