//! Public profile endpoints.

use axum::{
    Router,
    extract::{Path, Query, State},
    routing::get,
};
use orbit_common::AppResult;
use orbit_core::{PostView, ProfileView};
use orbit_db::entities::profile;
use serde::{Deserialize, Serialize};

use crate::{extractors::MaybeAuthSession, middleware::AppState, response::ApiResponse};

/// Profile page: the profile, its counts and its active posts.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePageResponse {
    #[serde(flatten)]
    pub view: ProfileView,
    pub posts: Vec<PostView>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

async fn show(
    viewer: MaybeAuthSession,
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> AppResult<ApiResponse<ProfilePageResponse>> {
    let view = state
        .profile_service
        .profile_view(&username, viewer.user_id())
        .await?;

    let posts = state
        .post_service
        .list_by_author(&view.profile.id)
        .await?
        .into_iter()
        .filter(|p| p.is_active)
        .collect();

    Ok(ApiResponse::ok(ProfilePageResponse { view, posts }))
}

/// Case-insensitive username search. The searcher is left out.
async fn search(
    viewer: MaybeAuthSession,
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> AppResult<ApiResponse<Vec<profile::Model>>> {
    let profiles = state
        .profile_service
        .search(&query.q, viewer.user_id(), state.limits.search_limit)
        .await?;
    Ok(ApiResponse::ok(profiles))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/search", get(search))
        .route("/{username}", get(show))
}
