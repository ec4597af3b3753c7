//! Tag listing.

use actix_web::{HttpResponse, web};

use super::views::tag_response;
use crate::middleware::error::AppResult;
use crate::state::AppState;

/// GET /api/tag - all tags, sorted by name
pub async fn list_tags(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let tags: Vec<_> = state
        .posts
        .list_tags()
        .await?
        .into_iter()
        .map(tag_response)
        .collect();
    Ok(HttpResponse::Ok().json(tags))
}
