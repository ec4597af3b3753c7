//! Post handlers.

use actix_multipart::Multipart;
use actix_web::{HttpResponse, web};

use inkwell_core::domain::{PostId, PostQuery};
use inkwell_shared::dto::ListPostsQuery;

use super::forms::read_post_form;
use super::views::{page_response, post_response};
use crate::middleware::auth::Caller;
use crate::middleware::error::AppResult;
use crate::state::AppState;

/// GET /api/post
pub async fn list_posts(
    state: web::Data<AppState>,
    query: web::Query<ListPostsQuery>,
) -> AppResult<HttpResponse> {
    let query = query.into_inner();
    let query = PostQuery {
        search: query.search.unwrap_or_default(),
        tag_id: query.tag_id,
        page: query.page.unwrap_or(1),
        page_size: query.page_size.unwrap_or(PostQuery::DEFAULT_PAGE_SIZE),
    };

    let page = state.posts.list(query).await?;
    Ok(HttpResponse::Ok().json(page_response(page.map(post_response))))
}

/// GET /api/post/{id}
pub async fn get_post(
    state: web::Data<AppState>,
    path: web::Path<PostId>,
) -> AppResult<HttpResponse> {
    let post = state.posts.get(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(post_response(post)))
}

/// POST /api/post - multipart form
pub async fn create_post(
    state: web::Data<AppState>,
    caller: Caller,
    payload: Multipart,
) -> AppResult<HttpResponse> {
    let draft = read_post_form(payload).await?;
    let post = state.posts.create(&caller.0, draft).await?;
    Ok(HttpResponse::Created().json(post_response(post)))
}

/// PUT /api/post/{id} - multipart form
pub async fn update_post(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<PostId>,
    payload: Multipart,
) -> AppResult<HttpResponse> {
    let draft = read_post_form(payload).await?;
    state.posts.update(&caller.0, path.into_inner(), draft).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// DELETE /api/post/{id}
pub async fn delete_post(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<PostId>,
) -> AppResult<HttpResponse> {
    state.posts.delete(&caller.0, path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}
