//! Stored image download.

use actix_web::http::header::{CacheControl, CacheDirective, ContentType};
use actix_web::{HttpResponse, web};

use crate::middleware::error::AppResult;
use crate::state::AppState;

/// GET /api/files/{name}
pub async fn serve_file(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let name = path.into_inner();
    let bytes = state.storage.load(&name).await?;

    Ok(HttpResponse::Ok()
        .insert_header(content_type_for(&name))
        .insert_header(CacheControl(vec![
            CacheDirective::Public,
            CacheDirective::MaxAge(86_400),
        ]))
        .body(bytes))
}

fn content_type_for(name: &str) -> ContentType {
    let extension = name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase());
    match extension.as_deref() {
        Some("png") => ContentType::png(),
        Some("jpg" | "jpeg") => ContentType::jpeg(),
        _ => ContentType::octet_stream(),
    }
}
