//! Multipart form reading for post create/update.

use actix_multipart::{Field, Multipart};
use futures::StreamExt;

use inkwell_core::domain::{ImageUpload, PostDraft};
use inkwell_core::services::MAX_IMAGE_BYTES;

use crate::middleware::error::AppError;

/// Upper bound for a text field of the post form.
const MAX_TEXT_FIELD_BYTES: usize = 1024 * 1024;

/// Read `title`, `content`, `tags` and an optional `image` part.
///
/// Unknown parts are drained and ignored. Image bytes beyond
/// [`MAX_IMAGE_BYTES`] are counted but not kept, so validation can reject
/// the upload by size without buffering it.
pub async fn read_post_form(mut payload: Multipart) -> Result<PostDraft, AppError> {
    let mut draft = PostDraft::default();

    while let Some(field) = payload.next().await {
        let mut field = field.map_err(|e| AppError::BadRequest(e.to_string()))?;
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "title" => draft.title = read_text(&mut field).await?,
            "content" => draft.content = read_text(&mut field).await?,
            "tags" => draft.tags = read_text(&mut field).await?,
            "image" => draft.image = Some(read_image(&mut field).await?),
            _ => {
                while let Some(chunk) = field.next().await {
                    chunk.map_err(|e| AppError::BadRequest(e.to_string()))?;
                }
            }
        }
    }

    Ok(draft)
}

async fn read_text(field: &mut Field) -> Result<String, AppError> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(|e| AppError::BadRequest(e.to_string()))?;
        if bytes.len() + chunk.len() > MAX_TEXT_FIELD_BYTES {
            return Err(AppError::PayloadTooLarge(format!(
                "form field exceeds {MAX_TEXT_FIELD_BYTES} bytes"
            )));
        }
        bytes.extend_from_slice(&chunk);
    }
    String::from_utf8(bytes).map_err(|_| AppError::BadRequest("form field is not UTF-8".to_string()))
}

async fn read_image(field: &mut Field) -> Result<ImageUpload, AppError> {
    let original_name = field
        .content_disposition()
        .and_then(|cd| cd.get_filename())
        .unwrap_or_default()
        .to_string();
    let content_type = field
        .content_type()
        .map(|mime| mime.essence_str().to_string())
        .unwrap_or_default();

    let mut size: u64 = 0;
    let mut data = Vec::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(|e| AppError::BadRequest(e.to_string()))?;
        size += chunk.len() as u64;
        if size <= MAX_IMAGE_BYTES {
            data.extend_from_slice(&chunk);
        } else if !data.is_empty() {
            data = Vec::new();
        }
    }

    Ok(ImageUpload {
        original_name,
        content_type,
        size,
        data,
    })
}
