//! Domain to response conversions.

use inkwell_core::domain::{Page, Post, Tag, User};
use inkwell_shared::dto::{AuthorResponse, PageResponse, PostResponse, TagResponse, UserResponse};

/// Public URL under which stored images are served.
pub fn image_url(name: &str) -> String {
    format!("/api/files/{name}")
}

pub fn post_response(post: Post) -> PostResponse {
    PostResponse {
        id: post.id,
        title: post.title,
        content: post.content,
        image: post.image.as_deref().map(image_url),
        created_at: post.created_at.to_rfc3339(),
        updated_at: post.updated_at.to_rfc3339(),
        author: AuthorResponse {
            id: post.author.id,
            username: post.author.username,
        },
        tags: post.tags.into_iter().map(tag_response).collect(),
    }
}

pub fn tag_response(tag: Tag) -> TagResponse {
    TagResponse {
        id: tag.id,
        name: tag.name,
    }
}

pub fn user_response(user: User) -> UserResponse {
    UserResponse {
        id: user.id,
        username: user.username,
        created_at: user.created_at.to_rfc3339(),
    }
}

pub fn page_response<T>(page: Page<T>) -> PageResponse<T> {
    PageResponse {
        items: page.items,
        page: page.page,
        page_size: page.page_size,
        total: page.total,
        pages: page.pages,
    }
}
