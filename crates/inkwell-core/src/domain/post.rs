use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{PostId, Tag, TagId, UserId};

/// The user who wrote a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: UserId,
    pub username: String,
}

/// Post entity - a blog post with its author and tags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub title: String,
    pub content: String,
    /// Stored file name of the attached image.
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub author: Author,
    /// Sorted by name.
    pub tags: Vec<Tag>,
}

impl Post {
    pub fn tag_names(&self) -> Vec<&str> {
        self.tags.iter().map(|t| t.name.as_str()).collect()
    }
}

/// Column values for a post about to be inserted.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub user_id: UserId,
    pub title: String,
    pub content: String,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An uploaded image as received from the client.
///
/// `data` holds the full payload only while `size` is within the upload
/// limit; oversized uploads are counted but not buffered.
#[derive(Debug, Clone, Default)]
pub struct ImageUpload {
    pub original_name: String,
    pub content_type: String,
    pub size: u64,
    pub data: Vec<u8>,
}

impl ImageUpload {
    pub fn new(original_name: impl Into<String>, content_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            original_name: original_name.into(),
            content_type: content_type.into(),
            size: data.len() as u64,
            data,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }
}

/// Client input for creating or updating a post.
#[derive(Debug, Clone, Default)]
pub struct PostDraft {
    pub title: String,
    pub content: String,
    pub image: Option<ImageUpload>,
    /// Raw, whitespace separated tag phrase.
    pub tags: String,
}

impl PostDraft {
    pub fn new(title: impl Into<String>, content: impl Into<String>, tags: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            image: None,
            tags: tags.into(),
        }
    }

    pub fn with_image(mut self, image: ImageUpload) -> Self {
        self.image = Some(image);
        self
    }

    /// The image, if one was sent with actual content.
    pub fn present_image(&self) -> Option<&ImageUpload> {
        self.image.as_ref().filter(|image| !image.is_empty())
    }
}

/// Listing filter for posts.
#[derive(Debug, Clone)]
pub struct PostQuery {
    /// Substring matched against title and content; empty matches everything.
    pub search: String,
    pub tag_id: Option<TagId>,
    /// 1-based page number.
    pub page: u64,
    pub page_size: u64,
}

impl PostQuery {
    pub const DEFAULT_PAGE_SIZE: u64 = 4;
    pub const MAX_PAGE_SIZE: u64 = 100;

    /// Clamp paging values into their valid range. The page is capped so
    /// its offset fits a signed 64-bit SQL `OFFSET`.
    pub fn normalized(mut self) -> Self {
        self.search = self.search.trim().to_string();
        self.page_size = self.page_size.clamp(1, Self::MAX_PAGE_SIZE);
        let last_page = i64::MAX as u64 / self.page_size;
        self.page = self.page.clamp(1, last_page);
        self.tag_id = self.tag_id.filter(|id| *id > 0);
        self
    }

    /// Zero-based offset of the first item on the requested page.
    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.page_size)
    }
}

impl Default for PostQuery {
    fn default() -> Self {
        Self {
            search: String::new(),
            tag_id: None,
            page: 1,
            page_size: Self::DEFAULT_PAGE_SIZE,
        }
    }
}

/// One page of a listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u64,
    pub page_size: u64,
    pub total: u64,
    pub pages: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, page: u64, page_size: u64, total: u64) -> Self {
        Self {
            items,
            page,
            page_size,
            total,
            pages: total.div_ceil(page_size.max(1)),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            page_size: self.page_size,
            total: self.total,
            pages: self.pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_normalization_clamps_paging() {
        let query = PostQuery {
            search: "  rust ".to_string(),
            tag_id: Some(0),
            page: 0,
            page_size: 1_000,
        }
        .normalized();

        assert_eq!(query.search, "rust");
        assert_eq!(query.tag_id, None);
        assert_eq!(query.page, 1);
        assert_eq!(query.page_size, PostQuery::MAX_PAGE_SIZE);
        assert_eq!(query.offset(), 0);
    }

    #[test]
    fn test_huge_page_number_is_capped() {
        let query = PostQuery {
            page: u64::MAX,
            page_size: 100,
            ..PostQuery::default()
        }
        .normalized();

        assert_eq!(query.page, i64::MAX as u64 / 100);
        assert!(query.offset() <= i64::MAX as u64);

        let raw = PostQuery {
            page: u64::MAX,
            ..PostQuery::default()
        };
        assert_eq!(raw.offset(), u64::MAX);
    }

    #[test]
    fn test_page_counts_partial_last_page() {
        let page = Page::new(vec![1, 2], 3, 4, 10);
        assert_eq!(page.pages, 3);
        assert_eq!(page.map(|n| n * 10).items, vec![10, 20]);
    }

    #[test]
    fn test_empty_image_is_not_present() {
        let draft = PostDraft::new("t", "c", "").with_image(ImageUpload::default());
        assert!(draft.present_image().is_none());
    }
}
