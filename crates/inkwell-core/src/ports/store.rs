//! Persistence ports for posts, tags, users and the post/tag join table.

use async_trait::async_trait;

use crate::domain::{NewPost, NewUser, Page, Post, PostId, PostQuery, Tag, TagId, User, UserId};
use crate::error::RepoError;

/// Read access plus the entry point for transactional writes.
#[async_trait]
pub trait BlogStore: Send + Sync {
    /// Open a transaction. Dropping it without [`StoreTransaction::commit`]
    /// discards every write made through it.
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, RepoError>;

    /// Find a post, with author and tags, by id.
    async fn find_post(&self, id: PostId) -> Result<Option<Post>, RepoError>;

    /// List posts newest first, filtered and paginated by `query`.
    async fn list_posts(&self, query: &PostQuery) -> Result<Page<Post>, RepoError>;

    /// All tags, sorted by name.
    async fn list_tags(&self) -> Result<Vec<Tag>, RepoError>;

    async fn find_user(&self, id: UserId) -> Result<Option<User>, RepoError>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, RepoError>;
}

/// Write primitives executed inside one store transaction.
///
/// Reads made through the transaction observe its own uncommitted writes.
#[async_trait]
pub trait StoreTransaction: Send {
    async fn find_post(&mut self, id: PostId) -> Result<Option<Post>, RepoError>;

    /// Insert a post and return it with its generated id (and no tags).
    async fn insert_post(&mut self, post: NewPost) -> Result<Post, RepoError>;

    /// Persist title, content, image and update time. Returns false when the
    /// post no longer exists.
    async fn update_post(&mut self, post: &Post) -> Result<bool, RepoError>;

    async fn delete_post(&mut self, id: PostId) -> Result<bool, RepoError>;

    /// Ids of the tags currently linked to a post.
    async fn tag_ids_for_post(&mut self, post_id: PostId) -> Result<Vec<TagId>, RepoError>;

    /// Remove every tag link of a post; returns how many were removed.
    async fn unlink_post_tags(&mut self, post_id: PostId) -> Result<u64, RepoError>;

    async fn link_post_tag(&mut self, post_id: PostId, tag_id: TagId) -> Result<(), RepoError>;

    /// Number of posts linked to a tag. Implementations lock the tag for the
    /// rest of the transaction so the count stays valid until commit.
    async fn count_tag_references(&mut self, tag_id: TagId) -> Result<u64, RepoError>;

    async fn find_tag_by_name(&mut self, name: &str) -> Result<Option<Tag>, RepoError>;

    /// Create a tag. If a concurrent writer created the same name first, the
    /// existing row is returned instead of a duplicate.
    async fn insert_tag(&mut self, name: &str) -> Result<Tag, RepoError>;

    async fn delete_tag(&mut self, id: TagId) -> Result<(), RepoError>;

    async fn find_user(&mut self, id: UserId) -> Result<Option<User>, RepoError>;

    /// Insert a user; a taken username fails with [`RepoError::Constraint`].
    async fn insert_user(&mut self, user: NewUser) -> Result<User, RepoError>;

    async fn update_username(&mut self, id: UserId, username: &str) -> Result<bool, RepoError>;

    async fn update_password(&mut self, id: UserId, password_hash: &str)
    -> Result<bool, RepoError>;

    async fn commit(self: Box<Self>) -> Result<(), RepoError>;
}
