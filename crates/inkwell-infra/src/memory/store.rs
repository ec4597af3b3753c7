//! In-memory blog store - used when no database is configured and in tests.
//!
//! A transaction takes the write lock for its whole lifetime and works on a
//! copy of the state; commit swaps the copy in, drop discards it. Writers are
//! therefore serialized, which is what keeps tag creation race free here.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};

use inkwell_core::domain::{
    Author, NewPost, NewUser, Page, Post, PostId, PostQuery, Tag, TagId, User, UserId,
};
use inkwell_core::error::RepoError;
use inkwell_core::ports::{BlogStore, StoreTransaction};

#[derive(Debug, Clone)]
struct PostRow {
    id: PostId,
    user_id: UserId,
    title: String,
    content: String,
    image: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
struct StoreState {
    last_user_id: UserId,
    last_post_id: PostId,
    last_tag_id: TagId,
    users: BTreeMap<UserId, User>,
    posts: BTreeMap<PostId, PostRow>,
    tags: BTreeMap<TagId, Tag>,
    post_tags: BTreeSet<(PostId, TagId)>,
}

impl StoreState {
    fn hydrate(&self, row: &PostRow) -> Post {
        let author = self
            .users
            .get(&row.user_id)
            .map(|user| Author {
                id: user.id,
                username: user.username.clone(),
            })
            .unwrap_or(Author {
                id: row.user_id,
                username: String::new(),
            });

        let mut tags: Vec<Tag> = self
            .post_tags
            .range((row.id, TagId::MIN)..=(row.id, TagId::MAX))
            .filter_map(|(_, tag_id)| self.tags.get(tag_id).cloned())
            .collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));

        Post {
            id: row.id,
            title: row.title.clone(),
            content: row.content.clone(),
            image: row.image.clone(),
            created_at: row.created_at,
            updated_at: row.updated_at,
            author,
            tags,
        }
    }

    fn find_post(&self, id: PostId) -> Option<Post> {
        self.posts.get(&id).map(|row| self.hydrate(row))
    }

    fn list_posts(&self, query: &PostQuery) -> Page<Post> {
        let matches = |row: &&PostRow| {
            let text_matches = query.search.is_empty()
                || row.title.contains(&query.search)
                || row.content.contains(&query.search);
            let tag_matches = query
                .tag_id
                .is_none_or(|tag_id| self.post_tags.contains(&(row.id, tag_id)));
            text_matches && tag_matches
        };

        let selected: Vec<&PostRow> = self.posts.values().rev().filter(matches).collect();
        let total = selected.len() as u64;
        let items = selected
            .into_iter()
            .skip(usize::try_from(query.offset()).unwrap_or(usize::MAX))
            .take(usize::try_from(query.page_size).unwrap_or(usize::MAX))
            .map(|row| self.hydrate(row))
            .collect();

        Page::new(items, query.page, query.page_size, total)
    }

    fn list_tags(&self) -> Vec<Tag> {
        let mut tags: Vec<Tag> = self.tags.values().cloned().collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        tags
    }

    fn find_user_by_username(&self, username: &str) -> Option<User> {
        self.users
            .values()
            .find(|user| user.username == username)
            .cloned()
    }
}

/// Blog store kept entirely in process memory.
///
/// Note: Data is lost on process restart.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<StoreState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored tags.
    pub async fn tag_count(&self) -> usize {
        self.state.read().await.tags.len()
    }

    /// Number of post/tag links.
    pub async fn link_count(&self) -> usize {
        self.state.read().await.post_tags.len()
    }
}

#[async_trait]
impl BlogStore for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, RepoError> {
        let guard = self.state.clone().write_owned().await;
        let working = guard.clone();
        Ok(Box::new(InMemoryTransaction { guard, working }))
    }

    async fn find_post(&self, id: PostId) -> Result<Option<Post>, RepoError> {
        Ok(self.state.read().await.find_post(id))
    }

    async fn list_posts(&self, query: &PostQuery) -> Result<Page<Post>, RepoError> {
        Ok(self.state.read().await.list_posts(query))
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, RepoError> {
        Ok(self.state.read().await.list_tags())
    }

    async fn find_user(&self, id: UserId) -> Result<Option<User>, RepoError> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        Ok(self.state.read().await.find_user_by_username(username))
    }
}

/// Exclusive write access to an [`InMemoryStore`].
pub struct InMemoryTransaction {
    guard: OwnedRwLockWriteGuard<StoreState>,
    working: StoreState,
}

#[async_trait]
impl StoreTransaction for InMemoryTransaction {
    async fn find_post(&mut self, id: PostId) -> Result<Option<Post>, RepoError> {
        Ok(self.working.find_post(id))
    }

    async fn insert_post(&mut self, post: NewPost) -> Result<Post, RepoError> {
        if !self.working.users.contains_key(&post.user_id) {
            return Err(RepoError::Constraint(format!(
                "user {} does not exist",
                post.user_id
            )));
        }

        self.working.last_post_id += 1;
        let row = PostRow {
            id: self.working.last_post_id,
            user_id: post.user_id,
            title: post.title,
            content: post.content,
            image: post.image,
            created_at: post.created_at,
            updated_at: post.updated_at,
        };
        let inserted = self.working.hydrate(&row);
        self.working.posts.insert(row.id, row);
        Ok(inserted)
    }

    async fn update_post(&mut self, post: &Post) -> Result<bool, RepoError> {
        let Some(row) = self.working.posts.get_mut(&post.id) else {
            return Ok(false);
        };
        row.title = post.title.clone();
        row.content = post.content.clone();
        row.image = post.image.clone();
        row.updated_at = post.updated_at;
        Ok(true)
    }

    async fn delete_post(&mut self, id: PostId) -> Result<bool, RepoError> {
        if self.working.posts.remove(&id).is_none() {
            return Ok(false);
        }
        self.working.post_tags.retain(|(post_id, _)| *post_id != id);
        Ok(true)
    }

    async fn tag_ids_for_post(&mut self, post_id: PostId) -> Result<Vec<TagId>, RepoError> {
        Ok(self
            .working
            .post_tags
            .range((post_id, TagId::MIN)..=(post_id, TagId::MAX))
            .map(|(_, tag_id)| *tag_id)
            .collect())
    }

    async fn unlink_post_tags(&mut self, post_id: PostId) -> Result<u64, RepoError> {
        let before = self.working.post_tags.len();
        self.working.post_tags.retain(|(id, _)| *id != post_id);
        Ok((before - self.working.post_tags.len()) as u64)
    }

    async fn link_post_tag(&mut self, post_id: PostId, tag_id: TagId) -> Result<(), RepoError> {
        if !self.working.posts.contains_key(&post_id) || !self.working.tags.contains_key(&tag_id) {
            return Err(RepoError::Constraint(format!(
                "cannot link post {post_id} to tag {tag_id}"
            )));
        }
        self.working.post_tags.insert((post_id, tag_id));
        Ok(())
    }

    async fn count_tag_references(&mut self, tag_id: TagId) -> Result<u64, RepoError> {
        Ok(self
            .working
            .post_tags
            .iter()
            .filter(|(_, id)| *id == tag_id)
            .count() as u64)
    }

    async fn find_tag_by_name(&mut self, name: &str) -> Result<Option<Tag>, RepoError> {
        Ok(self
            .working
            .tags
            .values()
            .find(|tag| tag.name == name)
            .cloned())
    }

    async fn insert_tag(&mut self, name: &str) -> Result<Tag, RepoError> {
        if let Some(existing) = self.find_tag_by_name(name).await? {
            return Ok(existing);
        }
        self.working.last_tag_id += 1;
        let tag = Tag {
            id: self.working.last_tag_id,
            name: name.to_string(),
        };
        self.working.tags.insert(tag.id, tag.clone());
        Ok(tag)
    }

    async fn delete_tag(&mut self, id: TagId) -> Result<(), RepoError> {
        self.working.tags.remove(&id);
        self.working.post_tags.retain(|(_, tag_id)| *tag_id != id);
        Ok(())
    }

    async fn find_user(&mut self, id: UserId) -> Result<Option<User>, RepoError> {
        Ok(self.working.users.get(&id).cloned())
    }

    async fn insert_user(&mut self, user: NewUser) -> Result<User, RepoError> {
        if self.working.find_user_by_username(&user.username).is_some() {
            return Err(RepoError::Constraint(format!(
                "username '{}' is already taken",
                user.username
            )));
        }
        self.working.last_user_id += 1;
        let user = User {
            id: self.working.last_user_id,
            username: user.username,
            password_hash: user.password_hash,
            created_at: user.created_at,
            updated_at: user.updated_at,
        };
        self.working.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_username(&mut self, id: UserId, username: &str) -> Result<bool, RepoError> {
        if self
            .working
            .find_user_by_username(username)
            .is_some_and(|other| other.id != id)
        {
            return Err(RepoError::Constraint(format!(
                "username '{username}' is already taken"
            )));
        }
        let Some(user) = self.working.users.get_mut(&id) else {
            return Ok(false);
        };
        user.username = username.to_string();
        user.updated_at = Utc::now();
        Ok(true)
    }

    async fn update_password(
        &mut self,
        id: UserId,
        password_hash: &str,
    ) -> Result<bool, RepoError> {
        let Some(user) = self.working.users.get_mut(&id) else {
            return Ok(false);
        };
        user.password_hash = password_hash.to_string();
        user.updated_at = Utc::now();
        Ok(true)
    }

    async fn commit(self: Box<Self>) -> Result<(), RepoError> {
        let InMemoryTransaction { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}
