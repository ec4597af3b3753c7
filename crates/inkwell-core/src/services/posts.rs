//! Post operations: listing, lookup and the audited mutations.

use std::sync::Arc;

use chrono::Utc;

use crate::domain::{NewPost, Page, Post, PostDraft, PostId, PostQuery, Principal, Tag};
use crate::error::{DomainError, ValidationReason};
use crate::ports::{BlogStore, FileStorage, PrincipalProvider, StoreTransaction};

use super::audit::{AuditInterceptor, AuditedCall};
use super::tags::reconcile_tags;
use super::validation::{Operation, Target, ValidationPipeline, image_extension};

/// Post use cases. Mutations run validation, then the audit interceptor,
/// then one store transaction covering the post row and its tags.
pub struct PostService {
    store: Arc<dyn BlogStore>,
    storage: Arc<dyn FileStorage>,
    validation: Arc<ValidationPipeline>,
    audit: AuditInterceptor,
}

impl PostService {
    pub fn new(
        store: Arc<dyn BlogStore>,
        storage: Arc<dyn FileStorage>,
        validation: Arc<ValidationPipeline>,
    ) -> Self {
        Self {
            store,
            storage,
            validation,
            audit: AuditInterceptor::new(),
        }
    }

    pub async fn list(&self, query: PostQuery) -> Result<Page<Post>, DomainError> {
        Ok(self.store.list_posts(&query.normalized()).await?)
    }

    pub async fn list_tags(&self) -> Result<Vec<Tag>, DomainError> {
        Ok(self.store.list_tags().await?)
    }

    pub async fn get(&self, id: PostId) -> Result<Post, DomainError> {
        self.validation
            .guard(Operation::GetPost, Target::post(id), || async move {
                self.store
                    .find_post(id)
                    .await?
                    .ok_or_else(|| DomainError::not_found("post", id))
            })
            .await
    }

    /// Create a post authored by the current principal.
    pub async fn create(
        &self,
        ctx: &dyn PrincipalProvider,
        draft: PostDraft,
    ) -> Result<Post, DomainError> {
        self.validation
            .guard(Operation::CreatePost, Target::new_post(&draft), || {
                self.audit
                    .around(ctx, AuditedCall::CreatePost { draft: &draft }, |author| {
                        self.insert(author, &draft)
                    })
            })
            .await
    }

    /// Replace title, content and tags of a post; a new image replaces the
    /// old one, no image keeps it.
    pub async fn update(
        &self,
        ctx: &dyn PrincipalProvider,
        id: PostId,
        draft: PostDraft,
    ) -> Result<Post, DomainError> {
        self.validation
            .guard(Operation::UpdatePost, Target::post_update(id, &draft), || {
                self.audit
                    .around(ctx, AuditedCall::UpdatePost { id, draft: &draft }, |principal| {
                        self.apply_update(principal, id, &draft)
                    })
            })
            .await
    }

    pub async fn delete(&self, ctx: &dyn PrincipalProvider, id: PostId) -> Result<(), DomainError> {
        self.validation
            .guard(Operation::DeletePost, Target::post(id), || {
                self.audit
                    .around(ctx, AuditedCall::DeletePost { id }, |principal| {
                        self.remove(principal, id)
                    })
            })
            .await
    }

    async fn insert(&self, author: Principal, draft: &PostDraft) -> Result<Post, DomainError> {
        let image = self.store_image(draft).await?;
        let result = self.write_new_post(&author, draft, image.clone()).await;
        if result.is_err() {
            if let Some(name) = &image {
                self.discard_image(name).await;
            }
        }
        result
    }

    async fn write_new_post(
        &self,
        author: &Principal,
        draft: &PostDraft,
        image: Option<String>,
    ) -> Result<Post, DomainError> {
        let now = Utc::now();
        let mut tx = self.store.begin().await?;

        let post = tx
            .insert_post(NewPost {
                user_id: author.id,
                title: draft.title.trim().to_string(),
                content: draft.content.trim().to_string(),
                image,
                created_at: now,
                updated_at: now,
            })
            .await?;
        reconcile_tags(tx.as_mut(), post.id, &draft.tags).await?;
        let post = reload(tx.as_mut(), post.id).await?;

        tx.commit().await?;
        Ok(post)
    }

    async fn apply_update(
        &self,
        principal: Principal,
        id: PostId,
        draft: &PostDraft,
    ) -> Result<Post, DomainError> {
        let mut tx = self.store.begin().await?;
        let mut post = tx
            .find_post(id)
            .await?
            .ok_or_else(|| DomainError::not_found("post", id))?;
        ensure_author(&principal, &post)?;

        let new_image = self.store_image(draft).await?;
        let replaced = match &new_image {
            Some(name) => post.image.replace(name.clone()),
            None => None,
        };
        post.title = draft.title.trim().to_string();
        post.content = draft.content.trim().to_string();
        post.updated_at = Utc::now();

        let committed = match write_update(tx.as_mut(), &post, &draft.tags).await {
            Ok(post) => tx.commit().await.map(|()| post).map_err(DomainError::from),
            Err(err) => Err(err),
        };

        match committed {
            Ok(post) => {
                if let Some(old) = replaced {
                    self.discard_image(&old).await;
                }
                Ok(post)
            }
            Err(err) => {
                if let Some(new) = new_image {
                    self.discard_image(&new).await;
                }
                Err(err)
            }
        }
    }

    async fn remove(&self, principal: Principal, id: PostId) -> Result<(), DomainError> {
        let mut tx = self.store.begin().await?;
        let post = tx
            .find_post(id)
            .await?
            .ok_or_else(|| DomainError::not_found("post", id))?;
        ensure_author(&principal, &post)?;

        reconcile_tags(tx.as_mut(), id, "").await?;
        if !tx.delete_post(id).await? {
            return Err(DomainError::not_found("post", id));
        }
        tx.commit().await?;

        if let Some(image) = post.image {
            self.discard_image(&image).await;
        }
        Ok(())
    }

    async fn store_image(&self, draft: &PostDraft) -> Result<Option<String>, DomainError> {
        let Some(image) = draft.present_image() else {
            return Ok(None);
        };
        let extension = image_extension(&image.content_type)
            .ok_or_else(|| DomainError::invalid(ValidationReason::BadImageType))?;
        let name = self.storage.store(&image.data, extension).await?;
        tracing::debug!(
            stored = %name,
            original = %image.original_name,
            size = image.size,
            "Stored post image"
        );
        Ok(Some(name))
    }

    async fn discard_image(&self, name: &str) {
        if let Err(err) = self.storage.delete(name).await {
            tracing::warn!(image = %name, error = %err, "Failed to delete post image");
        }
    }
}

async fn write_update(
    tx: &mut dyn StoreTransaction,
    post: &Post,
    tags: &str,
) -> Result<Post, DomainError> {
    if !tx.update_post(post).await? {
        return Err(DomainError::not_found("post", post.id));
    }
    reconcile_tags(tx, post.id, tags).await?;
    reload(tx, post.id).await
}

async fn reload(tx: &mut dyn StoreTransaction, id: PostId) -> Result<Post, DomainError> {
    tx.find_post(id)
        .await?
        .ok_or_else(|| DomainError::Internal(format!("post {id} vanished inside its own transaction")))
}

fn ensure_author(principal: &Principal, post: &Post) -> Result<(), DomainError> {
    if post.author.id != principal.id {
        return Err(DomainError::Forbidden(format!(
            "post {} belongs to another user",
            post.id
        )));
    }
    Ok(())
}
