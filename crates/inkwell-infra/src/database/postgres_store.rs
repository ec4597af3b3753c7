//! PostgreSQL blog store.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::{Expr, OnConflict, Query};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    SqlErr, TransactionTrait,
};

use inkwell_core::domain::{
    Author, NewPost, NewUser, Page, Post, PostId, PostQuery, Tag, TagId, User, UserId,
};
use inkwell_core::error::RepoError;
use inkwell_core::ports::{BlogStore, StoreTransaction};

use super::entity::{post, post_tag, tag, user};

fn repo_err(err: DbErr) -> RepoError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(msg))
        | Some(SqlErr::ForeignKeyConstraintViolation(msg)) => RepoError::Constraint(msg),
        _ => match err {
            DbErr::Conn(_) | DbErr::ConnectionAcquire(_) => RepoError::Connection(err.to_string()),
            _ => RepoError::Query(err.to_string()),
        },
    }
}

/// Attach authors and tags to post rows, keeping the rows' order.
///
/// Queries users, then links, then tags (skipped when there are no links).
async fn hydrate<C: ConnectionTrait>(db: &C, models: Vec<post::Model>) -> Result<Vec<Post>, DbErr> {
    if models.is_empty() {
        return Ok(Vec::new());
    }

    let user_ids: BTreeSet<UserId> = models.iter().map(|m| m.user_id).collect();
    let post_ids: Vec<PostId> = models.iter().map(|m| m.id).collect();

    let authors: HashMap<UserId, Author> = user::Entity::find()
        .filter(user::Column::Id.is_in(user_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|u| {
            (
                u.id,
                Author {
                    id: u.id,
                    username: u.username,
                },
            )
        })
        .collect();

    let links = post_tag::Entity::find()
        .filter(post_tag::Column::PostId.is_in(post_ids))
        .all(db)
        .await?;

    let tags: HashMap<TagId, Tag> = if links.is_empty() {
        HashMap::new()
    } else {
        let tag_ids: BTreeSet<TagId> = links.iter().map(|l| l.tag_id).collect();
        tag::Entity::find()
            .filter(tag::Column::Id.is_in(tag_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|t| (t.id, Tag::from(t)))
            .collect()
    };

    Ok(models
        .into_iter()
        .map(|m| {
            let mut post_tags: Vec<Tag> = links
                .iter()
                .filter(|l| l.post_id == m.id)
                .filter_map(|l| tags.get(&l.tag_id).cloned())
                .collect();
            post_tags.sort_by(|a, b| a.name.cmp(&b.name));

            let author = authors.get(&m.user_id).cloned().unwrap_or(Author {
                id: m.user_id,
                username: String::new(),
            });

            Post {
                id: m.id,
                title: m.title,
                content: m.content,
                image: m.image,
                created_at: m.created_at.into(),
                updated_at: m.updated_at.into(),
                author,
                tags: post_tags,
            }
        })
        .collect())
}

async fn find_post<C: ConnectionTrait>(db: &C, id: PostId) -> Result<Option<Post>, DbErr> {
    let Some(model) = post::Entity::find_by_id(id).one(db).await? else {
        return Ok(None);
    };
    Ok(hydrate(db, vec![model]).await?.pop())
}

async fn find_user<C: ConnectionTrait>(db: &C, id: UserId) -> Result<Option<User>, DbErr> {
    Ok(user::Entity::find_by_id(id).one(db).await?.map(Into::into))
}

/// Blog store backed by PostgreSQL.
pub struct PostgresStore {
    db: DatabaseConnection,
}

impl PostgresStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl BlogStore for PostgresStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, RepoError> {
        let tx = self.db.begin().await.map_err(repo_err)?;
        Ok(Box::new(PostgresTransaction { tx }))
    }

    async fn find_post(&self, id: PostId) -> Result<Option<Post>, RepoError> {
        find_post(&self.db, id).await.map_err(repo_err)
    }

    async fn list_posts(&self, query: &PostQuery) -> Result<Page<Post>, RepoError> {
        let mut select = post::Entity::find().order_by_desc(post::Column::Id);

        if !query.search.is_empty() {
            select = select.filter(
                Condition::any()
                    .add(post::Column::Title.contains(query.search.as_str()))
                    .add(post::Column::Content.contains(query.search.as_str())),
            );
        }
        if let Some(tag_id) = query.tag_id {
            select = select.filter(
                post::Column::Id.in_subquery(
                    Query::select()
                        .column(post_tag::Column::PostId)
                        .from(post_tag::Entity)
                        .and_where(post_tag::Column::TagId.eq(tag_id))
                        .to_owned(),
                ),
            );
        }

        let paginator = select.paginate(&self.db, query.page_size);
        let total = paginator.num_items().await.map_err(repo_err)?;
        let models = paginator
            .fetch_page(query.page.saturating_sub(1))
            .await
            .map_err(repo_err)?;
        let items = hydrate(&self.db, models).await.map_err(repo_err)?;

        Ok(Page::new(items, query.page, query.page_size, total))
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, RepoError> {
        let tags = tag::Entity::find()
            .order_by_asc(tag::Column::Name)
            .all(&self.db)
            .await
            .map_err(repo_err)?;
        Ok(tags.into_iter().map(Into::into).collect())
    }

    async fn find_user(&self, id: UserId) -> Result<Option<User>, RepoError> {
        find_user(&self.db, id).await.map_err(repo_err)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        tracing::debug!(username, "Finding user by username");

        let result = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await
            .map_err(repo_err)?;

        Ok(result.map(Into::into))
    }
}

/// One database transaction. Dropping it uncommitted rolls back.
pub struct PostgresTransaction {
    tx: DatabaseTransaction,
}

#[async_trait]
impl StoreTransaction for PostgresTransaction {
    async fn find_post(&mut self, id: PostId) -> Result<Option<Post>, RepoError> {
        find_post(&self.tx, id).await.map_err(repo_err)
    }

    async fn insert_post(&mut self, new: NewPost) -> Result<Post, RepoError> {
        let model = post::ActiveModel {
            id: NotSet,
            user_id: Set(new.user_id),
            title: Set(new.title),
            content: Set(new.content),
            image: Set(new.image),
            created_at: Set(new.created_at.into()),
            updated_at: Set(new.updated_at.into()),
        }
        .insert(&self.tx)
        .await
        .map_err(repo_err)?;

        let id = model.id;
        hydrate(&self.tx, vec![model])
            .await
            .map_err(repo_err)?
            .pop()
            .ok_or_else(|| RepoError::Query(format!("inserted post {id} could not be read back")))
    }

    async fn update_post(&mut self, post: &Post) -> Result<bool, RepoError> {
        let result = post::Entity::update_many()
            .col_expr(post::Column::Title, Expr::value(post.title.clone()))
            .col_expr(post::Column::Content, Expr::value(post.content.clone()))
            .col_expr(post::Column::Image, Expr::value(post.image.clone()))
            .col_expr(
                post::Column::UpdatedAt,
                Expr::value(DateTimeWithTimeZone::from(post.updated_at)),
            )
            .filter(post::Column::Id.eq(post.id))
            .exec(&self.tx)
            .await
            .map_err(repo_err)?;

        Ok(result.rows_affected > 0)
    }

    async fn delete_post(&mut self, id: PostId) -> Result<bool, RepoError> {
        let result = post::Entity::delete_by_id(id)
            .exec(&self.tx)
            .await
            .map_err(repo_err)?;
        Ok(result.rows_affected > 0)
    }

    async fn tag_ids_for_post(&mut self, post_id: PostId) -> Result<Vec<TagId>, RepoError> {
        let links = post_tag::Entity::find()
            .filter(post_tag::Column::PostId.eq(post_id))
            .all(&self.tx)
            .await
            .map_err(repo_err)?;
        Ok(links.into_iter().map(|l| l.tag_id).collect())
    }

    async fn unlink_post_tags(&mut self, post_id: PostId) -> Result<u64, RepoError> {
        let result = post_tag::Entity::delete_many()
            .filter(post_tag::Column::PostId.eq(post_id))
            .exec(&self.tx)
            .await
            .map_err(repo_err)?;
        Ok(result.rows_affected)
    }

    async fn link_post_tag(&mut self, post_id: PostId, tag_id: TagId) -> Result<(), RepoError> {
        post_tag::Entity::insert(post_tag::ActiveModel {
            post_id: Set(post_id),
            tag_id: Set(tag_id),
        })
        .exec_without_returning(&self.tx)
        .await
        .map_err(repo_err)?;
        Ok(())
    }

    async fn count_tag_references(&mut self, tag_id: TagId) -> Result<u64, RepoError> {
        // Row lock on the tag: a concurrent link to it waits until we commit.
        tag::Entity::find_by_id(tag_id)
            .lock_exclusive()
            .one(&self.tx)
            .await
            .map_err(repo_err)?;

        post_tag::Entity::find()
            .filter(post_tag::Column::TagId.eq(tag_id))
            .count(&self.tx)
            .await
            .map_err(repo_err)
    }

    async fn find_tag_by_name(&mut self, name: &str) -> Result<Option<Tag>, RepoError> {
        let result = tag::Entity::find()
            .filter(tag::Column::Name.eq(name))
            .one(&self.tx)
            .await
            .map_err(repo_err)?;
        Ok(result.map(Into::into))
    }

    async fn insert_tag(&mut self, name: &str) -> Result<Tag, RepoError> {
        // A no-op update on conflict makes RETURNING yield the existing row.
        let model = tag::Entity::insert(tag::ActiveModel {
            id: NotSet,
            name: Set(name.to_string()),
        })
        .on_conflict(
            OnConflict::column(tag::Column::Name)
                .update_column(tag::Column::Name)
                .to_owned(),
        )
        .exec_with_returning(&self.tx)
        .await
        .map_err(repo_err)?;

        Ok(model.into())
    }

    async fn delete_tag(&mut self, id: TagId) -> Result<(), RepoError> {
        tag::Entity::delete_by_id(id)
            .exec(&self.tx)
            .await
            .map_err(repo_err)?;
        Ok(())
    }

    async fn find_user(&mut self, id: UserId) -> Result<Option<User>, RepoError> {
        find_user(&self.tx, id).await.map_err(repo_err)
    }

    async fn insert_user(&mut self, new: NewUser) -> Result<User, RepoError> {
        let model = user::ActiveModel {
            id: NotSet,
            username: Set(new.username),
            password_hash: Set(new.password_hash),
            created_at: Set(new.created_at.into()),
            updated_at: Set(new.updated_at.into()),
        }
        .insert(&self.tx)
        .await
        .map_err(repo_err)?;

        Ok(model.into())
    }

    async fn update_username(&mut self, id: UserId, username: &str) -> Result<bool, RepoError> {
        let result = user::Entity::update_many()
            .col_expr(user::Column::Username, Expr::value(username))
            .col_expr(user::Column::UpdatedAt, Expr::current_timestamp().into())
            .filter(user::Column::Id.eq(id))
            .exec(&self.tx)
            .await
            .map_err(repo_err)?;
        Ok(result.rows_affected > 0)
    }

    async fn update_password(
        &mut self,
        id: UserId,
        password_hash: &str,
    ) -> Result<bool, RepoError> {
        let result = user::Entity::update_many()
            .col_expr(user::Column::PasswordHash, Expr::value(password_hash))
            .col_expr(user::Column::UpdatedAt, Expr::current_timestamp().into())
            .filter(user::Column::Id.eq(id))
            .exec(&self.tx)
            .await
            .map_err(repo_err)?;
        Ok(result.rows_affected > 0)
    }

    async fn commit(self: Box<Self>) -> Result<(), RepoError> {
        self.tx.commit().await.map_err(repo_err)
    }
}
