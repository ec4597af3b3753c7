//! Domain entities - the core business objects.

mod post;
mod principal;
mod tag;
mod user;

pub use post::{Author, ImageUpload, NewPost, Page, Post, PostDraft, PostQuery};
pub use principal::{Principal, RequestContext};
pub use tag::{Tag, parse_tag_phrase};
pub use user::{Credentials, NewUser, PasswordChange, User};

pub type PostId = i64;
pub type TagId = i64;
pub type UserId = i64;
