//! Validation pipeline - the checks that gate mutating operations.
//!
//! Every operation has a [`ValidationPolicy`]: a set of independent switches
//! selecting which checks run. The policies live in a [`PolicyTable`] handed to
//! the [`ValidationPipeline`] when services are assembled. Checks run in a
//! fixed order (existence, content, username, password) and the first failure
//! rejects the call before the wrapped operation starts.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use crate::domain::{PostDraft, PostId, UserId};
use crate::error::{DomainError, ValidationReason};
use crate::ports::BlogStore;

/// Largest accepted image upload (5 MiB).
pub const MAX_IMAGE_BYTES: u64 = 5 * 1024 * 1024;

/// Content types accepted for post images.
pub const ALLOWED_IMAGE_TYPES: [&str; 2] = ["image/jpeg", "image/png"];

/// File extension stored images of an accepted content type get.
pub fn image_extension(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        _ => None,
    }
}

/// Operations that pass through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    GetPost,
    CreatePost,
    UpdatePost,
    DeletePost,
    SignUp,
    UpdateUsername,
    UpdatePassword,
}

impl Operation {
    pub const ALL: [Operation; 7] = [
        Operation::GetPost,
        Operation::CreatePost,
        Operation::UpdatePost,
        Operation::DeletePost,
        Operation::SignUp,
        Operation::UpdateUsername,
        Operation::UpdatePassword,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Operation::GetPost => "get_post",
            Operation::CreatePost => "create_post",
            Operation::UpdatePost => "update_post",
            Operation::DeletePost => "delete_post",
            Operation::SignUp => "sign_up",
            Operation::UpdateUsername => "update_username",
            Operation::UpdatePassword => "update_password",
        }
    }
}

/// A single check the pipeline can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    Existence,
    PostContent,
    Username,
    Password,
}

/// Which checks apply to one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ValidationPolicy {
    /// The target post or user must exist.
    pub existence: bool,
    /// Post title, content and image must be well formed.
    pub content: bool,
    pub username: bool,
    pub password: bool,
}

impl ValidationPolicy {
    pub const NONE: Self = Self {
        existence: false,
        content: false,
        username: false,
        password: false,
    };

    /// The default decision table.
    pub fn for_operation(operation: Operation) -> Self {
        let none = Self::NONE;
        match operation {
            Operation::GetPost | Operation::DeletePost => Self {
                existence: true,
                ..none
            },
            Operation::CreatePost => Self {
                content: true,
                ..none
            },
            Operation::UpdatePost => Self {
                existence: true,
                content: true,
                ..none
            },
            Operation::SignUp => Self {
                username: true,
                password: true,
                ..none
            },
            Operation::UpdateUsername => Self {
                existence: true,
                username: true,
                ..none
            },
            Operation::UpdatePassword => Self {
                password: true,
                ..none
            },
        }
    }

    /// Enabled checks, in evaluation order.
    pub fn checks(&self) -> Vec<Check> {
        [
            (self.existence, Check::Existence),
            (self.content, Check::PostContent),
            (self.username, Check::Username),
            (self.password, Check::Password),
        ]
        .into_iter()
        .filter_map(|(enabled, check)| enabled.then_some(check))
        .collect()
    }
}

/// Policy for every operation, fixed when services are assembled.
#[derive(Debug, Clone)]
pub struct PolicyTable {
    policies: HashMap<Operation, ValidationPolicy>,
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self {
            policies: Operation::ALL
                .into_iter()
                .map(|op| (op, ValidationPolicy::for_operation(op)))
                .collect(),
        }
    }
}

impl PolicyTable {
    /// Replace the policy of one operation.
    pub fn with_policy(mut self, operation: Operation, policy: ValidationPolicy) -> Self {
        self.policies.insert(operation, policy);
        self
    }

    pub fn policy(&self, operation: Operation) -> ValidationPolicy {
        self.policies
            .get(&operation)
            .copied()
            .unwrap_or_else(|| ValidationPolicy::for_operation(operation))
    }
}

/// The arguments of a call, as seen by the checks.
#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    Post {
        id: Option<PostId>,
        draft: Option<&'a PostDraft>,
    },
    User {
        id: Option<UserId>,
        username: Option<&'a str>,
        password: Option<&'a str>,
    },
}

impl<'a> Target<'a> {
    pub fn post(id: PostId) -> Self {
        Target::Post {
            id: Some(id),
            draft: None,
        }
    }

    pub fn new_post(draft: &'a PostDraft) -> Self {
        Target::Post {
            id: None,
            draft: Some(draft),
        }
    }

    pub fn post_update(id: PostId, draft: &'a PostDraft) -> Self {
        Target::Post {
            id: Some(id),
            draft: Some(draft),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Target::Post { .. } => "post",
            Target::User { .. } => "user",
        }
    }
}

/// Title and content must survive trimming; an attached image must be a
/// JPEG or PNG no larger than [`MAX_IMAGE_BYTES`].
pub fn check_post_content(draft: &PostDraft) -> Result<(), DomainError> {
    if draft.title.trim().is_empty() || draft.content.trim().is_empty() {
        return Err(DomainError::invalid(ValidationReason::EmptyField));
    }

    if let Some(image) = draft.present_image() {
        if !ALLOWED_IMAGE_TYPES.contains(&image.content_type.as_str()) {
            return Err(DomainError::invalid(ValidationReason::BadImageType));
        }
        if image.size > MAX_IMAGE_BYTES {
            return Err(DomainError::PayloadTooLarge {
                size: image.size,
                limit: MAX_IMAGE_BYTES,
            });
        }
    }

    Ok(())
}

pub fn check_username(username: &str) -> Result<(), DomainError> {
    if username.trim().is_empty() {
        return Err(DomainError::invalid(ValidationReason::EmptyUsername));
    }
    Ok(())
}

pub fn check_password(password: &str) -> Result<(), DomainError> {
    if password.trim().is_empty() {
        return Err(DomainError::invalid(ValidationReason::EmptyPassword));
    }
    Ok(())
}

/// Runs the checks selected by an operation's policy.
pub struct ValidationPipeline {
    store: Arc<dyn BlogStore>,
    policies: PolicyTable,
}

impl ValidationPipeline {
    pub fn new(store: Arc<dyn BlogStore>, policies: PolicyTable) -> Self {
        Self { store, policies }
    }

    pub fn policies(&self) -> &PolicyTable {
        &self.policies
    }

    /// Run every check enabled for `operation`, stopping at the first failure.
    pub async fn validate(&self, operation: Operation, target: &Target<'_>) -> Result<(), DomainError> {
        for check in self.policies.policy(operation).checks() {
            if let Err(err) = self.run_check(check, target).await {
                tracing::debug!(
                    operation = operation.name(),
                    check = ?check,
                    error = %err,
                    "Validation rejected call"
                );
                return Err(err);
            }
        }
        Ok(())
    }

    /// Validate, then run `call`. Its result is returned untouched.
    pub async fn guard<T, F, Fut>(
        &self,
        operation: Operation,
        target: Target<'_>,
        call: F,
    ) -> Result<T, DomainError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, DomainError>>,
    {
        self.validate(operation, &target).await?;
        call().await
    }

    async fn run_check(&self, check: Check, target: &Target<'_>) -> Result<(), DomainError> {
        match (check, *target) {
            (Check::Existence, Target::Post { id, .. }) => self.post_exists(id).await,
            (Check::Existence, Target::User { id, .. }) => self.user_exists(id).await,
            (Check::PostContent, Target::Post { draft, .. }) => match draft {
                Some(draft) => check_post_content(draft),
                None => Err(DomainError::invalid(ValidationReason::EmptyField)),
            },
            (Check::Username, Target::User { username, .. }) => {
                check_username(username.unwrap_or_default())
            }
            (Check::Password, Target::User { password, .. }) => {
                check_password(password.unwrap_or_default())
            }
            (check, target) => Err(DomainError::Internal(format!(
                "{check:?} check does not apply to a {} call",
                target.kind()
            ))),
        }
    }

    async fn post_exists(&self, id: Option<PostId>) -> Result<(), DomainError> {
        let Some(id) = id else {
            return Err(DomainError::not_found("post", "without id"));
        };
        match self.store.find_post(id).await? {
            Some(_) => Ok(()),
            None => Err(DomainError::not_found("post", id)),
        }
    }

    async fn user_exists(&self, id: Option<UserId>) -> Result<(), DomainError> {
        let Some(id) = id else {
            return Err(DomainError::not_found("user", "without id"));
        };
        match self.store.find_user(id).await? {
            Some(_) => Ok(()),
            None => Err(DomainError::not_found("user", id)),
        }
    }
}
