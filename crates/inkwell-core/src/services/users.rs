//! Account operations: sign up, log in, current user and self-service updates.

use std::sync::Arc;

use crate::domain::{Credentials, NewUser, PasswordChange, User, UserId};
use crate::error::DomainError;
use crate::ports::{BlogStore, PasswordService, PrincipalProvider};

use super::validation::{Operation, Target, ValidationPipeline};

pub struct UserService {
    store: Arc<dyn BlogStore>,
    passwords: Arc<dyn PasswordService>,
    validation: Arc<ValidationPipeline>,
}

impl UserService {
    pub fn new(
        store: Arc<dyn BlogStore>,
        passwords: Arc<dyn PasswordService>,
        validation: Arc<ValidationPipeline>,
    ) -> Self {
        Self {
            store,
            passwords,
            validation,
        }
    }

    /// Register a new account. Username and password are trimmed first.
    pub async fn sign_up(&self, credentials: Credentials) -> Result<User, DomainError> {
        let target = Target::User {
            id: None,
            username: Some(&credentials.username),
            password: Some(&credentials.password),
        };
        self.validation
            .guard(Operation::SignUp, target, || self.register(&credentials))
            .await
    }

    /// Check a username/password pair. Unknown users and wrong passwords are
    /// both reported as [`DomainError::NotFound`].
    pub async fn authenticate(&self, credentials: &Credentials) -> Result<User, DomainError> {
        let username = credentials.username.trim();
        let user = self
            .store
            .find_user_by_username(username)
            .await?
            .ok_or_else(|| DomainError::not_found("credentials", username))?;

        if !self
            .passwords
            .verify(credentials.password.trim(), &user.password_hash)?
        {
            return Err(DomainError::not_found("credentials", username));
        }
        Ok(user)
    }

    pub async fn current(&self, ctx: &dyn PrincipalProvider) -> Result<User, DomainError> {
        let principal = ctx.current_principal().ok_or(DomainError::Unauthorized)?;
        self.store
            .find_user(principal.id)
            .await?
            .ok_or_else(|| DomainError::not_found("user", principal.id))
    }

    pub async fn update_username(
        &self,
        ctx: &dyn PrincipalProvider,
        username: String,
    ) -> Result<(), DomainError> {
        let principal = ctx.current_principal().ok_or(DomainError::Unauthorized)?;
        let target = Target::User {
            id: Some(principal.id),
            username: Some(&username),
            password: None,
        };
        self.validation
            .guard(Operation::UpdateUsername, target, || {
                self.rename(principal.id, &username)
            })
            .await
    }

    /// Replace the caller's password. A wrong current password yields
    /// [`DomainError::NotFound`], reusing the current one [`DomainError::Conflict`].
    pub async fn update_password(
        &self,
        ctx: &dyn PrincipalProvider,
        change: PasswordChange,
    ) -> Result<(), DomainError> {
        let principal = ctx.current_principal().ok_or(DomainError::Unauthorized)?;
        let target = Target::User {
            id: Some(principal.id),
            username: None,
            password: Some(&change.new_password),
        };
        self.validation
            .guard(Operation::UpdatePassword, target, || {
                self.change_password(principal.id, &change)
            })
            .await
    }

    async fn register(&self, credentials: &Credentials) -> Result<User, DomainError> {
        let username = credentials.username.trim();
        self.ensure_username_free(username).await?;

        let password_hash = self.passwords.hash(credentials.password.trim())?;
        let mut tx = self.store.begin().await?;
        let user = tx
            .insert_user(NewUser::new(username.to_string(), password_hash))
            .await?;
        tx.commit().await?;

        tracing::info!(user_id = user.id, "User signed up");
        Ok(user)
    }

    async fn rename(&self, id: UserId, username: &str) -> Result<(), DomainError> {
        let username = username.trim();
        self.ensure_username_free(username).await?;

        let mut tx = self.store.begin().await?;
        if !tx.update_username(id, username).await? {
            return Err(DomainError::not_found("user", id));
        }
        tx.commit().await?;

        tracing::info!(user_id = id, "Username changed");
        Ok(())
    }

    async fn change_password(&self, id: UserId, change: &PasswordChange) -> Result<(), DomainError> {
        let current = change.current_password.trim();
        let new = change.new_password.trim();

        let mut tx = self.store.begin().await?;
        let stored = tx
            .find_user(id)
            .await?
            .ok_or_else(|| DomainError::not_found("user", id))?;

        if !self.passwords.verify(current, &stored.password_hash)? {
            return Err(DomainError::not_found("credentials", &stored.username));
        }
        if self.passwords.verify(new, &stored.password_hash)? {
            return Err(DomainError::Conflict(
                "new password must differ from the current one".to_string(),
            ));
        }

        let password_hash = self.passwords.hash(new)?;
        if !tx.update_password(id, &password_hash).await? {
            return Err(DomainError::Internal(format!(
                "password update for user {id} affected no rows"
            )));
        }
        tx.commit().await?;

        tracing::info!(user_id = id, "Password changed");
        Ok(())
    }

    async fn ensure_username_free(&self, username: &str) -> Result<(), DomainError> {
        if self.store.find_user_by_username(username).await?.is_some() {
            return Err(DomainError::Conflict(format!(
                "username '{username}' is already taken"
            )));
        }
        Ok(())
    }
}
