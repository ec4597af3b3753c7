//! Account handlers: sign up, login and self-service updates.

use actix_web::{HttpResponse, web};

use inkwell_core::domain::{Credentials, PasswordChange};
use inkwell_shared::dto::{
    AuthResponse, LoginRequest, SignUpRequest, UpdatePasswordRequest, UpdateUsernameRequest,
};

use super::views::user_response;
use crate::middleware::auth::Caller;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

/// POST /api/signup
pub async fn sign_up(
    state: web::Data<AppState>,
    body: web::Json<SignUpRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let user = state
        .users
        .sign_up(Credentials::new(req.username, req.password))
        .await?;
    Ok(HttpResponse::Created().json(user_response(user)))
}

/// POST /api/login
pub async fn login(
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let user = state
        .users
        .authenticate(&Credentials::new(req.username, req.password))
        .await?;

    let token = state
        .tokens
        .generate_token(user.id, &user.username)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    tracing::info!(user_id = user.id, "User logged in");

    Ok(HttpResponse::Ok().json(AuthResponse {
        access_token: token,
        token_type: "Bearer".to_string(),
        expires_in: state.tokens.expiration_seconds().max(0) as u64,
    }))
}

/// GET /api/user
pub async fn current_user(state: web::Data<AppState>, caller: Caller) -> AppResult<HttpResponse> {
    let user = state.users.current(&caller.0).await?;
    Ok(HttpResponse::Ok().json(user_response(user)))
}

/// PUT /api/user/username
pub async fn update_username(
    state: web::Data<AppState>,
    caller: Caller,
    body: web::Json<UpdateUsernameRequest>,
) -> AppResult<HttpResponse> {
    state
        .users
        .update_username(&caller.0, body.into_inner().username)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// PUT /api/user/password
pub async fn update_password(
    state: web::Data<AppState>,
    caller: Caller,
    body: web::Json<UpdatePasswordRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    state
        .users
        .update_password(
            &caller.0,
            PasswordChange {
                current_password: req.current_password,
                new_password: req.password,
            },
        )
        .await?;
    Ok(HttpResponse::NoContent().finish())
}
