//! HTTP handlers and route configuration.

mod files;
mod forms;
mod health;
mod posts;
mod tags;
mod users;
mod views;

use actix_web::web;

use crate::middleware::error::AppError;

/// Configure all application routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    let json_config = web::JsonConfig::default()
        .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into());

    cfg.service(
        web::scope("/api")
            .app_data(json_config)
            // Public routes
            .route("/health", web::get().to(health::health_check))
            .route("/signup", web::post().to(users::sign_up))
            .route("/login", web::post().to(users::login))
            .route("/tag", web::get().to(tags::list_tags))
            .route("/files/{name}", web::get().to(files::serve_file))
            .service(
                web::resource("/post")
                    .route(web::get().to(posts::list_posts))
                    .route(web::post().to(posts::create_post)),
            )
            .service(
                web::resource("/post/{id}")
                    .route(web::get().to(posts::get_post))
                    .route(web::put().to(posts::update_post))
                    .route(web::delete().to(posts::delete_post)),
            )
            // Account routes
            .service(
                web::scope("/user")
                    .route("", web::get().to(users::current_user))
                    .route("/username", web::put().to(users::update_username))
                    .route("/password", web::put().to(users::update_password)),
            ),
    );
}

#[cfg(test)]
mod tests;
