use actix_web::{web, HttpRequest, HttpResponse};
use log::{debug, info};
use serde_json::json;

use crate::auth::{
    hash_password_blocking, removal_cookie, session_cookie, start_session,
    verify_password_blocking, AuthUser, SESSION_COOKIE,
};
use crate::config::AuthSettings;
use crate::db::Store;
use crate::error::ApiError;
use crate::models::validation::normalize_optional;
use crate::models::{LoginRequest, NewUser, RegisterRequest, Role, UserResponse};

pub async fn register(
    store: web::Data<dyn Store>,
    settings: web::Data<AuthSettings>,
    payload: web::Json<RegisterRequest>,
) -> Result<HttpResponse, ApiError> {
    let req = payload.into_inner();
    req.validate()?;
    if req.role == Role::Admin {
        return Err(ApiError::forbidden("Admin accounts cannot be self-registered"));
    }

    let username = req.username.trim().to_string();
    let email = req.email.trim().to_lowercase();

    if store.find_user_by_username(&username).await?.is_some() {
        return Err(ApiError::Conflict("Username already exists".into()));
    }
    if store.find_user_by_email(&email).await?.is_some() {
        return Err(ApiError::Conflict("Email already exists".into()));
    }

    let password_hash = hash_password_blocking(req.password, settings.bcrypt_cost).await?;
    let user = store
        .create_user(NewUser {
            username,
            email,
            password_hash,
            full_name: req.full_name.trim().to_string(),
            phone_number: normalize_optional(req.phone_number),
            address: normalize_optional(req.address),
            role: req.role,
        })
        .await?;

    let token = start_session(store.get_ref(), &user, &settings).await?;
    info!("Registered {} user {}", user.role, user.username);

    Ok(HttpResponse::Created()
        .cookie(session_cookie(&token, &settings))
        .json(UserResponse::from(user)))
}

pub async fn login(
    store: web::Data<dyn Store>,
    settings: web::Data<AuthSettings>,
    credentials: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    let LoginRequest { username, password } = credentials.into_inner();

    let user = match store.find_user_by_username(username.trim()).await? {
        Some(user) => user,
        None => {
            debug!("Login attempt for unknown user {}", username.trim());
            return Err(ApiError::InvalidCredentials);
        }
    };

    if !verify_password_blocking(password, user.password_hash.clone()).await? {
        debug!("Wrong password for user {}", user.username);
        return Err(ApiError::InvalidCredentials);
    }

    let token = start_session(store.get_ref(), &user, &settings).await?;
    info!("User {} authenticated successfully", user.username);

    Ok(HttpResponse::Ok()
        .cookie(session_cookie(&token, &settings))
        .json(UserResponse::from(user)))
}

/// Succeeds whether or not a session was present.
pub async fn logout(
    req: HttpRequest,
    store: web::Data<dyn Store>,
    settings: web::Data<AuthSettings>,
) -> Result<HttpResponse, ApiError> {
    if let Some(cookie) = req.cookie(SESSION_COOKIE) {
        if !cookie.value().is_empty() {
            store.delete_session(cookie.value()).await?;
        }
    }

    Ok(HttpResponse::Ok()
        .cookie(removal_cookie(&settings))
        .json(json!({ "message": "Logged out" })))
}

pub async fn current_user(auth: AuthUser) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(UserResponse::from(auth.user)))
}
