//! Password hashing, session tokens and the authenticated-user extractor.

use actix_web::cookie::{time, Cookie, SameSite};
use actix_web::dev::Payload;
use actix_web::{web, FromRequest, HttpRequest};
use chrono::Utc;
use futures::future::LocalBoxFuture;
use log::debug;
use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::config::AuthSettings;
use crate::db::Store;
use crate::error::ApiError;
use crate::models::{Role, User};

pub const SESSION_COOKIE: &str = "sid";
pub const SESSION_TOKEN_LEN: usize = 48;

pub fn hash_password(password: &str, cost: u32) -> Result<String, ApiError> {
    Ok(bcrypt::hash(password, cost)?)
}

/// Malformed stored hashes count as a mismatch rather than an error.
pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or_else(|e| {
        debug!("Bcrypt verification error: {}", e);
        false
    })
}

/// Runs [`hash_password`] on the blocking pool; bcrypt is CPU bound.
pub async fn hash_password_blocking(password: String, cost: u32) -> Result<String, ApiError> {
    web::block(move || hash_password(&password, cost))
        .await
        .map_err(|e| ApiError::Internal(format!("password hashing task failed: {e}")))?
}

pub async fn verify_password_blocking(password: String, hash: String) -> Result<bool, ApiError> {
    web::block(move || verify_password(&password, &hash))
        .await
        .map_err(|e| ApiError::Internal(format!("password check task failed: {e}")))
}

pub fn new_session_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SESSION_TOKEN_LEN)
        .map(char::from)
        .collect()
}

pub fn session_cookie(token: &str, settings: &AuthSettings) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, token.to_owned())
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(settings.cookie_secure)
        .max_age(time::Duration::seconds(settings.ttl.num_seconds()))
        .finish()
}

/// Expires the session cookie on the client.
pub fn removal_cookie(settings: &AuthSettings) -> Cookie<'static> {
    let mut cookie = session_cookie("", settings);
    cookie.make_removal();
    cookie
}

/// Creates a session row for `user` and returns its token.
pub async fn start_session(
    store: &dyn Store,
    user: &User,
    settings: &AuthSettings,
) -> Result<String, ApiError> {
    let now = Utc::now();
    let purged = store.purge_expired_sessions(now).await?;
    if purged > 0 {
        debug!("Purged {} expired sessions", purged);
    }

    let token = new_session_token();
    store
        .create_session(&token, user.id, now + settings.ttl)
        .await?;
    Ok(token)
}

/// The user behind a valid session cookie. Rejects with 401 otherwise.
pub struct AuthUser {
    pub user: User,
    pub token: String,
}

impl AuthUser {
    pub fn role(&self) -> Role {
        self.user.role
    }

    pub fn require_role(&self, role: Role) -> Result<(), ApiError> {
        if self.user.role == role {
            return Ok(());
        }
        Err(ApiError::forbidden(format!(
            "This action requires the {} role",
            role
        )))
    }
}

impl FromRequest for AuthUser {
    type Error = ApiError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let store = req.app_data::<web::Data<dyn Store>>().cloned();
        let token = req.cookie(SESSION_COOKIE).map(|c| c.value().to_owned());

        Box::pin(async move {
            let store =
                store.ok_or_else(|| ApiError::Internal("store is not configured".into()))?;
            let token = match token {
                Some(token) if !token.is_empty() => token,
                _ => {
                    debug!("Missing session cookie");
                    return Err(ApiError::Unauthorized);
                }
            };

            let user = store
                .find_session_user(&token, Utc::now())
                .await?
                .ok_or(ApiError::Unauthorized)?;
            Ok(AuthUser { user, token })
        })
    }
}
