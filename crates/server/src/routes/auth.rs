use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::Config,
    db::{
        models::User,
        users::{self, NewUser},
    },
    error::{AppError, Result},
    extract::{checked, trimmed, ValidatedForm},
    middleware::auth::{AuthUser, SESSION_COOKIE},
    AppState,
};

use super::Notice;

const SESSION_DAYS: i64 = 7;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

/// Routes that need a session
pub fn session_router() -> Router<AppState> {
    Router::new()
        .route("/logout", post(logout))
        .route("/me", get(me))
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterForm {
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(min = 3, max = 80, message = "Username must be between 3 and 80 characters"))]
    pub username: String,
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 4, message = "Password must be at least 4 characters long"))]
    pub password: String,
    #[serde(default)]
    #[validate(must_match(other = "password", message = "Passwords must match"))]
    pub confirm_password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginForm {
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
    /// Keeps the cookie past the browser session
    #[serde(default, deserialize_with = "checked")]
    pub remember: bool,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: User,
    /// Echo this back in `X-CSRF-Token` or a `csrf_token` form field
    pub csrf_token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64, // user id
    pub username: String,
    pub csrf: String,
    pub exp: usize,
}

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|_| AppError::Internal("Failed to hash password".to_string()))
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

fn create_token(user: &User, csrf: &str, secret: &str) -> Result<String> {
    let expiration = Utc::now()
        .checked_add_signed(chrono::Duration::days(SESSION_DAYS))
        .ok_or_else(|| AppError::Internal("Session expiry out of range".to_string()))?
        .timestamp() as usize;

    let claims = Claims {
        sub: user.id,
        username: user.username.clone(),
        csrf: csrf.to_string(),
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| AppError::Internal("Failed to create token".to_string()))
}

/// Without `remember` the cookie ends with the browser session, otherwise it
/// lives as long as the token
fn session_cookie(token: String, config: &Config, remember: bool) -> Cookie<'static> {
    let cookie = Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.cookie_secure);

    if remember {
        cookie.max_age(time::Duration::days(SESSION_DAYS)).build()
    } else {
        cookie.build()
    }
}

async fn register(
    State(state): State<AppState>,
    ValidatedForm(form): ValidatedForm<RegisterForm>,
) -> Result<(StatusCode, Json<Notice>)> {
    let mut tx = state.db.begin().await?;

    if users::username_taken(&mut tx, &form.username).await? {
        return Err(AppError::field(
            "username",
            "Username already taken. Please choose a different one.",
        ));
    }
    if users::email_taken(&mut tx, &form.email).await? {
        return Err(AppError::field(
            "email",
            "Email already registered. Please use a different email or login.",
        ));
    }

    let password_hash = hash_password(&form.password)?;
    let user = users::create(
        &mut tx,
        NewUser {
            username: form.username,
            email: form.email,
            password_hash,
        },
    )
    .await?;

    tx.commit().await?;
    tracing::info!(user_id = user.id, "account created");

    Ok((
        StatusCode::CREATED,
        Notice::new("Congratulations! Your account has been created. You can now log in."),
    ))
}

async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidatedForm(form): ValidatedForm<LoginForm>,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    let mut conn = state.db.conn().await?;
    let user = users::by_email(&mut conn, &form.email)
        .await?
        .ok_or(AppError::Unauthorized)?;
    drop(conn);

    if !verify_password(&form.password, &user.password_hash)? {
        tracing::info!(user_id = user.id, "login rejected");
        return Err(AppError::Unauthorized);
    }

    let csrf_token = Uuid::new_v4().to_string();
    let token = create_token(&user, &csrf_token, &state.config.session_secret)?;

    Ok((
        jar.add(session_cookie(token, &state.config, form.remember)),
        Json(SessionResponse { user, csrf_token }),
    ))
}

async fn logout(jar: CookieJar, user: AuthUser) -> (CookieJar, Json<Notice>) {
    tracing::debug!(user_id = user.id, "logged out");
    (
        jar.remove(Cookie::build(SESSION_COOKIE).path("/")),
        Notice::new("You have been logged out."),
    )
}

async fn me(State(state): State<AppState>, user: AuthUser) -> Result<Json<SessionResponse>> {
    let mut conn = state.db.conn().await?;
    let record = users::by_id(&mut conn, user.id)
        .await?
        .ok_or(AppError::Unauthorized)?;

    Ok(Json(SessionResponse {
        user: record,
        csrf_token: user.csrf,
    }))
}
