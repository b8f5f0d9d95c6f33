use axum::{
    async_trait,
    body::Body,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, Method},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{decode, DecodingKey, Validation};

use crate::{
    db::users,
    error::{AppError, Result},
    routes::auth::Claims,
    AppState,
};

pub const SESSION_COOKIE: &str = "studyhub_session";
pub const CSRF_HEADER: &str = "x-csrf-token";
pub const CSRF_FIELD: &str = "csrf_token";

/// Form bodies larger than this are refused before the token is looked up
const MAX_FORM_BYTES: usize = 2 * 1024 * 1024;

#[derive(Clone, Debug)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
    pub email: String,
    /// Token state-changing requests must echo back
    pub csrf: String,
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response> {
    let token = CookieJar::from_headers(request.headers())
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .ok_or(AppError::Unauthorized)?;

    let claims = decode::<Claims>(
        &token,
        &DecodingKey::from_secret(state.config.session_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized)?
    .claims;

    let mut request = if is_safe(request.method()) {
        request
    } else {
        verify_csrf(request, &claims.csrf).await?
    };

    // The account may have been deleted since the token was issued
    let user = {
        let mut conn = state.db.conn().await?;
        users::by_id(&mut conn, claims.sub)
            .await?
            .ok_or(AppError::Unauthorized)?
    };

    request.extensions_mut().insert(AuthUser {
        id: user.id,
        username: user.username,
        email: user.email,
        csrf: claims.csrf,
    });

    Ok(next.run(request).await)
}

fn is_safe(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// Accepts the token from the `X-CSRF-Token` header, or from the `csrf_token`
/// field of a url-encoded body. The body is buffered and handed back intact.
async fn verify_csrf(request: Request, expected: &str) -> Result<Request> {
    let from_header = request
        .headers()
        .get(CSRF_HEADER)
        .and_then(|value| value.to_str().ok());

    if let Some(token) = from_header {
        return if token == expected {
            Ok(request)
        } else {
            Err(csrf_failure())
        };
    }

    let is_form = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/x-www-form-urlencoded"));

    if !is_form {
        return Err(csrf_failure());
    }

    let (parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, MAX_FORM_BYTES)
        .await
        .map_err(|_| AppError::BadRequest("Request body too large".to_string()))?;

    let submitted = url::form_urlencoded::parse(&bytes)
        .find(|(key, _)| key == CSRF_FIELD)
        .map(|(_, value)| value.into_owned());

    if submitted.as_deref() != Some(expected) {
        return Err(csrf_failure());
    }

    Ok(Request::from_parts(parts, Body::from(bytes)))
}

fn csrf_failure() -> AppError {
    tracing::warn!("rejected state-changing request without a valid CSRF token");
    AppError::Forbidden("Invalid or missing CSRF token".to_string())
}

// Extractor for getting the authenticated user from request extensions
#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}
