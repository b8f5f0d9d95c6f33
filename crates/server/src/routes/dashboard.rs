use axum::{
    extract::{Query, State},
    routing::{delete, get},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    db::{
        exams,
        models::Subject,
        notes, notifications,
        subjects::{self, SubjectSummary},
        users,
    },
    error::{AppError, Result},
    extract::ValidatedForm,
    middleware::auth::{AuthUser, SESSION_COOKIE},
    services::statistics::{self, Statistics},
    AppState,
};

use super::{auth::verify_password, exams::ExamItem, notes::NoteCard, Notice};

const RECENT_NOTES: i64 = 5;
const UPCOMING_EXAMS: i64 = 3;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/search", get(search))
        .route("/statistics", get(get_statistics))
        .route("/settings", get(get_settings).post(update_settings))
        .route("/account", delete(delete_account))
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub subjects: Vec<SubjectSummary>,
    pub recent_notes: Vec<NoteCard>,
    pub total_subjects: i64,
    pub total_notes: i64,
    pub upcoming_exams: Vec<ExamItem>,
    pub unread_notifications: i64,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub subjects: Vec<Subject>,
    pub notes: Vec<NoteCard>,
}

#[derive(Debug, Serialize)]
pub struct SettingsResponse {
    pub username: String,
    pub email: String,
    pub total_subjects: i64,
    pub total_notes: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SettingsForm {
    #[serde(default)]
    #[validate(length(max = 80, message = "Username must be between 3 and 80 characters"))]
    pub username: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct DeleteAccountForm {
    #[serde(default)]
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

async fn dashboard(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<DashboardResponse>> {
    let mut conn = state.db.conn().await?;
    let now = Utc::now().naive_utc();

    let subjects = subjects::for_user(&mut conn, user.id).await?;
    let recent_notes = notes::recent_for_user(&mut conn, user.id, RECENT_NOTES)
        .await?
        .into_iter()
        .map(NoteCard::from)
        .collect();
    let total_notes = notes::count_for_user(&mut conn, user.id).await?;
    let upcoming_exams = exams::upcoming_for_user(&mut conn, user.id, now, UPCOMING_EXAMS)
        .await?
        .into_iter()
        .map(|exam| ExamItem::new(exam, now))
        .collect();
    let unread_notifications = notifications::unread_count(&mut conn, user.id).await?;

    Ok(Json(DashboardResponse {
        total_subjects: subjects.len() as i64,
        subjects,
        recent_notes,
        total_notes,
        upcoming_exams,
        unread_notifications,
    }))
}

async fn search(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<SearchQuery>,
) -> Result<Json<SearchResponse>> {
    let query = params.q.trim().to_string();
    if query.is_empty() {
        return Err(AppError::field("q", "Please enter a search term."));
    }

    let pattern = subjects::like_pattern(&query);
    let mut conn = state.db.conn().await?;
    let subjects = subjects::search(&mut conn, user.id, &pattern).await?;
    let notes = notes::search(&mut conn, user.id, &pattern)
        .await?
        .into_iter()
        .map(NoteCard::from)
        .collect();

    Ok(Json(SearchResponse {
        query,
        subjects,
        notes,
    }))
}

async fn get_statistics(State(state): State<AppState>, user: AuthUser) -> Result<Json<Statistics>> {
    let mut conn = state.db.conn().await?;
    let summaries = subjects::for_user(&mut conn, user.id).await?;
    let all_notes = notes::for_user(&mut conn, user.id).await?;

    Ok(Json(statistics::compute(&summaries, &all_notes)))
}

async fn get_settings(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<SettingsResponse>> {
    let mut conn = state.db.conn().await?;
    let total_subjects = subjects::count_for_user(&mut conn, user.id).await?;
    let total_notes = notes::count_for_user(&mut conn, user.id).await?;

    Ok(Json(SettingsResponse {
        username: user.username,
        email: user.email,
        total_subjects,
        total_notes,
    }))
}

/// A blank or unchanged username is a no-op
async fn update_settings(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedForm(form): ValidatedForm<SettingsForm>,
) -> Result<Json<Notice>> {
    let username = form.username.trim();
    if username.is_empty() || username == user.username {
        return Ok(Notice::new("Nothing to update."));
    }
    if username.chars().count() < 3 {
        return Err(AppError::field(
            "username",
            "Username must be between 3 and 80 characters",
        ));
    }

    let mut tx = state.db.begin().await?;
    if users::username_taken(&mut tx, username).await? {
        return Err(AppError::field("username", "Username already taken."));
    }
    users::rename(&mut tx, user.id, username).await?;
    tx.commit().await?;

    Ok(Notice::new("Username updated successfully!"))
}

async fn delete_account(
    State(state): State<AppState>,
    jar: CookieJar,
    user: AuthUser,
    ValidatedForm(form): ValidatedForm<DeleteAccountForm>,
) -> Result<(CookieJar, Json<Notice>)> {
    let mut tx = state.db.begin().await?;
    let record = users::by_id(&mut tx, user.id)
        .await?
        .ok_or(AppError::Unauthorized)?;

    if !verify_password(&form.password, &record.password_hash)? {
        return Err(AppError::field("password", "Incorrect password."));
    }

    users::delete(&mut tx, user.id).await?;
    tx.commit().await?;

    tracing::info!(user_id = user.id, "account deleted");

    Ok((
        jar.remove(Cookie::build(SESSION_COOKIE).path("/")),
        Notice::new("Your account and all of your data have been deleted."),
    ))
}
