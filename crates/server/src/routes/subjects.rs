use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    db::{
        models::Subject,
        notes,
        subjects::{self, NewSubject, SubjectSummary, UpdatedSubject},
    },
    error::{AppError, Result},
    extract::{is_hex_color, optional_text, ValidatedForm},
    middleware::auth::AuthUser,
    services::access::authorize,
    AppState,
};

use super::{notes::NoteCard, Notice};

const DEFAULT_SUBJECT_COLOR: &str = "#0d6efd";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_subjects).post(create_subject))
        .route(
            "/:id",
            get(get_subject).put(update_subject).delete(delete_subject),
        )
        .route("/:id/notes", post(super::notes::create_note))
}

#[derive(Debug, Deserialize, Validate)]
pub struct SubjectForm {
    #[serde(default)]
    #[validate(length(min = 2, max = 100, message = "Subject name must be between 2 and 100 characters"))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 500, message = "Description must be less than 500 characters"))]
    pub description: String,
    #[serde(default)]
    pub color: String,
}

impl SubjectForm {
    /// Blank picks the default color, anything else must be a hex color
    fn color(&self) -> Result<String> {
        let color = self.color.trim();
        if color.is_empty() {
            Ok(DEFAULT_SUBJECT_COLOR.to_string())
        } else if is_hex_color(color) {
            Ok(color.to_string())
        } else {
            Err(AppError::field("color", "Invalid color format"))
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SubjectListResponse {
    pub subjects: Vec<SubjectSummary>,
}

#[derive(Debug, Serialize)]
pub struct SubjectResponse {
    pub subject: Subject,
    pub notes: Vec<NoteCard>,
}

#[derive(Debug, Serialize)]
pub struct SubjectNotice {
    pub notice: String,
    pub subject: Subject,
}

async fn list_subjects(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<SubjectListResponse>> {
    let mut conn = state.db.conn().await?;
    let subjects = subjects::for_user(&mut conn, user.id).await?;

    Ok(Json(SubjectListResponse { subjects }))
}

async fn create_subject(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedForm(form): ValidatedForm<SubjectForm>,
) -> Result<(StatusCode, Json<SubjectNotice>)> {
    let color = form.color()?;

    let mut tx = state.db.begin().await?;
    let subject = subjects::create(
        &mut tx,
        NewSubject {
            name: form.name.trim().to_string(),
            description: optional_text(&form.description),
            color,
            user_id: user.id,
        },
    )
    .await?;
    tx.commit().await?;

    Ok((
        StatusCode::CREATED,
        Json(SubjectNotice {
            notice: format!("Subject \"{}\" created successfully!", subject.name),
            subject,
        }),
    ))
}

async fn get_subject(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<SubjectResponse>> {
    let mut conn = state.db.conn().await?;
    let subject: Subject = authorize(&mut conn, user.id, id).await?;
    let notes = notes::in_subject(&mut conn, subject.id)
        .await?
        .into_iter()
        .map(NoteCard::from)
        .collect();

    Ok(Json(SubjectResponse { subject, notes }))
}

async fn update_subject(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    ValidatedForm(form): ValidatedForm<SubjectForm>,
) -> Result<Json<SubjectNotice>> {
    let mut tx = state.db.begin().await?;
    let subject: Subject = authorize(&mut tx, user.id, id).await?;
    let color = form.color()?;

    let subject = subjects::update(
        &mut tx,
        UpdatedSubject {
            id: subject.id,
            name: form.name.trim().to_string(),
            description: optional_text(&form.description),
            color,
        },
    )
    .await?;
    tx.commit().await?;

    Ok(Json(SubjectNotice {
        notice: format!("Subject \"{}\" updated successfully!", subject.name),
        subject,
    }))
}

async fn delete_subject(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Notice>> {
    let mut tx = state.db.begin().await?;
    let subject: Subject = authorize(&mut tx, user.id, id).await?;
    let note_count = subjects::delete(&mut tx, subject.id).await?;
    tx.commit().await?;

    tracing::info!(user_id = user.id, subject_id = id, note_count, "subject deleted");

    Ok(Notice::new(format!(
        "Subject \"{}\" and {note_count} note(s) deleted successfully.",
        subject.name
    )))
}
