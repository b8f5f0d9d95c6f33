use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    db::{
        models::{Note, Progress, Subject},
        notes::{self, NewNote},
    },
    error::{AppError, Result},
    extract::{is_hex_color, ValidatedForm},
    middleware::auth::AuthUser,
    services::{access::authorize, pdf},
    AppState,
};

use super::Notice;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:id", get(get_note).put(update_note).delete(delete_note))
        .route("/:id/pin", post(toggle_pin))
        .route("/:id/progress", post(update_progress))
        .route("/:id/color", post(update_color))
        .route("/:id/export", get(export_note))
        .route("/:id/export/pdf", get(export_pdf))
}

#[derive(Debug, Deserialize, Validate)]
pub struct NoteForm {
    #[serde(default)]
    #[validate(length(min = 2, max = 200, message = "Title must be between 2 and 200 characters"))]
    pub title: String,
    #[serde(default)]
    #[validate(length(min = 10, message = "Content must be at least 10 characters long"))]
    pub content: String,
}

/// A note as shown in lists
#[derive(Debug, Serialize)]
pub struct NoteCard {
    #[serde(flatten)]
    pub note: Note,
    pub preview: String,
    pub word_count: usize,
}

impl From<Note> for NoteCard {
    fn from(note: Note) -> Self {
        Self {
            preview: note.preview(),
            word_count: note.word_count(),
            note,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct NoteNotice {
    pub notice: String,
    pub note: Note,
}

#[derive(Debug, Serialize)]
pub struct DeletedNote {
    pub notice: String,
    pub subject_id: i64,
}

#[derive(Debug, Serialize)]
pub struct PinResponse {
    pub notice: String,
    pub is_pinned: bool,
}

#[derive(Debug, Deserialize)]
pub struct ProgressRequest {
    #[serde(default)]
    pub progress: String,
}

#[derive(Debug, Serialize)]
pub struct ProgressResponse {
    /// False when the submitted value was not a known state
    pub success: bool,
    pub progress: Progress,
}

#[derive(Debug, Deserialize)]
pub struct ColorRequest {
    #[serde(default = "default_note_color")]
    pub color: String,
}

fn default_note_color() -> String {
    "#ffffff".to_string()
}

#[derive(Debug, Serialize)]
pub struct ColorResponse {
    pub success: bool,
    pub color: String,
}

pub(super) async fn create_note(
    State(state): State<AppState>,
    user: AuthUser,
    Path(subject_id): Path<i64>,
    ValidatedForm(form): ValidatedForm<NoteForm>,
) -> Result<(StatusCode, Json<NoteNotice>)> {
    let mut tx = state.db.begin().await?;
    let subject: Subject = authorize(&mut tx, user.id, subject_id).await?;

    let note = notes::create(
        &mut tx,
        NewNote {
            title: form.title.trim().to_string(),
            content: form.content,
            subject_id: subject.id,
        },
    )
    .await?;
    tx.commit().await?;

    Ok((
        StatusCode::CREATED,
        Json(NoteNotice {
            notice: format!("Note \"{}\" created successfully!", note.title),
            note,
        }),
    ))
}

async fn get_note(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<NoteCard>> {
    let mut conn = state.db.conn().await?;
    let note: Note = authorize(&mut conn, user.id, id).await?;

    Ok(Json(note.into()))
}

async fn update_note(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    ValidatedForm(form): ValidatedForm<NoteForm>,
) -> Result<Json<NoteNotice>> {
    let mut tx = state.db.begin().await?;
    let note: Note = authorize(&mut tx, user.id, id).await?;
    let note = notes::update(&mut tx, note.id, form.title.trim(), &form.content).await?;
    tx.commit().await?;

    Ok(Json(NoteNotice {
        notice: format!("Note \"{}\" updated successfully!", note.title),
        note,
    }))
}

async fn delete_note(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<DeletedNote>> {
    let mut tx = state.db.begin().await?;
    let note: Note = authorize(&mut tx, user.id, id).await?;
    notes::delete(&mut tx, note.id).await?;
    tx.commit().await?;

    Ok(Json(DeletedNote {
        notice: format!("Note \"{}\" deleted successfully.", note.title),
        subject_id: note.subject_id,
    }))
}

async fn toggle_pin(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<PinResponse>> {
    let mut tx = state.db.begin().await?;
    let note: Note = authorize(&mut tx, user.id, id).await?;
    let is_pinned = notes::toggle_pin(&mut tx, note.id).await?;
    tx.commit().await?;

    let status = if is_pinned { "pinned" } else { "unpinned" };
    Ok(Json(PinResponse {
        notice: format!("Note \"{}\" {status} successfully!", note.title),
        is_pinned,
    }))
}

/// Unknown values are ignored and the stored progress is reported back
async fn update_progress(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(body): Json<ProgressRequest>,
) -> Result<Json<ProgressResponse>> {
    let mut tx = state.db.begin().await?;
    let note: Note = authorize(&mut tx, user.id, id).await?;

    let response = match body.progress.parse::<Progress>() {
        Ok(progress) => {
            notes::set_progress(&mut tx, note.id, progress).await?;
            ProgressResponse {
                success: true,
                progress,
            }
        }
        Err(()) => {
            tracing::debug!(note_id = id, value = %body.progress, "ignored unknown progress");
            ProgressResponse {
                success: false,
                progress: note.progress,
            }
        }
    };
    tx.commit().await?;

    Ok(Json(response))
}

async fn update_color(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(body): Json<ColorRequest>,
) -> Result<Json<ColorResponse>> {
    let mut tx = state.db.begin().await?;
    let note: Note = authorize(&mut tx, user.id, id).await?;

    let color = body.color.trim();
    if !is_hex_color(color) {
        return Err(AppError::field("color", "Invalid color format"));
    }

    notes::set_color(&mut tx, note.id, color).await?;
    tx.commit().await?;

    Ok(Json(ColorResponse {
        success: true,
        color: color.to_string(),
    }))
}

async fn export_note(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let mut conn = state.db.conn().await?;
    let note: Note = authorize(&mut conn, user.id, id).await?;

    let disposition = format!(
        "attachment; filename=\"{}.txt\"",
        attachment_name(&note.title)
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        export_text(&note),
    ))
}

async fn export_pdf(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let note: Note = {
        let mut conn = state.db.conn().await?;
        authorize(&mut conn, user.id, id).await?
    };

    let disposition = format!(
        "attachment; filename=\"{}.pdf\"",
        attachment_name(&note.title)
    );
    let bytes = pdf::render_note(&note)?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    ))
}

pub fn export_text(note: &Note) -> String {
    const STAMP: &str = "%B %d, %Y at %I:%M %p";
    let rule = "=".repeat(60);

    format!(
        "{rule}\n{title}\n{rule}\n\n\
         Subject: {subject}\nCreated: {created}\nUpdated: {updated}\n\n\
         {rule}\n\n{content}\n\n{rule}\nExported from StudyHub\n{rule}",
        title = note.title,
        subject = note.subject_name,
        created = note.created_at.format(STAMP),
        updated = note.updated_at.format(STAMP),
        content = note.content,
    )
}

/// Keeps the header value ASCII and free of quotes
fn attachment_name(title: &str) -> String {
    title
        .chars()
        .map(|c| match c {
            '"' | '\\' | '/' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn attachment_names_are_header_safe() {
        assert_eq!(attachment_name("Chapter 5: \"Sets\""), "Chapter 5: _Sets_");
        assert_eq!(attachment_name("Über/Math"), "_ber_Math");
    }

    #[test]
    fn export_layout() {
        let at = Utc.with_ymd_and_hms(2026, 3, 5, 14, 30, 0).unwrap();
        let note = Note {
            id: 1,
            title: "Algebra".to_string(),
            content: "x + 1 = 2".to_string(),
            is_pinned: false,
            progress: Progress::Reading,
            color: "#ffffff".to_string(),
            subject_id: 1,
            subject_name: "Math".to_string(),
            owner_id: 1,
            created_at: at,
            updated_at: at,
        };

        let text = export_text(&note);
        assert!(text.starts_with(&format!("{}\nAlgebra\n", "=".repeat(60))));
        assert!(text.contains("Subject: Math\nCreated: March 05, 2026 at 02:30 PM\n"));
        assert!(text.contains("\n\nx + 1 = 2\n\n"));
        assert!(text.ends_with("Exported from StudyHub\n============================================================"));
    }
}
