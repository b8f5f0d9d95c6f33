use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    db::{
        exams::{self, NewExamDate},
        models::ExamDate,
        notes, subjects,
    },
    error::{AppError, Result},
    extract::{optional_text, ValidatedForm},
    middleware::auth::AuthUser,
    services::{
        access::authorize,
        prompts::{self, ExamSuggestion, SubjectOutline},
    },
    AppState,
};

use super::Notice;

/// Format of `datetime-local` inputs
pub const EXAM_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_exams).post(add_exam))
        .route("/:id", delete(delete_exam))
        .route("/suggest", post(suggest_exams))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ExamForm {
    #[serde(default)]
    #[validate(length(min = 1, max = 100, message = "Subject name is required"))]
    pub subject_name: String,
    #[serde(default)]
    pub exam_date: String,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Serialize)]
pub struct ExamItem {
    #[serde(flatten)]
    pub exam: ExamDate,
    pub days_remaining: i64,
}

impl ExamItem {
    pub(super) fn new(exam: ExamDate, now: NaiveDateTime) -> Self {
        Self {
            days_remaining: exam.days_remaining(now),
            exam,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ExamListResponse {
    pub exams: Vec<ExamItem>,
}

#[derive(Debug, Serialize)]
pub struct ExamNotice {
    pub notice: String,
    pub exam: ExamItem,
}

#[derive(Debug, Serialize)]
pub struct SuggestionsResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<ExamSuggestion>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SuggestionsResponse {
    fn error(message: &str) -> Json<Self> {
        Json(Self {
            suggestions: None,
            error: Some(message.to_string()),
        })
    }
}

pub fn parse_exam_date(value: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value.trim(), EXAM_DATE_FORMAT)
        .map_err(|_| AppError::field("exam_date", "Enter the date as YYYY-MM-DDTHH:MM"))
}

async fn list_exams(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ExamListResponse>> {
    let mut conn = state.db.conn().await?;
    let now = Utc::now().naive_utc();

    let exams = exams::for_user(&mut conn, user.id)
        .await?
        .into_iter()
        .map(|exam| ExamItem::new(exam, now))
        .collect();

    Ok(Json(ExamListResponse { exams }))
}

async fn add_exam(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedForm(form): ValidatedForm<ExamForm>,
) -> Result<(StatusCode, Json<ExamNotice>)> {
    let exam_date = parse_exam_date(&form.exam_date)?;

    let mut tx = state.db.begin().await?;
    let exam = exams::create(
        &mut tx,
        NewExamDate {
            subject_name: form.subject_name.trim().to_string(),
            exam_date,
            notes: optional_text(&form.notes),
            user_id: user.id,
        },
    )
    .await?;
    tx.commit().await?;

    Ok((
        StatusCode::CREATED,
        Json(ExamNotice {
            notice: "Exam date added!".to_string(),
            exam: ExamItem::new(exam, Utc::now().naive_utc()),
        }),
    ))
}

async fn delete_exam(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Notice>> {
    let mut tx = state.db.begin().await?;
    let exam: ExamDate = authorize(&mut tx, user.id, id).await?;
    exams::delete(&mut tx, exam.id).await?;
    tx.commit().await?;

    Ok(Notice::new("Exam date deleted."))
}

async fn suggest_exams(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<SuggestionsResponse>> {
    let outlines = {
        let mut conn = state.db.conn().await?;
        let summaries = subjects::for_user(&mut conn, user.id).await?;

        let mut outlines = Vec::with_capacity(summaries.len());
        for summary in summaries {
            let note_titles = notes::in_subject(&mut conn, summary.subject.id)
                .await?
                .into_iter()
                .map(|note| note.title)
                .collect();
            outlines.push(SubjectOutline {
                name: summary.subject.name,
                note_titles,
            });
        }
        outlines
    };

    if outlines.is_empty() {
        return Ok(SuggestionsResponse::error(
            "No subjects found. Add some subjects and notes first!",
        ));
    }

    let today = Utc::now().format("%Y-%m-%d").to_string();
    let prompt = prompts::exam_suggestions(&today, &outlines);
    let answer = state
        .ai
        .complete(&prompt.text, prompt.max_tokens)
        .await
        .into_text();

    Ok(match prompts::parse_exam_suggestions(&answer) {
        Some(suggestions) => Json(SuggestionsResponse {
            suggestions: Some(suggestions),
            error: None,
        }),
        None => SuggestionsResponse::error("Could not generate suggestions. Please try again."),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exam_dates_use_the_datetime_local_format() {
        let parsed = parse_exam_date("2026-03-15T09:00").unwrap();
        assert_eq!(parsed.to_string(), "2026-03-15 09:00:00");

        assert!(parse_exam_date("15/03/2026").is_err());
        assert!(parse_exam_date("").is_err());
    }
}
