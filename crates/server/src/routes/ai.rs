//! Handlers that hand a note, or the user's subjects, to the AI gateway.
//!
//! Database work finishes before the gateway is called so no connection is
//! held across the outbound request.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    db::{
        models::{Note, Subject},
        notes::{self, NewNote},
        subjects,
    },
    error::Result,
    extract::{ValidatedForm, ValidatedJson},
    middleware::auth::AuthUser,
    services::{
        access::authorize,
        prompts::{self, Flashcard, MindMap, Prompt},
    },
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/notes/:id/ai/:action", post(note_action))
        .route("/notes/:id/chat", post(chat))
        .route("/notes/:id/flashcards", post(flashcards))
        .route("/notes/:id/mindmap", post(mind_map))
        .route("/ai/study-plan", post(study_plan))
        .route("/ai/generate-note", post(generate_note))
        .route("/ai/generate-note/save", post(save_generated_note))
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteAction {
    Summarize,
    Quiz,
    Explain,
    Improve,
}

impl NoteAction {
    fn prompt(self, note: &Note) -> Prompt {
        match self {
            Self::Summarize => prompts::summarize(&note.title, &note.content),
            Self::Quiz => prompts::quiz(&note.title, &note.content),
            Self::Explain => prompts::explain(&note.title, &note.content),
            Self::Improve => prompts::improve(&note.title, &note.content),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AiResult {
    pub result: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct FlashcardsResponse {
    pub cards: Vec<Flashcard>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MindMapResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mindmap: Option<MindMap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct GenerateNoteRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Topic is required"))]
    pub topic: String,
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub subject_id: Option<i64>,
}

fn default_level() -> String {
    "intermediate".to_string()
}

#[derive(Debug, Serialize)]
pub struct GeneratedNote {
    pub topic: String,
    pub subject_id: Option<i64>,
    pub content: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SaveGeneratedNoteForm {
    #[serde(default)]
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Content is required"))]
    pub content: String,
    pub subject_id: i64,
}

#[derive(Debug, Serialize)]
pub struct SavedNote {
    pub notice: String,
    pub note: Note,
}

async fn owned_note(state: &AppState, user: &AuthUser, id: i64) -> Result<Note> {
    let mut conn = state.db.conn().await?;
    authorize(&mut conn, user.id, id).await
}

async fn ask(state: &AppState, prompt: Prompt) -> String {
    state
        .ai
        .complete(&prompt.text, prompt.max_tokens)
        .await
        .into_text()
}

async fn note_action(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, action)): Path<(i64, NoteAction)>,
) -> Result<Json<AiResult>> {
    let note = owned_note(&state, &user, id).await?;
    let result = ask(&state, action.prompt(&note)).await;

    Ok(Json(AiResult { result }))
}

async fn chat(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(body): Json<ChatRequest>,
) -> Result<Json<AiResult>> {
    let note = owned_note(&state, &user, id).await?;

    let question = body.question.trim();
    if question.is_empty() {
        return Ok(Json(AiResult {
            result: "Please ask a question.".to_string(),
        }));
    }

    let result = ask(&state, prompts::chat(&note.title, &note.content, question)).await;
    Ok(Json(AiResult { result }))
}

async fn study_plan(State(state): State<AppState>, user: AuthUser) -> Result<Json<AiResult>> {
    let summaries = {
        let mut conn = state.db.conn().await?;
        subjects::for_user(&mut conn, user.id).await?
    };

    if summaries.is_empty() {
        return Ok(Json(AiResult {
            result: "You have no subjects yet. Add some subjects and notes first!".to_string(),
        }));
    }

    let counts: Vec<(String, i64)> = summaries
        .into_iter()
        .map(|s| (s.subject.name, s.note_count))
        .collect();

    let result = ask(&state, prompts::study_plan(&counts)).await;
    Ok(Json(AiResult { result }))
}

async fn flashcards(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<FlashcardsResponse>> {
    let note = owned_note(&state, &user, id).await?;
    let answer = ask(&state, prompts::flashcards(&note.title, &note.content)).await;

    Ok(Json(match prompts::parse_flashcards(&answer) {
        Some(cards) => FlashcardsResponse { cards, error: None },
        None => FlashcardsResponse {
            cards: Vec::new(),
            error: Some("Could not generate flashcards. Try again.".to_string()),
        },
    }))
}

async fn mind_map(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<MindMapResponse>> {
    let note = owned_note(&state, &user, id).await?;
    let answer = ask(&state, prompts::mind_map(&note.title, &note.content)).await;

    Ok(Json(match prompts::parse_mind_map(&answer) {
        Some(map) => MindMapResponse {
            mindmap: Some(map),
            error: None,
        },
        None => MindMapResponse {
            mindmap: None,
            error: Some("Could not generate mind map. Please try again.".to_string()),
        },
    }))
}

async fn generate_note(
    State(state): State<AppState>,
    _user: AuthUser,
    ValidatedJson(body): ValidatedJson<GenerateNoteRequest>,
) -> Result<Json<GeneratedNote>> {
    let topic = body.topic.trim().to_string();
    let answer = ask(&state, prompts::generate_note(&topic, &body.level)).await;

    Ok(Json(GeneratedNote {
        topic,
        subject_id: body.subject_id,
        content: prompts::strip_markdown(&answer),
    }))
}

async fn save_generated_note(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedForm(form): ValidatedForm<SaveGeneratedNoteForm>,
) -> Result<(StatusCode, Json<SavedNote>)> {
    let mut tx = state.db.begin().await?;
    let subject: Subject = authorize(&mut tx, user.id, form.subject_id).await?;

    let note = notes::create(
        &mut tx,
        NewNote {
            title: form.title.trim().to_string(),
            content: form.content.trim().to_string(),
            subject_id: subject.id,
        },
    )
    .await?;
    tx.commit().await?;

    Ok((
        StatusCode::CREATED,
        Json(SavedNote {
            notice: "AI generated note saved successfully!".to_string(),
            note,
        }),
    ))
}
