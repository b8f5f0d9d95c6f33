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
        groups::{self, NewStudyGroup},
        models::{GroupMember, Note, SharedNote, StudyGroup},
        notes, notifications,
    },
    error::{AppError, Result},
    extract::{optional_text, ValidatedForm},
    middleware::auth::AuthUser,
    services::{access::authorize, invite},
    AppState,
};

use super::Notice;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_groups).post(create_group))
        .route("/join", post(join_group))
        .route("/:id", get(get_group))
        .route("/:id/share", post(share_note))
        .route("/:id/leave", post(leave_group))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateGroupForm {
    #[serde(default)]
    #[validate(length(min = 1, max = 100, message = "Group name is required."))]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct JoinGroupForm {
    #[serde(default)]
    pub invite_code: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ShareNoteForm {
    pub note_id: i64,
}

#[derive(Debug, Serialize)]
pub struct GroupListResponse {
    pub groups: Vec<StudyGroup>,
}

#[derive(Debug, Serialize)]
pub struct GroupNotice {
    pub notice: String,
    pub group: StudyGroup,
}

#[derive(Debug, Serialize)]
pub struct GroupResponse {
    pub group: StudyGroup,
    pub members: Vec<GroupMember>,
    /// Newest first
    pub shared_notes: Vec<SharedNote>,
    /// The caller's own notes, candidates for sharing
    pub my_notes: Vec<Note>,
}

#[derive(Debug, Serialize)]
pub struct ShareResponse {
    pub notice: String,
    /// False when the note was already in the group
    pub shared: bool,
}

async fn list_groups(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<GroupListResponse>> {
    let mut conn = state.db.conn().await?;
    let groups = groups::for_user(&mut conn, user.id).await?;

    Ok(Json(GroupListResponse { groups }))
}

async fn create_group(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedForm(form): ValidatedForm<CreateGroupForm>,
) -> Result<(StatusCode, Json<GroupNotice>)> {
    let name = form.name.trim();
    if name.is_empty() {
        return Err(AppError::field("name", "Group name is required."));
    }

    let mut tx = state.db.begin().await?;
    let invite_code = invite::fresh_invite_code(&mut tx).await?;
    let group = groups::create(
        &mut tx,
        NewStudyGroup {
            name: name.to_string(),
            description: optional_text(&form.description),
            invite_code,
            created_by: user.id,
        },
    )
    .await?;
    tx.commit().await?;

    tracing::info!(user_id = user.id, group_id = group.id, "study group created");

    Ok((
        StatusCode::CREATED,
        Json(GroupNotice {
            notice: format!("Group created! Invite code: {}", group.invite_code),
            group,
        }),
    ))
}

async fn join_group(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedForm(form): ValidatedForm<JoinGroupForm>,
) -> Result<Json<GroupNotice>> {
    let code = form.invite_code.trim().to_uppercase();

    let mut tx = state.db.begin().await?;
    let group = groups::by_invite_code(&mut tx, &code).await?.ok_or_else(|| {
        AppError::field(
            "invite_code",
            "Invalid invite code. Please check and try again.",
        )
    })?;

    if groups::is_member(&mut tx, group.id, user.id).await? {
        return Ok(Json(GroupNotice {
            notice: "You are already a member of this group!".to_string(),
            group,
        }));
    }

    groups::add_member(&mut tx, group.id, user.id).await?;
    if let Some(creator) = group.created_by.filter(|&id| id != user.id) {
        notifications::create(
            &mut tx,
            creator,
            "New group member",
            &format!("{} joined {}", user.username, group.name),
        )
        .await?;
    }
    tx.commit().await?;

    Ok(Json(GroupNotice {
        notice: format!("You joined {}!", group.name),
        group,
    }))
}

async fn get_group(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<GroupResponse>> {
    let mut conn = state.db.conn().await?;
    let group: StudyGroup = authorize(&mut conn, user.id, id).await?;

    let members = groups::members(&mut conn, group.id).await?;
    let shared_notes = groups::shared_notes(&mut conn, group.id).await?;
    let my_notes = notes::for_user(&mut conn, user.id).await?;

    Ok(Json(GroupResponse {
        group,
        members,
        shared_notes,
        my_notes,
    }))
}

async fn share_note(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    ValidatedForm(form): ValidatedForm<ShareNoteForm>,
) -> Result<Json<ShareResponse>> {
    let mut tx = state.db.begin().await?;
    let group: StudyGroup = authorize(&mut tx, user.id, id).await?;
    let note: Note = authorize(&mut tx, user.id, form.note_id).await?;

    if groups::is_shared(&mut tx, group.id, note.id).await? {
        return Ok(Json(ShareResponse {
            notice: "This note is already shared in this group!".to_string(),
            shared: false,
        }));
    }

    groups::share_note(&mut tx, group.id, note.id, user.id).await?;

    let message = format!("{} shared \"{}\" in {}", user.username, note.title, group.name);
    for member in groups::members(&mut tx, group.id).await? {
        if member.user_id != user.id {
            notifications::create(&mut tx, member.user_id, "New shared note", &message).await?;
        }
    }
    tx.commit().await?;

    Ok(Json(ShareResponse {
        notice: format!("Note \"{}\" shared with the group!", note.title),
        shared: true,
    }))
}

async fn leave_group(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Notice>> {
    let mut tx = state.db.begin().await?;
    let group = groups::by_id(&mut tx, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Group not found".to_string()))?;

    let left = groups::remove_member(&mut tx, group.id, user.id).await?;
    tx.commit().await?;

    Ok(Notice::new(if left {
        format!("You left {}.", group.name)
    } else {
        format!("You are not a member of {}.", group.name)
    }))
}
