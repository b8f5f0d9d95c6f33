use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::{
    db::{models::Notification, notifications},
    error::Result,
    middleware::auth::AuthUser,
    services::access::authorize,
    AppState,
};

use super::Notice;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_notifications))
        .route("/read-all", post(mark_all_read))
        .route("/:id/read", post(mark_read))
}

#[derive(Debug, Serialize)]
pub struct NotificationListResponse {
    pub notifications: Vec<Notification>,
    pub unread: i64,
}

async fn list_notifications(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<NotificationListResponse>> {
    let mut conn = state.db.conn().await?;
    let notifications = notifications::for_user(&mut conn, user.id).await?;
    let unread = notifications::unread_count(&mut conn, user.id).await?;

    Ok(Json(NotificationListResponse {
        notifications,
        unread,
    }))
}

async fn mark_read(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Notice>> {
    let mut tx = state.db.begin().await?;
    let notification: Notification = authorize(&mut tx, user.id, id).await?;
    notifications::mark_read(&mut tx, notification.id).await?;
    tx.commit().await?;

    Ok(Notice::new("Notification marked as read."))
}

async fn mark_all_read(State(state): State<AppState>, user: AuthUser) -> Result<Json<Notice>> {
    let mut tx = state.db.begin().await?;
    let changed = notifications::mark_all_read(&mut tx, user.id).await?;
    tx.commit().await?;

    Ok(Notice::new(format!("{changed} notification(s) marked as read.")))
}
