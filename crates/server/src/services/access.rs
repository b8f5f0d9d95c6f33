//! The single authorization gate every handler goes through before it reads
//! or changes a user-owned resource.
//!
//! A resource is looked up first and then asked whether the acting user may
//! touch it. A missing row is reported as not found, a row that belongs to
//! somebody else as forbidden.

use axum::async_trait;
use sqlx::SqliteConnection;

use crate::{
    db::{
        exams, groups,
        models::{ExamDate, Note, Notification, StudyGroup, Subject},
        notes, notifications, subjects,
    },
    error::{AppError, Result},
};

#[async_trait]
pub trait Guarded: Sized + Send + Sync {
    /// Used in not-found and forbidden messages
    const RESOURCE: &'static str;

    async fn fetch(conn: &mut SqliteConnection, id: i64) -> Result<Option<Self>>;

    async fn permits(&self, conn: &mut SqliteConnection, user_id: i64) -> Result<bool>;
}

/// Loads `R` by id and checks that `user_id` may act on it
pub async fn authorize<R: Guarded>(
    conn: &mut SqliteConnection,
    user_id: i64,
    id: i64,
) -> Result<R> {
    let resource = R::fetch(conn, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} not found", R::RESOURCE)))?;

    if !resource.permits(conn, user_id).await? {
        tracing::warn!(
            user_id,
            resource = R::RESOURCE,
            id,
            "access denied to resource owned by another user"
        );
        return Err(AppError::Forbidden(format!(
            "You do not have access to this {}",
            R::RESOURCE.to_lowercase()
        )));
    }

    Ok(resource)
}

#[async_trait]
impl Guarded for Subject {
    const RESOURCE: &'static str = "Subject";

    async fn fetch(conn: &mut SqliteConnection, id: i64) -> Result<Option<Self>> {
        Ok(subjects::by_id(conn, id).await?)
    }

    async fn permits(&self, _conn: &mut SqliteConnection, user_id: i64) -> Result<bool> {
        Ok(self.user_id == user_id)
    }
}

#[async_trait]
impl Guarded for Note {
    const RESOURCE: &'static str = "Note";

    async fn fetch(conn: &mut SqliteConnection, id: i64) -> Result<Option<Self>> {
        Ok(notes::by_id(conn, id).await?)
    }

    /// `owner_id` is the parent subject's user, joined in by the fetch
    async fn permits(&self, _conn: &mut SqliteConnection, user_id: i64) -> Result<bool> {
        Ok(self.owner_id == user_id)
    }
}

#[async_trait]
impl Guarded for ExamDate {
    const RESOURCE: &'static str = "Exam";

    async fn fetch(conn: &mut SqliteConnection, id: i64) -> Result<Option<Self>> {
        Ok(exams::by_id(conn, id).await?)
    }

    async fn permits(&self, _conn: &mut SqliteConnection, user_id: i64) -> Result<bool> {
        Ok(self.user_id == user_id)
    }
}

#[async_trait]
impl Guarded for Notification {
    const RESOURCE: &'static str = "Notification";

    async fn fetch(conn: &mut SqliteConnection, id: i64) -> Result<Option<Self>> {
        Ok(notifications::by_id(conn, id).await?)
    }

    async fn permits(&self, _conn: &mut SqliteConnection, user_id: i64) -> Result<bool> {
        Ok(self.user_id == user_id)
    }
}

#[async_trait]
impl Guarded for StudyGroup {
    const RESOURCE: &'static str = "Group";

    async fn fetch(conn: &mut SqliteConnection, id: i64) -> Result<Option<Self>> {
        Ok(groups::by_id(conn, id).await?)
    }

    async fn permits(&self, conn: &mut SqliteConnection, user_id: i64) -> Result<bool> {
        if self.created_by == Some(user_id) {
            return Ok(true);
        }
        Ok(groups::is_member(conn, self.id, user_id).await?)
    }
}
