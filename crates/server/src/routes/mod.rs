pub mod ai;
pub mod auth;
pub mod dashboard;
pub mod exams;
pub mod groups;
pub mod leaderboard;
pub mod notes;
pub mod notifications;
pub mod subjects;

use axum::Json;
use serde::Serialize;

/// The human-readable outcome of a form submission
#[derive(Debug, Serialize)]
pub struct Notice {
    pub notice: String,
}

impl Notice {
    pub fn new(notice: impl Into<String>) -> Json<Self> {
        Json(Self {
            notice: notice.into(),
        })
    }
}
