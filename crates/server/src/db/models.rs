use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Subject {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub color: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
}

/// Reading progress of a note
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Progress {
    #[default]
    Unread,
    Reading,
    Mastered,
}

impl Progress {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unread => "unread",
            Self::Reading => "reading",
            Self::Mastered => "mastered",
        }
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Progress {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unread" => Ok(Self::Unread),
            "reading" => Ok(Self::Reading),
            "mastered" => Ok(Self::Mastered),
            _ => Err(()),
        }
    }
}

/// A note together with the subject it lives in. `owner_id` is the
/// subject's user, which is what ownership checks compare against.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Note {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub is_pinned: bool,
    pub progress: Progress,
    pub color: String,
    pub subject_id: i64,
    pub subject_name: String,
    pub owner_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Note {
    const PREVIEW_CHARS: usize = 100;

    /// The first hundred characters of the content
    pub fn preview(&self) -> String {
        if self.content.chars().count() > Self::PREVIEW_CHARS {
            let head: String = self.content.chars().take(Self::PREVIEW_CHARS).collect();
            format!("{head}...")
        } else {
            self.content.clone()
        }
    }

    pub fn word_count(&self) -> usize {
        self.content.split_whitespace().count()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ExamDate {
    pub id: i64,
    pub subject_name: String,
    pub exam_date: NaiveDateTime,
    pub notes: Option<String>,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
}

impl ExamDate {
    /// Whole days until the exam, never negative
    pub fn days_remaining(&self, now: NaiveDateTime) -> i64 {
        (self.exam_date - now).num_days().max(0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct StudyGroup {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub invite_code: String,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct GroupMember {
    pub user_id: i64,
    pub username: String,
    pub joined_at: DateTime<Utc>,
}

/// A shared note as shown inside a group
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SharedNote {
    pub id: i64,
    pub note_id: i64,
    pub group_id: i64,
    pub shared_by: i64,
    pub shared_by_name: String,
    pub note_title: String,
    pub note_content: String,
    pub subject_name: String,
    pub shared_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}
