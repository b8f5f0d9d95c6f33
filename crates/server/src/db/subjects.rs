use chrono::Utc;
use serde::Serialize;
use sqlx::SqliteConnection;

use super::models::Subject;

#[derive(Debug)]
pub struct NewSubject {
    pub name: String,
    pub description: Option<String>,
    pub color: String,
    pub user_id: i64,
}

#[derive(Debug)]
pub struct UpdatedSubject {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub color: String,
}

/// A subject with the number of notes it holds
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SubjectSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub subject: Subject,
    pub note_count: i64,
    pub mastered_count: i64,
}

const SELECT_SUMMARY: &str = r#"
    SELECT s.*,
        (SELECT COUNT(*) FROM notes n WHERE n.subject_id = s.id) AS note_count,
        (SELECT COUNT(*) FROM notes n WHERE n.subject_id = s.id AND n.progress = 'mastered') AS mastered_count
    FROM subjects s
"#;

pub async fn by_id(conn: &mut SqliteConnection, id: i64) -> sqlx::Result<Option<Subject>> {
    sqlx::query_as::<_, Subject>("SELECT * FROM subjects WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
}

/// Newest first
pub async fn for_user(
    conn: &mut SqliteConnection,
    user_id: i64,
) -> sqlx::Result<Vec<SubjectSummary>> {
    sqlx::query_as::<_, SubjectSummary>(&format!(
        "{SELECT_SUMMARY} WHERE s.user_id = ? ORDER BY s.created_at DESC, s.id DESC"
    ))
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await
}

pub async fn count_for_user(conn: &mut SqliteConnection, user_id: i64) -> sqlx::Result<i64> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM subjects WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await
}

/// Case-insensitive substring match on name or description
pub async fn search(
    conn: &mut SqliteConnection,
    user_id: i64,
    pattern: &str,
) -> sqlx::Result<Vec<Subject>> {
    sqlx::query_as::<_, Subject>(
        r#"
        SELECT * FROM subjects
        WHERE user_id = ?
            AND (name LIKE ? ESCAPE '\' OR description LIKE ? ESCAPE '\')
        ORDER BY created_at DESC
        "#,
    )
    .bind(user_id)
    .bind(pattern)
    .bind(pattern)
    .fetch_all(&mut *conn)
    .await
}

pub async fn create(conn: &mut SqliteConnection, new_subject: NewSubject) -> sqlx::Result<Subject> {
    sqlx::query_as::<_, Subject>(
        "INSERT INTO subjects (name, description, color, user_id, created_at) VALUES (?, ?, ?, ?, ?) RETURNING *",
    )
    .bind(&new_subject.name)
    .bind(&new_subject.description)
    .bind(&new_subject.color)
    .bind(new_subject.user_id)
    .bind(Utc::now())
    .fetch_one(&mut *conn)
    .await
}

pub async fn update(conn: &mut SqliteConnection, updated: UpdatedSubject) -> sqlx::Result<Subject> {
    sqlx::query_as::<_, Subject>(
        "UPDATE subjects SET name = ?, description = ?, color = ? WHERE id = ? RETURNING *",
    )
    .bind(&updated.name)
    .bind(&updated.description)
    .bind(&updated.color)
    .bind(updated.id)
    .fetch_one(&mut *conn)
    .await
}

/// Deletes the subject and its notes, returning how many notes went with it
pub async fn delete(conn: &mut SqliteConnection, id: i64) -> sqlx::Result<i64> {
    let note_count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM notes WHERE subject_id = ?")
        .bind(id)
        .fetch_one(&mut *conn)
        .await?;

    sqlx::query("DELETE FROM subjects WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    Ok(note_count)
}

/// Wraps user input in `%…%` for LIKE, escaping wildcards
pub fn like_pattern(query: &str) -> String {
    let escaped = query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{fixtures, notes, Database};

    #[tokio::test]
    async fn deleting_a_subject_removes_its_notes() {
        let db = Database::in_memory().await;
        let mut conn = db.conn().await.unwrap();

        let user = fixtures::user(&mut conn, "ada").await;
        let math = fixtures::subject(&mut conn, &user, "Math").await;
        let history = fixtures::subject(&mut conn, &user, "History").await;
        let algebra = fixtures::note(&mut conn, &math, "Algebra").await;
        fixtures::note(&mut conn, &math, "Geometry").await;
        let rome = fixtures::note(&mut conn, &history, "Rome").await;

        assert_eq!(delete(&mut conn, math.id).await.unwrap(), 2);

        assert!(by_id(&mut conn, math.id).await.unwrap().is_none());
        assert!(notes::by_id(&mut conn, algebra.id).await.unwrap().is_none());
        assert!(notes::by_id(&mut conn, rome.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn summaries_count_notes() {
        let db = Database::in_memory().await;
        let mut conn = db.conn().await.unwrap();

        let user = fixtures::user(&mut conn, "ada").await;
        let math = fixtures::subject(&mut conn, &user, "Math").await;
        let algebra = fixtures::note(&mut conn, &math, "Algebra").await;
        fixtures::note(&mut conn, &math, "Geometry").await;
        notes::set_progress(&mut conn, algebra.id, crate::db::models::Progress::Mastered)
            .await
            .unwrap();

        let summaries = for_user(&mut conn, user.id).await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].note_count, 2);
        assert_eq!(summaries[0].mastered_count, 1);
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("50%"), "%50\\%%");
        assert_eq!(like_pattern("a_b"), "%a\\_b%");
        assert_eq!(like_pattern("plain"), "%plain%");
    }
}
