use chrono::Utc;
use sqlx::SqliteConnection;

use super::models::{Note, Progress};

#[derive(Debug)]
pub struct NewNote {
    pub title: String,
    pub content: String,
    pub subject_id: i64,
}

const SELECT_NOTE: &str = r#"
    SELECT n.id, n.title, n.content, n.is_pinned, n.progress, n.color, n.subject_id,
        s.name AS subject_name, s.user_id AS owner_id, n.created_at, n.updated_at
    FROM notes n
    JOIN subjects s ON s.id = n.subject_id
"#;

pub async fn by_id(conn: &mut SqliteConnection, id: i64) -> sqlx::Result<Option<Note>> {
    sqlx::query_as::<_, Note>(&format!("{SELECT_NOTE} WHERE n.id = ?"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
}

/// Pinned notes first, then most recently updated
pub async fn in_subject(conn: &mut SqliteConnection, subject_id: i64) -> sqlx::Result<Vec<Note>> {
    sqlx::query_as::<_, Note>(&format!(
        "{SELECT_NOTE} WHERE n.subject_id = ? ORDER BY n.is_pinned DESC, n.updated_at DESC"
    ))
    .bind(subject_id)
    .fetch_all(&mut *conn)
    .await
}

/// Every note the user owns, most recently updated first
pub async fn for_user(conn: &mut SqliteConnection, user_id: i64) -> sqlx::Result<Vec<Note>> {
    sqlx::query_as::<_, Note>(&format!(
        "{SELECT_NOTE} WHERE s.user_id = ? ORDER BY n.updated_at DESC"
    ))
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await
}

pub async fn recent_for_user(
    conn: &mut SqliteConnection,
    user_id: i64,
    limit: i64,
) -> sqlx::Result<Vec<Note>> {
    sqlx::query_as::<_, Note>(&format!(
        "{SELECT_NOTE} WHERE s.user_id = ? ORDER BY n.updated_at DESC LIMIT ?"
    ))
    .bind(user_id)
    .bind(limit)
    .fetch_all(&mut *conn)
    .await
}

pub async fn count_for_user(conn: &mut SqliteConnection, user_id: i64) -> sqlx::Result<i64> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM notes n JOIN subjects s ON s.id = n.subject_id WHERE s.user_id = ?",
    )
    .bind(user_id)
    .fetch_one(&mut *conn)
    .await
}

/// Case-insensitive substring match on title or content
pub async fn search(
    conn: &mut SqliteConnection,
    user_id: i64,
    pattern: &str,
) -> sqlx::Result<Vec<Note>> {
    sqlx::query_as::<_, Note>(&format!(
        r#"{SELECT_NOTE}
        WHERE s.user_id = ?
            AND (n.title LIKE ? ESCAPE '\' OR n.content LIKE ? ESCAPE '\')
        ORDER BY n.updated_at DESC"#
    ))
    .bind(user_id)
    .bind(pattern)
    .bind(pattern)
    .fetch_all(&mut *conn)
    .await
}

pub async fn create(conn: &mut SqliteConnection, new_note: NewNote) -> sqlx::Result<Note> {
    let now = Utc::now();
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO notes (title, content, subject_id, created_at, updated_at) VALUES (?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(&new_note.title)
    .bind(&new_note.content)
    .bind(new_note.subject_id)
    .bind(now)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;

    fetch_existing(conn, id).await
}

pub async fn update(
    conn: &mut SqliteConnection,
    id: i64,
    title: &str,
    content: &str,
) -> sqlx::Result<Note> {
    sqlx::query("UPDATE notes SET title = ?, content = ?, updated_at = ? WHERE id = ?")
        .bind(title)
        .bind(content)
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *conn)
        .await?;

    fetch_existing(conn, id).await
}

/// Flips the pin and returns the new state
pub async fn toggle_pin(conn: &mut SqliteConnection, id: i64) -> sqlx::Result<bool> {
    sqlx::query_scalar::<_, bool>(
        "UPDATE notes SET is_pinned = NOT is_pinned WHERE id = ? RETURNING is_pinned",
    )
    .bind(id)
    .fetch_one(&mut *conn)
    .await
}

pub async fn set_progress(
    conn: &mut SqliteConnection,
    id: i64,
    progress: Progress,
) -> sqlx::Result<()> {
    sqlx::query("UPDATE notes SET progress = ? WHERE id = ?")
        .bind(progress)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn set_color(conn: &mut SqliteConnection, id: i64, color: &str) -> sqlx::Result<()> {
    sqlx::query("UPDATE notes SET color = ? WHERE id = ?")
        .bind(color)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn delete(conn: &mut SqliteConnection, id: i64) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM notes WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn fetch_existing(conn: &mut SqliteConnection, id: i64) -> sqlx::Result<Note> {
    by_id(conn, id).await?.ok_or(sqlx::Error::RowNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{fixtures, Database};

    #[tokio::test]
    async fn notes_carry_their_owner() {
        let db = Database::in_memory().await;
        let mut conn = db.conn().await.unwrap();

        let user = fixtures::user(&mut conn, "ada").await;
        let math = fixtures::subject(&mut conn, &user, "Math").await;
        let note = fixtures::note(&mut conn, &math, "Algebra").await;

        assert_eq!(note.owner_id, user.id);
        assert_eq!(note.subject_name, "Math");
        assert_eq!(note.progress, Progress::Unread);
        assert!(!note.is_pinned);
    }

    #[tokio::test]
    async fn pinned_notes_come_first() {
        let db = Database::in_memory().await;
        let mut conn = db.conn().await.unwrap();

        let user = fixtures::user(&mut conn, "ada").await;
        let math = fixtures::subject(&mut conn, &user, "Math").await;
        let first = fixtures::note(&mut conn, &math, "First").await;
        fixtures::note(&mut conn, &math, "Second").await;

        assert!(toggle_pin(&mut conn, first.id).await.unwrap());

        let listed = in_subject(&mut conn, math.id).await.unwrap();
        assert_eq!(listed[0].id, first.id);

        assert!(!toggle_pin(&mut conn, first.id).await.unwrap());
    }

    #[tokio::test]
    async fn schema_rejects_unknown_progress() {
        let db = Database::in_memory().await;
        let mut conn = db.conn().await.unwrap();

        let user = fixtures::user(&mut conn, "ada").await;
        let math = fixtures::subject(&mut conn, &user, "Math").await;
        let note = fixtures::note(&mut conn, &math, "Algebra").await;

        let result = sqlx::query("UPDATE notes SET progress = 'done' WHERE id = ?")
            .bind(note.id)
            .execute(&mut *conn)
            .await;
        assert!(result.is_err());

        let stored = by_id(&mut conn, note.id).await.unwrap().unwrap();
        assert_eq!(stored.progress, Progress::Unread);
    }

    #[tokio::test]
    async fn search_is_scoped_to_the_owner() {
        let db = Database::in_memory().await;
        let mut conn = db.conn().await.unwrap();

        let ada = fixtures::user(&mut conn, "ada").await;
        let bob = fixtures::user(&mut conn, "bob").await;
        let ada_math = fixtures::subject(&mut conn, &ada, "Math").await;
        let bob_math = fixtures::subject(&mut conn, &bob, "Math").await;
        fixtures::note(&mut conn, &ada_math, "Algebra basics").await;
        fixtures::note(&mut conn, &bob_math, "Algebra advanced").await;

        let found = search(&mut conn, ada.id, "%ALGEBRA%").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Algebra basics");
    }
}
