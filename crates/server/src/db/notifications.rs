use chrono::Utc;
use sqlx::SqliteConnection;

use super::models::Notification;

pub async fn by_id(conn: &mut SqliteConnection, id: i64) -> sqlx::Result<Option<Notification>> {
    sqlx::query_as::<_, Notification>("SELECT * FROM notifications WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
}

/// Newest first
pub async fn for_user(
    conn: &mut SqliteConnection,
    user_id: i64,
) -> sqlx::Result<Vec<Notification>> {
    sqlx::query_as::<_, Notification>(
        "SELECT * FROM notifications WHERE user_id = ? ORDER BY created_at DESC, id DESC",
    )
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await
}

pub async fn unread_count(conn: &mut SqliteConnection, user_id: i64) -> sqlx::Result<i64> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM notifications WHERE user_id = ? AND is_read = 0",
    )
    .bind(user_id)
    .fetch_one(&mut *conn)
    .await
}

pub async fn create(
    conn: &mut SqliteConnection,
    user_id: i64,
    title: &str,
    message: &str,
) -> sqlx::Result<()> {
    sqlx::query(
        "INSERT INTO notifications (user_id, title, message, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(user_id)
    .bind(title)
    .bind(message)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn mark_read(conn: &mut SqliteConnection, id: i64) -> sqlx::Result<()> {
    sqlx::query("UPDATE notifications SET is_read = 1 WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Returns how many notifications changed
pub async fn mark_all_read(conn: &mut SqliteConnection, user_id: i64) -> sqlx::Result<u64> {
    let result = sqlx::query("UPDATE notifications SET is_read = 1 WHERE user_id = ? AND is_read = 0")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{fixtures, Database};

    #[tokio::test]
    async fn read_state_is_per_user() {
        let db = Database::in_memory().await;
        let mut conn = db.conn().await.unwrap();
        let ada = fixtures::user(&mut conn, "ada").await;
        let bob = fixtures::user(&mut conn, "bob").await;

        create(&mut conn, ada.id, "First", "one").await.unwrap();
        create(&mut conn, ada.id, "Second", "two").await.unwrap();
        create(&mut conn, bob.id, "Other", "three").await.unwrap();

        let inbox = for_user(&mut conn, ada.id).await.unwrap();
        let titles: Vec<_> = inbox.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, ["Second", "First"]);

        mark_read(&mut conn, inbox[0].id).await.unwrap();
        assert_eq!(unread_count(&mut conn, ada.id).await.unwrap(), 1);

        assert_eq!(mark_all_read(&mut conn, ada.id).await.unwrap(), 1);
        assert_eq!(mark_all_read(&mut conn, ada.id).await.unwrap(), 0);
        assert_eq!(unread_count(&mut conn, ada.id).await.unwrap(), 0);
        assert_eq!(unread_count(&mut conn, bob.id).await.unwrap(), 1);
    }
}
