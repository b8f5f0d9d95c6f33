use chrono::Utc;
use sqlx::SqliteConnection;

use super::models::User;

#[derive(Debug)]
pub struct NewUser {
    pub username: String,
    /// Stored lowercased
    pub email: String,
    pub password_hash: String,
}

pub async fn by_id(conn: &mut SqliteConnection, id: i64) -> sqlx::Result<Option<User>> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
}

/// Case-insensitive lookup
pub async fn by_email(conn: &mut SqliteConnection, email: &str) -> sqlx::Result<Option<User>> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ? COLLATE NOCASE")
        .bind(email.trim())
        .fetch_optional(&mut *conn)
        .await
}

pub async fn username_taken(conn: &mut SqliteConnection, username: &str) -> sqlx::Result<bool> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE username = ?")
        .bind(username)
        .fetch_one(&mut *conn)
        .await?;
    Ok(count > 0)
}

pub async fn email_taken(conn: &mut SqliteConnection, email: &str) -> sqlx::Result<bool> {
    Ok(by_email(conn, email).await?.is_some())
}

pub async fn create(conn: &mut SqliteConnection, new_user: NewUser) -> sqlx::Result<User> {
    sqlx::query_as::<_, User>(
        "INSERT INTO users (username, email, password_hash, created_at) VALUES (?, ?, ?, ?) RETURNING *",
    )
    .bind(&new_user.username)
    .bind(new_user.email.trim().to_lowercase())
    .bind(&new_user.password_hash)
    .bind(Utc::now())
    .fetch_one(&mut *conn)
    .await
}

pub async fn rename(conn: &mut SqliteConnection, id: i64, username: &str) -> sqlx::Result<()> {
    sqlx::query("UPDATE users SET username = ? WHERE id = ?")
        .bind(username)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Removes the account; subjects, notes, exams, notifications and
/// memberships go with it.
pub async fn delete(conn: &mut SqliteConnection, id: i64) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{fixtures, Database};

    #[tokio::test]
    async fn email_lookup_ignores_case() {
        let db = Database::in_memory().await;
        let mut conn = db.conn().await.unwrap();

        let user = create(
            &mut conn,
            NewUser {
                username: "ada".to_string(),
                email: "Ada@Example.COM".to_string(),
                password_hash: "hash".to_string(),
            },
        )
        .await
        .unwrap();

        assert_eq!(user.email, "ada@example.com");
        assert!(email_taken(&mut conn, "ADA@example.com").await.unwrap());
        assert!(!email_taken(&mut conn, "bob@example.com").await.unwrap());
    }

    #[tokio::test]
    async fn usernames_are_unique_in_the_schema() {
        let db = Database::in_memory().await;
        let mut conn = db.conn().await.unwrap();

        fixtures::user(&mut conn, "ada").await;
        assert!(username_taken(&mut conn, "ada").await.unwrap());

        let duplicate = create(
            &mut conn,
            NewUser {
                username: "ada".to_string(),
                email: "other@example.com".to_string(),
                password_hash: "hash".to_string(),
            },
        )
        .await;
        assert!(duplicate.is_err());
    }
}
