use chrono::Utc;
use sqlx::SqliteConnection;

use super::models::{GroupMember, SharedNote, StudyGroup};

#[derive(Debug)]
pub struct NewStudyGroup {
    pub name: String,
    pub description: Option<String>,
    pub invite_code: String,
    pub created_by: i64,
}

pub async fn by_id(conn: &mut SqliteConnection, id: i64) -> sqlx::Result<Option<StudyGroup>> {
    sqlx::query_as::<_, StudyGroup>("SELECT * FROM study_groups WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
}

pub async fn by_invite_code(
    conn: &mut SqliteConnection,
    code: &str,
) -> sqlx::Result<Option<StudyGroup>> {
    sqlx::query_as::<_, StudyGroup>("SELECT * FROM study_groups WHERE invite_code = ?")
        .bind(code)
        .fetch_optional(&mut *conn)
        .await
}

pub async fn invite_code_exists(conn: &mut SqliteConnection, code: &str) -> sqlx::Result<bool> {
    Ok(by_invite_code(conn, code).await?.is_some())
}

/// Groups the user belongs to or created
pub async fn for_user(conn: &mut SqliteConnection, user_id: i64) -> sqlx::Result<Vec<StudyGroup>> {
    sqlx::query_as::<_, StudyGroup>(
        r#"
        SELECT DISTINCT g.*
        FROM study_groups g
        LEFT JOIN group_members gm ON gm.group_id = g.id
        WHERE gm.user_id = ? OR g.created_by = ?
        ORDER BY g.created_at DESC
        "#,
    )
    .bind(user_id)
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await
}

/// Creates the group with its creator as the first member
pub async fn create(
    conn: &mut SqliteConnection,
    new_group: NewStudyGroup,
) -> sqlx::Result<StudyGroup> {
    let group = sqlx::query_as::<_, StudyGroup>(
        "INSERT INTO study_groups (name, description, invite_code, created_by, created_at) VALUES (?, ?, ?, ?, ?) RETURNING *",
    )
    .bind(&new_group.name)
    .bind(&new_group.description)
    .bind(&new_group.invite_code)
    .bind(new_group.created_by)
    .bind(Utc::now())
    .fetch_one(&mut *conn)
    .await?;

    add_member(conn, group.id, new_group.created_by).await?;

    Ok(group)
}

pub async fn is_member(
    conn: &mut SqliteConnection,
    group_id: i64,
    user_id: i64,
) -> sqlx::Result<bool> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM group_members WHERE group_id = ? AND user_id = ?",
    )
    .bind(group_id)
    .bind(user_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(count > 0)
}

pub async fn add_member(
    conn: &mut SqliteConnection,
    group_id: i64,
    user_id: i64,
) -> sqlx::Result<()> {
    sqlx::query("INSERT INTO group_members (group_id, user_id, joined_at) VALUES (?, ?, ?)")
        .bind(group_id)
        .bind(user_id)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Returns whether a membership was removed
pub async fn remove_member(
    conn: &mut SqliteConnection,
    group_id: i64,
    user_id: i64,
) -> sqlx::Result<bool> {
    let result = sqlx::query("DELETE FROM group_members WHERE group_id = ? AND user_id = ?")
        .bind(group_id)
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn members(conn: &mut SqliteConnection, group_id: i64) -> sqlx::Result<Vec<GroupMember>> {
    sqlx::query_as::<_, GroupMember>(
        r#"
        SELECT u.id AS user_id, u.username, gm.joined_at
        FROM group_members gm
        JOIN users u ON u.id = gm.user_id
        WHERE gm.group_id = ?
        ORDER BY gm.joined_at, u.username
        "#,
    )
    .bind(group_id)
    .fetch_all(&mut *conn)
    .await
}

pub async fn is_shared(
    conn: &mut SqliteConnection,
    group_id: i64,
    note_id: i64,
) -> sqlx::Result<bool> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM shared_notes WHERE group_id = ? AND note_id = ?",
    )
    .bind(group_id)
    .bind(note_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(count > 0)
}

pub async fn share_note(
    conn: &mut SqliteConnection,
    group_id: i64,
    note_id: i64,
    shared_by: i64,
) -> sqlx::Result<()> {
    sqlx::query(
        "INSERT INTO shared_notes (note_id, group_id, shared_by, shared_at) VALUES (?, ?, ?, ?)",
    )
    .bind(note_id)
    .bind(group_id)
    .bind(shared_by)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Newest first
pub async fn shared_notes(
    conn: &mut SqliteConnection,
    group_id: i64,
) -> sqlx::Result<Vec<SharedNote>> {
    sqlx::query_as::<_, SharedNote>(
        r#"
        SELECT sn.id, sn.note_id, sn.group_id, sn.shared_by, u.username AS shared_by_name,
            n.title AS note_title, n.content AS note_content, s.name AS subject_name, sn.shared_at
        FROM shared_notes sn
        JOIN notes n ON n.id = sn.note_id
        JOIN subjects s ON s.id = n.subject_id
        JOIN users u ON u.id = sn.shared_by
        WHERE sn.group_id = ?
        ORDER BY sn.shared_at DESC, sn.id DESC
        "#,
    )
    .bind(group_id)
    .fetch_all(&mut *conn)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{fixtures, users, Database};

    async fn group(conn: &mut SqliteConnection, creator: i64, code: &str) -> StudyGroup {
        create(
            conn,
            NewStudyGroup {
                name: "Night owls".to_string(),
                description: None,
                invite_code: code.to_string(),
                created_by: creator,
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn creator_is_the_first_member() {
        let db = Database::in_memory().await;
        let mut conn = db.conn().await.unwrap();
        let ada = fixtures::user(&mut conn, "ada").await;

        let group = group(&mut conn, ada.id, "ABCD1234").await;

        assert!(is_member(&mut conn, group.id, ada.id).await.unwrap());
        assert_eq!(members(&mut conn, group.id).await.unwrap().len(), 1);
        assert!(invite_code_exists(&mut conn, "ABCD1234").await.unwrap());
    }

    #[tokio::test]
    async fn groups_survive_their_creator() {
        let db = Database::in_memory().await;
        let mut conn = db.conn().await.unwrap();
        let ada = fixtures::user(&mut conn, "ada").await;
        let bob = fixtures::user(&mut conn, "bob").await;

        let group = group(&mut conn, ada.id, "ABCD1234").await;
        add_member(&mut conn, group.id, bob.id).await.unwrap();

        users::delete(&mut conn, ada.id).await.unwrap();

        let group = by_id(&mut conn, group.id).await.unwrap().unwrap();
        assert_eq!(group.created_by, None);
        let members = members(&mut conn, group.id).await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].username, "bob");
    }

    #[tokio::test]
    async fn shared_notes_list_their_note() {
        let db = Database::in_memory().await;
        let mut conn = db.conn().await.unwrap();
        let ada = fixtures::user(&mut conn, "ada").await;
        let math = fixtures::subject(&mut conn, &ada, "Math").await;
        let note = fixtures::note(&mut conn, &math, "Algebra").await;
        let group = group(&mut conn, ada.id, "ABCD1234").await;

        assert!(!is_shared(&mut conn, group.id, note.id).await.unwrap());
        share_note(&mut conn, group.id, note.id, ada.id).await.unwrap();
        assert!(is_shared(&mut conn, group.id, note.id).await.unwrap());

        let shared = shared_notes(&mut conn, group.id).await.unwrap();
        assert_eq!(shared.len(), 1);
        assert_eq!(shared[0].note_title, "Algebra");
        assert_eq!(shared[0].shared_by_name, "ada");
        assert_eq!(shared[0].subject_name, "Math");
    }
}
