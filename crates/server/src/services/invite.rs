use rand::{thread_rng, Rng};
use sqlx::SqliteConnection;

use crate::db::groups;

const INVITE_CODE_LENGTH: usize = 8;
const INVITE_CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Eight random uppercase letters and digits
pub fn generate_invite_code() -> String {
    let mut rng = thread_rng();

    std::iter::repeat(())
        .map(|_| INVITE_CODE_CHARSET[rng.gen_range(0..INVITE_CODE_CHARSET.len())] as char)
        .take(INVITE_CODE_LENGTH)
        .collect()
}

/// An invite code no existing group uses
pub async fn fresh_invite_code(conn: &mut SqliteConnection) -> sqlx::Result<String> {
    fresh_invite_code_with(conn, generate_invite_code).await
}

pub async fn fresh_invite_code_with(
    conn: &mut SqliteConnection,
    mut generate: impl FnMut() -> String,
) -> sqlx::Result<String> {
    loop {
        let code = generate();
        if !groups::invite_code_exists(conn, &code).await? {
            return Ok(code);
        }
        tracing::debug!(code = %code, "invite code collision, generating another");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{fixtures, groups::NewStudyGroup, Database};

    #[test]
    fn codes_are_uppercase_alphanumeric() {
        for _ in 0..50 {
            let code = generate_invite_code();
            assert_eq!(code.len(), 8);
            assert!(code
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        }
    }

    #[tokio::test]
    async fn codes_in_use_are_skipped() {
        let db = Database::in_memory().await;
        let mut conn = db.conn().await.unwrap();
        let ada = fixtures::user(&mut conn, "ada").await;

        groups::create(
            &mut conn,
            NewStudyGroup {
                name: "Night owls".to_string(),
                description: None,
                invite_code: "TAKEN123".to_string(),
                created_by: ada.id,
            },
        )
        .await
        .unwrap();

        let mut candidates = vec!["FRESH456", "TAKEN123", "TAKEN123"];
        let code = fresh_invite_code_with(&mut conn, || candidates.pop().unwrap().to_string())
            .await
            .unwrap();

        assert_eq!(code, "FRESH456");
        assert!(candidates.is_empty());
    }
}
