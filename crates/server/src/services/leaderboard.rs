use serde::Serialize;
use sqlx::SqliteConnection;

const POINTS_PER_NOTE: i64 = 10;
const POINTS_PER_SUBJECT: i64 = 5;
const POINTS_PER_MASTERED: i64 = 20;

pub fn score(notes: i64, subjects: i64, mastered: i64) -> i64 {
    notes * POINTS_PER_NOTE + subjects * POINTS_PER_SUBJECT + mastered * POINTS_PER_MASTERED
}

/// Raw per-user totals
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserTotals {
    pub user_id: i64,
    pub username: String,
    pub subject_count: i64,
    pub note_count: i64,
    pub mastered_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Standing {
    pub rank: usize,
    pub user_id: i64,
    pub username: String,
    pub subjects: i64,
    pub notes: i64,
    pub mastered: i64,
    pub score: i64,
    pub is_me: bool,
}

/// Totals for every user, in id order
pub async fn totals(conn: &mut SqliteConnection) -> sqlx::Result<Vec<UserTotals>> {
    sqlx::query_as::<_, UserTotals>(
        r#"
        SELECT u.id AS user_id, u.username,
            (SELECT COUNT(*) FROM subjects s WHERE s.user_id = u.id) AS subject_count,
            (SELECT COUNT(*) FROM notes n JOIN subjects s ON s.id = n.subject_id
                WHERE s.user_id = u.id) AS note_count,
            (SELECT COUNT(*) FROM notes n JOIN subjects s ON s.id = n.subject_id
                WHERE s.user_id = u.id AND n.progress = 'mastered') AS mastered_count
        FROM users u
        ORDER BY u.id
        "#,
    )
    .fetch_all(&mut *conn)
    .await
}

/// Highest score first. Ties keep their input order.
pub fn rank(totals: Vec<UserTotals>, me: i64) -> Vec<Standing> {
    let mut standings: Vec<Standing> = totals
        .into_iter()
        .map(|t| Standing {
            rank: 0,
            score: score(t.note_count, t.subject_count, t.mastered_count),
            is_me: t.user_id == me,
            user_id: t.user_id,
            username: t.username,
            subjects: t.subject_count,
            notes: t.note_count,
            mastered: t.mastered_count,
        })
        .collect();

    standings.sort_by(|a, b| b.score.cmp(&a.score));
    for (i, standing) in standings.iter_mut().enumerate() {
        standing.rank = i + 1;
    }

    standings
}

pub async fn leaderboard(conn: &mut SqliteConnection, me: i64) -> sqlx::Result<Vec<Standing>> {
    Ok(rank(totals(conn).await?, me))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{fixtures, models::Progress, notes, Database};

    fn totals_for(user_id: i64, subjects: i64, notes: i64, mastered: i64) -> UserTotals {
        UserTotals {
            user_id,
            username: format!("user{user_id}"),
            subject_count: subjects,
            note_count: notes,
            mastered_count: mastered,
        }
    }

    #[test]
    fn ties_keep_their_order() {
        let ranked = rank(
            vec![
                totals_for(1, 1, 0, 0),
                totals_for(2, 0, 3, 0),
                totals_for(3, 1, 0, 0),
            ],
            3,
        );

        let order: Vec<_> = ranked.iter().map(|s| (s.rank, s.user_id)).collect();
        assert_eq!(order, [(1, 2), (2, 1), (3, 3)]);
        assert!(ranked[2].is_me);
        assert!(!ranked[0].is_me);
    }

    #[tokio::test]
    async fn score_counts_notes_subjects_and_mastery() {
        let db = Database::in_memory().await;
        let mut conn = db.conn().await.unwrap();

        let ada = fixtures::user(&mut conn, "ada").await;
        fixtures::user(&mut conn, "bob").await;
        let math = fixtures::subject(&mut conn, &ada, "Math").await;
        let history = fixtures::subject(&mut conn, &ada, "History").await;
        let algebra = fixtures::note(&mut conn, &math, "Algebra").await;
        fixtures::note(&mut conn, &math, "Geometry").await;
        fixtures::note(&mut conn, &math, "Calculus").await;
        fixtures::note(&mut conn, &history, "Rome").await;
        fixtures::note(&mut conn, &history, "Greece").await;
        notes::set_progress(&mut conn, algebra.id, Progress::Mastered)
            .await
            .unwrap();

        let board = leaderboard(&mut conn, ada.id).await.unwrap();

        assert_eq!(board[0].username, "ada");
        assert_eq!(board[0].score, 80);
        assert_eq!(
            (board[0].subjects, board[0].notes, board[0].mastered),
            (2, 5, 1)
        );
        assert!(board[0].is_me);
        assert_eq!(board[1].score, 0);
        assert_eq!(board[1].rank, 2);
    }
}
