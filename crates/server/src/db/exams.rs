use chrono::{NaiveDateTime, Utc};
use sqlx::SqliteConnection;

use super::models::ExamDate;

#[derive(Debug)]
pub struct NewExamDate {
    pub subject_name: String,
    pub exam_date: NaiveDateTime,
    pub notes: Option<String>,
    pub user_id: i64,
}

pub async fn by_id(conn: &mut SqliteConnection, id: i64) -> sqlx::Result<Option<ExamDate>> {
    sqlx::query_as::<_, ExamDate>("SELECT * FROM exam_dates WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
}

/// Soonest first
pub async fn for_user(conn: &mut SqliteConnection, user_id: i64) -> sqlx::Result<Vec<ExamDate>> {
    sqlx::query_as::<_, ExamDate>("SELECT * FROM exam_dates WHERE user_id = ? ORDER BY exam_date")
        .bind(user_id)
        .fetch_all(&mut *conn)
        .await
}

pub async fn upcoming_for_user(
    conn: &mut SqliteConnection,
    user_id: i64,
    after: NaiveDateTime,
    limit: i64,
) -> sqlx::Result<Vec<ExamDate>> {
    sqlx::query_as::<_, ExamDate>(
        "SELECT * FROM exam_dates WHERE user_id = ? AND exam_date >= ? ORDER BY exam_date LIMIT ?",
    )
    .bind(user_id)
    .bind(after)
    .bind(limit)
    .fetch_all(&mut *conn)
    .await
}

pub async fn create(conn: &mut SqliteConnection, new_exam: NewExamDate) -> sqlx::Result<ExamDate> {
    sqlx::query_as::<_, ExamDate>(
        "INSERT INTO exam_dates (subject_name, exam_date, notes, user_id, created_at) VALUES (?, ?, ?, ?, ?) RETURNING *",
    )
    .bind(&new_exam.subject_name)
    .bind(new_exam.exam_date)
    .bind(&new_exam.notes)
    .bind(new_exam.user_id)
    .bind(Utc::now())
    .fetch_one(&mut *conn)
    .await
}

pub async fn delete(conn: &mut SqliteConnection, id: i64) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM exam_dates WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{fixtures, Database};
    use chrono::NaiveDate;

    fn date(m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, m, d)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    #[tokio::test]
    async fn exams_are_listed_soonest_first() {
        let db = Database::in_memory().await;
        let mut conn = db.conn().await.unwrap();
        let user = fixtures::user(&mut conn, "ada").await;

        for (name, when) in [("Physics", date(5, 2)), ("Math", date(3, 15))] {
            create(
                &mut conn,
                NewExamDate {
                    subject_name: name.to_string(),
                    exam_date: when,
                    notes: None,
                    user_id: user.id,
                },
            )
            .await
            .unwrap();
        }

        let exams = for_user(&mut conn, user.id).await.unwrap();
        let names: Vec<_> = exams.iter().map(|e| e.subject_name.as_str()).collect();
        assert_eq!(names, ["Math", "Physics"]);

        let upcoming = upcoming_for_user(&mut conn, user.id, date(4, 1), 5)
            .await
            .unwrap();
        assert_eq!(upcoming.len(), 1);
        assert_eq!(upcoming[0].subject_name, "Physics");
    }
}
