pub mod exams;
pub mod groups;
pub mod models;
pub mod notes;
pub mod notifications;
pub mod subjects;
pub mod users;

use std::str::FromStr;

use sqlx::{
    pool::PoolConnection,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Sqlite, SqlitePool, Transaction,
};

#[derive(Clone)]
pub struct Database {
    pub pool: SqlitePool,
}

impl Database {
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        // Ensure the data directory exists
        if let Some(path) = url.strip_prefix("sqlite:") {
            let path = path.split('?').next().unwrap_or(path);
            if !path.starts_with(':') {
                if let Some(parent) = std::path::Path::new(path).parent() {
                    std::fs::create_dir_all(parent)?;
                }
            }
        }

        let options = SqliteConnectOptions::from_str(url)?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Opens the unit of work for one request. Dropping it without
    /// `commit` rolls everything back.
    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>, sqlx::Error> {
        self.pool.begin().await
    }

    /// A plain connection for read-only handlers
    pub async fn conn(&self) -> Result<PoolConnection<Sqlite>, sqlx::Error> {
        self.pool.acquire().await
    }
}

#[cfg(test)]
impl Database {
    /// A migrated in-memory database. A single connection that never expires,
    /// otherwise every new connection would see an empty database.
    pub async fn in_memory() -> Self {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .expect("valid url")
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .expect("in-memory database");

        let db = Self { pool };
        db.run_migrations().await.expect("migrations apply");
        db
    }
}

#[cfg(test)]
pub mod fixtures {
    use sqlx::SqliteConnection;

    use super::{
        models::{Note, Subject, User},
        notes::{self, NewNote},
        subjects::{self, NewSubject},
        users::{self, NewUser},
    };

    pub async fn user(conn: &mut SqliteConnection, username: &str) -> User {
        users::create(
            conn,
            NewUser {
                username: username.to_string(),
                email: format!("{username}@example.com"),
                password_hash: "not-a-real-hash".to_string(),
            },
        )
        .await
        .expect("user is created")
    }

    pub async fn subject(conn: &mut SqliteConnection, owner: &User, name: &str) -> Subject {
        subjects::create(
            conn,
            NewSubject {
                name: name.to_string(),
                description: None,
                color: "#0d6efd".to_string(),
                user_id: owner.id,
            },
        )
        .await
        .expect("subject is created")
    }

    pub async fn note(conn: &mut SqliteConnection, subject: &Subject, title: &str) -> Note {
        notes::create(
            conn,
            NewNote {
                title: title.to_string(),
                content: format!("Content of {title}"),
                subject_id: subject.id,
            },
        )
        .await
        .expect("note is created")
    }
}
