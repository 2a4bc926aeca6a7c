use crate::core::verification::{
    DayCounters, PendingVerification, VerificationOutcome, VerificationStore,
    VerificationStoreError,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Row, Sqlite};
use std::path::Path;

const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct SqliteVerificationStore {
    pool: Pool<Sqlite>,
}

impl SqliteVerificationStore {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Ensure the file exists if it's a file path
        let path_str = database_url.trim_start_matches("sqlite://");
        if !database_url.contains(":memory:") && !Path::new(path_str).exists() {
            if let Some(parent) = Path::new(path_str).parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::File::create(path_str)?;
        }

        let conn_str = if database_url.starts_with("sqlite:") {
            database_url.to_string()
        } else {
            format!("sqlite://{}", database_url)
        };

        let pool = SqlitePoolOptions::new().connect(&conn_str).await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS pending_verifications (
                user_id INTEGER NOT NULL,
                guild_id INTEGER NOT NULL,
                question_id TEXT NOT NULL,
                correct_index INTEGER NOT NULL,
                started_at TEXT NOT NULL,
                expires_at TEXT NOT NULL,
                PRIMARY KEY (guild_id, user_id)
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS verification_days (
                guild_id INTEGER NOT NULL,
                day TEXT NOT NULL,
                passed INTEGER NOT NULL DEFAULT 0,
                failed INTEGER NOT NULL DEFAULT 0,
                timed_out INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (guild_id, day)
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    fn backend_err(err: sqlx::Error) -> VerificationStoreError {
        VerificationStoreError::Backend(err.to_string())
    }

    fn row_to_pending(row: &sqlx::sqlite::SqliteRow) -> Result<PendingVerification, VerificationStoreError> {
        let started_at: String = row.get("started_at");
        let expires_at: String = row.get("expires_at");
        Ok(PendingVerification {
            user_id: row.get::<i64, _>("user_id") as u64,
            guild_id: row.get::<i64, _>("guild_id") as u64,
            question_id: row.get("question_id"),
            correct_index: row.get::<i64, _>("correct_index") as usize,
            started_at: parse_timestamp(&started_at)?,
            expires_at: parse_timestamp(&expires_at)?,
        })
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, VerificationStoreError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| VerificationStoreError::Backend(format!("bad timestamp {value}: {err}")))
}

fn parse_day(value: &str) -> Result<NaiveDate, VerificationStoreError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|err| VerificationStoreError::Backend(format!("bad date {value}: {err}")))
}

#[async_trait]
impl VerificationStore for SqliteVerificationStore {
    async fn put_pending(
        &self,
        record: PendingVerification,
    ) -> Result<(), VerificationStoreError> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO pending_verifications
                (user_id, guild_id, question_id, correct_index, started_at, expires_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.user_id as i64)
        .bind(record.guild_id as i64)
        .bind(&record.question_id)
        .bind(record.correct_index as i64)
        .bind(record.started_at.to_rfc3339())
        .bind(record.expires_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(Self::backend_err)?;
        Ok(())
    }

    async fn get_pending(
        &self,
        guild_id: u64,
        user_id: u64,
    ) -> Result<Option<PendingVerification>, VerificationStoreError> {
        let row = sqlx::query(
            "SELECT * FROM pending_verifications WHERE guild_id = ? AND user_id = ?",
        )
        .bind(guild_id as i64)
        .bind(user_id as i64)
        .fetch_optional(&self.pool)
        .await
        .map_err(Self::backend_err)?;

        row.as_ref().map(Self::row_to_pending).transpose()
    }

    async fn take_pending(
        &self,
        guild_id: u64,
        user_id: u64,
    ) -> Result<Option<PendingVerification>, VerificationStoreError> {
        let pending = self.get_pending(guild_id, user_id).await?;
        if pending.is_some() {
            sqlx::query("DELETE FROM pending_verifications WHERE guild_id = ? AND user_id = ?")
                .bind(guild_id as i64)
                .bind(user_id as i64)
                .execute(&self.pool)
                .await
                .map_err(Self::backend_err)?;
        }
        Ok(pending)
    }

    async fn record_outcome(
        &self,
        guild_id: u64,
        date: NaiveDate,
        outcome: VerificationOutcome,
    ) -> Result<(), VerificationStoreError> {
        let (passed, failed, timed_out) = match outcome {
            VerificationOutcome::Passed => (1, 0, 0),
            VerificationOutcome::Failed => (0, 1, 0),
            VerificationOutcome::TimedOut => (0, 0, 1),
        };

        sqlx::query(
            r#"
            INSERT INTO verification_days (guild_id, day, passed, failed, timed_out)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(guild_id, day) DO UPDATE SET
                passed = passed + excluded.passed,
                failed = failed + excluded.failed,
                timed_out = timed_out + excluded.timed_out
            "#,
        )
        .bind(guild_id as i64)
        .bind(date.format(DATE_FORMAT).to_string())
        .bind(passed)
        .bind(failed)
        .bind(timed_out)
        .execute(&self.pool)
        .await
        .map_err(Self::backend_err)?;
        Ok(())
    }

    async fn daily_counters(
        &self,
        guild_id: u64,
    ) -> Result<Vec<(NaiveDate, DayCounters)>, VerificationStoreError> {
        let rows = sqlx::query(
            "SELECT day, passed, failed, timed_out FROM verification_days WHERE guild_id = ? ORDER BY day",
        )
        .bind(guild_id as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(Self::backend_err)?;

        rows.iter()
            .map(|row| {
                let day: String = row.get("day");
                Ok((
                    parse_day(&day)?,
                    DayCounters {
                        passed: row.get::<i64, _>("passed") as u32,
                        failed: row.get::<i64, _>("failed") as u32,
                        timed_out: row.get::<i64, _>("timed_out") as u32,
                    },
                ))
            })
            .collect()
    }

    async fn evict_before(&self, cutoff: NaiveDate) -> Result<usize, VerificationStoreError> {
        let result = sqlx::query("DELETE FROM verification_days WHERE day < ?")
            .bind(cutoff.format(DATE_FORMAT).to_string())
            .execute(&self.pool)
            .await
            .map_err(Self::backend_err)?;
        Ok(result.rows_affected() as usize)
    }
}
