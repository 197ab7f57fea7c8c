//! Job posting storage.

use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqlitePool;

/// Lifecycle state of a job posting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Open,
    Closed,
    Filled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Open => "open",
            JobStatus::Closed => "closed",
            JobStatus::Filled => "filled",
        }
    }

    pub fn from_db(s: &str) -> Self {
        match s {
            "closed" => JobStatus::Closed,
            "filled" => JobStatus::Filled,
            _ => JobStatus::Open,
        }
    }

    /// Filled postings are terminal; open and closed can move between each other.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Open, JobStatus::Closed)
                | (JobStatus::Open, JobStatus::Filled)
                | (JobStatus::Closed, JobStatus::Open)
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Job {
    pub uuid: String,
    pub title: String,
    pub location: String,
    pub description: String,
    pub status: JobStatus,
    pub created_by: String,
    pub created_at: String,
}

#[derive(sqlx::FromRow)]
struct JobRow {
    uuid: String,
    title: String,
    location: String,
    description: String,
    status: String,
    created_by: String,
    created_at: String,
}

impl From<JobRow> for Job {
    fn from(row: JobRow) -> Self {
        Self {
            uuid: row.uuid,
            title: row.title,
            location: row.location,
            description: row.description,
            status: JobStatus::from_db(&row.status),
            created_by: row.created_by,
            created_at: row.created_at,
        }
    }
}

pub struct NewJob<'a> {
    pub uuid: &'a str,
    pub title: &'a str,
    pub location: &'a str,
    pub description: &'a str,
    pub created_by: &'a str,
}

const JOB_COLUMNS: &str = "uuid, title, location, description, status, created_by, created_at";

pub struct JobStore {
    pool: SqlitePool,
}

impl JobStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, job: NewJob<'_>) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO jobs (uuid, title, location, description, created_by) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(job.uuid)
        .bind(job.title)
        .bind(job.location)
        .bind(job.description)
        .bind(job.created_by)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_by_uuid(&self, uuid: &str) -> Result<Option<Job>, sqlx::Error> {
        let row: Option<JobRow> =
            sqlx::query_as(&format!("SELECT {JOB_COLUMNS} FROM jobs WHERE uuid = ?"))
                .bind(uuid)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(Job::from))
    }

    /// List postings with the given status, newest first.
    pub async fn list_by_status(&self, status: JobStatus) -> Result<Vec<Job>, sqlx::Error> {
        let rows: Vec<JobRow> = sqlx::query_as(&format!(
            "SELECT {JOB_COLUMNS} FROM jobs WHERE status = ? ORDER BY id DESC"
        ))
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Job::from).collect())
    }

    /// Move a posting from `from` to `to`. Returns false if the status changed concurrently.
    pub async fn update_status(
        &self,
        uuid: &str,
        from: JobStatus,
        to: JobStatus,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE jobs SET status = ? WHERE uuid = ? AND status = ?")
            .bind(to.as_str())
            .bind(uuid)
            .bind(from.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete(&self, uuid: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM jobs WHERE uuid = ?")
            .bind(uuid)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
