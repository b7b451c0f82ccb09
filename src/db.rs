use anyhow::anyhow;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::models::{Job, JobPatch, JobStatus, NewJob};

pub struct Database {
    conn: Connection,
    path: PathBuf,
}

impl Database {
    pub fn open() -> anyhow::Result<Self> {
        let path = Self::default_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&path)?;
        Ok(Self { conn, path })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn,
            path: PathBuf::from(":memory:"),
        })
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn default_path() -> anyhow::Result<PathBuf> {
        // Use XDG data directory or fallback
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "pursuit") {
            Ok(proj_dirs.data_dir().join("pursuit.db"))
        } else {
            // Fallback to current directory
            Ok(PathBuf::from("pursuit.db"))
        }
    }

    pub fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS jobs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                company TEXT NOT NULL,
                location TEXT,
                description TEXT,
                url TEXT NOT NULL,
                source TEXT,
                salary TEXT,
                experience_level TEXT NOT NULL DEFAULT 'mid'
                    CHECK (experience_level IN ('junior', 'mid', 'senior')),
                status TEXT NOT NULL DEFAULT 'new'
                    CHECK (status IN ('new', 'reviewed', 'tailoring', 'applied', 'interviewing', 'rejected', 'offer')),
                posted_date TEXT,
                applied_date TEXT,
                next_action TEXT,
                next_action_date TEXT,
                notes TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX IF NOT EXISTS idx_jobs_status ON jobs(status);
            CREATE INDEX IF NOT EXISTS idx_jobs_applied ON jobs(applied_date);
            "#,
        )?;
        Ok(())
    }

    pub fn ensure_initialized(&self) -> anyhow::Result<()> {
        let tables: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='jobs'",
            [],
            |row| row.get(0),
        )?;
        if tables == 0 {
            return Err(anyhow!("Database not initialized. Run 'pursuit init' first."));
        }
        Ok(())
    }

    pub fn create_job(&self, new: &NewJob) -> Result<Job> {
        new.validate()?;

        let posted_date = new.posted_date.unwrap_or_else(Utc::now);
        let level = new.experience_level.unwrap_or_default();

        self.conn.execute(
            "INSERT INTO jobs (title, company, location, description, url, source, salary, experience_level, posted_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                new.title.trim(),
                new.company.trim(),
                new.location,
                new.description,
                new.url.trim(),
                new.source,
                new.salary,
                level.as_str(),
                posted_date,
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        self.get_job(id)?.ok_or(Error::NotFound(id))
    }

    pub fn get_job(&self, id: i64) -> Result<Option<Job>> {
        let result = self.conn.query_row(
            &format!("{SELECT_JOB} WHERE id = ?1"),
            [id],
            Self::row_to_job,
        );
        match result {
            Ok(job) => Ok(Some(job)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn list_jobs(&self, status: Option<JobStatus>) -> Result<Vec<Job>> {
        let mut sql = String::from(SELECT_JOB);
        if status.is_some() {
            sql.push_str(" WHERE status = ?1");
        }
        sql.push_str(" ORDER BY created_at DESC, id DESC");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = if let Some(s) = status {
            stmt.query_map([s.as_str()], Self::row_to_job)?
        } else {
            stmt.query_map([], Self::row_to_job)?
        };

        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    /// Applies annotation edits. Unset fields are left as they are.
    pub fn update_job(&self, id: i64, patch: &JobPatch) -> Result<Job> {
        if patch.is_empty() {
            return self.get_job(id)?.ok_or(Error::NotFound(id));
        }

        let mut sets: Vec<&str> = Vec::new();
        let mut values: Vec<&dyn rusqlite::ToSql> = Vec::new();

        if let Some(next_action) = &patch.next_action {
            sets.push("next_action = ?");
            values.push(next_action);
        }
        if let Some(next_action_date) = &patch.next_action_date {
            sets.push("next_action_date = ?");
            values.push(next_action_date);
        }
        if let Some(notes) = &patch.notes {
            sets.push("notes = ?");
            values.push(notes);
        }

        let sql = format!(
            "UPDATE jobs SET {}, updated_at = datetime('now') WHERE id = ?",
            sets.join(", ")
        );
        values.push(&id);

        let changed = self.conn.execute(&sql, values.as_slice())?;
        if changed == 0 {
            return Err(Error::NotFound(id));
        }
        self.get_job(id)?.ok_or(Error::NotFound(id))
    }

    /// Moves a job through the status pipeline, stamping `applied_date` on
    /// the first transition into `applied` (see [`Job::apply_status`]).
    pub fn set_status(&self, id: i64, status: JobStatus) -> Result<Job> {
        let mut job = self.get_job(id)?.ok_or(Error::NotFound(id))?;
        job.apply_status(status, Utc::now());

        self.conn.execute(
            "UPDATE jobs SET status = ?1, applied_date = ?2, updated_at = datetime('now') WHERE id = ?3",
            params![job.status.as_str(), job.applied_date, id],
        )?;
        self.get_job(id)?.ok_or(Error::NotFound(id))
    }

    pub fn delete_job(&self, id: i64) -> Result<()> {
        let changed = self.conn.execute("DELETE FROM jobs WHERE id = ?1", [id])?;
        if changed == 0 {
            return Err(Error::NotFound(id));
        }
        Ok(())
    }

    /// Counts per status, zero-filled so every pipeline stage is reported.
    pub fn count_by_status(&self) -> Result<Vec<(JobStatus, i64)>> {
        let mut counts: Vec<(JobStatus, i64)> =
            JobStatus::ALL.iter().map(|s| (*s, 0)).collect();

        let mut stmt = self
            .conn
            .prepare("SELECT status, COUNT(*) FROM jobs GROUP BY status")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        for row in rows {
            let (status, count) = row?;
            if let Ok(status) = status.parse::<JobStatus>() {
                if let Some(entry) = counts.iter_mut().find(|(s, _)| *s == status) {
                    entry.1 = count;
                }
            }
        }
        Ok(counts)
    }

    /// Number of jobs whose application was stamped at or after `cutoff`.
    pub fn applied_since(&self, cutoff: DateTime<Utc>) -> Result<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM jobs
             WHERE applied_date IS NOT NULL AND datetime(applied_date) >= datetime(?1)",
            params![cutoff],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Duplicate check used when persisting search or scrape results: same
    /// url, or same title at the same company.
    pub fn job_exists(&self, title: &str, company: &str, url: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM jobs
             WHERE url = ?3 OR (LOWER(title) = LOWER(?1) AND LOWER(company) = LOWER(?2))",
            params![title, company, url],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn row_to_job(row: &rusqlite::Row) -> rusqlite::Result<Job> {
        let level: String = row.get(8)?;
        let level = level.parse().map_err(|e: Error| {
            rusqlite::Error::FromSqlConversionFailure(8, rusqlite::types::Type::Text, Box::new(e))
        })?;
        let status: String = row.get(9)?;
        let status = status.parse().map_err(|e: Error| {
            rusqlite::Error::FromSqlConversionFailure(9, rusqlite::types::Type::Text, Box::new(e))
        })?;

        Ok(Job {
            id: row.get(0)?,
            title: row.get(1)?,
            company: row.get(2)?,
            location: row.get(3)?,
            description: row.get(4)?,
            url: row.get(5)?,
            source: row.get(6)?,
            salary: row.get(7)?,
            experience_level: level,
            status,
            posted_date: row.get(10)?,
            applied_date: row.get(11)?,
            next_action: row.get(12)?,
            next_action_date: row.get(13)?,
            notes: row.get(14)?,
            created_at: row.get(15)?,
            updated_at: row.get(16)?,
        })
    }
}

const SELECT_JOB: &str = "SELECT id, title, company, location, description, url, source, salary,
        experience_level, status, posted_date, applied_date,
        next_action, next_action_date, notes, created_at, updated_at
 FROM jobs";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExperienceLevel;

    fn test_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.init().unwrap();
        db
    }

    fn lead(title: &str, company: &str, url: &str) -> NewJob {
        NewJob {
            title: title.to_string(),
            company: company.to_string(),
            url: url.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_and_get_round_trip() {
        let db = test_db();
        let created = db
            .create_job(&NewJob {
                location: Some("Berlin".to_string()),
                salary: Some("$120k - $150k".to_string()),
                experience_level: Some(ExperienceLevel::Senior),
                source: Some("manual".to_string()),
                ..lead("Senior Backend Engineer", "Acme", "https://acme.example/jobs/1")
            })
            .unwrap();

        let fetched = db.get_job(created.id).unwrap().unwrap();
        assert_eq!(fetched.title, "Senior Backend Engineer");
        assert_eq!(fetched.company, "Acme");
        assert_eq!(fetched.experience_level, ExperienceLevel::Senior);
        assert_eq!(fetched.status, JobStatus::New);
        assert!(fetched.posted_date.is_some(), "posted_date defaults to creation time");
        assert_eq!(fetched.applied_date, None);
    }

    #[test]
    fn test_create_rejects_missing_required_fields() {
        let db = test_db();
        let err = db.create_job(&lead("", "Acme", "https://a.example")).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        let err = db.create_job(&lead("Engineer role", "", "https://a.example")).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        let err = db.create_job(&lead("Engineer role", "Acme", " ")).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_get_missing_job_is_none() {
        let db = test_db();
        assert!(db.get_job(42).unwrap().is_none());
    }

    #[test]
    fn test_list_filters_by_status() {
        let db = test_db();
        let a = db.create_job(&lead("Backend Engineer", "Acme", "https://a.example/1")).unwrap();
        db.create_job(&lead("Frontend Engineer", "Acme", "https://a.example/2")).unwrap();
        db.set_status(a.id, JobStatus::Reviewed).unwrap();

        assert_eq!(db.list_jobs(None).unwrap().len(), 2);
        let reviewed = db.list_jobs(Some(JobStatus::Reviewed)).unwrap();
        assert_eq!(reviewed.len(), 1);
        assert_eq!(reviewed[0].id, a.id);
        assert!(db.list_jobs(Some(JobStatus::Offer)).unwrap().is_empty());
    }

    #[test]
    fn test_applied_date_survives_round_trip_through_pipeline() {
        let db = test_db();
        let job = db.create_job(&lead("Backend Engineer", "Acme", "https://a.example/1")).unwrap();

        let applied = db.set_status(job.id, JobStatus::Applied).unwrap();
        let stamp = applied.applied_date.expect("first applied transition stamps");

        db.set_status(job.id, JobStatus::Interviewing).unwrap();
        let reapplied = db.set_status(job.id, JobStatus::Applied).unwrap();
        assert_eq!(reapplied.applied_date, Some(stamp));
        assert_eq!(reapplied.status, JobStatus::Applied);
    }

    #[test]
    fn test_set_status_missing_job_is_not_found() {
        let db = test_db();
        let err = db.set_status(9, JobStatus::Applied).unwrap_err();
        assert!(matches!(err, Error::NotFound(9)));
    }

    #[test]
    fn test_update_patches_annotations_independently() {
        let db = test_db();
        let job = db.create_job(&lead("Backend Engineer", "Acme", "https://a.example/1")).unwrap();

        let updated = db
            .update_job(
                job.id,
                &JobPatch {
                    next_action: Some("Send follow-up email".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.next_action.as_deref(), Some("Send follow-up email"));
        assert_eq!(updated.notes, None);

        let updated = db
            .update_job(
                job.id,
                &JobPatch {
                    notes: Some("Referred by Sam".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.next_action.as_deref(), Some("Send follow-up email"));
        assert_eq!(updated.notes.as_deref(), Some("Referred by Sam"));
    }

    #[test]
    fn test_update_missing_job_is_not_found() {
        let db = test_db();
        let err = db
            .update_job(7, &JobPatch { notes: Some("x".to_string()), ..Default::default() })
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(7)));
    }

    #[test]
    fn test_delete_job() {
        let db = test_db();
        let job = db.create_job(&lead("Backend Engineer", "Acme", "https://a.example/1")).unwrap();
        db.delete_job(job.id).unwrap();
        assert!(db.get_job(job.id).unwrap().is_none());
        assert!(matches!(db.delete_job(job.id).unwrap_err(), Error::NotFound(_)));
    }

    #[test]
    fn test_count_by_status_is_zero_filled() {
        let db = test_db();
        let counts = db.count_by_status().unwrap();
        assert_eq!(counts.len(), JobStatus::ALL.len());
        assert!(counts.iter().all(|(_, n)| *n == 0));

        let a = db.create_job(&lead("Backend Engineer", "Acme", "https://a.example/1")).unwrap();
        db.create_job(&lead("Frontend Engineer", "Acme", "https://a.example/2")).unwrap();
        db.set_status(a.id, JobStatus::Applied).unwrap();

        let counts = db.count_by_status().unwrap();
        let get = |status: JobStatus| counts.iter().find(|(s, _)| *s == status).unwrap().1;
        assert_eq!(get(JobStatus::New), 1);
        assert_eq!(get(JobStatus::Applied), 1);
        assert_eq!(get(JobStatus::Offer), 0);
    }

    #[test]
    fn test_applied_since_counts_only_recent_applications() {
        let db = test_db();
        let recent = db.create_job(&lead("Backend Engineer", "Acme", "https://a.example/1")).unwrap();
        let old = db.create_job(&lead("Frontend Engineer", "Acme", "https://a.example/2")).unwrap();
        db.set_status(recent.id, JobStatus::Applied).unwrap();
        db.set_status(old.id, JobStatus::Applied).unwrap();

        // Backdate the second application past the window.
        db.conn
            .execute(
                "UPDATE jobs SET applied_date = datetime('now', '-10 days') WHERE id = ?1",
                [old.id],
            )
            .unwrap();

        let cutoff = Utc::now() - chrono::Duration::days(7);
        assert_eq!(db.applied_since(cutoff).unwrap(), 1);
    }

    #[test]
    fn test_job_exists_matches_url_or_title_and_company() {
        let db = test_db();
        db.create_job(&lead("Backend Engineer", "Acme", "https://a.example/1")).unwrap();

        assert!(db.job_exists("Anything", "Elsewhere", "https://a.example/1").unwrap());
        assert!(db.job_exists("backend engineer", "ACME", "https://other.example").unwrap());
        assert!(!db.job_exists("Backend Engineer", "Globex", "https://other.example").unwrap());
    }
}
