use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Pipeline position of a tracked job. Transitions are unrestricted; the
/// only side effect lives in [`Job::apply_status`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[default]
    New,
    Reviewed,
    Tailoring,
    Applied,
    Interviewing,
    Rejected,
    Offer,
}

impl JobStatus {
    pub const ALL: [JobStatus; 7] = [
        JobStatus::New,
        JobStatus::Reviewed,
        JobStatus::Tailoring,
        JobStatus::Applied,
        JobStatus::Interviewing,
        JobStatus::Rejected,
        JobStatus::Offer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::New => "new",
            JobStatus::Reviewed => "reviewed",
            JobStatus::Tailoring => "tailoring",
            JobStatus::Applied => "applied",
            JobStatus::Interviewing => "interviewing",
            JobStatus::Rejected => "rejected",
            JobStatus::Offer => "offer",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "new" => Ok(JobStatus::New),
            "reviewed" => Ok(JobStatus::Reviewed),
            "tailoring" => Ok(JobStatus::Tailoring),
            "applied" => Ok(JobStatus::Applied),
            "interviewing" => Ok(JobStatus::Interviewing),
            "rejected" => Ok(JobStatus::Rejected),
            "offer" => Ok(JobStatus::Offer),
            other => Err(Error::Validation(format!(
                "unknown status '{other}'. Valid: new, reviewed, tailoring, applied, interviewing, rejected, offer"
            ))),
        }
    }
}

/// Seniority band. Variant order matters: the scorer compares bands by
/// casting to their discriminants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExperienceLevel {
    Junior,
    #[default]
    Mid,
    Senior,
}

impl ExperienceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExperienceLevel::Junior => "junior",
            ExperienceLevel::Mid => "mid",
            ExperienceLevel::Senior => "senior",
        }
    }

    /// Guess the band from a job title. Senior markers win over junior
    /// markers; anything unmarked is mid.
    pub fn infer_from_title(title: &str) -> Self {
        let title = title.to_lowercase();
        if ["senior", "lead", "staff", "principal"]
            .iter()
            .any(|k| title.contains(k))
        {
            ExperienceLevel::Senior
        } else if ["junior", "entry", "intern"].iter().any(|k| title.contains(k)) {
            ExperienceLevel::Junior
        } else {
            ExperienceLevel::Mid
        }
    }
}

impl fmt::Display for ExperienceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExperienceLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "junior" => Ok(ExperienceLevel::Junior),
            "mid" => Ok(ExperienceLevel::Mid),
            "senior" => Ok(ExperienceLevel::Senior),
            other => Err(Error::Validation(format!(
                "unknown experience level '{other}'. Valid: junior, mid, senior"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: i64,
    pub title: String,
    pub company: String,
    pub location: Option<String>,
    pub description: Option<String>,
    pub url: String,
    pub source: Option<String>, // "remotive", "careers-page", "manual", etc.
    pub salary: Option<String>,
    pub experience_level: ExperienceLevel,
    pub status: JobStatus,
    pub posted_date: Option<DateTime<Utc>>,
    pub applied_date: Option<DateTime<Utc>>,
    pub next_action: Option<String>,
    pub next_action_date: Option<String>,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Job {
    /// Moves the job to `next`. Any status may follow any other; the first
    /// move into `applied` stamps `applied_date`, and later round-trips
    /// through `applied` leave the original stamp alone.
    pub fn apply_status(&mut self, next: JobStatus, now: DateTime<Utc>) {
        if next == JobStatus::Applied && self.applied_date.is_none() {
            self.applied_date = Some(now);
        }
        self.status = next;
    }
}

/// Input shape for creating a job, shared by manual entry, the career-page
/// extractor, and the search adapters.
#[derive(Debug, Clone, Default)]
pub struct NewJob {
    pub title: String,
    pub company: String,
    pub url: String,
    pub location: Option<String>,
    pub description: Option<String>,
    pub salary: Option<String>,
    pub experience_level: Option<ExperienceLevel>,
    pub posted_date: Option<DateTime<Utc>>,
    pub source: Option<String>,
}

impl NewJob {
    pub fn validate(&self) -> Result<(), Error> {
        for (field, value) in [
            ("title", &self.title),
            ("company", &self.company),
            ("url", &self.url),
        ] {
            if value.trim().is_empty() {
                return Err(Error::Validation(format!("{field} is required")));
            }
        }
        Ok(())
    }
}

/// Annotation edits; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct JobPatch {
    pub next_action: Option<String>,
    pub next_action_date: Option<String>,
    pub notes: Option<String>,
}

impl JobPatch {
    pub fn is_empty(&self) -> bool {
        self.next_action.is_none() && self.next_action_date.is_none() && self.notes.is_none()
    }
}

/// Scorer input. Never persisted.
#[derive(Debug, Clone)]
pub struct UserProfile {
    pub skills: Vec<String>,
    pub experience_level: ExperienceLevel,
}

impl UserProfile {
    /// Builds a profile from a comma-separated skill list, dropping empty
    /// entries.
    pub fn from_skill_list(skills: &str, experience_level: ExperienceLevel) -> Self {
        let skills = skills
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        Self {
            skills,
            experience_level,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn job() -> Job {
        Job {
            id: 1,
            title: "Backend Engineer".to_string(),
            company: "Acme".to_string(),
            location: None,
            description: None,
            url: "https://acme.example/jobs/1".to_string(),
            source: None,
            salary: None,
            experience_level: ExperienceLevel::Mid,
            status: JobStatus::New,
            posted_date: None,
            applied_date: None,
            next_action: None,
            next_action_date: None,
            notes: None,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn test_status_round_trip() {
        for status in JobStatus::ALL {
            assert_eq!(status.as_str().parse::<JobStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_status_rejects_unknown_value() {
        assert!("closed".parse::<JobStatus>().is_err());
        assert!("".parse::<JobStatus>().is_err());
    }

    #[test]
    fn test_status_parse_is_case_insensitive() {
        assert_eq!("Applied".parse::<JobStatus>().unwrap(), JobStatus::Applied);
        assert_eq!(" OFFER ".parse::<JobStatus>().unwrap(), JobStatus::Offer);
    }

    #[test]
    fn test_applied_date_stamped_once() {
        let mut job = job();
        let first = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2026, 3, 20, 9, 0, 0).unwrap();

        job.apply_status(JobStatus::Applied, first);
        assert_eq!(job.applied_date, Some(first));

        job.apply_status(JobStatus::Interviewing, later);
        job.apply_status(JobStatus::Applied, later);
        assert_eq!(job.status, JobStatus::Applied);
        assert_eq!(job.applied_date, Some(first), "re-applying must not re-stamp");
    }

    #[test]
    fn test_non_applied_transitions_do_not_stamp() {
        let mut job = job();
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        job.apply_status(JobStatus::Reviewed, now);
        job.apply_status(JobStatus::Rejected, now);
        assert_eq!(job.applied_date, None);
    }

    #[test]
    fn test_any_transition_is_allowed() {
        let mut job = job();
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        job.apply_status(JobStatus::Offer, now);
        job.apply_status(JobStatus::New, now);
        assert_eq!(job.status, JobStatus::New);
    }

    #[test]
    fn test_infer_level_from_title() {
        assert_eq!(
            ExperienceLevel::infer_from_title("Senior Backend Engineer"),
            ExperienceLevel::Senior
        );
        assert_eq!(
            ExperienceLevel::infer_from_title("Staff Platform Engineer"),
            ExperienceLevel::Senior
        );
        assert_eq!(
            ExperienceLevel::infer_from_title("Junior Developer"),
            ExperienceLevel::Junior
        );
        assert_eq!(
            ExperienceLevel::infer_from_title("Software Engineering Intern"),
            ExperienceLevel::Junior
        );
        assert_eq!(
            ExperienceLevel::infer_from_title("Backend Engineer"),
            ExperienceLevel::Mid
        );
    }

    #[test]
    fn test_new_job_requires_title_company_url() {
        let valid = NewJob {
            title: "Backend Engineer".to_string(),
            company: "Acme".to_string(),
            url: "https://acme.example/jobs/1".to_string(),
            ..Default::default()
        };
        assert!(valid.validate().is_ok());

        for field in ["title", "company", "url"] {
            let mut bad = valid.clone();
            match field {
                "title" => bad.title = "  ".to_string(),
                "company" => bad.company = String::new(),
                _ => bad.url = String::new(),
            }
            let err = bad.validate().unwrap_err();
            assert!(
                matches!(err, Error::Validation(ref msg) if msg.contains(field)),
                "expected validation error naming {field}, got {err}"
            );
        }
    }

    #[test]
    fn test_profile_from_skill_list_drops_empty_entries() {
        let profile = UserProfile::from_skill_list("rust, sql,, postgres ", ExperienceLevel::Mid);
        assert_eq!(profile.skills, vec!["rust", "sql", "postgres"]);
    }
}
