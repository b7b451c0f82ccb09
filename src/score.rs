use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::models::{Job, UserProfile};

// Per-factor caps; the factors sum to a 0-100 score.
const SKILL_CAP: f64 = 40.0;
const RECENCY_CAP: f64 = 25.0;
const EXPERIENCE_CAP: f64 = 20.0;
const SIGNAL_CAP: f64 = 15.0;

const MAX_REASONS: usize = 3;

// Hiring-signal keyword families: (terms, points, reasoning line). Points
// are additive across families and clamped at SIGNAL_CAP.
const SIGNAL_FAMILIES: &[(&[&str], f64, &str)] = &[
    (
        &["urgent", "immediate start", "hiring now", "asap", "actively hiring"],
        5.0,
        "Employer is hiring urgently",
    ),
    (
        &["entry level", "entry-level", "junior friendly", "willing to train", "no experience necessary"],
        3.0,
        "Posting is junior-friendly",
    ),
    (
        &["remote", "worldwide", "work from anywhere", "work from home"],
        3.0,
        "Remote-friendly role",
    ),
    (
        &["startup", "start-up", "seed stage", "series a", "series b"],
        2.0,
        "Startup environment",
    ),
    (
        &["small team", "lean team", "tight-knit", "founding engineer"],
        2.0,
        "Small, focused team",
    ),
];

#[derive(Debug, Clone)]
pub struct MatchBreakdown {
    pub skills: f64,
    pub recency: f64,
    pub experience: f64,
    pub signals: f64,
}

impl MatchBreakdown {
    pub fn total(&self) -> f64 {
        self.skills + self.recency + self.experience + self.signals
    }
}

/// A job with its computed ranking. Derived on demand, never stored.
#[derive(Debug, Clone)]
pub struct ScoredJob {
    pub job: Job,
    pub score: u8,
    pub breakdown: MatchBreakdown,
    pub hire_probability: u8,
    pub reasoning: Vec<String>,
}

/// Scores one job against a profile. Pure: identical inputs (including
/// `now`) produce identical output.
///
/// Reasoning entries accumulate in fixed evaluation order (skills, recency,
/// experience, signals) and only the first three are kept. Truncation is by
/// that order, not by factor magnitude.
pub fn score_job(job: &Job, profile: &UserProfile, now: DateTime<Utc>) -> Result<ScoredJob> {
    if profile.skills.is_empty() {
        return Err(Error::InvalidProfile(
            "profile has no skills to match against".to_string(),
        ));
    }

    let haystack = format!(
        "{} {} {}",
        job.title,
        job.description.as_deref().unwrap_or(""),
        job.company
    )
    .to_lowercase();

    let mut reasoning: Vec<String> = Vec::new();

    // Skill overlap: fraction of profile skills found anywhere in the text.
    let matched: Vec<&str> = profile
        .skills
        .iter()
        .filter(|skill| haystack.contains(&skill.to_lowercase()))
        .map(|skill| skill.as_str())
        .collect();
    let skills = matched.len() as f64 / profile.skills.len() as f64 * SKILL_CAP;
    if !matched.is_empty() {
        reasoning.push(format!(
            "Matches {} of {} skills ({})",
            matched.len(),
            profile.skills.len(),
            matched.join(", ")
        ));
    }

    // Recency: bucketed by whole days since posting. Unknown posting date
    // contributes nothing and produces no reasoning line.
    let recency = match job.posted_date {
        Some(posted) => {
            let days = (now - posted).num_days();
            let (points, label) = if days <= 1 {
                (25.0, "Posted within the last day")
            } else if days <= 3 {
                (20.0, "Posted in the last three days")
            } else if days <= 7 {
                (15.0, "Posted in the last week")
            } else if days <= 14 {
                (10.0, "Posted in the last two weeks")
            } else {
                (5.0, "Posting is older than two weeks")
            };
            reasoning.push(label.to_string());
            points
        }
        None => 0.0,
    };

    // Experience fit: band distance between the profile and the role.
    let gap = profile.experience_level as i8 - job.experience_level as i8;
    let (experience, label) = match gap {
        0 => (20.0, "Experience level matches the role"),
        1 => (15.0, "Overqualified, with room to grow"),
        -1 => (10.0, "A stretch role one level up"),
        _ => (5.0, "Experience level is far from the role"),
    };
    reasoning.push(label.to_string());

    let mut signals = 0.0;
    for &(terms, points, label) in SIGNAL_FAMILIES {
        if terms.iter().any(|term| haystack.contains(term)) {
            signals += points;
            reasoning.push(label.to_string());
        }
    }
    let signals = signals.min(SIGNAL_CAP);

    let breakdown = MatchBreakdown {
        skills,
        recency,
        experience,
        signals,
    };
    let score = breakdown.total().round() as u8;

    // Weighted percentage of each factor's own cap. The weights mirror the
    // caps, so today this lands on the same value as `score`; the two are
    // computed separately on purpose.
    let hire_probability = (breakdown.skills / SKILL_CAP * 40.0
        + breakdown.recency / RECENCY_CAP * 25.0
        + breakdown.experience / EXPERIENCE_CAP * 20.0
        + breakdown.signals / SIGNAL_CAP * 15.0)
        .round() as u8;

    reasoning.truncate(MAX_REASONS);

    Ok(ScoredJob {
        job: job.clone(),
        score,
        breakdown,
        hire_probability,
        reasoning,
    })
}

/// Scores a batch independently and sorts by descending score. `sort_by` is
/// stable, so ties keep their input order. An empty batch is fine.
pub fn rank_jobs(jobs: &[Job], profile: &UserProfile, now: DateTime<Utc>) -> Result<Vec<ScoredJob>> {
    let mut scored = jobs
        .iter()
        .map(|job| score_job(job, profile, now))
        .collect::<Result<Vec<_>>>()?;
    scored.sort_by(|a, b| b.score.cmp(&a.score));
    Ok(scored)
}
