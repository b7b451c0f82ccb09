mod db;
mod error;
mod extract;
mod models;
mod score;
mod search;

use anyhow::Result;
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};

use db::Database;
use models::{ExperienceLevel, JobPatch, JobStatus, NewJob, UserProfile};

#[derive(Parser)]
#[command(name = "pursuit")]
#[command(about = "Job application tracking - store, score, and search opportunities")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// Add a job posting
    Add {
        /// Job title
        title: String,

        /// Company name
        #[arg(short, long)]
        company: String,

        /// Posting URL
        #[arg(short, long)]
        url: String,

        #[arg(short, long)]
        location: Option<String>,

        #[arg(short, long)]
        description: Option<String>,

        /// Salary or salary range, free text
        #[arg(short, long)]
        salary: Option<String>,

        /// Experience level (junior, mid, senior)
        #[arg(long)]
        level: Option<String>,

        /// Original posting date (YYYY-MM-DD)
        #[arg(short, long)]
        posted: Option<String>,
    },

    /// List tracked jobs
    List {
        /// Filter by status (new, reviewed, tailoring, applied, interviewing, rejected, offer)
        #[arg(short, long)]
        status: Option<String>,
    },

    /// Show job details
    Show {
        /// Job ID
        id: i64,
    },

    /// Move a job to a new pipeline status
    Status {
        /// Job ID
        id: i64,

        /// One of: new, reviewed, tailoring, applied, interviewing, rejected, offer
        status: String,
    },

    /// Update job annotations
    Update {
        /// Job ID
        id: i64,

        #[arg(long)]
        next_action: Option<String>,

        /// When the next action is due
        #[arg(long)]
        next_action_date: Option<String>,

        #[arg(long)]
        notes: Option<String>,
    },

    /// Delete a job
    Delete {
        /// Job ID
        id: i64,
    },

    /// Show pipeline statistics
    Stats,

    /// Search external job boards
    Search {
        /// Search query
        query: String,

        /// Provider (remotive, jsearch, adzuna)
        #[arg(short, long, default_value = "remotive")]
        provider: String,

        #[arg(short, long)]
        location: Option<String>,

        /// Maximum number of results
        #[arg(short, long, default_value = "20")]
        max: usize,

        /// Persist results to the database
        #[arg(long)]
        save: bool,
    },

    /// Extract job listings from a company careers page
    Scrape {
        /// Careers page URL
        url: String,

        /// Company name for the extracted records
        #[arg(short, long)]
        company: String,

        /// Space-separated keywords a listing must mention
        #[arg(short, long)]
        keywords: Option<String>,

        /// Persist results to the database
        #[arg(long)]
        save: bool,
    },

    /// Score stored jobs against a skill profile
    Match {
        /// Comma-separated skills, e.g. "rust, sql, kubernetes"
        #[arg(long)]
        skills: String,

        /// Your experience level (junior, mid, senior)
        #[arg(long, default_value = "mid")]
        level: String,

        /// Only score jobs with this status
        #[arg(long)]
        status: Option<String>,

        /// Number of jobs to show
        #[arg(long, default_value = "10")]
        limit: usize,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let db = Database::open()?;

    match cli.command {
        Commands::Init => {
            db.init()?;
            println!("Database initialized at {}", db.path().display());
        }

        Commands::Add {
            title,
            company,
            url,
            location,
            description,
            salary,
            level,
            posted,
        } => {
            db.ensure_initialized()?;

            let experience_level = level
                .as_deref()
                .map(str::parse::<ExperienceLevel>)
                .transpose()?;
            let posted_date = match posted.as_deref() {
                Some(raw) => Some(extract::parse_posted_date(raw).ok_or_else(|| {
                    error::Error::Validation(format!("invalid date '{raw}', expected YYYY-MM-DD"))
                })?),
                None => None,
            };

            let job = db.create_job(&NewJob {
                title,
                company,
                url,
                location,
                description,
                salary,
                experience_level,
                posted_date,
                source: Some("manual".to_string()),
            })?;
            println!("Added job #{}: {} at {}", job.id, job.title, job.company);
        }

        Commands::List { status } => {
            db.ensure_initialized()?;
            let status = parse_status(status.as_deref())?;
            let jobs = db.list_jobs(status)?;
            if jobs.is_empty() {
                println!("No jobs found.");
            } else {
                println!(
                    "{:<6} {:<13} {:<30} {:<20} {:<16}",
                    "ID", "STATUS", "TITLE", "COMPANY", "LOCATION"
                );
                println!("{}", "-".repeat(88));
                for job in jobs {
                    println!(
                        "{:<6} {:<13} {:<30} {:<20} {:<16}",
                        job.id,
                        job.status,
                        truncate(&job.title, 28),
                        truncate(&job.company, 18),
                        truncate(job.location.as_deref().unwrap_or("-"), 14)
                    );
                }
            }
        }

        Commands::Show { id } => {
            db.ensure_initialized()?;
            match db.get_job(id)? {
                Some(job) => {
                    println!("Job #{}", job.id);
                    println!("Title: {}", job.title);
                    println!("Company: {}", job.company);
                    println!("Status: {}", job.status);
                    println!("Level: {}", job.experience_level);
                    println!("URL: {}", job.url);
                    if let Some(location) = &job.location {
                        println!("Location: {location}");
                    }
                    if let Some(salary) = &job.salary {
                        println!("Salary: {salary}");
                    }
                    if let Some(source) = &job.source {
                        println!("Source: {source}");
                    }
                    if let Some(posted) = job.posted_date {
                        println!("Posted: {}", posted.format("%Y-%m-%d"));
                    }
                    if let Some(applied) = job.applied_date {
                        println!("Applied: {}", applied.format("%Y-%m-%d"));
                    }
                    if let Some(next_action) = &job.next_action {
                        let due = job.next_action_date.as_deref().unwrap_or("no date");
                        println!("Next action: {next_action} ({due})");
                    }
                    println!("Created: {}", job.created_at);
                    if let Some(notes) = &job.notes {
                        println!("\n--- Notes ---\n{notes}");
                    }
                    if let Some(description) = &job.description {
                        println!("\n--- Description ---\n{description}");
                    }
                }
                None => {
                    println!("Job #{id} not found.");
                }
            }
        }

        Commands::Status { id, status } => {
            db.ensure_initialized()?;
            let status: JobStatus = status.parse()?;
            let job = db.set_status(id, status)?;
            match (status, job.applied_date) {
                (JobStatus::Applied, Some(applied)) => println!(
                    "Job #{} is now '{}' (applied {})",
                    job.id,
                    job.status,
                    applied.format("%Y-%m-%d")
                ),
                _ => println!("Job #{} is now '{}'", job.id, job.status),
            }
        }

        Commands::Update {
            id,
            next_action,
            next_action_date,
            notes,
        } => {
            db.ensure_initialized()?;
            let patch = JobPatch {
                next_action,
                next_action_date,
                notes,
            };
            if patch.is_empty() {
                println!("Nothing to update. Use --next-action, --next-action-date, or --notes.");
            } else {
                let job = db.update_job(id, &patch)?;
                println!("Updated job #{}", job.id);
            }
        }

        Commands::Delete { id } => {
            db.ensure_initialized()?;
            db.delete_job(id)?;
            println!("Deleted job #{id}");
        }

        Commands::Stats => {
            db.ensure_initialized()?;
            let counts = db.count_by_status()?;
            let total: i64 = counts.iter().map(|(_, n)| n).sum();

            println!("{:<14} {:>6}", "STATUS", "COUNT");
            println!("{}", "-".repeat(21));
            for (status, count) in &counts {
                println!("{:<14} {:>6}", status.to_string(), count);
            }
            println!("{}", "-".repeat(21));
            println!("{:<14} {:>6}", "total", total);

            let week_ago = Utc::now() - Duration::days(7);
            let recent = db.applied_since(week_ago)?;
            println!("\nApplications in the last 7 days: {recent}");
        }

        Commands::Search {
            query,
            provider,
            location,
            max,
            save,
        } => {
            db.ensure_initialized()?;
            let kind = search::resolve_provider(&provider)?;
            let provider = search::create_provider(kind)?;

            println!("Searching {} for '{}'...", provider.name(), query);
            let leads = provider.search(&query, location.as_deref(), max)?;
            print_leads(&leads);

            if save && !leads.is_empty() {
                let (added, skipped) = save_leads(&db, leads)?;
                println!("\nSaved {added} job(s), skipped {skipped} duplicate/invalid.");
            }
        }

        Commands::Scrape {
            url,
            company,
            keywords,
            save,
        } => {
            db.ensure_initialized()?;
            println!("Fetching {url}...");
            let leads = extract::scrape_careers_page(&url, &company, keywords.as_deref())?;
            print_leads(&leads);

            if save && !leads.is_empty() {
                let (added, skipped) = save_leads(&db, leads)?;
                println!("\nSaved {added} job(s), skipped {skipped} duplicate/invalid.");
            }
        }

        Commands::Match {
            skills,
            level,
            status,
            limit,
        } => {
            db.ensure_initialized()?;
            let level: ExperienceLevel = level.parse()?;
            let profile = UserProfile::from_skill_list(&skills, level);
            let status = parse_status(status.as_deref())?;

            let jobs = db.list_jobs(status)?;
            let mut ranked = score::rank_jobs(&jobs, &profile, Utc::now())?;
            ranked.truncate(limit);

            if ranked.is_empty() {
                println!("No jobs to score.");
            } else {
                println!(
                    "{:<5} {:<6} {:>6} {:>6} {:<28} {:<18}",
                    "RANK", "ID", "SCORE", "PROB", "TITLE", "COMPANY"
                );
                println!("{}", "-".repeat(74));
                for (i, scored) in ranked.iter().enumerate() {
                    println!(
                        "{:<5} {:<6} {:>6} {:>5}% {:<28} {:<18}",
                        i + 1,
                        scored.job.id,
                        scored.score,
                        scored.hire_probability,
                        truncate(&scored.job.title, 26),
                        truncate(&scored.job.company, 16)
                    );
                    if !scored.reasoning.is_empty() {
                        println!("       {}", scored.reasoning.join("; "));
                    }
                }
            }
        }
    }

    Ok(())
}

fn parse_status(status: Option<&str>) -> Result<Option<JobStatus>> {
    Ok(status.map(str::parse).transpose()?)
}

fn print_leads(leads: &[NewJob]) {
    if leads.is_empty() {
        println!("No jobs found.");
        return;
    }
    println!(
        "{:<4} {:<30} {:<18} {:<18} {:<14}",
        "#", "TITLE", "COMPANY", "LOCATION", "SALARY"
    );
    println!("{}", "-".repeat(86));
    for (i, lead) in leads.iter().enumerate() {
        println!(
            "{:<4} {:<30} {:<18} {:<18} {:<14}",
            i + 1,
            truncate(&lead.title, 28),
            truncate(&lead.company, 16),
            truncate(lead.location.as_deref().unwrap_or("-"), 16),
            truncate(lead.salary.as_deref().unwrap_or("-"), 12)
        );
    }
}

fn save_leads(db: &Database, leads: Vec<NewJob>) -> Result<(usize, usize)> {
    let mut added = 0;
    let mut skipped = 0;
    for lead in leads {
        if lead.validate().is_err() || db.job_exists(&lead.title, &lead.company, &lead.url)? {
            skipped += 1;
            continue;
        }
        db.create_job(&lead)?;
        added += 1;
    }
    Ok((added, skipped))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}
