use serde::Deserialize;
use std::env;

use crate::error::{Error, Result};
use crate::extract::parse_posted_date;
use crate::models::{ExperienceLevel, NewJob};

/// A job-board adapter: translates one provider's response into the common
/// job shape. Implementations hold their own credentials and HTTP client.
pub trait SearchProvider {
    fn search(&self, query: &str, location: Option<&str>, max_results: usize) -> Result<Vec<NewJob>>;
    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy)]
pub enum ProviderKind {
    JSearch,
    Remotive,
    Adzuna,
}

pub fn resolve_provider(name: &str) -> Result<ProviderKind> {
    match name {
        "jsearch" => Ok(ProviderKind::JSearch),
        "remotive" => Ok(ProviderKind::Remotive),
        "adzuna" => Ok(ProviderKind::Adzuna),
        _ => Err(Error::Validation(format!(
            "unknown provider '{name}'. Available: remotive (default), jsearch, adzuna"
        ))),
    }
}

pub fn create_provider(kind: ProviderKind) -> Result<Box<dyn SearchProvider>> {
    match kind {
        ProviderKind::JSearch => Ok(Box::new(JSearchProvider::from_env()?)),
        ProviderKind::Remotive => Ok(Box::new(RemotiveProvider::new())),
        ProviderKind::Adzuna => Ok(Box::new(AdzunaProvider::from_env()?)),
    }
}

fn get_json<T: serde::de::DeserializeOwned>(
    request: reqwest::blocking::RequestBuilder,
    url: &str,
) -> Result<T> {
    let response = request.send().map_err(|e| Error::Fetch {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(Error::Fetch {
            url: url.to_string(),
            reason: format!("HTTP {status}"),
        });
    }

    response.json().map_err(|e| Error::Fetch {
        url: url.to_string(),
        reason: format!("invalid response body: {e}"),
    })
}

fn format_salary_range(min: Option<f64>, max: Option<f64>) -> Option<String> {
    match (min, max) {
        (Some(min), Some(max)) => Some(format!("${min:.0} - ${max:.0}")),
        (Some(min), None) => Some(format!("${min:.0}+")),
        (None, Some(max)) => Some(format!("up to ${max:.0}")),
        (None, None) => None,
    }
}

// --- JSearch (generic aggregator, RapidAPI key) ---

const JSEARCH_URL: &str = "https://jsearch.p.rapidapi.com/search";

#[derive(Debug, Deserialize)]
struct JSearchResponse {
    #[serde(default)]
    data: Vec<JSearchJob>,
}

#[derive(Debug, Deserialize)]
struct JSearchJob {
    job_title: Option<String>,
    employer_name: Option<String>,
    job_city: Option<String>,
    job_country: Option<String>,
    job_description: Option<String>,
    job_apply_link: Option<String>,
    job_min_salary: Option<f64>,
    job_max_salary: Option<f64>,
    job_posted_at_datetime_utc: Option<String>,
}

pub struct JSearchProvider {
    api_key: String,
    client: reqwest::blocking::Client,
}

impl JSearchProvider {
    pub fn from_env() -> Result<Self> {
        let api_key = env::var("JSEARCH_API_KEY").map_err(|_| {
            Error::Configuration(
                "JSEARCH_API_KEY environment variable not set. \
                 Set it with: export JSEARCH_API_KEY=your-key-here"
                    .to_string(),
            )
        })?;
        Ok(Self::new(api_key))
    }

    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            client: reqwest::blocking::Client::new(),
        }
    }
}

impl SearchProvider for JSearchProvider {
    fn search(&self, query: &str, location: Option<&str>, max_results: usize) -> Result<Vec<NewJob>> {
        let query = match location {
            Some(location) => format!("{query} in {location}"),
            None => query.to_string(),
        };
        let request = self
            .client
            .get(JSEARCH_URL)
            .query(&[("query", query.as_str()), ("num_pages", "1")])
            .header("x-rapidapi-key", &self.api_key)
            .header("x-rapidapi-host", "jsearch.p.rapidapi.com");

        let response: JSearchResponse = get_json(request, JSEARCH_URL)?;
        Ok(response
            .data
            .into_iter()
            .take(max_results)
            .map(lead_from_jsearch)
            .collect())
    }

    fn name(&self) -> &'static str {
        "jsearch"
    }
}

fn lead_from_jsearch(job: JSearchJob) -> NewJob {
    let title = job.job_title.unwrap_or_default();
    let experience_level = ExperienceLevel::infer_from_title(&title);
    let location = match (job.job_city, job.job_country) {
        (Some(city), Some(country)) => Some(format!("{city}, {country}")),
        (Some(city), None) => Some(city),
        (None, Some(country)) => Some(country),
        (None, None) => None,
    };

    NewJob {
        title,
        company: job.employer_name.unwrap_or_default(),
        url: job.job_apply_link.unwrap_or_default(),
        location,
        description: job.job_description,
        salary: format_salary_range(job.job_min_salary, job.job_max_salary),
        experience_level: Some(experience_level),
        posted_date: job
            .job_posted_at_datetime_utc
            .as_deref()
            .and_then(parse_posted_date),
        source: Some("jsearch".to_string()),
    }
}

// --- Remotive (free remote-jobs board, no credentials) ---

const REMOTIVE_URL: &str = "https://remotive.com/api/remote-jobs";

#[derive(Debug, Deserialize)]
struct RemotiveResponse {
    #[serde(default)]
    jobs: Vec<RemotiveJob>,
}

#[derive(Debug, Deserialize)]
struct RemotiveJob {
    title: Option<String>,
    company_name: Option<String>,
    candidate_required_location: Option<String>,
    description: Option<String>,
    url: Option<String>,
    salary: Option<String>,
    publication_date: Option<String>,
}

pub struct RemotiveProvider {
    client: reqwest::blocking::Client,
}

impl RemotiveProvider {
    pub fn new() -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
        }
    }
}

impl SearchProvider for RemotiveProvider {
    // Remote-only board; the location argument does not narrow results.
    fn search(&self, query: &str, _location: Option<&str>, max_results: usize) -> Result<Vec<NewJob>> {
        let limit = max_results.to_string();
        let request = self
            .client
            .get(REMOTIVE_URL)
            .query(&[("search", query), ("limit", limit.as_str())]);

        let response: RemotiveResponse = get_json(request, REMOTIVE_URL)?;
        Ok(response
            .jobs
            .into_iter()
            .take(max_results)
            .map(lead_from_remotive)
            .collect())
    }

    fn name(&self) -> &'static str {
        "remotive"
    }
}

fn lead_from_remotive(job: RemotiveJob) -> NewJob {
    let title = job.title.unwrap_or_default();
    let experience_level = ExperienceLevel::infer_from_title(&title);

    NewJob {
        title,
        company: job.company_name.unwrap_or_default(),
        url: job.url.unwrap_or_default(),
        location: job.candidate_required_location,
        description: job.description,
        salary: job.salary.filter(|s| !s.trim().is_empty()),
        experience_level: Some(experience_level),
        posted_date: job.publication_date.as_deref().and_then(parse_posted_date),
        source: Some("remotive".to_string()),
    }
}

// --- Adzuna (region-specific board, app-id/app-key pair) ---

const ADZUNA_URL: &str = "https://api.adzuna.com/v1/api/jobs/gb/search/1";

#[derive(Debug, Deserialize)]
struct AdzunaResponse {
    #[serde(default)]
    results: Vec<AdzunaJob>,
}

#[derive(Debug, Deserialize)]
struct AdzunaJob {
    title: Option<String>,
    company: Option<AdzunaCompany>,
    location: Option<AdzunaLocation>,
    description: Option<String>,
    redirect_url: Option<String>,
    salary_min: Option<f64>,
    salary_max: Option<f64>,
    created: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AdzunaCompany {
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AdzunaLocation {
    display_name: Option<String>,
}

pub struct AdzunaProvider {
    app_id: String,
    app_key: String,
    client: reqwest::blocking::Client,
}

impl AdzunaProvider {
    pub fn from_env() -> Result<Self> {
        let app_id = env::var("ADZUNA_APP_ID").map_err(|_| {
            Error::Configuration(
                "ADZUNA_APP_ID environment variable not set. \
                 Set it with: export ADZUNA_APP_ID=your-app-id"
                    .to_string(),
            )
        })?;
        let app_key = env::var("ADZUNA_APP_KEY").map_err(|_| {
            Error::Configuration(
                "ADZUNA_APP_KEY environment variable not set. \
                 Set it with: export ADZUNA_APP_KEY=your-app-key"
                    .to_string(),
            )
        })?;
        Ok(Self::new(app_id, app_key))
    }

    pub fn new(app_id: String, app_key: String) -> Self {
        Self {
            app_id,
            app_key,
            client: reqwest::blocking::Client::new(),
        }
    }
}

impl SearchProvider for AdzunaProvider {
    fn search(&self, query: &str, location: Option<&str>, max_results: usize) -> Result<Vec<NewJob>> {
        let per_page = max_results.to_string();
        let mut params = vec![
            ("app_id", self.app_id.as_str()),
            ("app_key", self.app_key.as_str()),
            ("what", query),
            ("results_per_page", per_page.as_str()),
        ];
        if let Some(location) = location {
            params.push(("where", location));
        }
        let request = self.client.get(ADZUNA_URL).query(&params);

        let response: AdzunaResponse = get_json(request, ADZUNA_URL)?;
        Ok(response
            .results
            .into_iter()
            .take(max_results)
            .map(lead_from_adzuna)
            .collect())
    }

    fn name(&self) -> &'static str {
        "adzuna"
    }
}

fn lead_from_adzuna(job: AdzunaJob) -> NewJob {
    let title = job.title.unwrap_or_default();
    let experience_level = ExperienceLevel::infer_from_title(&title);

    NewJob {
        title,
        company: job
            .company
            .and_then(|c| c.display_name)
            .unwrap_or_default(),
        url: job.redirect_url.unwrap_or_default(),
        location: job.location.and_then(|l| l.display_name),
        description: job.description,
        salary: format_salary_range(job.salary_min, job.salary_max),
        experience_level: Some(experience_level),
        posted_date: job.created.as_deref().and_then(parse_posted_date),
        source: Some("adzuna".to_string()),
    }
}
