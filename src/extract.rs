use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use scraper::{Html, Selector};
use serde_json::Value;
use url::Url;

use crate::error::{Error, Result};
use crate::models::{ExperienceLevel, NewJob};

// Role and department words that mark an anchor as a probable job listing.
const ROLE_KEYWORDS: &[&str] = &[
    "engineer", "developer", "designer", "manager", "analyst", "architect", "lead", "senior",
    "junior", "intern", "fullstack", "frontend", "backend", "devops", "data", "ml", "ai",
    "product",
];

// Href fragments that mark a link as job-related even without a role word.
const HREF_HINTS: &[&str] = &["job", "career", "position"];

// Link text outside these bounds is navigation chrome or a wall of text.
const MIN_TITLE_CHARS: usize = 10;
const MAX_TITLE_CHARS: usize = 150;

// Below this many anchor hits, fall back to embedded structured data.
const FALLBACK_MIN_RESULTS: usize = 3;

const DESCRIPTION_LIMIT: usize = 500;

/// Downloads a careers page. Transport failures and non-success statuses
/// surface as [`Error::Fetch`] with the page URL.
pub fn fetch_page(url: &str) -> Result<String> {
    let client = reqwest::blocking::Client::new();
    let response = client.get(url).send().map_err(|e| Error::Fetch {
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

    response.text().map_err(|e| Error::Fetch {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

/// Fetches and extracts in one step.
pub fn scrape_careers_page(
    url: &str,
    company: &str,
    keywords: Option<&str>,
) -> Result<Vec<NewJob>> {
    let html = fetch_page(url)?;
    Ok(extract_jobs(&html, company, url, keywords, Utc::now()))
}

/// Best-effort extraction of job listings from careers-page HTML. Never
/// fails: malformed markup or structured data degrades to fewer results.
///
/// Anchors are classified by keyword vocabulary and link-text length; when
/// that pass finds fewer than three listings, embedded schema.org
/// JobPosting blocks are parsed as a fallback. Results are deduplicated by
/// (title, url), first occurrence wins.
pub fn extract_jobs(
    html: &str,
    company: &str,
    base_url: &str,
    keywords: Option<&str>,
    now: DateTime<Utc>,
) -> Vec<NewJob> {
    let document = Html::parse_document(html);
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut jobs: Vec<NewJob> = Vec::new();

    let anchor_selector = Selector::parse("a[href]").ok();
    if let Some(ref selector) = anchor_selector {
        for element in document.select(selector) {
            let href = element.value().attr("href").unwrap_or("");
            let text = element.text().collect::<Vec<_>>().join(" ");
            let title = text.split_whitespace().collect::<Vec<_>>().join(" ");

            if href.is_empty() || !looks_like_job_link(&title, href) {
                continue;
            }

            let chars = title.chars().count();
            if chars <= MIN_TITLE_CHARS || chars >= MAX_TITLE_CHARS {
                continue;
            }

            if !matches_keywords(&title, keywords) {
                continue;
            }

            let url = match resolve_href(base_url, href) {
                Some(url) => url,
                None => continue,
            };

            if !seen.insert((title.clone(), url.clone())) {
                continue;
            }

            let experience_level = ExperienceLevel::infer_from_title(&title);
            jobs.push(NewJob {
                title,
                company: company.to_string(),
                url,
                location: Some("See job posting".to_string()),
                description: Some(format!("Found on {company} careers page")),
                salary: None,
                experience_level: Some(experience_level),
                posted_date: Some(now),
                source: Some("careers-page".to_string()),
            });
        }
    }

    if jobs.len() < FALLBACK_MIN_RESULTS {
        collect_structured_postings(&document, company, base_url, &mut seen, &mut jobs);
    }

    jobs
}

fn looks_like_job_link(text: &str, href: &str) -> bool {
    let text = text.to_lowercase();
    let href = href.to_lowercase();

    ROLE_KEYWORDS
        .iter()
        .any(|k| text.contains(k) || href.contains(k))
        || HREF_HINTS.iter().any(|h| href.contains(h))
}

// An empty or whitespace-only filter matches everything.
fn matches_keywords(text: &str, keywords: Option<&str>) -> bool {
    let terms: Vec<String> = keywords
        .unwrap_or("")
        .split_whitespace()
        .map(str::to_lowercase)
        .collect();
    if terms.is_empty() {
        return true;
    }
    let text = text.to_lowercase();
    terms.iter().any(|term| text.contains(term))
}

fn resolve_href(base_url: &str, href: &str) -> Option<String> {
    let base = Url::parse(base_url).ok()?;
    base.join(href).ok().map(|url| url.to_string())
}

/// Scans `<script type="application/ld+json">` blocks for schema.org
/// JobPosting records. Malformed blocks are skipped silently.
fn collect_structured_postings(
    document: &Html,
    company: &str,
    base_url: &str,
    seen: &mut HashSet<(String, String)>,
    jobs: &mut Vec<NewJob>,
) {
    let selector = match Selector::parse(r#"script[type="application/ld+json"]"#) {
        Ok(selector) => selector,
        Err(_) => return,
    };

    for script in document.select(&selector) {
        let raw = script.text().collect::<String>();
        let value: Value = match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(_) => continue,
        };

        for candidate in flatten_candidates(&value) {
            if let Some(job) = posting_from_json(candidate, company, base_url) {
                if seen.insert((job.title.clone(), job.url.clone())) {
                    jobs.push(job);
                }
            }
        }
    }
}

// A block may hold one posting, a bare array of them, or an @graph wrapper.
fn flatten_candidates(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        Value::Object(map) => match map.get("@graph").and_then(Value::as_array) {
            Some(items) => items.iter().collect(),
            None => vec![value],
        },
        _ => Vec::new(),
    }
}

fn posting_from_json(value: &Value, company: &str, base_url: &str) -> Option<NewJob> {
    let is_posting = value
        .get("@type")
        .and_then(Value::as_str)
        .is_some_and(|t| t.eq_ignore_ascii_case("JobPosting"));
    if !is_posting {
        return None;
    }

    let title = value
        .get("title")
        .and_then(Value::as_str)
        .or_else(|| value.get("name").and_then(Value::as_str))?
        .trim()
        .to_string();
    if title.is_empty() {
        return None;
    }

    let url = value
        .get("url")
        .and_then(Value::as_str)
        .and_then(|u| resolve_href(base_url, u))
        .unwrap_or_else(|| base_url.to_string());

    let description = value
        .get("description")
        .and_then(Value::as_str)
        .map(|d| d.chars().take(DESCRIPTION_LIMIT).collect::<String>());

    Some(NewJob {
        title,
        company: company.to_string(),
        url,
        location: structured_location(value).or_else(|| Some("See job posting".to_string())),
        description,
        salary: structured_salary(value),
        experience_level: Some(ExperienceLevel::Mid),
        posted_date: value
            .get("datePosted")
            .and_then(Value::as_str)
            .and_then(parse_posted_date),
        source: Some("careers-page".to_string()),
    })
}

fn structured_location(value: &Value) -> Option<String> {
    let location = value.get("jobLocation")?;
    let location = match location {
        Value::Array(items) => items.first()?,
        other => other,
    };
    let address = location.get("address")?;

    if let Some(text) = address.as_str() {
        return non_empty(text);
    }
    for key in ["addressLocality", "addressRegion", "addressCountry"] {
        if let Some(part) = address.get(key).and_then(Value::as_str) {
            if let Some(part) = non_empty(part) {
                return Some(part);
            }
        }
    }
    None
}

fn structured_salary(value: &Value) -> Option<String> {
    let salary = value.get("baseSalary")?;
    if let Some(text) = salary.as_str() {
        return non_empty(text);
    }

    let amount = salary.get("value")?;
    let min = amount.get("minValue").and_then(Value::as_f64);
    let max = amount.get("maxValue").and_then(Value::as_f64);
    let range = match (min, max) {
        (Some(min), Some(max)) => format!("{min:.0} - {max:.0}"),
        (Some(min), None) => format!("{min:.0}+"),
        (None, Some(max)) => format!("up to {max:.0}"),
        (None, None) => format!("{:.0}", amount.as_f64()?),
    };

    Some(match amount.get("unitText").and_then(Value::as_str) {
        Some(unit) => format!("{range} per {}", unit.to_lowercase()),
        None => range,
    })
}

fn non_empty(text: &str) -> Option<String> {
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// Lenient posting-date parser for the formats the boards actually emit:
/// RFC 3339, bare dates, and zone-less timestamps (treated as UTC).
pub fn parse_posted_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(parsed.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|datetime| datetime.and_utc())
}
