//! The job repository: an in-memory snapshot of job definitions, loaded
//! either from the store (Retriever role) or from the declarative jobs
//! document followed by a Loader-role upsert pass.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use httpmon_core::{Error, Job, Result};
use serde::Deserialize;
use store_postgres::Store;
use tracing::{debug, info};

pub const JOBS_FILE: &str = "jobs.json";

#[derive(Debug, Deserialize)]
struct JobDocument {
    jobs: Vec<JobEntry>,
}

/// One raw entry of the jobs document. Every field is optional here; the
/// defaults for absent fields are the documented ones (empty maps, empty
/// pattern, empty method and zero interval, which validation then rejects).
/// A missing required key is a validation failure, never a parse failure.
#[derive(Debug, Deserialize)]
struct JobEntry {
    #[serde(default)]
    name: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    method: String,
    #[serde(default)]
    headers: BTreeMap<String, String>,
    #[serde(default)]
    body: BTreeMap<String, i64>,
    #[serde(default)]
    expected_regex: Option<String>,
    #[serde(default)]
    scheduled_interval: i64,
}

pub struct JobRepository {
    jobs: Vec<Job>,
}

impl JobRepository {
    /// Snapshot of the persisted jobs, read with the Retriever role.
    pub async fn from_store(store: &Store) -> Result<Self> {
        let jobs = store.list_jobs().await?;
        debug!(count = jobs.len(), "jobs loaded from the store");
        Ok(JobRepository { jobs })
    }

    /// Bulk load from the declarative document, then upsert every entry so
    /// the store catches up with the file. The in-memory set and the store
    /// end up identical.
    pub async fn from_file(path: &Path, store: &Store) -> Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| Error::InvalidSource(format!("{}: {e}", path.display())))?;
        let jobs = parse_jobs(&text)?;
        for job in &jobs {
            store.upsert_job(job).await?;
        }
        info!(count = jobs.len(), "jobs loaded from file and stored");
        Ok(JobRepository { jobs })
    }

    pub fn all(&self) -> &[Job] {
        &self.jobs
    }

    #[allow(dead_code)]
    pub fn by_name(&self, name: &str) -> Option<&Job> {
        self.jobs.iter().find(|job| job.name == name)
    }
}

/// Parse and validate the jobs document. Duplicate names overwrite earlier
/// entries (last wins) before anything is persisted.
pub(crate) fn parse_jobs(text: &str) -> Result<Vec<Job>> {
    let document: JobDocument =
        serde_json::from_str(text).map_err(|e| Error::InvalidSource(e.to_string()))?;

    let mut jobs: Vec<Job> = Vec::with_capacity(document.jobs.len());
    for entry in document.jobs {
        let job = Job::new(
            entry.name,
            entry.url,
            entry.method,
            entry.headers,
            entry.body,
            entry.expected_regex.unwrap_or_default(),
            entry.scheduled_interval,
        )?;
        match jobs.iter_mut().find(|existing| existing.name == job.name) {
            Some(existing) => *existing = job,
            None => jobs.push(job),
        }
    }
    Ok(jobs)
}

/// Write a starter jobs document if none exists yet.
pub fn deploy_default_jobs(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    let starter = serde_json::json!({
        "jobs": [{
            "name": "example_job",
            "url": "https://cnn.com",
            "method": "GET",
            "headers": {},
            "body": {},
            "expected_regex": "",
            "scheduled_interval": 30
        }]
    });
    let text = serde_json::to_string_pretty(&starter)
        .map_err(|e| Error::InvalidSource(e.to_string()))?;
    fs::write(path, text).map_err(|e| Error::InvalidSource(format!("{}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_job_document_parses_with_names_and_intervals() {
        let text = r#"{"jobs": [
            {"name": "job_a", "url": "https://example.org/a", "method": "GET",
             "headers": {}, "body": {}, "scheduled_interval": 10},
            {"name": "job_b", "url": "https://example.org/b", "method": "POST",
             "headers": {}, "body": {}, "scheduled_interval": 30}
        ]}"#;
        let jobs = parse_jobs(text).unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!((jobs[0].name.as_str(), jobs[0].scheduled_interval), ("job_a", 10));
        assert_eq!((jobs[1].name.as_str(), jobs[1].scheduled_interval), ("job_b", 30));
    }

    #[test]
    fn duplicate_names_last_wins() {
        let text = r#"{"jobs": [
            {"name": "job_a", "url": "https://example.org/old", "method": "GET",
             "scheduled_interval": 10},
            {"name": "job_a", "url": "https://example.org/new", "method": "GET",
             "scheduled_interval": 20}
        ]}"#;
        let jobs = parse_jobs(text).unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].url, "https://example.org/new");
        assert_eq!(jobs[0].scheduled_interval, 20);
    }

    #[test]
    fn lookup_by_name_hits_and_misses() {
        let text = r#"{"jobs": [
            {"name": "job_a", "url": "https://example.org/a", "method": "GET",
             "scheduled_interval": 10}
        ]}"#;
        let repository = JobRepository {
            jobs: parse_jobs(text).unwrap(),
        };
        assert_eq!(repository.by_name("job_a").unwrap().scheduled_interval, 10);
        assert!(repository.by_name("job_z").is_none());
    }

    #[test]
    fn missing_method_is_a_validation_failure() {
        let text = r#"{"jobs": [
            {"name": "job_a", "url": "https://example.org/a", "scheduled_interval": 10}
        ]}"#;
        assert!(matches!(
            parse_jobs(text),
            Err(Error::Validation { model: "Job", .. })
        ));
    }

    #[test]
    fn unparsable_document_is_invalid_source() {
        assert!(matches!(
            parse_jobs("not json"),
            Err(Error::InvalidSource(_))
        ));
        assert!(matches!(
            parse_jobs(r#"{"no_jobs_key": []}"#),
            Err(Error::InvalidSource(_))
        ));
    }

    #[test]
    fn starter_document_is_itself_valid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(JOBS_FILE);
        deploy_default_jobs(&path).unwrap();
        let jobs = parse_jobs(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].name, "example_job");
    }
}
