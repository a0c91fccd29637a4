//! One HTTP request/response cycle per job: issue the request, bracket it
//! with timestamps, record the status, and optionally extract the first
//! regex match from the response body.
//!
//! A non-2xx status is a result, not a failure; only transport-level faults
//! (DNS, refused connections, unusable request material) abort a probe, and
//! then no [`Check`] is produced. The client carries no timeout: a hung call
//! blocks the caller, which is the documented behavior of the tick loop.

use std::time::Instant;

use httpmon_core::{Check, Job};
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::info;

pub use reqwest::Client as HttpClient;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("job '{job}' has unusable request material: {reason}")]
    BadRequest { job: String, reason: String },

    #[error("transport failure probing job '{job}'")]
    Transport {
        job: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("job '{job}' has an uncompilable pattern")]
    Pattern {
        job: String,
        #[source]
        source: regex::Error,
    },

    #[error(transparent)]
    Model(#[from] httpmon_core::Error),
}

/// Shared client for all probes. Deliberately built without a timeout.
pub fn build_client() -> reqwest::Result<Client> {
    Client::builder()
        .user_agent(concat!("httpmon/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Execute one probe and build its [`Check`].
pub async fn probe(client: &Client, job: &Job) -> Result<Check, ProbeError> {
    let method = Method::from_bytes(job.method.as_bytes()).map_err(|e| ProbeError::BadRequest {
        job: job.name.clone(),
        reason: e.to_string(),
    })?;
    let headers = header_map(job)?;

    let start_time = OffsetDateTime::now_utc();
    let started = Instant::now();
    let response = client
        .request(method, job.url.as_str())
        .headers(headers)
        .form(&job.body)
        .send()
        .await
        .map_err(|source| ProbeError::Transport {
            job: job.name.clone(),
            source,
        })?;
    // Elapsed time up to the response head, not including body download.
    let end_time = start_time + started.elapsed();

    let status_code = i32::from(response.status().as_u16());
    let regex_result = if job.expected_regex.is_empty() {
        String::new()
    } else {
        let body = response
            .text()
            .await
            .map_err(|source| ProbeError::Transport {
                job: job.name.clone(),
                source,
            })?;
        check_regex(&job.expected_regex, &body).map_err(|source| ProbeError::Pattern {
            job: job.name.clone(),
            source,
        })?
    };

    let check = Check::new(
        job.name.clone(),
        start_time,
        end_time,
        status_code,
        regex_result,
    )?;
    info!(job = %job.name, status = check.status_code, "probe completed");
    Ok(check)
}

/// First match of `pattern` in `text`, or the empty string when nothing
/// matches. No match is not an error.
pub fn check_regex(pattern: &str, text: &str) -> Result<String, regex::Error> {
    let re = Regex::new(pattern)?;
    Ok(re
        .find(text)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default())
}

fn header_map(job: &Job) -> Result<HeaderMap, ProbeError> {
    let mut map = HeaderMap::with_capacity(job.headers.len());
    for (name, value) in &job.headers {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| ProbeError::BadRequest {
            job: job.name.clone(),
            reason: format!("header '{name}': {e}"),
        })?;
        let value = HeaderValue::from_str(value).map_err(|e| ProbeError::BadRequest {
            job: job.name.clone(),
            reason: format!("header value for '{name:?}': {e}"),
        })?;
        map.insert(name, value);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn job(name: &str, url: String, expected_regex: &str) -> Job {
        Job::new(
            name.to_string(),
            url,
            "GET".to_string(),
            BTreeMap::new(),
            BTreeMap::new(),
            expected_regex.to_string(),
            30,
        )
        .unwrap()
    }

    /// Serve exactly one canned HTTP response on a loopback port.
    async fn serve_once(response: String) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            if let Ok((mut stream, _)) = listener.accept().await {
                let mut buf = [0u8; 2048];
                let _ = stream.read(&mut buf).await;
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });
        port
    }

    fn http_response(status_line: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {status_line}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
    }

    #[test]
    fn check_regex_returns_first_match_or_empty() {
        let body = "<html><title>Example</title></html>";
        assert_eq!(
            check_regex("<title>(.*)</title>", body).unwrap(),
            "<title>Example</title>"
        );
        assert_eq!(check_regex("<title>(.*)</title>", "no titles here").unwrap(), "");
    }

    #[tokio::test]
    async fn non_2xx_status_still_produces_a_check() {
        let port = serve_once(http_response("503 Service Unavailable", "down")).await;
        let client = build_client().unwrap();
        let job = job("job_503", format!("http://127.0.0.1:{port}/"), "");
        let check = probe(&client, &job).await.unwrap();
        assert_eq!(check.status_code, 503);
        assert_eq!(check.regex_result, "");
        assert!(check.end_time >= check.start_time);
    }

    #[tokio::test]
    async fn configured_pattern_is_extracted_from_the_body() {
        let body = "<html><title>Example</title></html>";
        let port = serve_once(http_response("200 OK", body)).await;
        let client = build_client().unwrap();
        let job = job(
            "job_title",
            format!("http://127.0.0.1:{port}/"),
            "<title>(.*)</title>",
        );
        let check = probe(&client, &job).await.unwrap();
        assert_eq!(check.status_code, 200);
        assert_eq!(check.regex_result, "<title>Example</title>");
    }

    #[tokio::test]
    async fn refused_connection_is_a_transport_failure() {
        // Bind then drop to get a port nothing listens on.
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let client = build_client().unwrap();
        let job = job("job_gone", format!("http://127.0.0.1:{port}/"), "");
        assert!(matches!(
            probe(&client, &job).await,
            Err(ProbeError::Transport { .. })
        ));
    }

    #[tokio::test]
    async fn unusable_header_material_fails_before_the_wire() {
        let mut headers = BTreeMap::new();
        headers.insert("bad header".to_string(), "x".to_string());
        let job = Job::new(
            "job_hdrs".to_string(),
            "http://127.0.0.1:1/".to_string(),
            "GET".to_string(),
            headers,
            BTreeMap::new(),
            String::new(),
            30,
        )
        .unwrap();
        let client = build_client().unwrap();
        assert!(matches!(
            probe(&client, &job).await,
            Err(ProbeError::BadRequest { .. })
        ));
    }
}
