//! Persisted and transmitted entities.
//!
//! Constructors are the single integrity gate: every model is built through
//! `new`, which runs the declarative schema and refuses invalid instances, so
//! nothing unvalidated ever reaches the store or the network.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use time::OffsetDateTime;

use crate::error::{Error, Result};
use crate::validate::{validate, Field, Rule, Value};

pub const HTTP_METHODS: &[&str] = &[
    "CONNECT", "DELETE", "GET", "HEAD", "OPTIONS", "PATCH", "POST", "PUT", "TRACE",
];

pub const LOG_LEVELS: &[&str] = &["debug", "info", "warning", "error", "critical"];

static NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_!]+$").expect("name pattern"));

static URL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^https?://(?:www\.)?[-a-zA-Z0-9@:%._\+~#=]{1,256}\.[a-zA-Z0-9()]{1,6}\b(?:[-a-zA-Z0-9()@:%_\+.~#?&/=]*)$",
    )
    .expect("url pattern")
});

static USERNAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]+$").expect("username pattern"));

static ALNUM_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9]+$").expect("alnum pattern"));

/// The three database roles. Dispatch on this enum is exhaustive, so adding a
/// role is a compile-checked change; arbitrary strings are rejected at the
/// [`FromStr`] boundary instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DbRole {
    /// Provisioning-only; its credentials are purged after setup.
    Administrator,
    /// Read-only access to jobs, checks, and raw findings.
    Retriever,
    /// Write access for job upserts and check inserts.
    Loader,
}

impl DbRole {
    pub const ALL: [DbRole; 3] = [DbRole::Administrator, DbRole::Retriever, DbRole::Loader];

    pub fn as_str(self) -> &'static str {
        match self {
            DbRole::Administrator => "administrator",
            DbRole::Retriever => "retriever",
            DbRole::Loader => "loader",
        }
    }

    /// Vault key for this role's username.
    pub fn username_key(self) -> String {
        format!("{}_username", self.as_str())
    }

    /// Vault key for this role's password.
    pub fn password_key(self) -> String {
        format!("{}_password", self.as_str())
    }
}

impl fmt::Display for DbRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DbRole {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "administrator" => Ok(DbRole::Administrator),
            "retriever" => Ok(DbRole::Retriever),
            "loader" => Ok(DbRole::Loader),
            _ => Err(Error::UnknownRole(s.to_string())),
        }
    }
}

/// A named, scheduled HTTP probe definition. `name` is the stable identity
/// used for upserts and for correlating checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub name: String,
    pub url: String,
    pub method: String,
    pub headers: BTreeMap<String, String>,
    pub body: BTreeMap<String, i64>,
    /// Empty when no extraction is configured; otherwise a compilable
    /// pattern of at most 100 characters.
    pub expected_regex: String,
    /// Seconds between probes, 5..=300.
    pub scheduled_interval: i64,
}

impl Job {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: String,
        url: String,
        method: String,
        headers: BTreeMap<String, String>,
        body: BTreeMap<String, i64>,
        expected_regex: String,
        scheduled_interval: i64,
    ) -> Result<Self> {
        let job = Job {
            name,
            url,
            method,
            headers,
            body,
            expected_regex,
            scheduled_interval,
        };
        let result = validate(&[
            Field {
                name: "name",
                value: Value::Text(&job.name),
                rules: &[
                    Rule::LenMin(5),
                    Rule::LenMax(50),
                    Rule::Matches(&NAME_PATTERN, "letters, digits, underscores, or bangs"),
                ],
            },
            Field {
                name: "url",
                value: Value::Text(&job.url),
                rules: &[Rule::LenMax(200), Rule::Matches(&URL_PATTERN, "an http(s) url")],
            },
            Field {
                name: "method",
                value: Value::Text(&job.method),
                rules: &[Rule::OneOf(HTTP_METHODS)],
            },
            Field {
                name: "expected_regex",
                value: Value::Text(&job.expected_regex),
                rules: &[Rule::AllowEmpty, Rule::LenMax(100)],
            },
            Field {
                name: "scheduled_interval",
                value: Value::Int(job.scheduled_interval),
                rules: &[Rule::Range(5, 300)],
            },
        ]);
        let mut violations = result.err().unwrap_or_default();
        if !job.expected_regex.is_empty() {
            if let Err(e) = Regex::new(&job.expected_regex) {
                violations.push("expected_regex", format!("uncompilable pattern: {e}"));
            }
        }
        if !violations.is_empty() {
            return Err(Error::Validation {
                model: "Job",
                violations,
            });
        }
        Ok(job)
    }
}

/// The immutable result of one executed probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Check {
    pub job_name: String,
    pub start_time: OffsetDateTime,
    pub end_time: OffsetDateTime,
    pub status_code: i32,
    /// First regex match in the response body; empty when no pattern was
    /// configured or nothing matched.
    pub regex_result: String,
}

impl Check {
    pub fn new(
        job_name: String,
        start_time: OffsetDateTime,
        end_time: OffsetDateTime,
        status_code: i32,
        regex_result: String,
    ) -> Result<Self> {
        let check = Check {
            job_name,
            start_time,
            end_time,
            status_code,
            regex_result,
        };
        let result = validate(&[
            Field {
                name: "job_name",
                value: Value::Text(&check.job_name),
                rules: &[
                    Rule::LenMin(5),
                    Rule::LenMax(50),
                    Rule::Matches(&NAME_PATTERN, "letters, digits, underscores, or bangs"),
                ],
            },
            Field {
                name: "status_code",
                value: Value::Int(check.status_code.into()),
                rules: &[Rule::Range(100, 599)],
            },
        ]);
        let mut violations = result.err().unwrap_or_default();
        if check.end_time < check.start_time {
            violations.push("end_time", "must not precede start_time");
        }
        if !violations.is_empty() {
            return Err(Error::Validation {
                model: "Check",
                violations,
            });
        }
        Ok(check)
    }
}

/// Login credentials for one database role. The password policy is waived for
/// the administrator, whose credentials come from the existing database
/// superuser rather than being minted here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbCredentials {
    pub username: String,
    pub password: String,
    pub role: DbRole,
}

impl DbCredentials {
    pub fn new(username: String, password: String, role: DbRole) -> Result<Self> {
        let creds = DbCredentials {
            username,
            password,
            role,
        };
        if creds.role == DbRole::Administrator {
            return Ok(creds);
        }
        validate(&[
            Field {
                name: "username",
                value: Value::Text(&creds.username),
                rules: &[
                    Rule::LenMin(3),
                    Rule::LenMax(50),
                    Rule::Matches(&USERNAME_PATTERN, "lowercase letters and digits"),
                ],
            },
            Field {
                name: "password",
                value: Value::Text(&creds.password),
                rules: &[Rule::Password],
            },
        ])
        .map_err(|violations| Error::Validation {
            model: "DbCredentials",
            violations,
        })?;
        Ok(creds)
    }
}

/// Application-level settings, validated once at load time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub working_dir: String,
    pub db_host: String,
    pub db_port: u16,
    pub db_name: String,
    pub db_name_default: String,
    pub vault_service_name: String,
    pub log_out_path: String,
    pub log_level: String,
}

impl AppConfig {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        working_dir: String,
        db_host: String,
        db_port: u16,
        db_name: String,
        db_name_default: String,
        vault_service_name: String,
        log_out_path: String,
        log_level: String,
    ) -> Result<Self> {
        let config = AppConfig {
            working_dir,
            db_host,
            db_port,
            db_name,
            db_name_default,
            vault_service_name,
            log_out_path,
            log_level,
        };
        validate(&[
            Field {
                name: "working_dir",
                value: Value::Text(&config.working_dir),
                rules: &[Rule::LenMin(1)],
            },
            Field {
                name: "db_host",
                value: Value::Text(&config.db_host),
                rules: &[Rule::LenMin(1)],
            },
            Field {
                name: "db_name",
                value: Value::Text(&config.db_name),
                rules: &[Rule::Matches(&ALNUM_PATTERN, "letters and digits")],
            },
            Field {
                name: "db_name_default",
                value: Value::Text(&config.db_name_default),
                rules: &[Rule::Matches(&ALNUM_PATTERN, "letters and digits")],
            },
            Field {
                name: "vault_service_name",
                value: Value::Text(&config.vault_service_name),
                rules: &[Rule::LenMin(3), Rule::LenMax(50)],
            },
            Field {
                name: "log_out_path",
                value: Value::Text(&config.log_out_path),
                rules: &[Rule::LenMin(1)],
            },
            Field {
                name: "log_level",
                value: Value::Text(&config.log_level),
                rules: &[Rule::OneOf(LOG_LEVELS)],
            },
        ])
        .map_err(|violations| Error::Validation {
            model: "AppConfig",
            violations,
        })?;
        Ok(config)
    }
}
