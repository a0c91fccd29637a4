//! Retriever-role reads. Every fetched row is rebuilt through the model
//! constructors, so a row that no longer satisfies the schema surfaces as
//! [`Error::DataCorruption`] instead of leaking into the scheduler.

use std::collections::BTreeMap;

use httpmon_core::{DbRole, Error, Job, Result};
use sqlx::postgres::PgRow;
use sqlx::Row;

use crate::db_err;
use crate::insert::decode_map;
use crate::open::Store;
use crate::schema::ident;
use crate::JobId;

const JOB_COLUMNS: &str = "id, name, url, method, headers, body, expected_regex, scheduled_interval";

impl Store {
    /// All persisted jobs, by name.
    pub async fn list_jobs(&self) -> Result<Vec<Job>> {
        let sql = format!(
            "SELECT {JOB_COLUMNS} FROM {schema}.jobs ORDER BY name",
            schema = ident(self.db_name())?
        );
        let mut conn = self.connect(DbRole::Retriever, None).await?;
        let rows = sqlx::query(&sql)
            .fetch_all(&mut conn)
            .await
            .map_err(db_err)?;
        rows.iter().map(job_from_row).collect()
    }

    /// One job by unique name, along with its generated id.
    pub async fn get_job(&self, name: &str) -> Result<(JobId, Job)> {
        let sql = format!(
            "SELECT {JOB_COLUMNS} FROM {schema}.jobs WHERE name = $1",
            schema = ident(self.db_name())?
        );
        let mut conn = self.connect(DbRole::Retriever, None).await?;
        let row = sqlx::query(&sql)
            .bind(name)
            .fetch_optional(&mut conn)
            .await
            .map_err(db_err)?
            .ok_or_else(|| Error::NotFound {
                what: "job",
                name: name.to_string(),
            })?;
        let id: JobId = row.try_get("id").map_err(db_err)?;
        Ok((id, job_from_row(&row)?))
    }
}

fn job_from_row(row: &PgRow) -> Result<Job> {
    let name: String = row.try_get("name").map_err(db_err)?;
    let url: String = row.try_get("url").map_err(db_err)?;
    let method: String = row.try_get("method").map_err(db_err)?;
    let headers: BTreeMap<String, String> =
        decode_map("jobs", "headers", row.try_get("headers").map_err(db_err)?)?;
    let body: BTreeMap<String, i64> =
        decode_map("jobs", "body", row.try_get("body").map_err(db_err)?)?;
    let expected_regex: Option<String> = row.try_get("expected_regex").map_err(db_err)?;
    let scheduled_interval: i32 = row.try_get("scheduled_interval").map_err(db_err)?;

    Job::new(
        name,
        url,
        method,
        headers,
        body,
        expected_regex.unwrap_or_default(),
        scheduled_interval.into(),
    )
    .map_err(|e| match e {
        Error::Validation { violations, .. } => Error::DataCorruption {
            table: "jobs",
            violations,
        },
        other => other,
    })
}
