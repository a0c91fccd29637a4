//! Loader-role writes: job upserts and check inserts.

use httpmon_core::{Check, DbRole, Error, Job, Result, Violations};
use sqlx::Row;
use tracing::debug;

use crate::db_err;
use crate::open::Store;
use crate::schema::ident;

impl Store {
    /// Insert a job, or replace every mutable field of the row with the same
    /// name. The name itself is never updated; it is the row's identity.
    pub async fn upsert_job(&self, job: &Job) -> Result<()> {
        let sql = upsert_job_sql(self.db_name())?;
        let mut conn = self.connect(DbRole::Loader, None).await?;
        sqlx::query(&sql)
            .bind(&job.name)
            .bind(&job.url)
            .bind(&job.method)
            .bind(encode_map(&job.headers)?)
            .bind(encode_map(&job.body)?)
            .bind(&job.expected_regex)
            .bind(job.scheduled_interval as i32)
            .execute(&mut conn)
            .await
            .map_err(db_err)?;
        debug!(job = %job.name, "job upserted");
        Ok(())
    }

    /// Persist one check. The job's identity is resolved through a
    /// Retriever-role lookup first; when the job has a pattern and the check
    /// carries a match, the raw finding is stored and referenced.
    pub async fn insert_check(&self, check: &Check) -> Result<()> {
        let (job_id, job) = self.get_job(&check.job_name).await?;

        let mut regex_result_id: Option<i32> = None;
        if !job.expected_regex.is_empty() && !check.regex_result.is_empty() {
            let sql = format!(
                "INSERT INTO {schema}.regex_raw (raw_finding) VALUES ($1) RETURNING id",
                schema = ident(self.db_name())?
            );
            let mut conn = self.connect(DbRole::Loader, None).await?;
            let row = sqlx::query(&sql)
                .bind(&check.regex_result)
                .fetch_one(&mut conn)
                .await
                .map_err(db_err)?;
            regex_result_id = Some(row.try_get("id").map_err(db_err)?);
        }

        let sql = format!(
            "INSERT INTO {schema}.checks \
                 (job_id, start_ts, end_ts, status_code, regex_result_id) \
             VALUES ($1, $2, $3, $4, $5)",
            schema = ident(self.db_name())?
        );
        let mut conn = self.connect(DbRole::Loader, None).await?;
        sqlx::query(&sql)
            .bind(job_id)
            .bind(check.start_time)
            .bind(check.end_time)
            .bind(check.status_code)
            .bind(regex_result_id)
            .execute(&mut conn)
            .await
            .map_err(db_err)?;
        debug!(job = %check.job_name, status = check.status_code, "check inserted");
        Ok(())
    }
}

/// The job upsert statement: conflict target is `name`, and every mutable
/// field is replaced from the incoming row. `name` itself never appears in
/// the update list.
fn upsert_job_sql(schema: &str) -> Result<String> {
    Ok(format!(
        "INSERT INTO {schema}.jobs \
             (name, url, method, headers, body, expected_regex, scheduled_interval) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         ON CONFLICT (name) DO UPDATE SET \
             url = EXCLUDED.url, \
             method = EXCLUDED.method, \
             headers = EXCLUDED.headers, \
             body = EXCLUDED.body, \
             expected_regex = EXCLUDED.expected_regex, \
             scheduled_interval = EXCLUDED.scheduled_interval",
        schema = ident(schema)?
    ))
}

pub(crate) fn encode_map<T: serde::Serialize>(map: &T) -> Result<String> {
    serde_json::to_string(map).map_err(|e| Error::Db(Box::new(e)))
}

pub(crate) fn decode_map<T: serde::de::DeserializeOwned + Default>(
    table: &'static str,
    field: &'static str,
    raw: Option<String>,
) -> Result<T> {
    match raw {
        None => Ok(T::default()),
        Some(raw) if raw.is_empty() => Ok(T::default()),
        Some(raw) => serde_json::from_str(&raw).map_err(|e| {
            let mut violations = Violations::default();
            violations.push(field, format!("undecodable mapping: {e}"));
            Error::DataCorruption { table, violations }
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn upsert_conflicts_on_name_and_never_rewrites_it() {
        let sql = upsert_job_sql("httpmon").unwrap();
        let (_, update_list) = sql.split_once("ON CONFLICT (name) DO UPDATE SET").unwrap();
        assert!(!update_list.contains("name = EXCLUDED.name"));
        for column in ["url", "method", "headers", "body", "expected_regex", "scheduled_interval"] {
            assert!(update_list.contains(&format!("{column} = EXCLUDED.{column}")));
        }
    }

    #[test]
    fn upsert_rejects_unquotable_schema_names() {
        assert!(upsert_job_sql("db;drop").is_err());
    }

    #[test]
    fn maps_round_trip_as_json_text() {
        let mut headers = BTreeMap::new();
        headers.insert("accept".to_string(), "text/html".to_string());
        let encoded = encode_map(&headers).unwrap();
        let decoded: BTreeMap<String, String> =
            decode_map("jobs", "headers", Some(encoded)).unwrap();
        assert_eq!(decoded, headers);
    }

    #[test]
    fn null_and_empty_columns_decode_to_empty_maps() {
        let decoded: BTreeMap<String, i64> = decode_map("jobs", "body", None).unwrap();
        assert!(decoded.is_empty());
        let decoded: BTreeMap<String, i64> =
            decode_map("jobs", "body", Some(String::new())).unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn garbage_columns_are_data_corruption() {
        let err = decode_map::<BTreeMap<String, String>>(
            "jobs",
            "headers",
            Some("{'python': 'repr'}".to_string()),
        )
        .unwrap_err();
        assert!(matches!(err, Error::DataCorruption { table: "jobs", .. }));
    }
}
