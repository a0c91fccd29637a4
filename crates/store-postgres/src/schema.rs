//! DDL text and the two substitution classes it is built from: allow-listed,
//! quoted identifiers and quote-doubled literals. Row values elsewhere are
//! always `$n`-bound; these helpers exist only for the places Postgres will
//! not accept a bind parameter (identifiers, CREATE ROLE passwords).

use httpmon_core::{DbCredentials, DbRole, Error, Result};

/// Quote an identifier after checking it against the allow-list: ASCII
/// alphanumerics and underscores, leading letter, at most 63 bytes.
pub(crate) fn ident(name: &str) -> Result<String> {
    let mut chars = name.chars();
    let head_ok = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
    let tail_ok = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if head_ok && tail_ok && name.len() <= 63 {
        Ok(format!("\"{name}\""))
    } else {
        Err(Error::InvalidIdentifier(name.to_string()))
    }
}

/// Quote a string literal, doubling embedded quotes.
pub(crate) fn literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

pub(crate) fn create_database_sql(db_name: &str) -> Result<String> {
    Ok(format!("CREATE DATABASE {};", ident(db_name)?))
}

/// Schema plus the three tables. The schema is named after the database, as
/// the tables are always addressed schema-qualified.
pub(crate) fn create_schema_sql(db_name: &str) -> Result<String> {
    let schema = ident(db_name)?;
    Ok(format!(
        r#"
CREATE SCHEMA {schema};
CREATE TABLE {schema}.regex_raw (
    id              SERIAL PRIMARY KEY,
    raw_finding     TEXT
);
CREATE TABLE {schema}.jobs (
    id                  SERIAL PRIMARY KEY,
    name                VARCHAR(50) UNIQUE NOT NULL,
    url                 VARCHAR(200) NOT NULL,
    method              VARCHAR(10) NOT NULL,
    headers             TEXT,
    body                TEXT,
    expected_regex      VARCHAR(100),
    scheduled_interval  INT DEFAULT 60
);
CREATE TABLE {schema}.checks (
    id              SERIAL PRIMARY KEY,
    job_id          INT REFERENCES {schema}.jobs(id),
    start_ts        TIMESTAMPTZ NOT NULL,
    end_ts          TIMESTAMPTZ NOT NULL,
    status_code     INT NOT NULL,
    regex_result_id INT REFERENCES {schema}.regex_raw(id)
);
"#
    ))
}

pub(crate) fn drop_schema_sql(schema_name: &str) -> Result<String> {
    Ok(format!("DROP SCHEMA {} CASCADE;", ident(schema_name)?))
}

/// CREATE ROLE plus the grants that scope it. Loader gets full DML on every
/// table; Retriever gets SELECT on exactly the three tables and nothing else.
pub(crate) fn create_role_sql(db_name: &str, creds: &DbCredentials) -> Result<String> {
    let schema = ident(db_name)?;
    let username = ident(&creds.username)?;
    let password = literal(&creds.password);

    let grants = match creds.role {
        DbRole::Loader => format!(
            "GRANT SELECT, INSERT, UPDATE, DELETE ON ALL TABLES IN SCHEMA {schema} TO {username};"
        ),
        DbRole::Retriever => format!(
            "GRANT SELECT ON {schema}.jobs TO {username};\n\
             GRANT SELECT ON {schema}.checks TO {username};\n\
             GRANT SELECT ON {schema}.regex_raw TO {username};"
        ),
        // The administrator login pre-exists; it is never minted here.
        DbRole::Administrator => {
            return Err(Error::RoleExists(creds.username.clone()));
        }
    };

    Ok(format!(
        "CREATE ROLE {username} LOGIN PASSWORD {password};\n\
         GRANT CONNECT ON DATABASE {schema} TO {username};\n\
         GRANT USAGE ON SCHEMA {schema} TO {username};\n\
         GRANT USAGE, SELECT ON ALL SEQUENCES IN SCHEMA {schema} TO {username};\n\
         {grants}"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ident_rejects_injection_material() {
        assert_eq!(ident("httpmon").unwrap(), "\"httpmon\"");
        assert_eq!(ident("regex_raw").unwrap(), "\"regex_raw\"");
        for bad in ["", "1db", "db name", "db;drop", "db\"x", "pg-role"] {
            assert!(matches!(ident(bad), Err(Error::InvalidIdentifier(_))), "{bad}");
        }
    }

    #[test]
    fn literal_doubles_quotes() {
        assert_eq!(literal("pa'ss"), "'pa''ss'");
    }

    #[test]
    fn schema_ddl_creates_all_three_tables() {
        let sql = create_schema_sql("httpmon").unwrap();
        for table in ["jobs", "checks", "regex_raw"] {
            assert!(sql.contains(&format!("CREATE TABLE \"httpmon\".{table}")));
        }
    }

    fn creds(role: DbRole) -> DbCredentials {
        DbCredentials::new("user1".into(), "s3cret!pw".into(), role).unwrap()
    }

    #[test]
    fn retriever_grants_are_select_only() {
        let sql = create_role_sql("httpmon", &creds(DbRole::Retriever)).unwrap();
        assert!(sql.contains("GRANT SELECT ON \"httpmon\".jobs"));
        assert!(!sql.contains("INSERT"));
        assert!(!sql.contains("DELETE"));
    }

    #[test]
    fn loader_grants_cover_dml() {
        let sql = create_role_sql("httpmon", &creds(DbRole::Loader)).unwrap();
        assert!(sql.contains("GRANT SELECT, INSERT, UPDATE, DELETE ON ALL TABLES"));
    }

    #[test]
    fn administrator_is_never_minted() {
        let admin =
            DbCredentials::new("postgres".into(), "anything".into(), DbRole::Administrator)
                .unwrap();
        assert!(matches!(
            create_role_sql("httpmon", &admin),
            Err(Error::RoleExists(_))
        ));
    }
}
