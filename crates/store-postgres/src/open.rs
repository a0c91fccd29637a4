use httpmon_core::{CredentialResolver, DbRole, Error, Result};
use sqlx::postgres::{PgConnectOptions, PgConnection, PgSslMode};
use sqlx::Connection;
use tracing::debug;

/// Handle on the relational store. Cheap to clone; holds no live connection,
/// only the coordinates and the credential resolver.
#[derive(Clone)]
pub struct Store {
    host: String,
    port: u16,
    db_name: String,
    db_name_default: String,
    resolver: CredentialResolver,
}

impl Store {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        db_name: impl Into<String>,
        db_name_default: impl Into<String>,
        resolver: CredentialResolver,
    ) -> Self {
        Store {
            host: host.into(),
            port,
            db_name: db_name.into(),
            db_name_default: db_name_default.into(),
            resolver,
        }
    }

    pub fn db_name(&self) -> &str {
        &self.db_name
    }

    pub(crate) fn db_name_default(&self) -> &str {
        &self.db_name_default
    }

    /// Open a fresh connection authenticated as the given role. Any failure to
    /// connect, including a missing database or login role, means the store
    /// was never provisioned; it is surfaced as [`Error::SetupRequired`] and
    /// never retried here.
    pub(crate) async fn connect(
        &self,
        role: DbRole,
        db_override: Option<&str>,
    ) -> Result<PgConnection> {
        let (username, password) = self.resolver.resolve(role)?;
        let database = db_override.unwrap_or(&self.db_name);
        debug!(%role, database, "opening store connection");
        let options = PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(database)
            .username(&username)
            .password(&password)
            .ssl_mode(PgSslMode::Require);
        PgConnection::connect_with(&options)
            .await
            .map_err(|e| Error::SetupRequired(format!("cannot connect as {role}: {e}")))
    }
}
