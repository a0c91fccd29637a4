//! Administrator-role operations: one-time provisioning of the database,
//! schema, and the two scoped login roles.

use httpmon_core::{DbCredentials, DbRole, Error, Result};
use tracing::info;

use crate::db_err;
use crate::open::Store;
use crate::schema;

impl Store {
    /// Whether a login role with this name exists on the server.
    pub async fn role_exists(&self, username: &str) -> Result<bool> {
        let mut conn = self
            .connect(DbRole::Administrator, Some(self.db_name_default()))
            .await?;
        let row = sqlx::query("SELECT 1 FROM pg_roles WHERE rolname = $1")
            .bind(username)
            .fetch_optional(&mut conn)
            .await
            .map_err(db_err)?;
        Ok(row.is_some())
    }

    /// Create the database (from a connection to the default database, since
    /// CREATE DATABASE cannot target itself), then the schema and its tables.
    pub async fn init_database(&self) -> Result<()> {
        let create_db = schema::create_database_sql(self.db_name())?;
        let mut conn = self
            .connect(DbRole::Administrator, Some(self.db_name_default()))
            .await?;
        sqlx::raw_sql(&create_db)
            .execute(&mut conn)
            .await
            .map_err(db_err)?;

        let create_schema = schema::create_schema_sql(self.db_name())?;
        let mut conn = self.connect(DbRole::Administrator, None).await?;
        sqlx::raw_sql(&create_schema)
            .execute(&mut conn)
            .await
            .map_err(db_err)?;
        info!(database = self.db_name(), "database and schema created");
        Ok(())
    }

    pub async fn drop_schema(&self, schema_name: &str) -> Result<()> {
        let sql = schema::drop_schema_sql(schema_name)?;
        let mut conn = self.connect(DbRole::Administrator, None).await?;
        sqlx::raw_sql(&sql).execute(&mut conn).await.map_err(db_err)?;
        info!(schema = schema_name, "schema dropped");
        Ok(())
    }

    /// Create a login role scoped to the privileges its [`DbRole`] calls for.
    pub async fn create_login_role(&self, creds: &DbCredentials) -> Result<()> {
        if self.role_exists(&creds.username).await? {
            return Err(Error::RoleExists(creds.username.clone()));
        }
        let sql = schema::create_role_sql(self.db_name(), creds)?;
        let mut conn = self.connect(DbRole::Administrator, None).await?;
        sqlx::raw_sql(&sql).execute(&mut conn).await.map_err(db_err)?;
        info!(username = %creds.username, role = %creds.role, "login role created");
        Ok(())
    }
}
