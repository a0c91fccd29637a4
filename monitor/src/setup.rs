//! Non-interactive provisioning. Credentials for all three roles are
//! expected in the vault already (see the `credential` subcommand); this
//! creates the database, schema, and the two scoped login roles, then purges
//! the administrator pair — it is needed for provisioning only.

use std::path::Path;

use anyhow::Result;
use httpmon_core::{AppConfig, CredentialResolver, DbCredentials, DbRole};
use store_postgres::Store;
use tracing::info;

use crate::jobs;

pub async fn setup(config: &AppConfig, resolver: &CredentialResolver, store: &Store) -> Result<()> {
    let jobs_path = Path::new(&config.working_dir).join(jobs::JOBS_FILE);
    jobs::deploy_default_jobs(&jobs_path)?;

    store.init_database().await?;

    for role in [DbRole::Retriever, DbRole::Loader] {
        let (username, password) = resolver.resolve(role)?;
        let creds = DbCredentials::new(username, password, role)?;
        store.create_login_role(&creds).await?;
    }

    resolver.purge(DbRole::Administrator)?;
    info!("setup finished, administrator credentials purged from the vault");
    Ok(())
}
