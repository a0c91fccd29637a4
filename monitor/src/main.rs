use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use httpmon_core::{CredentialResolver, DbCredentials, DbRole, Error};
use store_postgres::Store;

mod config;
mod jobs;
mod logging;
mod scheduler;
mod setup;
mod vault;

use jobs::JobRepository;
use scheduler::Scheduler;
use vault::FileVault;

const VAULT_FILE: &str = "vault.json";

#[derive(Debug, Parser)]
#[command(name = "httpmon", version, about = "Periodic HTTP endpoint monitor with role-scoped persistence")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "httpmon.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Schedule all jobs and drive the tick loop until the process is killed
    Run {
        /// Load jobs from the declarative jobs file and store them, instead
        /// of reading the job set from the database
        #[arg(long)]
        from_file: bool,
    },
    /// Provision the database, schema, and scoped login roles
    Setup,
    /// Store a credential pair for a role in the vault
    Credential {
        /// One of administrator, retriever, loader
        #[arg(long)]
        role: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::load_config(&cli.config)?;
    let _log_guard = logging::init_logging(&config)?;

    let vault = FileVault::new(Path::new(&config.working_dir).join(VAULT_FILE));
    let resolver = CredentialResolver::new(Arc::new(vault), config.vault_service_name.as_str());
    let store = Store::new(
        config.db_host.as_str(),
        config.db_port,
        config.db_name.as_str(),
        config.db_name_default.as_str(),
        resolver.clone(),
    );

    match cli.command {
        Command::Credential {
            role,
            username,
            password,
        } => {
            let role: DbRole = role.parse()?;
            // Enforce the credential policy up front, not only at role
            // creation time.
            DbCredentials::new(username.clone(), password.clone(), role)?;
            resolver.store(role, &username, &password)?;
            println!("credential for role '{role}' stored");
            Ok(())
        }
        Command::Setup => setup::setup(&config, &resolver, &store).await,
        Command::Run { from_file } => {
            let repository = if from_file {
                let path = Path::new(&config.working_dir).join(jobs::JOBS_FILE);
                JobRepository::from_file(&path, &store).await?
            } else {
                JobRepository::from_store(&store).await?
            };
            let mut scheduler = Scheduler::new(store)?;
            scheduler.schedule_jobs(repository.all());
            match scheduler.run().await {
                Err(err) if matches!(err.downcast_ref::<Error>(), Some(Error::SetupRequired(_))) => {
                    eprintln!("{err}");
                    std::process::exit(1);
                }
                other => other,
            }
        }
    }
}
