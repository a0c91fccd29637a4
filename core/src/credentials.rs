//! Credential resolution on top of an opaque secret vault.
//!
//! The vault itself is external; anything that can answer get/set/delete for
//! (service, key) pairs can sit behind [`SecretVault`]. Keys follow the
//! `<role>_username` / `<role>_password` convention.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::error::{Error, Result};
use crate::models::DbRole;

pub trait SecretVault: Send + Sync {
    fn get(&self, service: &str, key: &str) -> Result<Option<String>>;
    fn set(&self, service: &str, key: &str, value: &str) -> Result<()>;
    fn delete(&self, service: &str, key: &str) -> Result<()>;
}

/// Typed facade mapping a [`DbRole`] to its (username, password) pair.
#[derive(Clone)]
pub struct CredentialResolver {
    vault: Arc<dyn SecretVault>,
    service: String,
}

impl CredentialResolver {
    pub fn new(vault: Arc<dyn SecretVault>, service: impl Into<String>) -> Self {
        CredentialResolver {
            vault,
            service: service.into(),
        }
    }

    /// Look up the credential pair for a role. A missing entry means the
    /// system was never provisioned, which is [`Error::SetupRequired`].
    pub fn resolve(&self, role: DbRole) -> Result<(String, String)> {
        let username = self.fetch(role, role.username_key())?;
        let password = self.fetch(role, role.password_key())?;
        Ok((username, password))
    }

    fn fetch(&self, role: DbRole, key: String) -> Result<String> {
        self.vault
            .get(&self.service, &key)?
            .ok_or_else(|| Error::SetupRequired(format!("no vault entry '{key}' for role {role}")))
    }

    /// Store a credential pair, rejecting blank values up front.
    pub fn store(&self, role: DbRole, username: &str, password: &str) -> Result<()> {
        if username.trim().is_empty() {
            return Err(Error::EmptyCredential("username"));
        }
        if password.trim().is_empty() {
            return Err(Error::EmptyCredential("password"));
        }
        self.vault.set(&self.service, &role.username_key(), username)?;
        self.vault.set(&self.service, &role.password_key(), password)
    }

    /// Remove both entries for a role. Used to drop administrator credentials
    /// once provisioning is done.
    pub fn purge(&self, role: DbRole) -> Result<()> {
        self.vault.delete(&self.service, &role.username_key())?;
        self.vault.delete(&self.service, &role.password_key())
    }
}

/// Process-local vault, primarily for tests and wiring experiments.
#[derive(Default)]
pub struct MemoryVault {
    entries: Mutex<BTreeMap<(String, String), String>>,
}

impl SecretVault for MemoryVault {
    fn get(&self, service: &str, key: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| Error::Vault("memory vault poisoned".to_string()))?;
        Ok(entries.get(&(service.to_string(), key.to_string())).cloned())
    }

    fn set(&self, service: &str, key: &str, value: &str) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| Error::Vault("memory vault poisoned".to_string()))?;
        entries.insert((service.to_string(), key.to_string()), value.to_string());
        Ok(())
    }

    fn delete(&self, service: &str, key: &str) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| Error::Vault("memory vault poisoned".to_string()))?;
        entries.remove(&(service.to_string(), key.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> CredentialResolver {
        CredentialResolver::new(Arc::new(MemoryVault::default()), "httpmon")
    }

    #[test]
    fn resolve_before_store_is_setup_required() {
        let err = resolver().resolve(DbRole::Loader).unwrap_err();
        assert!(matches!(err, Error::SetupRequired(_)));
    }

    #[test]
    fn store_then_resolve_round_trips_for_every_role() {
        let resolver = resolver();
        for role in DbRole::ALL {
            let user = format!("{role}user");
            resolver.store(role, &user, "s3cret!pw").unwrap();
            assert_eq!(
                resolver.resolve(role).unwrap(),
                (user, "s3cret!pw".to_string())
            );
        }
    }

    #[test]
    fn blank_values_are_rejected_before_the_vault_is_touched() {
        let resolver = resolver();
        assert!(matches!(
            resolver.store(DbRole::Loader, "  ", "s3cret!pw"),
            Err(Error::EmptyCredential("username"))
        ));
        assert!(matches!(
            resolver.store(DbRole::Loader, "loader1", ""),
            Err(Error::EmptyCredential("password"))
        ));
        assert!(matches!(
            resolver.resolve(DbRole::Loader),
            Err(Error::SetupRequired(_))
        ));
    }

    #[test]
    fn purge_removes_both_entries() {
        let resolver = resolver();
        resolver
            .store(DbRole::Administrator, "postgres", "anything")
            .unwrap();
        resolver.purge(DbRole::Administrator).unwrap();
        assert!(matches!(
            resolver.resolve(DbRole::Administrator),
            Err(Error::SetupRequired(_))
        ));
    }
}
