//! JSON-file implementation of the secret vault. Any concrete vault can sit
//! behind [`SecretVault`]; this one keeps (service, key) pairs in a single
//! file under the working directory, which is enough for a single-host
//! deployment and for exercising the full credential lifecycle.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use httpmon_core::{Error, Result, SecretVault};

type Entries = BTreeMap<String, BTreeMap<String, String>>;

pub struct FileVault {
    path: PathBuf,
}

impl FileVault {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileVault { path: path.into() }
    }

    fn read(&self) -> Result<Entries> {
        if !self.path.exists() {
            return Ok(Entries::default());
        }
        let text = fs::read_to_string(&self.path)
            .map_err(|e| Error::Vault(format!("reading {}: {e}", self.path.display())))?;
        serde_json::from_str(&text)
            .map_err(|e| Error::Vault(format!("decoding {}: {e}", self.path.display())))
    }

    fn write(&self, entries: &Entries) -> Result<()> {
        let text = serde_json::to_string_pretty(entries)
            .map_err(|e| Error::Vault(e.to_string()))?;
        fs::write(&self.path, text)
            .map_err(|e| Error::Vault(format!("writing {}: {e}", self.path.display())))
    }
}

impl SecretVault for FileVault {
    fn get(&self, service: &str, key: &str) -> Result<Option<String>> {
        Ok(self
            .read()?
            .get(service)
            .and_then(|keys| keys.get(key))
            .cloned())
    }

    fn set(&self, service: &str, key: &str, value: &str) -> Result<()> {
        let mut entries = self.read()?;
        entries
            .entry(service.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
        self.write(&entries)
    }

    fn delete(&self, service: &str, key: &str) -> Result<()> {
        let mut entries = self.read()?;
        if let Some(keys) = entries.get_mut(service) {
            keys.remove(key);
            if keys.is_empty() {
                entries.remove(service);
            }
        }
        self.write(&entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmon_core::{CredentialResolver, DbRole};
    use std::sync::Arc;

    #[test]
    fn survives_a_fresh_file_and_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let vault = FileVault::new(dir.path().join("vault.json"));
        assert_eq!(vault.get("httpmon", "missing").unwrap(), None);
        vault.set("httpmon", "loader_username", "loader1").unwrap();
        assert_eq!(
            vault.get("httpmon", "loader_username").unwrap().as_deref(),
            Some("loader1")
        );
        vault.delete("httpmon", "loader_username").unwrap();
        assert_eq!(vault.get("httpmon", "loader_username").unwrap(), None);
    }

    #[test]
    fn backs_the_resolver_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let vault = Arc::new(FileVault::new(dir.path().join("vault.json")));
        let resolver = CredentialResolver::new(vault, "httpmon");
        resolver
            .store(DbRole::Retriever, "retriever1", "s3cret!pw")
            .unwrap();
        assert_eq!(
            resolver.resolve(DbRole::Retriever).unwrap(),
            ("retriever1".to_string(), "s3cret!pw".to_string())
        );
    }
}
