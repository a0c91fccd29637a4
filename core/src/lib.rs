//! Core types for the httpmon workspace: models, validation, roles,
//! credential resolution, and the shared error taxonomy.

pub mod credentials;
pub mod error;
pub mod models;
pub mod validate;

pub use credentials::{CredentialResolver, MemoryVault, SecretVault};
pub use error::{Error, Result, Violations};
pub use models::{AppConfig, Check, DbCredentials, DbRole, Job};

pub const fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!version().is_empty());
    }
}
