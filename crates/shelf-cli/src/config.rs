//! CLI configuration resolved from flags, environment, and defaults.

use std::env;
use std::path::PathBuf;

use crate::error::CliError;

const DEFAULT_SERVER_URL: &str = "http://localhost:3000";

/// Resolved runtime configuration for a CLI invocation.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Book server base URL
    pub server_url: String,
    /// Bearer token; empty when the user never authenticated
    pub token: String,
    /// Path of the local cache database
    pub db_path: PathBuf,
}

impl CliConfig {
    /// Resolve configuration: flags win over environment, environment over
    /// defaults.
    pub fn resolve(
        server: Option<String>,
        token: Option<String>,
        db_path: Option<PathBuf>,
    ) -> Result<Self, CliError> {
        let server_url = server
            .or_else(|| env::var("SHELF_SERVER_URL").ok())
            .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());

        let token = token
            .or_else(|| env::var("SHELF_TOKEN").ok())
            .unwrap_or_default();

        let db_path = db_path
            .or_else(|| env::var_os("SHELF_DB_PATH").map(PathBuf::from))
            .map_or_else(default_db_path, Ok)?;

        Ok(Self {
            server_url,
            token,
            db_path,
        })
    }
}

fn default_db_path() -> Result<PathBuf, CliError> {
    dirs::data_dir()
        .map(|dir| dir.join("shelf").join("shelf.db"))
        .ok_or_else(|| CliError::Config("could not resolve a data directory".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_win_over_defaults() {
        let config = CliConfig::resolve(
            Some("http://books.example.com".to_string()),
            Some("secret".to_string()),
            Some(PathBuf::from("/tmp/shelf-test.db")),
        )
        .unwrap();

        assert_eq!(config.server_url, "http://books.example.com");
        assert_eq!(config.token, "secret");
        assert_eq!(config.db_path, PathBuf::from("/tmp/shelf-test.db"));
    }
}
