use std::env;

/// Database configuration.
///
/// Reads from the `COACHWISE_DATABASE_URL` environment variable, falling back
/// to `postgresql://localhost:5432/coachwise` when unset.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Full PostgreSQL connection URL.
    pub database_url: String,
}

impl DbConfig {
    /// The default connection URL used when no environment variable is set.
    pub const DEFAULT_URL: &str = "postgresql://localhost:5432/coachwise";

    /// Environment variable consulted by [`DbConfig::from_env`].
    pub const ENV_VAR: &str = "COACHWISE_DATABASE_URL";

    /// Build a config from the environment.
    pub fn from_env() -> Self {
        let database_url =
            env::var(Self::ENV_VAR).unwrap_or_else(|_| Self::DEFAULT_URL.to_owned());
        Self { database_url }
    }

    /// Build a config from an explicit URL.
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
        }
    }

    /// Split the URL into everything before the query string and the query
    /// string itself (including its leading `?`, empty when absent).
    fn split_query(&self) -> (&str, &str) {
        match self.database_url.find('?') {
            Some(pos) => self.database_url.split_at(pos),
            None => (self.database_url.as_str(), ""),
        }
    }

    /// Extract the database name from the URL, ignoring any query string.
    ///
    /// Returns `None` if the URL has no path component.
    pub fn database_name(&self) -> Option<&str> {
        let (base, _) = self.split_query();
        base.rsplit_once('/')
            .map(|(_, name)| name)
            .filter(|s| !s.is_empty())
    }

    /// URL of the `postgres` maintenance database on the same server, used to
    /// issue `CREATE DATABASE` when the target does not exist yet. Connection
    /// parameters in the query string are kept.
    pub fn maintenance_url(&self) -> String {
        let (base, query) = self.split_query();
        match base.rsplit_once('/') {
            Some((server, _)) => format!("{server}/postgres{query}"),
            None => self.database_url.clone(),
        }
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
