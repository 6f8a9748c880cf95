use std::env;

use reqwest::Url;

use super::error::{CouchDaoError, CouchResult};

const DEFAULT_DB: &str = "progress_board";

/// Where the CouchDB server lives and how to authenticate against it.
#[derive(Debug, Clone)]
pub struct CouchConfig {
    /// Server root, without the database segment.
    pub base_url: Url,
    pub database: String,
    /// Basic-auth username and password.
    pub credentials: Option<(String, String)>,
}

impl CouchConfig {
    /// Validate `base_url` and target `database` on that server.
    pub fn new(base_url: &str, database: impl Into<String>) -> CouchResult<Self> {
        let invalid = |reason: String| CouchDaoError::InvalidBaseUrl {
            url: base_url.to_owned(),
            reason,
        };
        let parsed = Url::parse(base_url.trim_end_matches('/')).map_err(|err| invalid(err.to_string()))?;
        if parsed.cannot_be_a_base() {
            return Err(invalid("URL cannot have path segments".into()));
        }

        Ok(Self {
            base_url: parsed,
            database: database.into(),
            credentials: None,
        })
    }

    /// Read `COUCH_BASE_URL` (required), `COUCH_DB`, and the optional
    /// `COUCH_USERNAME`/`COUCH_PASSWORD` pair.
    pub fn from_env() -> CouchResult<Self> {
        let base_url = env::var("COUCH_BASE_URL").map_err(|_| CouchDaoError::MissingEnvVar {
            var: "COUCH_BASE_URL",
        })?;
        let database = env::var("COUCH_DB").unwrap_or_else(|_| DEFAULT_DB.into());

        let mut config = Self::new(&base_url, database)?;
        config.credentials = env::var("COUCH_USERNAME")
            .ok()
            .zip(env::var("COUCH_PASSWORD").ok());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_ignored() {
        let config = CouchConfig::new("http://localhost:5984/", "boards").unwrap();
        assert_eq!(config.base_url.as_str(), "http://localhost:5984/");
        assert_eq!(config.database, "boards");
        assert!(config.credentials.is_none());
    }

    #[test]
    fn rejects_urls_without_a_path() {
        let err = CouchConfig::new("mailto:admin@example.com", "boards").unwrap_err();
        assert!(matches!(err, CouchDaoError::InvalidBaseUrl { .. }));
    }

    #[test]
    fn rejects_unparseable_urls() {
        assert!(CouchConfig::new("not a url", "boards").is_err());
    }
}
