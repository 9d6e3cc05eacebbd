//! Where dataset text comes from: a local directory or a remote base URL.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::blocking::Client;

use crate::data::catalog::DatasetConfig;
use crate::error::DatasetError;

const DEFAULT_DATA_DIR: &str = "data";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Location of the published CSVs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    Dir(PathBuf),
    /// Base URL; `DatasetConfig::source` is appended.
    Url(String),
}

impl DataSource {
    /// `RDS_DATA_URL` wins over `RDS_DATA_DIR`; `./data` otherwise.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        if let Ok(url) = std::env::var("RDS_DATA_URL")
            && !url.trim().is_empty()
        {
            return DataSource::Url(url.trim().trim_end_matches('/').to_string());
        }
        let dir = std::env::var("RDS_DATA_DIR").unwrap_or_else(|_| DEFAULT_DATA_DIR.to_string());
        DataSource::Dir(PathBuf::from(dir))
    }

    /// Interpret a `--data` argument.
    pub fn parse(arg: &str) -> Self {
        if arg.starts_with("http://") || arg.starts_with("https://") {
            DataSource::Url(arg.trim_end_matches('/').to_string())
        } else {
            DataSource::Dir(PathBuf::from(arg))
        }
    }

    /// Where `config` lives under this source (absolute URLs in the catalog win).
    pub fn locate(&self, config: &DatasetConfig) -> String {
        if is_url(&config.source) {
            return config.source.clone();
        }
        match self {
            DataSource::Dir(dir) => dir.join(&config.source).display().to_string(),
            DataSource::Url(base) => format!("{base}/{}", config.source.trim_start_matches('/')),
        }
    }

    /// Read the raw text of one dataset.
    pub fn fetch_text(&self, config: &DatasetConfig) -> Result<String, DatasetError> {
        let location = self.locate(config);
        tracing::info!(dataset = %config.id, %location, "loading dataset");

        if is_url(&location) {
            fetch_url(&config.id, &location)
        } else {
            fs::read_to_string(&location).map_err(|e| DatasetError::Fetch {
                dataset: config.id.clone(),
                message: format!("{location}: {e}"),
            })
        }
    }
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataSource::Dir(dir) => write!(f, "{}", dir.display()),
            DataSource::Url(url) => f.write_str(url),
        }
    }
}

fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

fn fetch_url(dataset: &str, url: &str) -> Result<String, DatasetError> {
    let fetch_err = |message: String| DatasetError::Fetch {
        dataset: dataset.to_string(),
        message,
    };

    let client = Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| fetch_err(format!("HTTP client setup failed: {e}")))?;

    let resp = client
        .get(url)
        .send()
        .map_err(|e| fetch_err(format!("request failed: {e}")))?;

    if !resp.status().is_success() {
        return Err(DatasetError::Status {
            dataset: dataset.to_string(),
            status: resp.status().as_u16(),
        });
    }

    resp.text()
        .map_err(|e| fetch_err(format!("failed to read response body: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::catalog::Catalog;

    #[test]
    fn locate_joins_dir_and_url() {
        let catalog = Catalog::builtin().unwrap();
        let config = catalog.get("eurostat_gerd").unwrap();

        let dir = DataSource::parse("fixtures");
        assert_eq!(
            dir.locate(config),
            PathBuf::from("fixtures").join(&config.source).display().to_string()
        );

        let url = DataSource::parse("https://example.org/rd/");
        assert_eq!(url, DataSource::Url("https://example.org/rd".to_string()));
        assert_eq!(url.locate(config), format!("https://example.org/rd/{}", config.source));
    }

    #[test]
    fn missing_file_is_a_fetch_error() {
        let catalog = Catalog::builtin().unwrap();
        let config = catalog.get("eurostat_gerd").unwrap();
        let source = DataSource::Dir(PathBuf::from("/nonexistent/rds"));
        let err = source.fetch_text(config).unwrap_err();
        assert!(matches!(err, DatasetError::Fetch { .. }));
        assert!(err.is_unavailable());
    }
}
