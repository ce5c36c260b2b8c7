/// Locating and fetching the readings document
use std::path::PathBuf;

use log::debug;
use url::Url;

use crate::error::LoadError;
use crate::models::SensorRecord;

/// Where a readings document lives.
#[derive(Debug, Clone, PartialEq)]
pub enum Locator {
    Path(PathBuf),
    Http(Url),
}

/// Resolve a locator string.
///
/// Relative or absolute paths (anything without a scheme) and `file://`
/// URLs are read from disk; `http://` and `https://` URLs are fetched.
pub fn resolve(locator: &str) -> Result<Locator, LoadError> {
    match Url::parse(locator) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(Locator::Http(url)),
            "file" => url
                .to_file_path()
                .map(Locator::Path)
                .map_err(|_| LoadError::Locator(format!("'{}' is not a local file", locator))),
            other => Err(LoadError::Locator(format!(
                "unsupported scheme '{}' in '{}'",
                other, locator
            ))),
        },
        Err(url::ParseError::RelativeUrlWithoutBase) => Ok(Locator::Path(PathBuf::from(locator))),
        Err(e) => Err(LoadError::Locator(format!("'{}': {}", locator, e))),
    }
}

/// Fetch the raw readings document behind a locator.
pub async fn fetch(locator: &str) -> Result<String, LoadError> {
    match resolve(locator)? {
        Locator::Path(path) => {
            debug!("Reading sensors from file {}", path.display());
            tokio::fs::read_to_string(&path)
                .await
                .map_err(|source| LoadError::Io {
                    path: path.display().to_string(),
                    source,
                })
        }
        Locator::Http(url) => {
            debug!("Fetching sensors from {}", url);
            let response = reqwest::get(url).await?;
            let status = response.status();
            if !status.is_success() {
                return Err(LoadError::Status {
                    status: status.as_u16(),
                    reason: status.canonical_reason().unwrap_or("unknown").to_string(),
                });
            }
            Ok(response.text().await?)
        }
    }
}

/// Parse a readings document: a JSON array of plain records.
pub fn parse_records(body: &str) -> Result<Vec<SensorRecord>, LoadError> {
    Ok(serde_json::from_str(body)?)
}
