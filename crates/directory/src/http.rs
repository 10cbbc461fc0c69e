//! HTTP coordinate directory client.
//!
//! GET with basic auth on a URL template; the response is a JSON array
//! whose first element carries the anchor's mounted coordinates.

use std::time::Duration;

use contracts::{ContractError, CoordinateDirectory, DirectoryConfig, Point3};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::error::DirectoryError;

/// First array element of the directory response; extra fields ignored.
#[derive(Debug, Deserialize)]
struct AnchorRecord {
    x: f64,
    y: f64,
    z: f64,
}

/// Coordinate directory backed by the configuration service's HTTP API.
pub struct HttpDirectory {
    client: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
}

impl HttpDirectory {
    /// Build a client from the blueprint's directory section.
    ///
    /// The configured timeout covers the whole request; on timeout the
    /// anchor is treated as unresolved.
    pub fn new(config: &DirectoryConfig) -> Result<Self, DirectoryError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    /// Substitute the anchor id into the URL template.
    fn endpoint_for(&self, anchor_id: &str) -> String {
        self.base_url.replacen("{}", anchor_id, 1)
    }

    #[instrument(name = "directory_fetch", skip(self), fields(anchor = anchor_id))]
    async fn fetch(&self, anchor_id: &str) -> Result<Point3, DirectoryError> {
        let url = self.endpoint_for(anchor_id);

        let response = self
            .client
            .get(&url)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DirectoryError::Status {
                status: status.as_u16(),
            });
        }

        let records: Vec<AnchorRecord> = response.json().await?;
        let record = records.into_iter().next().ok_or(DirectoryError::NotFound)?;

        debug!(
            anchor = anchor_id,
            x = record.x,
            y = record.y,
            z = record.z,
            "anchor resolved"
        );
        Ok(Point3::new(record.x, record.y, record.z))
    }
}

impl CoordinateDirectory for HttpDirectory {
    async fn resolve(&self, anchor_id: &str) -> Result<Point3, ContractError> {
        self.fetch(anchor_id)
            .await
            .map_err(|e| ContractError::anchor_resolution(anchor_id, e.to_string()))
    }
}
