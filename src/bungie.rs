//! Bungie.net Platform API boundary.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::archive::{self, ArchiveError, ContentArchive};
use crate::snapshot::ProfileResponse;

const BASE_URL: &str = "https://www.bungie.net";
const API_KEY_HEADER: &str = "X-API-Key";

/// `ErrorCode` value Bungie uses for a successful response.
const PLATFORM_SUCCESS: i32 = 1;

const COMPONENT_CHARACTERS: u32 = 200;
const COMPONENT_CHARACTER_ACTIVITIES: u32 = 204;

#[derive(Debug, thiserror::Error)]
pub enum BungieError {
    #[error("request failed: {0}")]
    Transfer(#[from] reqwest::Error),

    #[error("HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error("Bungie API error {code}: {status}")]
    Platform { code: i32, status: String },

    #[error("response envelope carried no body")]
    MissingResponse,
}

/// Envelope wrapped around every Platform response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServerResponse<T> {
    pub error_code: i32,
    #[serde(default)]
    pub error_status: String,
    pub response: Option<T>,
}

/// The slice of `Destiny2/Manifest/` this daemon cares about: where the
/// per-locale world content database lives.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestInfo {
    #[serde(default)]
    pub version: String,
    pub mobile_world_content_paths: HashMap<String, String>,
}

/// The telemetry calls the rest of the daemon needs. `ManifestCache` and
/// `SnapshotProvider` hold this as a trait object so tests can substitute a
/// fake without any network.
#[async_trait]
pub trait BungieApi: Send + Sync {
    async fn get_manifest(&self) -> Result<ManifestInfo, BungieError>;

    async fn get_profile(
        &self,
        membership_type: i32,
        membership_id: &str,
    ) -> Result<ProfileResponse, BungieError>;

    async fn get_content_archive(&self, path: &str) -> Result<ContentArchive, ArchiveError>;
}

pub struct BungieClient {
    http: reqwest::Client,
    api_key: String,
}

impl BungieClient {
    pub fn new(api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, BungieError> {
        let response = self
            .http
            .get(url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(BungieError::Status(response.status()));
        }

        let envelope: ServerResponse<T> = response.json().await?;
        if envelope.error_code != PLATFORM_SUCCESS {
            return Err(BungieError::Platform {
                code: envelope.error_code,
                status: envelope.error_status,
            });
        }

        envelope.response.ok_or(BungieError::MissingResponse)
    }
}

fn platform_url(path: &str, components: &[u32]) -> String {
    let mut url = format!("{BASE_URL}/Platform/{path}");
    if !components.is_empty() {
        let components = components
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        url.push_str("?components=");
        url.push_str(&components);
    }
    url
}

#[async_trait]
impl BungieApi for BungieClient {
    async fn get_manifest(&self) -> Result<ManifestInfo, BungieError> {
        self.get_json(&platform_url("Destiny2/Manifest/", &[])).await
    }

    async fn get_profile(
        &self,
        membership_type: i32,
        membership_id: &str,
    ) -> Result<ProfileResponse, BungieError> {
        let path = format!("Destiny2/{membership_type}/Profile/{membership_id}/");
        self.get_json(&platform_url(
            &path,
            &[COMPONENT_CHARACTERS, COMPONENT_CHARACTER_ACTIVITIES],
        ))
        .await
    }

    async fn get_content_archive(&self, path: &str) -> Result<ContentArchive, ArchiveError> {
        // Content downloads are plain GETs outside the /Platform envelope.
        archive::fetch(&self.http, &format!("{BASE_URL}{path}")).await
    }
}
