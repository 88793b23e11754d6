//! Blocking HTTP client for the Shelley API

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};

use crate::error::{HostError, Result};
use crate::platform::HostPlatform;
use crate::types::{ConversationSnapshot, ConversationState, CreatedConversation, LaunchRequest};

/// Default base URL of the Shelley API
pub const DEFAULT_API_BASE: &str = "http://localhost:9999/api";
/// Default value of the `X-Exedev-Userid` header
pub const DEFAULT_USER_ID: &str = "power-toys";

const REQUEST_MARKER: HeaderName = HeaderName::from_static("x-shelley-request");
const USER_ID: HeaderName = HeaderName::from_static("x-exedev-userid");

/// Connection settings for [`ShelleyClient`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostConfig {
    /// Base URL, e.g. `http://localhost:9999/api`
    pub base_url: String,
    /// Caller identity sent with every request
    pub user_id: String,
    /// Upper bound on a single request
    pub request_timeout: Duration,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE.to_string(),
            user_id: DEFAULT_USER_ID.to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Shelley API client
#[derive(Debug, Clone)]
pub struct ShelleyClient {
    http: Client,
    base_url: String,
}

impl ShelleyClient {
    /// Build a client for the given host.
    pub fn new(config: HostConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(REQUEST_MARKER, HeaderValue::from_static("1"));
        headers.insert(
            USER_ID,
            HeaderValue::from_str(&config.user_id).map_err(|e| HostError::InvalidResponse {
                message: format!("invalid user id header '{}': {}", config.user_id, e),
            })?,
        );

        let http = Client::builder()
            .timeout(config.request_timeout)
            .default_headers(headers)
            .build()
            .map_err(HostError::Client)?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl HostPlatform for ShelleyClient {
    fn create_conversation(&self, request: &LaunchRequest) -> Result<String> {
        let url = self.url("/conversations/new");
        tracing::debug!(%url, model = %request.model, cwd = %request.cwd, "creating conversation");

        let response = self
            .http
            .post(&url)
            .json(request)
            .send()
            .map_err(unavailable)?;

        let status = response.status();
        if !status.is_success() {
            return Err(HostError::Rejected {
                status: status.as_u16(),
                body: body_text(response),
            });
        }

        let created: CreatedConversation = response.json().map_err(invalid)?;
        if created.conversation_id.trim().is_empty() {
            return Err(HostError::InvalidResponse {
                message: "empty conversation_id".to_string(),
            });
        }
        Ok(created.conversation_id)
    }

    fn conversation_state(&self, handle: &str) -> Result<ConversationState> {
        let url = self.url(&format!("/conversation/{}", handle));
        let response = self.http.get(&url).send().map_err(unavailable)?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                return Ok(ConversationState::Error(
                    "remote conversation not found".to_string(),
                ));
            }
            status if !status.is_success() => {
                return Err(HostError::Unavailable {
                    message: format!("HTTP {}: {}", status.as_u16(), body_text(response)),
                });
            }
            _ => {}
        }

        let snapshot: ConversationSnapshot = response.json().map_err(invalid)?;
        Ok(snapshot.state())
    }
}

fn body_text(response: Response) -> String {
    response.text().unwrap_or_default()
}

fn unavailable(e: reqwest::Error) -> HostError {
    HostError::Unavailable {
        message: e.to_string(),
    }
}

fn invalid(e: reqwest::Error) -> HostError {
    HostError::InvalidResponse {
        message: e.to_string(),
    }
}
