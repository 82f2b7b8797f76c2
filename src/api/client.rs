//! HTTP client for the DataPulse backend.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use uuid::Uuid;

use super::DataPulseApi;
use super::models::{
    Account, AccountId, AccountUpdate, Connection, ConnectionId, ConnectionUpdate, Member,
    MemberId, MemberUpdate, NewAccount, NewConnection, NewMember, SyncStatusReport,
};
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::etl::ScenarioRunRequest;

const REQUEST_ID_HEADER: &str = "x-request-id";
const CORRELATION_ID_HEADER: &str = "x-correlation-id";

/// Error body returned by the backend services.
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    details: Option<String>,
    #[serde(default)]
    correlation_id: Option<String>,
}

/// `reqwest`-backed [`DataPulseApi`].
#[derive(Debug, Clone)]
pub struct HttpApiClient {
    client: reqwest::Client,
    base_url: String,
    auth_header: Option<HeaderValue>,
}

impl HttpApiClient {
    /// Create a client for `base_url`, optionally sending a bearer token.
    pub fn new(
        base_url: &str,
        token: Option<&SecretString>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let auth_header = match token {
            Some(token) => {
                let mut value =
                    HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
                        .map_err(|e| ApiError::transport(format!("Invalid API token format: {e}")))?;
                value.set_sensitive(true);
                Some(value)
            }
            None => None,
        };

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::transport(format!("Failed to initialize HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_header,
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, ApiError> {
        Self::new(
            &config.api_base_url,
            config.api_token.as_ref(),
            config.request_timeout,
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!(%method, %url, "DataPulse request");

        let mut builder = self
            .client
            .request(method, url)
            .header(REQUEST_ID_HEADER, Uuid::new_v4().to_string());
        if let Some(ref auth) = self.auth_header {
            builder = builder.header(AUTHORIZATION, auth.clone());
        }
        builder
    }

    /// Send a request; non-2xx responses become [`ApiError`].
    async fn send(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::transport(format!("Request failed: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let headers = response.headers().clone();
        let body = response.text().await.unwrap_or_default();
        let err = normalize_error(status, &headers, &body);
        warn!(
            status = err.status,
            correlation_id = ?err.correlation_id,
            "DataPulse request failed: {}",
            err.message
        );
        Err(err)
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let response = self.send(builder).await?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::transport(format!("Failed to read response: {e}")))?;

        serde_json::from_str(&body).map_err(|e| {
            ApiError::new(status, "Failed to parse response")
                .with_details(format!("{e}: {}", truncate(&body, 200)))
        })
    }

    async fn send_empty(&self, builder: RequestBuilder) -> Result<u16, ApiError> {
        let response = self.send(builder).await?;
        Ok(response.status().as_u16())
    }
}

/// Normalize a non-2xx response into the error shape the workflow sees.
pub(crate) fn normalize_error(status: StatusCode, headers: &HeaderMap, body: &str) -> ApiError {
    let header_correlation = headers
        .get(CORRELATION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let fallback_message = || {
        status
            .canonical_reason()
            .map(str::to_string)
            .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
    };

    let mut err = match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) => {
            let mut err = ApiError::new(
                status.as_u16(),
                parsed
                    .message
                    .or(parsed.error)
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(fallback_message),
            );
            err.details = parsed.details;
            err.correlation_id = parsed.correlation_id;
            err
        }
        Err(_) => {
            let mut err = ApiError::new(status.as_u16(), fallback_message());
            let trimmed = body.trim();
            if !trimmed.is_empty() {
                err.details = Some(truncate(trimmed, 200));
            }
            err
        }
    };

    if err.correlation_id.is_none() {
        err.correlation_id = header_correlation;
    }
    err
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[async_trait]
impl DataPulseApi for HttpApiClient {
    async fn session_active(&self) -> Result<bool, ApiError> {
        match self.send(self.request(Method::GET, "/oauth2/auth")).await {
            Ok(_) => Ok(true),
            Err(err) if err.status == 401 || err.status == 403 => Ok(false),
            Err(err) => Err(err),
        }
    }

    async fn list_accounts(&self) -> Result<Vec<Account>, ApiError> {
        self.send_json(self.request(Method::GET, "/api/accounts"))
            .await
    }

    async fn get_account(&self, account_id: AccountId) -> Result<Account, ApiError> {
        self.send_json(self.request(Method::GET, &format!("/api/accounts/{account_id}")))
            .await
    }

    async fn create_account(&self, account: &NewAccount) -> Result<Account, ApiError> {
        self.send_json(self.request(Method::POST, "/api/accounts").json(account))
            .await
    }

    async fn update_account(
        &self,
        account_id: AccountId,
        update: &AccountUpdate,
    ) -> Result<Account, ApiError> {
        self.send_json(
            self.request(Method::PUT, &format!("/api/accounts/{account_id}"))
                .json(update),
        )
        .await
    }

    async fn delete_account(&self, account_id: AccountId) -> Result<(), ApiError> {
        self.send_empty(self.request(Method::DELETE, &format!("/api/accounts/{account_id}")))
            .await
            .map(|_| ())
    }

    async fn list_connections(&self, account_id: AccountId) -> Result<Vec<Connection>, ApiError> {
        self.send_json(self.request(
            Method::GET,
            &format!("/api/accounts/{account_id}/connections"),
        ))
        .await
    }

    async fn create_connection(
        &self,
        account_id: AccountId,
        connection: &NewConnection,
    ) -> Result<Connection, ApiError> {
        self.send_json(
            self.request(
                Method::POST,
                &format!("/api/accounts/{account_id}/connections"),
            )
            .json(connection),
        )
        .await
    }

    async fn update_connection(
        &self,
        account_id: AccountId,
        connection_id: ConnectionId,
        update: &ConnectionUpdate,
    ) -> Result<Connection, ApiError> {
        self.send_json(
            self.request(
                Method::PUT,
                &format!("/api/accounts/{account_id}/connections/{connection_id}"),
            )
            .json(update),
        )
        .await
    }

    async fn delete_connection(
        &self,
        account_id: AccountId,
        connection_id: ConnectionId,
    ) -> Result<(), ApiError> {
        self.send_empty(self.request(
            Method::DELETE,
            &format!("/api/accounts/{account_id}/connections/{connection_id}"),
        ))
        .await
        .map(|_| ())
    }

    async fn list_members(&self, account_id: AccountId) -> Result<Vec<Member>, ApiError> {
        self.send_json(self.request(Method::GET, &format!("/api/accounts/{account_id}/members")))
            .await
    }

    async fn create_member(
        &self,
        account_id: AccountId,
        member: &NewMember,
    ) -> Result<Member, ApiError> {
        self.send_json(
            self.request(Method::POST, &format!("/api/accounts/{account_id}/members"))
                .json(member),
        )
        .await
    }

    async fn update_member(
        &self,
        account_id: AccountId,
        member_id: MemberId,
        update: &MemberUpdate,
    ) -> Result<Member, ApiError> {
        self.send_json(
            self.request(
                Method::PUT,
                &format!("/api/accounts/{account_id}/members/{member_id}"),
            )
            .json(update),
        )
        .await
    }

    async fn delete_member(
        &self,
        account_id: AccountId,
        member_id: MemberId,
    ) -> Result<(), ApiError> {
        self.send_empty(self.request(
            Method::DELETE,
            &format!("/api/accounts/{account_id}/members/{member_id}"),
        ))
        .await
        .map(|_| ())
    }

    async fn run_etl_scenario(&self, request: &ScenarioRunRequest) -> Result<u16, ApiError> {
        self.send_empty(
            self.request(Method::POST, "/api/etl/scenario/run")
                .json(request),
        )
        .await
    }

    async fn start_connection_sync(
        &self,
        connection_id: ConnectionId,
    ) -> Result<SyncStatusReport, ApiError> {
        self.send_json(self.request(
            Method::POST,
            &format!("/api/account-connections/{connection_id}/sync/start"),
        ))
        .await
    }

    async fn connection_sync_status(
        &self,
        connection_id: ConnectionId,
    ) -> Result<SyncStatusReport, ApiError> {
        self.send_json(self.request(
            Method::GET,
            &format!("/api/account-connections/{connection_id}/sync/status"),
        ))
        .await
    }
}
