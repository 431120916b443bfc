use std::time::Duration;

use async_trait::async_trait;
use ims_tracker_core::config::ApiConfig;
use ims_tracker_core::{
    ApprovalId, ApprovalStepRecord, Endpoint, FetchError, RequestListing, RequestSummary,
    WingHistoryListing,
};
use reqwest::{Client, StatusCode, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::context::RequestContext;
use crate::retry::{with_retry, RetryPolicy};
use crate::source::ApprovalSource;

pub const CORRELATION_HEADER: &str = "X-Correlation-Id";

#[derive(Debug, Error)]
pub enum HttpSourceError {
    #[error("invalid api base url `{url}`: {message}")]
    InvalidBaseUrl { url: String, message: String },
    #[error("could not build http client: {0}")]
    Client(#[from] reqwest::Error),
    #[error("backend at `{url}` is unreachable: {message}")]
    Unreachable { url: String, message: String },
}

#[derive(Clone, Debug)]
pub struct HttpSourceSettings {
    pub base_url: String,
    pub timeout: Duration,
    pub retry: RetryPolicy,
    pub auth_token: Option<SecretString>,
}

impl From<&ApiConfig> for HttpSourceSettings {
    fn from(config: &ApiConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            retry: RetryPolicy::new(config.max_retries, Duration::from_millis(200)),
            auth_token: config.auth_token.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    data: Option<T>,
}

/// `ApprovalSource` over the backend's JSON REST API.
#[derive(Clone, Debug)]
pub struct HttpApprovalSource {
    client: Client,
    base_url: Url,
    timeout: Duration,
    retry: RetryPolicy,
    auth_token: Option<SecretString>,
}

impl HttpApprovalSource {
    pub fn new(settings: HttpSourceSettings) -> Result<Self, HttpSourceError> {
        let base_url = Url::parse(settings.base_url.trim()).map_err(|error| {
            HttpSourceError::InvalidBaseUrl {
                url: settings.base_url.clone(),
                message: error.to_string(),
            }
        })?;
        if base_url.cannot_be_a_base() {
            return Err(HttpSourceError::InvalidBaseUrl {
                url: settings.base_url,
                message: "url cannot carry path segments".to_string(),
            });
        }

        let client = Client::builder().timeout(settings.timeout).build()?;

        Ok(Self {
            client,
            base_url,
            timeout: settings.timeout,
            retry: settings.retry,
            auth_token: settings.auth_token,
        })
    }

    pub fn from_config(config: &ApiConfig) -> Result<Self, HttpSourceError> {
        Self::new(HttpSourceSettings::from(config))
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Issues a single GET against the base url. Any HTTP response, whatever its
    /// status, counts as reachable.
    pub async fn probe(&self, context: &RequestContext) -> Result<u16, HttpSourceError> {
        let mut request = self
            .client
            .get(self.base_url.clone())
            .header(CORRELATION_HEADER, context.correlation_id.as_str());
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request.send().await.map_err(|error| HttpSourceError::Unreachable {
            url: self.base_url.to_string(),
            message: error.to_string(),
        })?;
        Ok(response.status().as_u16())
    }

    fn endpoint_url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get_json<T>(
        &self,
        endpoint: Endpoint,
        url: Url,
        context: &RequestContext,
    ) -> Result<T, FetchError>
    where
        T: DeserializeOwned,
    {
        with_retry(self.retry, endpoint, context, || self.send_once(endpoint, url.clone(), context))
            .await
    }

    async fn send_once<T>(
        &self,
        endpoint: Endpoint,
        url: Url,
        context: &RequestContext,
    ) -> Result<T, FetchError>
    where
        T: DeserializeOwned,
    {
        debug!(
            event_name = "tracker.http.request",
            correlation_id = %context.correlation_id,
            endpoint = endpoint.as_str(),
            url = %url,
            "issuing backend read"
        );

        let mut request =
            self.client.get(url).header(CORRELATION_HEADER, context.correlation_id.as_str());
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request.send().await.map_err(|error| self.transport_error(endpoint, error))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound { endpoint });
        }
        if !status.is_success() {
            return Err(FetchError::Status { endpoint, status: status.as_u16() });
        }

        let body = response.bytes().await.map_err(|error| self.transport_error(endpoint, error))?;
        serde_json::from_slice::<T>(&body)
            .map_err(|error| FetchError::Envelope { endpoint, message: error.to_string() })
    }

    async fn get_data<T>(
        &self,
        endpoint: Endpoint,
        url: Url,
        context: &RequestContext,
    ) -> Result<T, FetchError>
    where
        T: DeserializeOwned,
    {
        let envelope: DataEnvelope<T> = self.get_json(endpoint, url, context).await?;
        envelope.data.ok_or_else(|| FetchError::Envelope {
            endpoint,
            message: "response is missing `data`".to_string(),
        })
    }

    fn transport_error(&self, endpoint: Endpoint, error: reqwest::Error) -> FetchError {
        if error.is_timeout() {
            FetchError::Timeout { endpoint, timeout_secs: self.timeout.as_secs().max(1) }
        } else {
            FetchError::Transport { endpoint, message: error.to_string() }
        }
    }
}

#[async_trait]
impl ApprovalSource for HttpApprovalSource {
    async fn fetch_summary(
        &self,
        approval_id: &ApprovalId,
        context: &RequestContext,
    ) -> Result<RequestSummary, FetchError> {
        let url = self.endpoint_url(&["approvals", approval_id.as_str()]);
        self.get_data(Endpoint::Summary, url, context).await
    }

    async fn fetch_history(
        &self,
        approval_id: &ApprovalId,
        context: &RequestContext,
    ) -> Result<Vec<ApprovalStepRecord>, FetchError> {
        let url = self.endpoint_url(&["approvals", approval_id.as_str(), "history"]);
        self.get_data(Endpoint::History, url, context).await
    }

    async fn fetch_my_requests(
        &self,
        user_id: &str,
        context: &RequestContext,
    ) -> Result<RequestListing, FetchError> {
        let url = self.endpoint_url(&["approvals", "my-requests", user_id]);
        self.get_json(Endpoint::MyRequests, url, context).await
    }

    async fn fetch_wing_history(
        &self,
        context: &RequestContext,
    ) -> Result<WingHistoryListing, FetchError> {
        let url = self.endpoint_url(&["wing-request-history"]);
        self.get_json(Endpoint::WingHistory, url, context).await
    }
}
