//! fitbase client - HTTPS access to the hosted tabular-data service
//!
//! Every request is POSTed as JSON to
//! `{base_url}/api/v1/bases/{base_id}/query` with a bearer token. Failures map
//! onto [`TransportError`] and are never retried here.

use ::async_trait::async_trait;
use fitbase_core::{
    FitError, FitResult, QueryRequest, ServiceConfig, ServiceResponse, TransportError,
};
use fitbase_storage::DataService;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Error body the service sends with non-success statuses.
#[derive(Debug, Deserialize)]
struct ServiceErrorBody {
    #[serde(default)]
    code: Option<String>,
    message: String,
}

pub struct HttpDataService {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    timeout: Duration,
}

impl HttpDataService {
    pub fn new(config: &ServiceConfig) -> FitResult<Self> {
        config.validate()?;
        let timeout = config.timeout();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Unreachable {
                reason: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/api/v1/bases/{}/query",
                config.base_url.trim_end_matches('/'),
                config.base_id
            ),
            api_key: config.api_key.clone(),
            timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn headers(&self) -> Result<HeaderMap, TransportError> {
        let mut headers = HeaderMap::new();
        let value = HeaderValue::from_str(&format!("Bearer {}", self.api_key)).map_err(|_| {
            TransportError::Unreachable {
                reason: "API key contains characters not allowed in a header".to_string(),
            }
        })?;
        headers.insert(AUTHORIZATION, value);
        Ok(headers)
    }

    fn send_error(&self, error: reqwest::Error) -> TransportError {
        if error.is_timeout() {
            TransportError::Unreachable {
                reason: format!("request timed out after {}ms", self.timeout.as_millis()),
            }
        } else {
            TransportError::Unreachable {
                reason: error.to_string(),
            }
        }
    }
}

impl std::fmt::Debug for HttpDataService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpDataService")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[async_trait]
impl DataService for HttpDataService {
    async fn execute(&self, request: &QueryRequest) -> FitResult<ServiceResponse> {
        debug!(
            table = %request.table,
            operation = %request.operation(),
            "Sending request to data service"
        );
        let response = self
            .client
            .post(&self.endpoint)
            .headers(self.headers()?)
            .json(request)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;

        parse_response(response).await.map_err(|e| {
            warn!(table = %request.table, error = %e, "Data service request failed");
            FitError::from(e)
        })
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

async fn parse_response(response: reqwest::Response) -> Result<ServiceResponse, TransportError> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| TransportError::InvalidResponse {
            reason: format!("failed to read body: {}", e),
        })?;

    if status.is_success() {
        return serde_json::from_str(&text).map_err(|e| TransportError::InvalidResponse {
            reason: format!("failed to parse response: {}", e),
        });
    }

    let message = match serde_json::from_str::<ServiceErrorBody>(&text) {
        Ok(ServiceErrorBody {
            code: Some(code),
            message,
        }) => format!("{}: {}", code, message),
        Ok(body) => body.message,
        Err(_) => text,
    };
    Err(TransportError::Status {
        status: status.as_u16(),
        message,
    })
}
