use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::common::config::DashboardConfig;
use crate::dashboard::{
    ApiError, BotStatus, Command, CommandAck, DashboardApi, Endpoint, LogEntry, Position, PriceSnapshot,
    ServiceHealth, WalletInfo,
};

/// HTTP client for the bot service's `/api` surface.
///
/// One attempt per call: retrying is left to the next poll tick or the
/// operator.
#[derive(Clone)]
pub struct HttpDashboardApi {
    base_url: String,
    client: Client,
}

/// FastAPI-style error body: `{"detail": "..."}`.
#[derive(Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

impl HttpDashboardApi {
    pub fn new(cfg: &DashboardConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(cfg.request_timeout())
            .build()?;
        Ok(Self::with_client(&cfg.backend_url, client))
    }

    pub fn with_client(base_url: &str, client: Client) -> Self {
        HttpDashboardApi {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: Endpoint) -> String {
        format!("{}{}", self.base_url, endpoint.path())
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let res = self
            .client
            .get(self.url(endpoint))
            .query(query)
            .send()
            .await
            .map_err(|e| transport_error(endpoint, e))?;
        decode(endpoint, res).await
    }

    async fn post_json<T: DeserializeOwned>(&self, endpoint: Endpoint) -> Result<T, ApiError> {
        let res = self
            .client
            .post(self.url(endpoint))
            .send()
            .await
            .map_err(|e| transport_error(endpoint, e))?;
        decode(endpoint, res).await
    }
}

fn transport_error(endpoint: Endpoint, err: reqwest::Error) -> ApiError {
    log::debug!("{} transport error: {:?}", endpoint, err);
    ApiError::Transport {
        endpoint,
        message: err.to_string(),
    }
}

async fn decode<T: DeserializeOwned>(endpoint: Endpoint, res: Response) -> Result<T, ApiError> {
    let status = res.status();
    let body = res.text().await.map_err(|e| transport_error(endpoint, e))?;

    if !status.is_success() {
        log::warn!("{} returned non-success status: {}", endpoint, status);
        return Err(ApiError::Rejected {
            endpoint,
            status: status.as_u16(),
            detail: error_detail(&body),
        });
    }

    serde_json::from_str(&body).map_err(|e| ApiError::Decode {
        endpoint,
        message: e.to_string(),
    })
}

/// Pulls the human-readable reason out of an error body, falling back to the
/// raw text.
fn error_detail(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            detail: serde_json::Value::String(detail),
        }) => detail,
        Ok(ErrorBody { detail }) => detail.to_string(),
        Err(_) if body.trim().is_empty() => "no response body".to_string(),
        Err(_) => body.trim().to_string(),
    }
}

#[async_trait]
impl DashboardApi for HttpDashboardApi {
    async fn health(&self) -> Result<ServiceHealth, ApiError> {
        self.get_json(Endpoint::Health, &[]).await
    }

    async fn status(&self) -> Result<BotStatus, ApiError> {
        self.get_json(Endpoint::Status, &[]).await
    }

    async fn active_positions(&self) -> Result<Vec<Position>, ApiError> {
        self.get_json(Endpoint::Positions, &[("status", "active".to_string())])
            .await
    }

    async fn recent_logs(&self, limit: usize) -> Result<Vec<LogEntry>, ApiError> {
        self.get_json(Endpoint::Logs, &[("limit", limit.to_string())]).await
    }

    async fn wallet(&self) -> Result<WalletInfo, ApiError> {
        self.get_json(Endpoint::Wallet, &[]).await
    }

    async fn price(&self) -> Result<PriceSnapshot, ApiError> {
        self.get_json(Endpoint::Price, &[]).await
    }

    async fn send_command(&self, command: Command) -> Result<CommandAck, ApiError> {
        self.post_json(command.endpoint()).await
    }
}
