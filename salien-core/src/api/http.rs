//! HTTP transport backed by reqwest

use std::time::Duration;

use async_trait::async_trait;

use super::{ApiRequest, EResult, Method, RawResponse, Transport};
use crate::error::TransportError;

pub const BASE_URL: &str = "https://community.steam-api.com/";
pub const USER_AGENT: &str = concat!("salien-agent/", env!("CARGO_PKG_VERSION"));

pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: String,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        Self::with_base_url(BASE_URL, timeout)
    }

    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, request: &ApiRequest) -> String {
        format!("{}/{}/", self.base_url, request.operation.path())
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &ApiRequest) -> Result<RawResponse, TransportError> {
        let url = self.url(request);

        // Parameters always travel in the query string, POST included
        let builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
        };

        let response = builder.query(&request.params).send().await?;

        let status = response.status().as_u16();
        let headers = response.headers();
        let eresult = headers
            .get("x-eresult")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<i32>().ok())
            .map(EResult);
        let error_message = headers
            .get("x-error_message")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response.text().await?;

        Ok(RawResponse {
            status,
            eresult,
            error_message,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Operation;

    #[test]
    fn test_url_building() {
        let transport = ReqwestTransport::with_base_url("https://example.invalid/", Duration::from_secs(5)).unwrap();
        let request = ApiRequest {
            operation: Operation::GetPlanets,
            method: Method::Get,
            params: vec![("active_only".into(), "1".into())],
        };
        assert_eq!(
            transport.url(&request),
            "https://example.invalid/ITerritoryControlMinigameService/GetPlanets/v0001/"
        );
    }
}
