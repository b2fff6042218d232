use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use super::errors::{LensError, TransportError};

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct GraphqlRequest {
    pub query: String,
    #[serde(rename = "operationName", skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,
    pub variables: Value,
}

impl GraphqlRequest {
    pub fn new(operation: &str, query: &str, variables: Value) -> Self {
        Self { query: query.to_string(), operation_name: Some(operation.to_string()), variables }
    }
}

/// Sends one GraphQL request to one endpoint.
///
/// Implementations return the decoded JSON body whenever the server
/// produced a GraphQL response (including ones carrying `errors`), and a
/// `TransportError` for anything that should make the caller try another
/// endpoint.
#[async_trait]
pub trait GraphqlTransport: Send + Sync {
    async fn post(&self, endpoint: &str, request: &GraphqlRequest, access_token: Option<&str>) -> Result<Value, TransportError>;
}

pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, LensError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(5)))
            .user_agent(concat!("chainsocial/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| LensError::Unexpected(format!("http client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl GraphqlTransport for ReqwestTransport {
    async fn post(&self, endpoint: &str, request: &GraphqlRequest, access_token: Option<&str>) -> Result<Value, TransportError> {
        let mut builder = self.client.post(endpoint).json(request);
        if let Some(token) = access_token {
            builder = builder.bearer_auth(token);
        }
        let resp = builder.send().await.map_err(|e| TransportError::Network(e.to_string()))?;
        let status = resp.status();
        let bytes = resp.bytes().await.map_err(|e| TransportError::Network(e.to_string()))?;

        match serde_json::from_slice::<Value>(&bytes) {
            Ok(body) if status.is_success() || body.get("errors").is_some() => Ok(body),
            Ok(_) => Err(TransportError::Status(status.as_u16())),
            Err(e) if status.is_success() => Err(TransportError::Decode(e.to_string())),
            Err(_) => Err(TransportError::Status(status.as_u16())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_with_operation_name() {
        let req = GraphqlRequest::new("Ping", "query Ping { ping }", serde_json::json!({}));
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["operationName"], "Ping");
        assert_eq!(v["query"], "query Ping { ping }");
        assert!(v["variables"].is_object());
    }
}
