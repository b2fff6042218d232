//! Scripted Lens transport shared by unit tests and the server's
//! integration tests (`test-util` feature).

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::lens::{GraphqlRequest, GraphqlTransport, LensClient, TransportError};

pub const ALICE_WALLET: &str = "0xa11ce00000000000000000000000000000000001";
pub const BOB_WALLET: &str = "0xb0b0000000000000000000000000000000000002";

/// One recorded request.
#[derive(Clone, Debug)]
pub struct FakeCall {
    pub endpoint: String,
    pub operation: String,
    pub variables: Value,
    pub token: Option<String>,
}

type Handler = dyn Fn(&FakeCall) -> Result<Value, TransportError> + Send + Sync;

struct Inner {
    handler: Box<Handler>,
    calls: Mutex<Vec<FakeCall>>,
}

/// Answers every request through `handler` and records it.
#[derive(Clone)]
pub struct FakeLens {
    inner: Arc<Inner>,
}

impl FakeLens {
    pub fn new(handler: impl Fn(&FakeCall) -> Result<Value, TransportError> + Send + Sync + 'static) -> Self {
        Self { inner: Arc::new(Inner { handler: Box::new(handler), calls: Mutex::new(Vec::new()) }) }
    }

    /// A fake that reports every endpoint as unreachable.
    pub fn offline() -> Self {
        Self::new(|_| Err(TransportError::Network("connection refused".into())))
    }

    pub fn client(&self, endpoints: &[&str]) -> LensClient {
        let cfg = configs::LensConfig {
            endpoints: endpoints.iter().map(|e| e.to_string()).collect(),
            ..Default::default()
        };
        LensClient::new(Arc::new(self.clone()), &cfg)
    }

    pub fn calls(&self) -> Vec<FakeCall> {
        self.inner.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn operations(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.operation).collect()
    }

    pub fn endpoints_hit(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.endpoint).collect()
    }
}

#[async_trait]
impl GraphqlTransport for FakeLens {
    async fn post(&self, endpoint: &str, request: &GraphqlRequest, access_token: Option<&str>) -> Result<Value, TransportError> {
        let call = FakeCall {
            endpoint: endpoint.to_string(),
            operation: request.operation_name.clone().unwrap_or_default(),
            variables: request.variables.clone(),
            token: access_token.map(str::to_string),
        };
        if let Ok(mut calls) = self.inner.calls.lock() {
            calls.push(call.clone());
        }
        (self.inner.handler)(&call)
    }
}
