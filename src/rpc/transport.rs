// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! JSON-RPC transport to the aria2 engine.
//!
//! One call is one HTTP POST carrying one JSON-RPC 2.0 request. There is no
//! batching and no multiplexing; a transport owns nothing mutable besides the
//! HTTP client, so a single instance can be shared across threads.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::{RpcError, RpcResult};
use crate::utils::mask_secret;

/// JSON-RPC protocol tag.
pub const JSONRPC_VERSION: &str = "2.0";

/// Base delay for exponential backoff (milliseconds).
const RETRY_BASE_DELAY_MS: u64 = 500;

/// Maximum delay for exponential backoff (milliseconds).
const RETRY_MAX_DELAY_MS: u64 = 10_000;

/// Longest response body kept in an [`RpcError::Http`].
const MAX_ERROR_BODY: usize = 512;

/// Anything that can carry a single engine call.
///
/// `params` excludes the authentication token; implementations prefix it.
/// On success the `result` member of the response envelope is returned.
pub trait Transport {
    fn call(&self, method: &str, params: Vec<Value>) -> RpcResult<Value>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn call(&self, method: &str, params: Vec<Value>) -> RpcResult<Value> {
        (**self).call(method, params)
    }
}

impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn call(&self, method: &str, params: Vec<Value>) -> RpcResult<Value> {
        (**self).call(method, params)
    }
}

/// URL scheme of the engine endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    Http,
    Https,
    Ws,
    Wss,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
            Self::Ws => "ws",
            Self::Wss => "wss",
        }
    }

    pub fn is_secure(&self) -> bool {
        matches!(self, Self::Https | Self::Wss)
    }

    /// The engine serves HTTP and WebSocket RPC on the same port and path,
    /// so stream schemes are posted to as their request counterpart.
    pub fn request_scheme(&self) -> &'static str {
        if self.is_secure() {
            "https"
        } else {
            "http"
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(Self::Http),
            "https" => Ok(Self::Https),
            "ws" => Ok(Self::Ws),
            "wss" => Ok(Self::Wss),
            other => Err(format!(
                "unknown protocol '{}' (expected http, https, ws or wss)",
                other
            )),
        }
    }
}

/// Everything needed to reach one engine.
///
/// Immutable once built: a settings change means building a new descriptor
/// and a new transport, never patching a live one.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    host: String,
    port: u16,
    path: String,
    scheme: Scheme,
    secret: String,
    timeout: Duration,
    retries: u32,
}

impl ConnectionDescriptor {
    /// Build a descriptor. The timeout is mandatory; retries default to 0.
    pub fn new(
        host: impl Into<String>,
        port: u16,
        path: impl Into<String>,
        scheme: Scheme,
        secret: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            path: path.into(),
            scheme,
            secret: secret.into(),
            timeout,
            retries: 0,
        }
    }

    /// Allow up to `retries` extra attempts for retryable transport faults.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// URL the requests are posted to.
    pub fn endpoint(&self) -> String {
        let host = if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };
        format!("{}://{}:{}{}", self.scheme.request_scheme(), host, self.port, self.path)
    }

    /// Authentication parameter prefixed to every call. An empty secret still
    /// yields `"token:"`, which an engine without `rpc-secret` accepts.
    pub fn token(&self) -> String {
        format!("token:{}", self.secret)
    }
}

impl fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionDescriptor")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("path", &self.path)
            .field("scheme", &self.scheme)
            .field("secret", &mask_secret(&self.secret))
            .field("timeout", &self.timeout)
            .field("retries", &self.retries)
            .finish()
    }
}

/// Outbound envelope.
#[derive(Debug, Clone, Serialize)]
pub struct RpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub method: &'a str,
    pub params: Vec<Value>,
    pub id: String,
}

impl<'a> RpcRequest<'a> {
    pub fn new(method: &'a str, params: Vec<Value>, id: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            method,
            params,
            id: id.into(),
        }
    }
}

/// Error descriptor carried by a failed response.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RpcErrorBody {
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

/// Inbound envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcErrorBody>,
    #[serde(default)]
    pub id: Option<Value>,
}

impl RpcResponse {
    /// Resolve the envelope against the identifier the request was sent with.
    pub fn into_result(self, expected_id: &str) -> RpcResult<Value> {
        if let Some(err) = self.error {
            return Err(RpcError::Fault {
                code: err.code,
                message: err.message,
            });
        }

        if let Some(Value::String(id)) = &self.id {
            if id != expected_id {
                return Err(RpcError::Decode(format!(
                    "response id '{}' does not match request id '{}'",
                    id, expected_id
                )));
            }
        }

        self.result.ok_or_else(|| {
            RpcError::Decode("response carries neither result nor error".to_string())
        })
    }
}

/// Turn an HTTP status and body into the call outcome.
///
/// The engine answers rejected calls with a 4xx status *and* an error
/// envelope; those stay protocol faults. A non-2xx status without an error
/// envelope is a transport fault.
pub fn decode_response(status: u16, body: &str, expected_id: &str) -> RpcResult<Value> {
    let parsed = serde_json::from_str::<RpcResponse>(body);

    if !(200..300).contains(&status) {
        return match parsed {
            Ok(envelope) if envelope.error.is_some() => envelope.into_result(expected_id),
            _ => Err(RpcError::Http {
                status,
                body: truncate(body, MAX_ERROR_BODY),
            }),
        };
    }

    parsed
        .map_err(|e| RpcError::Decode(format!("malformed envelope: {}", e)))?
        .into_result(expected_id)
}

fn truncate(body: &str, max: usize) -> String {
    let body = body.trim();
    if body.len() <= max {
        return body.to_string();
    }
    let mut end = max;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

/// Exponential backoff: 500ms, 1000ms, 2000ms, ... capped at 10s.
fn backoff_delay(attempt: u32) -> Duration {
    let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
    let delay = RETRY_BASE_DELAY_MS.saturating_mul(factor).min(RETRY_MAX_DELAY_MS);
    Duration::from_millis(delay)
}

/// Blocking HTTP(S) transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    descriptor: ConnectionDescriptor,
    endpoint: String,
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    /// Build a transport for `descriptor`. No request is sent.
    pub fn new(descriptor: ConnectionDescriptor) -> RpcResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(descriptor.timeout())
            .connect_timeout(descriptor.timeout())
            .pool_max_idle_per_host(0)
            .user_agent(concat!("ariadeck/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RpcError::Setup(e.to_string()))?;

        Ok(Self {
            endpoint: descriptor.endpoint(),
            descriptor,
            client,
        })
    }

    pub fn descriptor(&self) -> &ConnectionDescriptor {
        &self.descriptor
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn call_once(&self, method: &str, params: &[Value]) -> RpcResult<Value> {
        let id = format!("{:016x}", rand::random::<u64>());

        let mut full_params = Vec::with_capacity(params.len() + 1);
        full_params.push(Value::String(self.descriptor.token()));
        full_params.extend(params.iter().cloned());
        let request = RpcRequest::new(method, full_params, id.as_str());

        tracing::debug!(
            method,
            endpoint = %self.endpoint,
            token = %mask_secret(self.descriptor.secret()),
            id = %id,
            "engine call"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .map_err(|e| RpcError::from_reqwest(e, &self.endpoint))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|e| RpcError::from_reqwest(e, &self.endpoint))?;

        decode_response(status, &body, &id)
    }
}

impl Transport for HttpTransport {
    fn call(&self, method: &str, params: Vec<Value>) -> RpcResult<Value> {
        let mut attempt = 0;
        loop {
            match self.call_once(method, &params) {
                Err(err) if err.is_retryable() && attempt < self.descriptor.retries() => {
                    let delay = backoff_delay(attempt);
                    tracing::debug!(
                        "Retry attempt {} for {} after {}ms delay ({})",
                        attempt + 1,
                        method,
                        delay.as_millis(),
                        err
                    );
                    std::thread::sleep(delay);
                    attempt += 1;
                }
                outcome => return outcome,
            }
        }
    }
}
