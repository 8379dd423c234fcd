// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Error taxonomy for engine calls.
//!
//! Two families matter to callers:
//!
//! - **Transport faults**: the request never produced a usable envelope
//!   (refused connection, timeout, non-2xx status, garbage body).
//! - **Protocol faults**: the envelope decoded but carried an error
//!   descriptor. The engine's code and message are kept verbatim.

/// Coarse classification of an [`RpcError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Network, HTTP or envelope decoding failure.
    Transport,
    /// The engine answered with an error descriptor.
    Protocol,
}

/// Error types specific to engine RPC operations.
#[derive(Debug, Clone, PartialEq)]
pub enum RpcError {
    /// The engine could not be reached (refused, DNS, reset).
    Connect(String),
    /// The request did not complete within the configured timeout.
    Timeout(String),
    /// The engine answered with a non-2xx status and no error envelope.
    Http { status: u16, body: String },
    /// The response body, or its result payload, could not be decoded.
    Decode(String),
    /// The engine rejected the call.
    Fault { code: i64, message: String },
    /// The HTTP client itself could not be constructed.
    Setup(String),
}

/// Reserved JSON-RPC 2.0 code range (parse error, invalid request, ...).
const RESERVED_CODES: std::ops::RangeInclusive<i64> = -32768..=-32000;

impl RpcError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Fault { .. } => ErrorKind::Protocol,
            _ => ErrorKind::Transport,
        }
    }

    pub fn is_transport(&self) -> bool {
        self.kind() == ErrorKind::Transport
    }

    pub fn is_protocol(&self) -> bool {
        self.kind() == ErrorKind::Protocol
    }

    /// True for faults in the reserved JSON-RPC range: the request itself was
    /// malformed (unknown method, bad params) rather than refused by the engine.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, Self::Fault { code, .. } if RESERVED_CODES.contains(code))
    }

    /// Engine code for protocol faults.
    pub fn code(&self) -> Option<i64> {
        match self {
            Self::Fault { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Whether a bounded retry may help. Engine faults never qualify: the
    /// engine already said no, and asking again changes observable behavior.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connect(_) | Self::Timeout(_) => true,
            Self::Http { status, .. } => *status >= 500,
            Self::Decode(_) | Self::Fault { .. } | Self::Setup(_) => false,
        }
    }

    pub(crate) fn from_reqwest(err: reqwest::Error, endpoint: &str) -> Self {
        if err.is_timeout() {
            Self::Timeout(format!("Request to {} timed out", endpoint))
        } else if err.is_connect() {
            Self::Connect(format!("Cannot connect to aria2 at {}: {}", endpoint, err))
        } else if err.is_decode() || err.is_body() {
            Self::Decode(format!("Failed to read response from {}: {}", endpoint, err))
        } else {
            Self::Connect(format!("Request to {} failed: {}", endpoint, err))
        }
    }
}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connect(msg) => write!(f, "Connection failed: {}", msg),
            Self::Timeout(msg) => write!(f, "Request timed out: {}", msg),
            Self::Http { status, body } if body.is_empty() => write!(f, "HTTP {}", status),
            Self::Http { status, body } => write!(f, "HTTP {}: {}", status, body),
            Self::Decode(msg) => write!(f, "Invalid response: {}", msg),
            Self::Fault { code, message } => write!(f, "aria2 error {}: {}", code, message),
            Self::Setup(msg) => write!(f, "Client setup failed: {}", msg),
        }
    }
}

impl std::error::Error for RpcError {}

impl From<serde_json::Error> for RpcError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Result alias used by the transport and method bindings.
pub type RpcResult<T> = std::result::Result<T, RpcError>;
