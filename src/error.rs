// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! User-facing error messages.
//!
//! Formats faults with a title, possible causes and numbered fixes, and maps
//! them onto process exit codes.

use std::fmt;

use crate::rpc::RpcError;

/// Sysexits-style exit codes used by the CLI.
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    /// Generic failure.
    pub const FAILURE: i32 = 1;
    /// The engine rejected the request or sent unusable data.
    pub const DATA_ERR: i32 = 65;
    /// The engine could not be reached.
    pub const UNAVAILABLE: i32 = 69;
    /// Configuration is invalid.
    pub const CONFIG: i32 = 78;
}

/// Formats an error message with title, causes and fixes.
///
/// # Example
///
/// ```
/// use ariadeck::error::format_error;
///
/// let error = format_error(
///     "Cannot reach aria2",
///     &["aria2c is not running", "RPC is not enabled"],
///     &["Start it: aria2c --enable-rpc", "Check: ariadeck config show"],
/// );
/// assert!(error.contains("  2. Check: ariadeck config show"));
/// ```
pub fn format_error(title: &str, causes: &[&str], fixes: &[&str]) -> String {
    let mut output = format!("[✗] {}\n", title);

    if !causes.is_empty() {
        output.push_str("\nPossible causes:\n");
        for cause in causes {
            output.push_str(&format!("  - {}\n", cause));
        }
    }

    if !fixes.is_empty() {
        output.push_str("\nTry these fixes:\n");
        for (i, fix) in fixes.iter().enumerate() {
            output.push_str(&format!("  {}. {}\n", i + 1, fix));
        }
    }

    output
}

/// Builder for constructing formatted error messages.
#[derive(Debug, Clone)]
pub struct ErrorBuilder {
    title: String,
    causes: Vec<String>,
    fixes: Vec<String>,
}

impl ErrorBuilder {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            causes: Vec::new(),
            fixes: Vec::new(),
        }
    }

    pub fn cause(mut self, cause: impl Into<String>) -> Self {
        self.causes.push(cause.into());
        self
    }

    pub fn fix(mut self, fix: impl Into<String>) -> Self {
        self.fixes.push(fix.into());
        self
    }

    pub fn build(&self) -> String {
        let causes: Vec<&str> = self.causes.iter().map(String::as_str).collect();
        let fixes: Vec<&str> = self.fixes.iter().map(String::as_str).collect();
        format_error(&self.title, &causes, &fixes)
    }
}

impl fmt::Display for ErrorBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.build())
    }
}

/// Explain an RPC fault for a terminal user.
///
/// `endpoint` is where the client was trying to connect.
pub fn explain(err: &RpcError, endpoint: &str) -> ErrorBuilder {
    match err {
        RpcError::Connect(_) => ErrorBuilder::new(format!("Cannot reach aria2 at {}", endpoint))
            .cause("aria2c is not running")
            .cause("aria2c was started without --enable-rpc")
            .cause("Host or port in the config is wrong")
            .fix("Start the engine: aria2c --enable-rpc --rpc-listen-all=false")
            .fix("Check the connection settings: ariadeck config show")
            .fix("Override for one run: ariadeck --host <host> --port <port> ..."),
        RpcError::Timeout(_) => ErrorBuilder::new(format!("aria2 at {} did not answer in time", endpoint))
            .cause("The engine is overloaded or stuck")
            .cause("A slow network between you and the engine")
            .fix("Raise the timeout: ariadeck config set rpc.timeout 60")
            .fix("Retry transient failures: ariadeck config set rpc.retries 2"),
        RpcError::Http { status, .. } if *status == 401 || *status == 403 => {
            ErrorBuilder::new(format!("aria2 refused the request (HTTP {})", status))
                .cause("The RPC secret does not match --rpc-secret")
                .fix("Set the secret: ariadeck config set rpc.secret <secret>")
        }
        RpcError::Http { status, .. } => ErrorBuilder::new(format!("Unexpected HTTP {} from {}", status, endpoint))
            .cause("rpc.path does not point at the JSON-RPC endpoint")
            .cause("A proxy in front of the engine rejected the request")
            .fix("The default path is /jsonrpc: ariadeck config set rpc.path /jsonrpc"),
        RpcError::Decode(detail) => ErrorBuilder::new("aria2 sent a response that could not be read")
            .cause(detail.clone())
            .cause("The endpoint is not an aria2 JSON-RPC server")
            .fix("Check the connection settings: ariadeck config show"),
        RpcError::Fault { code, message } if err.is_protocol_violation() => {
            ErrorBuilder::new(format!("aria2 rejected the call as malformed ({}: {})", code, message))
                .cause("This aria2 version does not support the method")
                .fix("Check the engine version: ariadeck version")
        }
        RpcError::Fault { code, message } => {
            let builder = ErrorBuilder::new(format!("aria2 error {}: {}", code, message));
            if message.contains("Unauthorized") {
                builder
                    .cause("The RPC secret does not match --rpc-secret")
                    .fix("Set the secret: ariadeck config set rpc.secret <secret>")
            } else if message.contains("not found") {
                builder
                    .cause("The GID does not exist or the task was already removed")
                    .fix("List current tasks: ariadeck list")
            } else {
                builder
            }
        }
        RpcError::Setup(detail) => ErrorBuilder::new("Could not set up the RPC client")
            .cause(detail.clone())
            .fix("Check the connection settings: ariadeck config show"),
    }
}

/// Exit code for an RPC fault.
pub fn exit_code(err: &RpcError) -> i32 {
    match err {
        RpcError::Fault { .. } | RpcError::Decode(_) => exit_codes::DATA_ERR,
        RpcError::Setup(_) => exit_codes::CONFIG,
        _ => exit_codes::UNAVAILABLE,
    }
}
