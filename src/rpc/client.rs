// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Typed bindings for the engine methods this client uses.
//!
//! Each method maps its arguments onto the fixed parameter order the engine
//! expects and decodes the result. Faults pass through untouched.

use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use super::error::{RpcError, RpcResult};
use super::options::TaskOptions;
use super::transport::{ConnectionDescriptor, HttpTransport, Transport};
use super::types::{GlobalStat, TaskRecord, Version};

/// Engine method names.
pub mod methods {
    pub const GET_VERSION: &str = "aria2.getVersion";
    pub const TELL_ACTIVE: &str = "aria2.tellActive";
    pub const TELL_WAITING: &str = "aria2.tellWaiting";
    pub const TELL_STOPPED: &str = "aria2.tellStopped";
    pub const ADD_URI: &str = "aria2.addUri";
    pub const PAUSE: &str = "aria2.pause";
    pub const UNPAUSE: &str = "aria2.unpause";
    pub const REMOVE: &str = "aria2.remove";
    pub const PAUSE_ALL: &str = "aria2.pauseAll";
    pub const UNPAUSE_ALL: &str = "aria2.unpauseAll";
    pub const GET_GLOBAL_STAT: &str = "aria2.getGlobalStat";
}

/// Client for one aria2 engine.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use ariadeck::rpc::{Aria2Client, ConnectionDescriptor, Scheme, TaskOptions};
///
/// let descriptor = ConnectionDescriptor::new(
///     "localhost", 6800, "/jsonrpc", Scheme::Http, "", Duration::from_secs(30),
/// );
/// let (client, version) = Aria2Client::connect(descriptor)?;
/// println!("aria2 {}", version.version);
///
/// let gid = client.add_uri(&["https://example.org/file.iso"], &TaskOptions::new())?;
/// client.pause(&gid)?;
/// # Ok::<(), ariadeck::rpc::RpcError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Aria2Client<T = HttpTransport> {
    transport: T,
}

impl Aria2Client<HttpTransport> {
    /// Build a client over HTTP. Nothing is sent until the first call.
    pub fn new(descriptor: ConnectionDescriptor) -> RpcResult<Self> {
        Ok(Self::with_transport(HttpTransport::new(descriptor)?))
    }

    /// Build a client and check the engine answers `getVersion`.
    ///
    /// On failure no client is returned, so a caller replacing an existing
    /// client after a settings change keeps the old one.
    pub fn connect(descriptor: ConnectionDescriptor) -> RpcResult<(Self, Version)> {
        let client = Self::new(descriptor)?;
        let version = client.get_version()?;
        tracing::info!(
            "Connected to aria2 {} at {}",
            version.version,
            client.transport.endpoint()
        );
        Ok((client, version))
    }

    pub fn descriptor(&self) -> &ConnectionDescriptor {
        self.transport.descriptor()
    }
}

impl<T: Transport> Aria2Client<T> {
    pub fn with_transport(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn invoke<R: DeserializeOwned>(&self, method: &str, params: Vec<Value>) -> RpcResult<R> {
        let result = self.transport.call(method, params)?;
        serde_json::from_value(result)
            .map_err(|e| RpcError::Decode(format!("unexpected {} result: {}", method, e)))
    }

    fn invoke_unit(&self, method: &str, params: Vec<Value>) -> RpcResult<()> {
        self.transport.call(method, params).map(|_| ())
    }

    /// `aria2.getVersion`
    pub fn get_version(&self) -> RpcResult<Version> {
        self.invoke(methods::GET_VERSION, Vec::new())
    }

    /// `aria2.tellActive`: every active task, unpaginated.
    pub fn tell_active(&self) -> RpcResult<Vec<TaskRecord>> {
        self.invoke(methods::TELL_ACTIVE, Vec::new())
    }

    /// `aria2.tellWaiting`. Offset and count are passed through as given; the
    /// engine returns fewer records when fewer exist.
    pub fn tell_waiting(&self, offset: i64, num: u32) -> RpcResult<Vec<TaskRecord>> {
        self.invoke(methods::TELL_WAITING, vec![json!(offset), json!(num)])
    }

    /// `aria2.tellStopped`, paginated like [`tell_waiting`](Self::tell_waiting).
    pub fn tell_stopped(&self, offset: i64, num: u32) -> RpcResult<Vec<TaskRecord>> {
        self.invoke(methods::TELL_STOPPED, vec![json!(offset), json!(num)])
    }

    /// `aria2.addUri`. Returns the new task's GID.
    pub fn add_uri<S: AsRef<str>>(&self, uris: &[S], options: &TaskOptions) -> RpcResult<String> {
        let uris: Vec<&str> = uris.iter().map(AsRef::as_ref).collect();
        let options = serde_json::to_value(options)?;
        self.invoke(methods::ADD_URI, vec![json!(uris), options])
    }

    /// `aria2.pause`
    pub fn pause(&self, gid: &str) -> RpcResult<()> {
        self.invoke_unit(methods::PAUSE, vec![json!(gid)])
    }

    /// `aria2.unpause`
    pub fn unpause(&self, gid: &str) -> RpcResult<()> {
        self.invoke_unit(methods::UNPAUSE, vec![json!(gid)])
    }

    /// `aria2.remove`
    pub fn remove(&self, gid: &str) -> RpcResult<()> {
        self.invoke_unit(methods::REMOVE, vec![json!(gid)])
    }

    /// `aria2.pauseAll`: applies to every active and waiting task in the engine.
    pub fn pause_all(&self) -> RpcResult<()> {
        self.invoke_unit(methods::PAUSE_ALL, Vec::new())
    }

    /// `aria2.unpauseAll`
    pub fn unpause_all(&self) -> RpcResult<()> {
        self.invoke_unit(methods::UNPAUSE_ALL, Vec::new())
    }

    /// `aria2.getGlobalStat`
    pub fn get_global_stat(&self) -> RpcResult<GlobalStat> {
        self.invoke(methods::GET_GLOBAL_STAT, Vec::new())
    }
}
