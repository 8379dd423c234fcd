// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! aria2 JSON-RPC client.
//!
//! - [`transport`] - one JSON-RPC call per HTTP request
//! - [`client`] - typed bindings, one per engine method
//! - [`types`] - decoded task records and statistics
//! - [`options`] - per-task option map for `addUri`
//! - [`error`] - transport vs. protocol faults

pub mod client;
pub mod error;
pub mod options;
pub mod transport;
pub mod types;

pub use client::{methods, Aria2Client};
pub use error::{ErrorKind, RpcError, RpcResult};
pub use options::{OptionValue, TaskOptions};
pub use transport::{ConnectionDescriptor, HttpTransport, Scheme, Transport};
pub use types::{
    BittorrentInfo, BittorrentMode, FileEntry, GlobalStat, TaskRecord, TaskStatus, UriEntry,
    UriStatus, Version,
};
