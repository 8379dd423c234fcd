// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! ariadeck - client library for the aria2 download engine
//!
//! Talks to a running `aria2c --enable-rpc` over JSON-RPC and turns its raw
//! task records into something a terminal or GUI can show.
//!
//! **Transport** -> **Method bindings** -> **Task aggregation** -> **Metrics**
//!
//! # Core Modules
//!
//! - [`rpc`] - transport, typed method bindings, decoded engine records
//! - [`tasks`] - one combined task view from the engine's three task lists
//! - [`metrics`] - progress, speed and size text for display
//! - [`config`] - connection and download settings on disk
//! - [`error`] - user-facing fault explanations and exit codes
//!
//! # Example
//!
//! ```no_run
//! use ariadeck::config::AppConfig;
//! use ariadeck::metrics::TaskSummary;
//! use ariadeck::{Aria2Client, TaskAggregator};
//!
//! let config = AppConfig::load(&ariadeck::config::default_path()?)?;
//! let client = Aria2Client::new(config.rpc.descriptor()?)?;
//!
//! for task in TaskAggregator::new(client).fetch_all() {
//!     let row = TaskSummary::from_record(&task);
//!     println!("{} {:>3}% {}", row.gid, row.percent(), row.name);
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod colors;
pub mod config;
pub mod error;
pub mod metrics;
pub mod rpc;
pub mod tasks;
pub mod utils;

pub use config::AppConfig;
pub use metrics::{format_rate, format_size, parse_magnitude, progress_ratio, TaskSummary};
pub use rpc::{
    Aria2Client, ConnectionDescriptor, ErrorKind, HttpTransport, RpcError, RpcResult, Scheme,
    TaskOptions, TaskRecord, TaskStatus, Transport,
};
pub use tasks::{TaskAggregator, TaskSource};
