// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Task aggregation across the engine's three task lists.
//!
//! The engine keeps active, waiting and stopped tasks in separate lists that
//! have to be fetched one by one. [`TaskAggregator`] stitches them together
//! in that order and degrades instead of failing:
//!
//! - active fails: the view is empty (nothing else is meaningful without it)
//! - waiting or stopped fails: that list is skipped, the others are kept
//!
//! No deduplication happens. A task caught mid-transition can appear in two
//! lists and then appears twice.

use std::fmt;
use std::sync::Arc;

use crate::rpc::{Aria2Client, RpcError, RpcResult, TaskRecord, Transport};

/// How many waiting tasks one aggregation pass asks for.
pub const WAITING_FETCH_LIMIT: u32 = 1000;

/// How many stopped tasks one aggregation pass asks for.
pub const STOPPED_FETCH_LIMIT: u32 = 100;

/// The three task lists the engine exposes.
pub trait TaskSource {
    fn active(&self) -> RpcResult<Vec<TaskRecord>>;
    fn waiting(&self, offset: i64, num: u32) -> RpcResult<Vec<TaskRecord>>;
    fn stopped(&self, offset: i64, num: u32) -> RpcResult<Vec<TaskRecord>>;
}

impl<T: Transport> TaskSource for Aria2Client<T> {
    fn active(&self) -> RpcResult<Vec<TaskRecord>> {
        self.tell_active()
    }

    fn waiting(&self, offset: i64, num: u32) -> RpcResult<Vec<TaskRecord>> {
        self.tell_waiting(offset, num)
    }

    fn stopped(&self, offset: i64, num: u32) -> RpcResult<Vec<TaskRecord>> {
        self.tell_stopped(offset, num)
    }
}

impl<S: TaskSource + ?Sized> TaskSource for Arc<S> {
    fn active(&self) -> RpcResult<Vec<TaskRecord>> {
        (**self).active()
    }

    fn waiting(&self, offset: i64, num: u32) -> RpcResult<Vec<TaskRecord>> {
        (**self).waiting(offset, num)
    }

    fn stopped(&self, offset: i64, num: u32) -> RpcResult<Vec<TaskRecord>> {
        (**self).stopped(offset, num)
    }
}

/// One of the engine's task lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubCollection {
    Active,
    Waiting,
    Stopped,
}

impl fmt::Display for SubCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Active => "active",
            Self::Waiting => "waiting",
            Self::Stopped => "stopped",
        })
    }
}

/// Result of one aggregation pass.
#[derive(Debug, Clone, Default)]
pub struct Aggregate {
    /// Active, then waiting, then stopped, in engine order.
    pub tasks: Vec<TaskRecord>,
    /// Lists that could not be fetched (or were not fetched because the
    /// active list failed), with the fault that caused it.
    pub skipped: Vec<(SubCollection, RpcError)>,
}

impl Aggregate {
    /// True when every list was fetched.
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Builds the combined task view.
#[derive(Debug, Clone)]
pub struct TaskAggregator<S> {
    source: S,
    waiting_limit: u32,
    stopped_limit: u32,
}

impl<S: TaskSource> TaskAggregator<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            waiting_limit: WAITING_FETCH_LIMIT,
            stopped_limit: STOPPED_FETCH_LIMIT,
        }
    }

    /// Override the page sizes used for the waiting and stopped lists.
    pub fn with_limits(mut self, waiting: u32, stopped: u32) -> Self {
        self.waiting_limit = waiting;
        self.stopped_limit = stopped;
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Fetch all three lists and report which ones were skipped.
    pub fn collect(&self) -> Aggregate {
        let mut aggregate = Aggregate::default();

        match self.source.active() {
            Ok(active) => aggregate.tasks.extend(active),
            Err(err) => {
                tracing::warn!("Active task list unavailable, showing no tasks: {}", err);
                aggregate.skipped.push((SubCollection::Active, err));
                return aggregate;
            }
        }

        match self.source.waiting(0, self.waiting_limit) {
            Ok(waiting) => aggregate.tasks.extend(waiting),
            Err(err) => {
                tracing::warn!("Skipping waiting tasks: {}", err);
                aggregate.skipped.push((SubCollection::Waiting, err));
            }
        }

        match self.source.stopped(0, self.stopped_limit) {
            Ok(stopped) => aggregate.tasks.extend(stopped),
            Err(err) => {
                tracing::warn!("Skipping stopped tasks: {}", err);
                aggregate.skipped.push((SubCollection::Stopped, err));
            }
        }

        tracing::debug!(
            "Aggregated {} tasks ({} lists skipped)",
            aggregate.tasks.len(),
            aggregate.skipped.len()
        );
        aggregate
    }

    /// Combined task view. Never fails; see the module docs for how partial
    /// failures shrink the result.
    pub fn fetch_all(&self) -> Vec<TaskRecord> {
        self.collect().tasks
    }

    /// Number of tasks in the combined view, with the same degradation.
    pub fn count(&self) -> usize {
        self.collect().tasks.len()
    }
}

impl<S> TaskAggregator<S>
where
    S: TaskSource + Clone + Send + 'static,
{
    /// [`fetch_all`](Self::fetch_all) on the blocking thread pool, for shells
    /// that refresh from an async event loop.
    pub async fn fetch_all_async(&self) -> Vec<TaskRecord> {
        let aggregator = self.clone();
        match tokio::task::spawn_blocking(move || aggregator.fetch_all()).await {
            Ok(tasks) => tasks,
            Err(e) => {
                tracing::error!("Task aggregation worker failed: {}", e);
                Vec::new()
            }
        }
    }

    /// [`count`](Self::count) on the blocking thread pool.
    pub async fn count_async(&self) -> usize {
        let aggregator = self.clone();
        match tokio::task::spawn_blocking(move || aggregator.count()).await {
            Ok(count) => count,
            Err(e) => {
                tracing::error!("Task count worker failed: {}", e);
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn tasks(prefix: &str, n: usize) -> Vec<TaskRecord> {
        (0..n)
            .map(|i| TaskRecord {
                gid: format!("{}{}", prefix, i),
                ..TaskRecord::default()
            })
            .collect()
    }

    fn unreachable() -> RpcError {
        RpcError::Connect("connection refused".to_string())
    }

    #[derive(Clone)]
    struct FakeSource {
        active: RpcResult<Vec<TaskRecord>>,
        waiting: RpcResult<Vec<TaskRecord>>,
        stopped: RpcResult<Vec<TaskRecord>>,
        pages: Arc<Mutex<Vec<(&'static str, i64, u32)>>>,
    }

    impl FakeSource {
        fn new(
            active: RpcResult<Vec<TaskRecord>>,
            waiting: RpcResult<Vec<TaskRecord>>,
            stopped: RpcResult<Vec<TaskRecord>>,
        ) -> Self {
            Self {
                active,
                waiting,
                stopped,
                pages: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    impl TaskSource for FakeSource {
        fn active(&self) -> RpcResult<Vec<TaskRecord>> {
            self.active.clone()
        }

        fn waiting(&self, offset: i64, num: u32) -> RpcResult<Vec<TaskRecord>> {
            self.pages.lock().unwrap().push(("waiting", offset, num));
            self.waiting.clone()
        }

        fn stopped(&self, offset: i64, num: u32) -> RpcResult<Vec<TaskRecord>> {
            self.pages.lock().unwrap().push(("stopped", offset, num));
            self.stopped.clone()
        }
    }

    fn gids(tasks: &[TaskRecord]) -> Vec<&str> {
        tasks.iter().map(|t| t.gid.as_str()).collect()
    }

    #[test]
    fn test_all_lists_in_fetch_order() {
        let source = FakeSource::new(Ok(tasks("a", 1)), Ok(tasks("w", 2)), Ok(tasks("s", 1)));
        let aggregator = TaskAggregator::new(source);

        let aggregate = aggregator.collect();
        assert!(aggregate.is_complete());
        assert_eq!(gids(&aggregate.tasks), vec!["a0", "w0", "w1", "s0"]);
        assert_eq!(aggregator.count(), 4);
    }

    #[test]
    fn test_waiting_failure_keeps_active_and_stopped() {
        let source = FakeSource::new(Ok(tasks("a", 2)), Err(unreachable()), Ok(tasks("s", 3)));
        let aggregator = TaskAggregator::new(source);

        let all = aggregator.fetch_all();
        assert_eq!(all.len(), 5);
        assert_eq!(gids(&all), vec!["a0", "a1", "s0", "s1", "s2"]);
        assert_eq!(aggregator.count(), 5);

        let aggregate = aggregator.collect();
        assert_eq!(aggregate.skipped.len(), 1);
        assert_eq!(aggregate.skipped[0].0, SubCollection::Waiting);
    }

    #[test]
    fn test_stopped_failure_keeps_earlier_lists() {
        let source = FakeSource::new(Ok(tasks("a", 1)), Ok(tasks("w", 1)), Err(unreachable()));
        let aggregator = TaskAggregator::new(source);
        assert_eq!(gids(&aggregator.fetch_all()), vec!["a0", "w0"]);
        assert_eq!(aggregator.count(), 2);
    }

    #[test]
    fn test_active_failure_empties_view() {
        let source = FakeSource::new(Err(unreachable()), Ok(tasks("w", 4)), Ok(tasks("s", 2)));
        let aggregator = TaskAggregator::new(source);

        assert!(aggregator.fetch_all().is_empty());
        assert_eq!(aggregator.count(), 0);
        assert!(aggregator.source().pages.lock().unwrap().is_empty());

        let aggregate = aggregator.collect();
        assert_eq!(aggregate.skipped[0].0, SubCollection::Active);
    }

    #[test]
    fn test_duplicates_are_kept() {
        let source = FakeSource::new(Ok(tasks("x", 1)), Ok(tasks("x", 1)), Ok(Vec::new()));
        let all = TaskAggregator::new(source).fetch_all();
        assert_eq!(gids(&all), vec!["x0", "x0"]);
    }

    #[test]
    fn test_default_page_sizes() {
        let source = FakeSource::new(Ok(Vec::new()), Ok(Vec::new()), Ok(Vec::new()));
        let aggregator = TaskAggregator::new(source);
        aggregator.fetch_all();

        let pages = aggregator.source().pages.lock().unwrap().clone();
        assert_eq!(pages, vec![("waiting", 0, 1000), ("stopped", 0, 100)]);
    }

    #[test]
    fn test_custom_page_sizes() {
        let source = FakeSource::new(Ok(Vec::new()), Ok(Vec::new()), Ok(Vec::new()));
        let aggregator = TaskAggregator::new(source).with_limits(10, 5);
        aggregator.count();

        let pages = aggregator.source().pages.lock().unwrap().clone();
        assert_eq!(pages, vec![("waiting", 0, 10), ("stopped", 0, 5)]);
    }

    #[tokio::test]
    async fn test_fetch_all_async() {
        let source = FakeSource::new(Ok(tasks("a", 2)), Err(unreachable()), Ok(tasks("s", 1)));
        let aggregator = TaskAggregator::new(source);
        assert_eq!(aggregator.fetch_all_async().await.len(), 3);
        assert_eq!(aggregator.count_async().await, 3);
    }
}
