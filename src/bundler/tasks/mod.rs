//! Concurrent task execution with a sequential fallback.
//!
//! [`TaskManager`] spawns independent work on a [`JoinSet`]. Targets that are
//! not concurrency-safe are queued instead and run in declaration order once
//! everything concurrent has finished.
//!
//! Failure and cancellation are cooperative: when one task fails (or the
//! token fires) the others are detached, not aborted, and their results are
//! ignored. [`TaskManager::await_settled`] instead waits for tasks to reach
//! their own checkpoints after cancellation.

pub mod cancel;

pub use cancel::checkpoint;

use crate::bundler::{Arch, Error, Result, target::Target};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

struct QueuedTarget {
    target: Arc<dyn Target>,
    app_out_dir: PathBuf,
    arch: Arch,
}

/// Runs tasks of one build.
pub struct TaskManager {
    token: CancellationToken,
    running: JoinSet<Result<()>>,
    sequential: Vec<QueuedTarget>,
}

impl std::fmt::Debug for TaskManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskManager")
            .field("running", &self.running.len())
            .field("sequential", &self.sequential.len())
            .field("cancelled", &self.token.is_cancelled())
            .finish()
    }
}

impl TaskManager {
    /// Creates a manager observing `token`.
    pub fn new(token: CancellationToken) -> Self {
        Self {
            token,
            running: JoinSet::new(),
            sequential: Vec::new(),
        }
    }

    /// Token shared by all tasks of the build.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Number of tasks added and not yet awaited.
    pub fn len(&self) -> usize {
        self.running.len() + self.sequential.len()
    }

    /// Whether no tasks are pending.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Spawns `task` to run concurrently.
    ///
    /// Nothing is spawned once the token has been cancelled.
    pub fn add<F>(&mut self, task: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        if self.token.is_cancelled() {
            log::debug!("build cancelled, not starting new task");
            return;
        }
        self.running.spawn(task);
    }

    /// Schedules one target build.
    ///
    /// Concurrency-safe targets start right away; the others wait for
    /// [`await_all`](Self::await_all) to finish the concurrent batch.
    pub fn add_target(&mut self, target: Arc<dyn Target>, app_out_dir: PathBuf, arch: Arch) {
        if target.concurrency_safe() {
            self.add(async move { target.build(&app_out_dir, arch).await });
        } else {
            log::debug!("target {} is not concurrency-safe, queued", target.name());
            self.sequential.push(QueuedTarget {
                target,
                app_out_dir,
                arch,
            });
        }
    }

    /// Schedules all targets for one output directory.
    ///
    /// When every target is concurrency-safe they are added directly.
    /// Otherwise the whole batch becomes one task running its own manager, so
    /// the unsafe targets start only after the safe ones of this batch are done.
    pub fn add_targets(&mut self, targets: &[Arc<dyn Target>], app_out_dir: PathBuf, arch: Arch) {
        if targets.iter().all(|t| t.concurrency_safe()) {
            for target in targets {
                self.add_target(target.clone(), app_out_dir.clone(), arch);
            }
            return;
        }

        let targets = targets.to_vec();
        let token = self.token.clone();
        self.add(async move {
            let mut batch = TaskManager::new(token);
            for target in targets {
                batch.add_target(target, app_out_dir.clone(), arch);
            }
            batch.await_all().await
        });
    }

    /// Waits for every task, then runs queued targets one by one.
    ///
    /// Returns the first failure, or [`Error::Cancelled`] when the token
    /// fires first. Remaining tasks are detached in both cases.
    pub async fn await_all(mut self) -> Result<()> {
        loop {
            tokio::select! {
                biased;
                _ = self.token.cancelled() => {
                    self.running.detach_all();
                    return Err(Error::Cancelled);
                }
                next = self.running.join_next() => match next {
                    None => break,
                    Some(joined) => {
                        if let Err(error) = joined.map_err(Error::from).and_then(|r| r) {
                            self.running.detach_all();
                            return Err(error);
                        }
                    }
                },
            }
        }

        self.run_sequential().await
    }

    /// Like [`await_all`](Self::await_all), but keeps joining after the token
    /// fires.
    ///
    /// Tasks that observe cancellation at their own checkpoints are waited
    /// for, so nothing they started is still writing when this returns.
    /// Returns [`Error::Cancelled`] once everything has settled if a task
    /// stopped at a checkpoint or a queued target was skipped. Other failures
    /// still detach the rest.
    pub async fn await_settled(mut self) -> Result<()> {
        let mut cancelled = false;
        while let Some(joined) = self.running.join_next().await {
            match joined.map_err(Error::from).and_then(|r| r) {
                Ok(()) => {}
                Err(error) if error.is_cancelled() => cancelled = true,
                Err(error) => {
                    self.running.detach_all();
                    return Err(error);
                }
            }
        }

        if cancelled {
            return Err(Error::Cancelled);
        }
        self.run_sequential().await
    }

    async fn run_sequential(&mut self) -> Result<()> {
        for queued in std::mem::take(&mut self.sequential) {
            checkpoint(&self.token)?;
            log::debug!("building target {}", queued.target.name());
            queued.target.build(&queued.app_out_dir, queued.arch).await?;
        }
        Ok(())
    }
}
