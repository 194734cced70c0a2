/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */

use std::fmt;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{instrument, trace, trace_span, Instrument};

use crate::common::config::CONFIG;
use crate::common::types::{FutureBox, TaskFn};
use crate::common::{AgentId, ExecutionContext};
use crate::traits::Lifecycle;

struct PoolTask {
    context: ExecutionContext,
    action: TaskFn,
}

/// A bounded-concurrency executor for arbitrary asynchronous callbacks.
///
/// At most `parallelism` submitted actions are active at once; everything
/// else waits in an admission queue. The queue is unbounded (a simplicity
/// trade-off, not a backpressure guarantee), so sustained over-submission
/// grows memory without limit.
///
/// Each action is submitted together with an [`ExecutionContext`] captured
/// by the caller; the pool hands the context back to the action when it
/// runs, on whatever task it lands on, and records it on the task's tracing
/// span.
pub struct WorkerPool {
    id: AgentId,
    admission: mpsc::UnboundedSender<PoolTask>,
    cancellation: CancellationToken,
    tracker: TaskTracker,
    parallelism: usize,
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(CONFIG.limits.pool_parallelism)
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("id", &self.id)
            .field("parallelism", &self.parallelism)
            .finish()
    }
}

impl WorkerPool {
    /// Creates a pool with at most `parallelism` concurrently active tasks.
    ///
    /// A `parallelism` of 0 uses the number of available cores.
    pub fn new(parallelism: usize) -> Self {
        let parallelism = if parallelism == 0 {
            std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1)
        } else {
            parallelism
        };

        let id = AgentId::new("pool");
        let (admission, intake) = mpsc::unbounded_channel();
        let limiter = Arc::new(Semaphore::new(parallelism));
        let cancellation = CancellationToken::new();
        let tracker = TaskTracker::new();

        tracker.spawn(dispatch(
            id.clone(),
            intake,
            limiter,
            tracker.clone(),
            cancellation.clone(),
        ));
        tracker.close();

        Self {
            id,
            admission,
            cancellation,
            tracker,
            parallelism,
        }
    }

    /// The pool's identity.
    pub fn id(&self) -> &AgentId {
        &self.id
    }

    /// The maximum number of concurrently active tasks.
    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    /// Submits `action` for execution once a slot is free.
    ///
    /// `context` is captured here, at submission time, and passed back to
    /// `action` when it eventually runs. After [`stop`](Self::stop) the
    /// submission is ignored without error.
    #[instrument(skip(self, action), fields(pool = %self.id, context = %context))]
    pub fn spawn<F, Fut>(&self, context: ExecutionContext, action: F)
    where
        F: FnOnce(ExecutionContext) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if self.cancellation.is_cancelled() {
            trace!(pool = %self.id, "pool stopped; ignoring submission");
            return;
        }
        let task = PoolTask {
            context,
            action: Box::new(move |context| Box::pin(action(context)) as FutureBox),
        };
        if self.admission.send(task).is_err() {
            trace!(pool = %self.id, "admission queue closed; ignoring submission");
        }
    }

    /// Halts admission without waiting for the queue to drain.
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Gracefully shuts the pool down.
    ///
    /// New submissions are rejected from this point on; items already in the
    /// admission queue still execute, and the call waits for every in-flight
    /// task to finish. Running actions are never forcibly cancelled.
    #[instrument(skip(self), fields(pool = %self.id))]
    pub async fn stop(&self) -> anyhow::Result<()> {
        self.cancellation.cancel();
        self.tracker.wait().await;
        Ok(())
    }
}

#[async_trait]
impl Lifecycle for WorkerPool {
    fn id(&self) -> &AgentId {
        &self.id
    }

    fn cancel(&self) {
        WorkerPool::cancel(self);
    }

    async fn stop(&self) -> anyhow::Result<()> {
        WorkerPool::stop(self).await
    }
}

#[instrument(skip_all, fields(pool = %id))]
async fn dispatch(
    id: AgentId,
    mut intake: mpsc::UnboundedReceiver<PoolTask>,
    limiter: Arc<Semaphore>,
    tracker: TaskTracker,
    cancellation: CancellationToken,
) {
    let mut cancelled = Box::pin(cancellation.cancelled());

    loop {
        let task = tokio::select! {
            biased;
            () = &mut cancelled => break,
            next = intake.recv() => {
                let Some(task) = next else { return };
                task
            }
        };
        launch(task, &limiter, &tracker).await;
    }

    // Admission has been halted; everything already accepted still runs.
    while let Ok(task) = intake.try_recv() {
        launch(task, &limiter, &tracker).await;
    }
    trace!(pool = %id, "admission queue drained");
}

async fn launch(task: PoolTask, limiter: &Arc<Semaphore>, tracker: &TaskTracker) {
    // Wait for a free slot before the task becomes active; the permit rides
    // inside the task and frees the slot when it finishes.
    let Ok(permit) = Arc::clone(limiter).acquire_owned().await else {
        return;
    };
    let PoolTask { context, action } = task;
    let span = trace_span!("pool_task", context = %context);
    tracker.spawn(
        async move {
            let _permit = permit;
            action(context).await;
        }
        .instrument(span),
    );
}
