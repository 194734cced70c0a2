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

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;

use conflux::prelude::*;

mod setup;

/// No more than `parallelism` submitted actions are ever active at once.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn active_tasks_never_exceed_parallelism() -> anyhow::Result<()> {
    setup::initialize_tracing();

    let pool = WorkerPool::new(2);
    let active = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let completed = Arc::new(AtomicUsize::new(0));

    for _ in 0..10 {
        let active = Arc::clone(&active);
        let peak = Arc::clone(&peak);
        let completed = Arc::clone(&completed);
        pool.spawn(ExecutionContext::new(), move |_context| async move {
            let now = active.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(25)).await;
            active.fetch_sub(1, Ordering::SeqCst);
            completed.fetch_add(1, Ordering::SeqCst);
        });
    }

    pool.stop().await?;
    assert_eq!(completed.load(Ordering::SeqCst), 10);
    assert!(peak.load(Ordering::SeqCst) <= 2);
    assert!(peak.load(Ordering::SeqCst) >= 1);
    Ok(())
}

/// `stop` lets everything admitted beforehand run to completion, and
/// ignores later submissions without erroring.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stop_drains_admitted_work_and_rejects_new() -> anyhow::Result<()> {
    setup::initialize_tracing();

    let pool = WorkerPool::new(1);
    let completed = Arc::new(AtomicUsize::new(0));

    for _ in 0..3 {
        let completed = Arc::clone(&completed);
        pool.spawn(ExecutionContext::new(), move |_context| async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            completed.fetch_add(1, Ordering::SeqCst);
        });
    }

    pool.stop().await?;
    assert_eq!(completed.load(Ordering::SeqCst), 3);

    let late = Arc::clone(&completed);
    pool.spawn(ExecutionContext::new(), move |_context| async move {
        late.fetch_add(1, Ordering::SeqCst);
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(completed.load(Ordering::SeqCst), 3);

    // A second stop is a harmless no-op.
    pool.stop().await?;
    Ok(())
}

/// The context captured at submission is handed back to the action when it
/// runs, wherever it runs.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn submission_context_is_restored_for_the_action() -> anyhow::Result<()> {
    setup::initialize_tracing();

    let pool = WorkerPool::new(2);
    let context = ExecutionContext::named("billing-7")
        .with("locale", "en-NZ")
        .with("principal", "svc-batch");

    let (observed, observation) = oneshot::channel();
    pool.spawn(context, move |context| async move {
        let _ = observed.send((
            context.correlation().map(str::to_owned),
            context.get("locale").map(str::to_owned),
            context.get("principal").map(str::to_owned),
        ));
    });

    let (correlation, locale, principal) = observation.await?;
    assert_eq!(correlation.as_deref(), Some("billing-7"));
    assert_eq!(locale.as_deref(), Some("en-NZ"));
    assert_eq!(principal.as_deref(), Some("svc-batch"));

    pool.stop().await?;
    Ok(())
}

/// The admission queue is unbounded: a burst far beyond the slot count is
/// absorbed and eventually fully executed.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn admission_queue_absorbs_bursts() -> anyhow::Result<()> {
    setup::initialize_tracing();

    let pool = WorkerPool::new(2);
    let completed = Arc::new(AtomicUsize::new(0));

    for _ in 0..500 {
        let completed = Arc::clone(&completed);
        pool.spawn(ExecutionContext::new(), move |_context| async move {
            completed.fetch_add(1, Ordering::SeqCst);
        });
    }

    pool.stop().await?;
    assert_eq!(completed.load(Ordering::SeqCst), 500);
    Ok(())
}
