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

use std::future::Future;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{instrument, trace};

use crate::agent::AgentBuilder;
use crate::common::ExecutionContext;
use crate::pool::WorkerPool;

/// What flows into the reducer agent: mapped items, then one completion
/// request that reads the accumulator back out.
enum Fold<T> {
    Item(T),
    Complete,
}

/// Runs a two-stage parallel map → serialized reduce pipeline.
///
/// Stage 1 drains `source` into a bounded buffer of `bounded_capacity`
/// (feeding suspends while full), then runs up to `parallelism` concurrent
/// `map` invocations on `pool`, each flattening one input into zero or more
/// items. Stage 2 folds every mapped item into the accumulator through a
/// single reducer agent, one item at a time, in whatever order stage 1
/// delivers them.
///
/// Because delivery order across parallel branches is not deterministic,
/// `reduce` must be associative and commutative (or otherwise
/// order-insensitive) for the result to be reproducible; that is the
/// caller's obligation, not enforced here.
///
/// A fault in either stage faults the returned future with the original
/// error and cancels the session; no partial result is returned. Dropping
/// the returned future cancels the session the same way.
#[instrument(skip_all, fields(pool = %pool.id(), parallelism = parallelism, bounded_capacity = bounded_capacity))]
pub async fn fork_join<Source, Item, Mapped, Seq, Acc, MapFn, MapFut, ReduceFn, ReduceFut>(
    pool: &WorkerPool,
    source: Source,
    map: MapFn,
    reduce: ReduceFn,
    initial: Acc,
    parallelism: usize,
    bounded_capacity: usize,
) -> anyhow::Result<Acc>
where
    Source: IntoIterator<Item = Item> + Send + 'static,
    Source::IntoIter: Send + 'static,
    Item: Send + 'static,
    Mapped: Send + 'static,
    Seq: IntoIterator<Item = Mapped> + Send + 'static,
    Acc: Send + 'static,
    MapFn: Fn(Item) -> MapFut,
    MapFut: Future<Output = anyhow::Result<Seq>> + Send + 'static,
    ReduceFn: Fn(Acc, Mapped) -> ReduceFut + Send + Sync + 'static,
    ReduceFut: Future<Output = anyhow::Result<Acc>> + Send + 'static,
{
    let session = CancellationToken::new();
    // Dropping the outer future trips the token, winding down both stages.
    let _session_guard = session.clone().drop_guard();

    let reduce = Arc::new(reduce);
    let reducer = {
        let project = {
            let reduce = Arc::clone(&reduce);
            move |state: Option<anyhow::Result<Acc>>, message: Fold<Mapped>| {
                let reduce = Arc::clone(&reduce);
                async move { Ok(apply(&*reduce, state, message).await) }
            }
        };
        let respond = {
            let reduce = Arc::clone(&reduce);
            move |state: Option<anyhow::Result<Acc>>, message: Fold<Mapped>| {
                let reduce = Arc::clone(&reduce);
                async move {
                    match message {
                        Fold::Complete => {
                            let outcome =
                                state.unwrap_or_else(|| Err(anyhow!("fold produced no state")));
                            Ok((None, outcome))
                        }
                        // Items normally arrive as posts; a stray ask still
                        // folds its item.
                        item => {
                            let next = apply(&*reduce, state, item).await;
                            Ok((next, Err(anyhow!("fold still in progress"))))
                        }
                    }
                }
            }
        };
        // The reducer mailbox shares the session capacity; consumer sends
        // suspend when it fills.
        AgentBuilder::named("forkjoin-reducer")
            .mailbox_capacity(bounded_capacity.max(1))
            .start_replying(Some(Ok(initial)), project, respond)
    };

    // Input stage: feed the bounded buffer, suspending while it is full.
    let (feed, intake) = mpsc::channel::<Item>(bounded_capacity.max(1));
    let producer = tokio::spawn(feed_source(source, feed, session.clone()));

    let gate = Arc::new(Semaphore::new(parallelism.max(1)));
    let (results, mut outcomes) = mpsc::unbounded_channel::<anyhow::Result<Seq>>();

    // Map stage: dispatch each map invocation onto the pool, at most
    // `parallelism` in flight. When the driver and every dispatched task have
    // finished, the last `results` sender drops and the outcome stream ends.
    let driver_session = session.clone();
    let driver = async move {
        let mut intake = intake;
        loop {
            let item = tokio::select! {
                biased;
                () = driver_session.cancelled() => break,
                next = intake.recv() => {
                    let Some(item) = next else { break };
                    item
                }
            };
            let Ok(permit) = Arc::clone(&gate).acquire_owned().await else {
                break;
            };
            let mapping = map(item);
            let results = results.clone();
            pool.spawn(ExecutionContext::named("forkjoin-map"), move |_context| {
                async move {
                    let _permit = permit;
                    let _ = results.send(mapping.await);
                }
            });
        }
    };

    // Reduce feed: flatten each mapped sequence into the reducer, running
    // concurrently with the driver so results stream as they complete.
    let reducer_ref = &reducer;
    let consumer_session = &session;
    let consumer = async move {
        while let Some(outcome) = outcomes.recv().await {
            match outcome {
                Ok(seq) => {
                    for item in seq {
                        reducer_ref.send(Fold::Item(item)).await?;
                    }
                }
                Err(error) => {
                    trace!("map stage faulted; cancelling session");
                    consumer_session.cancel();
                    return Err(error.context("fork-join map stage faulted"));
                }
            }
        }
        Ok(())
    };

    let ((), fed) = futures::join!(driver, consumer);
    let _ = producer.await;

    if let Err(error) = fed {
        reducer.cancel();
        return Err(error);
    }

    let folded = reducer
        .ask(Fold::Complete)
        .await
        .context("fork-join reducer halted")?;
    reducer.stop().await?;
    folded
}

async fn feed_source<Source, Item>(
    source: Source,
    feed: mpsc::Sender<Item>,
    session: CancellationToken,
) where
    Source: IntoIterator<Item = Item> + Send + 'static,
    Source::IntoIter: Send + 'static,
    Item: Send + 'static,
{
    for item in source {
        tokio::select! {
            biased;
            () = session.cancelled() => {
                trace!("input stage cancelled");
                return;
            }
            sent = feed.send(item) => {
                if sent.is_err() {
                    return;
                }
            }
        }
    }
}

/// One fold step. A reduce fault is captured in the accumulator slot; items
/// arriving after it drain without further folding.
async fn apply<Acc, Mapped, ReduceFn, ReduceFut>(
    reduce: &ReduceFn,
    state: Option<anyhow::Result<Acc>>,
    message: Fold<Mapped>,
) -> Option<anyhow::Result<Acc>>
where
    ReduceFn: Fn(Acc, Mapped) -> ReduceFut,
    ReduceFut: Future<Output = anyhow::Result<Acc>>,
{
    match message {
        Fold::Item(item) => match state {
            Some(Ok(accumulator)) => Some(reduce(accumulator, item).await),
            faulted_or_spent => faulted_or_spent,
        },
        Fold::Complete => state,
    }
}
