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

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::oneshot;
use tracing::{instrument, trace};

use crate::agent::{AgentBuilder, AgentHandle};
use crate::common::types::{FutureBox, ReceiverFn};
use crate::common::{AgentId, ExecutionContext};
use crate::message::MessageError;
use crate::pool::WorkerPool;
use crate::traits::{AgentMessage, Lifecycle};

/// A receive registration waiting for a value: the handler, the context the
/// caller captured at submission, and the sink fired when the handler begins
/// executing.
struct PendingReceiver<T> {
    handler: ReceiverFn<T>,
    context: ExecutionContext,
    engaged: oneshot::Sender<()>,
}

/// The coordinator's exclusively-owned state.
///
/// Invariant: at most one of `pending_values` and `pending_receivers` is
/// non-empty at any observable instant: every operation matches against the
/// opposite queue before enqueuing itself. `parked_sends` only holds items
/// while a configured capacity bound is full, which implies no receiver is
/// waiting.
struct ChannelState<T> {
    pending_values: VecDeque<T>,
    pending_receivers: VecDeque<PendingReceiver<T>>,
    parked_sends: VecDeque<(T, oneshot::Sender<()>)>,
    capacity: Option<usize>,
}

impl<T> ChannelState<T> {
    fn new(capacity: Option<usize>) -> Self {
        Self {
            pending_values: VecDeque::new(),
            pending_receivers: VecDeque::new(),
            parked_sends: VecDeque::new(),
            capacity,
        }
    }

    fn has_buffer_room(&self) -> bool {
        match self.capacity {
            Some(limit) => self.pending_values.len() < limit,
            None => true,
        }
    }
}

/// The operations the coordinator agent understands.
enum ChannelOp<T> {
    Send {
        value: T,
        accepted: oneshot::Sender<()>,
    },
    Recv(PendingReceiver<T>),
    Snapshot {
        reply: oneshot::Sender<ChannelSnapshot>,
    },
}

/// Queue depths observed at one instant inside the coordinator's step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelSnapshot {
    /// Values sent but not yet matched to a receiver.
    pub pending_values: usize,
    /// Receivers waiting for a value.
    pub pending_receivers: usize,
}

/// A CSP-style channel matching senders and receivers in FIFO order.
///
/// All channel state is owned by a single coordinator agent and mutated only
/// inside its serialized transition, so matching needs no locks. Matched
/// `(receiver, value)` pairs are handed to the [`WorkerPool`] for execution,
/// with the receiver's captured [`ExecutionContext`] restored.
///
/// Both internal queues are unbounded by default; a sustained rate mismatch
/// between senders and receivers grows memory without limit. Use
/// [`Channel::bounded`] to cap the value buffer and suspend fast senders
/// instead.
pub struct Channel<T> {
    coordinator: AgentHandle<ChannelOp<T>>,
}

impl<T> Clone for Channel<T> {
    fn clone(&self) -> Self {
        Self {
            coordinator: self.coordinator.clone(),
        }
    }
}

impl<T> fmt::Debug for Channel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("id", &self.coordinator.id)
            .finish()
    }
}

impl<T: AgentMessage> Channel<T> {
    /// Creates an unbounded channel dispatching matched handlers onto `pool`.
    pub fn new(pool: Arc<WorkerPool>) -> Self {
        Self::with_capacity(None, pool)
    }

    /// Creates a channel whose value buffer holds at most `capacity`
    /// unmatched sends; further senders suspend until a receiver drains one.
    pub fn bounded(capacity: usize, pool: Arc<WorkerPool>) -> Self {
        Self::with_capacity(Some(capacity.max(1)), pool)
    }

    fn with_capacity(capacity: Option<usize>, pool: Arc<WorkerPool>) -> Self {
        let transition = move |mut state: ChannelState<T>, op: ChannelOp<T>| {
            let pool = Arc::clone(&pool);
            async move {
                match op {
                    ChannelOp::Send { value, accepted } => {
                        match state.pending_receivers.pop_front() {
                            // A receiver was already waiting: match and hand off.
                            Some(receiver) => {
                                hand_off(&pool, receiver, value);
                                let _ = accepted.send(());
                            }
                            None if state.has_buffer_room() => {
                                state.pending_values.push_back(value);
                                let _ = accepted.send(());
                            }
                            // Bounded and full: park the sender, acceptance
                            // stays unfired until a receive frees a slot.
                            None => {
                                trace!("value buffer full; parking sender");
                                state.parked_sends.push_back((value, accepted));
                            }
                        }
                    }
                    ChannelOp::Recv(receiver) => match state.pending_values.pop_front() {
                        Some(value) => {
                            hand_off(&pool, receiver, value);
                            if let Some((value, accepted)) = state.parked_sends.pop_front() {
                                state.pending_values.push_back(value);
                                let _ = accepted.send(());
                            }
                        }
                        None => state.pending_receivers.push_back(receiver),
                    },
                    ChannelOp::Snapshot { reply } => {
                        let _ = reply.send(ChannelSnapshot {
                            pending_values: state.pending_values.len(),
                            pending_receivers: state.pending_receivers.len(),
                        });
                    }
                }
                Ok(state)
            }
        };

        Self {
            coordinator: AgentBuilder::named("channel").start(ChannelState::new(capacity), transition),
        }
    }

    /// The channel's identity (its coordinator agent's id).
    pub fn id(&self) -> &AgentId {
        self.coordinator.id()
    }

    /// Sends a value into the channel.
    ///
    /// The returned future completes once the send has been matched with a
    /// waiting receiver or buffered. On a bounded channel with a full
    /// buffer it completes once a receive has made room (backpressure).
    #[instrument(skip_all, fields(channel = %self.coordinator.id))]
    pub async fn send(&self, value: T) -> Result<(), MessageError> {
        let (accepted, acceptance) = oneshot::channel();
        self.coordinator
            .send(ChannelOp::Send { value, accepted })
            .await?;
        acceptance
            .await
            .map_err(|_| MessageError::MailboxClosed)
    }

    /// Registers a receive.
    ///
    /// If a value is already buffered, the oldest one is matched
    /// immediately; otherwise the handler waits its FIFO turn. The returned
    /// future completes once `handler` **begins executing** on the pool, not
    /// once it finishes. `context` is captured now and handed back to the
    /// handler when it runs.
    #[instrument(skip(self, handler), fields(channel = %self.coordinator.id, context = %context))]
    pub async fn recv<F, Fut>(
        &self,
        context: ExecutionContext,
        handler: F,
    ) -> Result<(), MessageError>
    where
        F: FnOnce(T, ExecutionContext) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (engaged, engagement) = oneshot::channel();
        let receiver = PendingReceiver {
            handler: Box::new(move |value, context| Box::pin(handler(value, context)) as FutureBox),
            context,
            engaged,
        };
        self.coordinator.send(ChannelOp::Recv(receiver)).await?;
        engagement
            .await
            .map_err(|_| MessageError::ReplyDropped)
    }

    /// Consumes the channel forever: each delivery immediately re-issues the
    /// next receive.
    ///
    /// The loop ends only when the channel (or the pool executing handlers)
    /// stops; there is no normal completion. Values are delivered to
    /// `handler` in match order, though handler executions may overlap on a
    /// pool with parallelism above one.
    pub fn subscribe<F, Fut>(&self, context: ExecutionContext, handler: F)
    where
        F: Fn(T, ExecutionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let channel = self.clone();
        let handler = Arc::new(handler);
        self.coordinator.tracker().spawn(async move {
            loop {
                let handler = Arc::clone(&handler);
                let delivered = channel
                    .recv(context.clone(), move |value, context| {
                        (*handler)(value, context)
                    })
                    .await;
                if delivered.is_err() {
                    trace!(channel = %channel.coordinator.id, "subscription ended");
                    break;
                }
            }
        });
    }

    /// Reads the queue depths as observed inside the coordinator's step.
    pub async fn snapshot(&self) -> Result<ChannelSnapshot, MessageError> {
        let (reply, snapshot) = oneshot::channel();
        self.coordinator.send(ChannelOp::Snapshot { reply }).await?;
        snapshot
            .await
            .map_err(|_| MessageError::MailboxClosed)
    }

    /// Cooperatively halts the coordinator; queued values and receivers are
    /// discarded.
    pub fn cancel(&self) {
        self.coordinator.cancel();
    }

    /// Gracefully stops the channel after already-accepted operations have
    /// been applied.
    pub async fn stop(&self) -> anyhow::Result<()> {
        self.coordinator.stop().await
    }
}

#[async_trait]
impl<T: AgentMessage> Lifecycle for Channel<T> {
    fn id(&self) -> &AgentId {
        self.coordinator.id()
    }

    fn cancel(&self) {
        Channel::cancel(self);
    }

    async fn stop(&self) -> anyhow::Result<()> {
        Channel::stop(self).await
    }
}

/// Hands a matched pair to the pool; the engagement sink fires on the pool
/// task immediately before the handler runs.
fn hand_off<T: AgentMessage>(pool: &WorkerPool, receiver: PendingReceiver<T>, value: T) {
    let PendingReceiver {
        handler,
        context,
        engaged,
    } = receiver;
    pool.spawn(context, move |context| async move {
        let _ = engaged.send(());
        handler(value, context).await;
    });
}
